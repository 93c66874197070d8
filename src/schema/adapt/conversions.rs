//! Module for converting between different array types.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Date32Builder, NullArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;

use crate::schema::adapt::date_utils::{date_to_days, parse_date_string};
use crate::schema::adapt::types::{AdapterError, DateFormatConfig, Result};

/// Convert an Arrow array to match the target data type
///
/// Unparseable values become null rather than failing the whole column.
pub fn convert_array(
    array: &ArrayRef,
    target_type: &DataType,
    date_config: &DateFormatConfig,
) -> Result<ArrayRef> {
    let source_type = array.data_type();

    if source_type == target_type {
        return Ok(array.clone());
    }

    match (source_type, target_type) {
        (DataType::Utf8 | DataType::LargeUtf8, DataType::Date32) => {
            convert_string_to_date32(array, date_config)
        }

        // Integer columns written as text often carry a decimal point ("30.0")
        (DataType::Utf8 | DataType::LargeUtf8, t) if t.is_integer() => {
            let as_float = cast::cast(array, &DataType::Float64)?;
            Ok(cast::cast(&as_float, target_type)?)
        }

        (DataType::Dictionary(_, _), _) => {
            let values = cast::cast(array, &DataType::Utf8)?;
            convert_array(&values, target_type, date_config)
        }

        (DataType::Null, _) => create_null_array(target_type, array.len()),

        _ => cast::cast(array, target_type).map_err(|e| {
            AdapterError::ConversionError(format!(
                "Failed to convert from {source_type:?} to {target_type:?}: {e}"
            ))
        }),
    }
}

/// Create a null array of the specified type and length
pub fn create_null_array(data_type: &DataType, length: usize) -> Result<ArrayRef> {
    let null_array: ArrayRef = Arc::new(NullArray::new(length));
    cast::cast(&null_array, data_type).map_err(|e| {
        AdapterError::ConversionError(format!(
            "Failed to create null array of type {data_type:?}: {e}"
        ))
    })
}

/// Convert a string array to a Date32 array
fn convert_string_to_date32(array: &ArrayRef, date_config: &DateFormatConfig) -> Result<ArrayRef> {
    let utf8 = cast::cast(array, &DataType::Utf8)?;
    let strings = utf8
        .as_string_opt::<i32>()
        .ok_or_else(|| AdapterError::ValidationError("Expected StringArray".to_string()))?;

    let mut builder = Date32Builder::with_capacity(strings.len());
    for value in strings {
        match value.and_then(|s| parse_date_string(s, date_config)) {
            Some(date) => builder.append_value(date_to_days(date)),
            None => builder.append_null(),
        }
    }

    Ok(Arc::new(builder.finish()) as ArrayRef)
}
