//! Typed column access for record batches.
//!
//! Every accessor adapts the stored type to the requested one, so callers can read a column
//! the same way whether it came from text extracts or from typed Parquet.

use arrow::array::{
    Array, ArrayRef, Date32Array, Decimal128Array, Float64Array, Int32Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::models::money::CURRENCY_TYPE;
use crate::schema::adapt::{DateFormatConfig, convert_array, create_null_array};

/// Get a column from a record batch with automatic type adaptation
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column array (converted if necessary) if found
/// * `Ok(None)` - If the column is not found and `required` is false
/// * `Err(Error)` - If the column is not found and `required` is true
pub fn get_column(
    batch: &RecordBatch,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        if required {
            return Err(Error::ColumnNotFound {
                column: column_name.to_string(),
            });
        }
        return Ok(None);
    };

    let column = batch.column(idx);
    let actual_type = column.data_type();
    if actual_type == expected_type {
        return Ok(Some(column.clone()));
    }

    debug!("Converting column '{column_name}' from {actual_type:?} to {expected_type:?}");
    let converted = match convert_array(column, expected_type, &DateFormatConfig::default()) {
        Ok(converted) => converted,
        Err(err) => {
            warn!("Failed to convert column '{column_name}' to {expected_type:?}: {err}");
            create_null_array(expected_type, batch.num_rows())?
        }
    };

    Ok(Some(converted))
}

/// Downcast a column to a specific array type with clear error messages
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| Error::InvalidDataType {
            column: column_name.to_string(),
            expected: expected_type_name.to_string(),
        })
}

fn typed_column<A: Array + Clone + 'static>(
    batch: &RecordBatch,
    column_name: &str,
    data_type: &DataType,
    type_name: &str,
) -> Result<Option<A>> {
    get_column(batch, column_name, data_type, false)?
        .map(|array| downcast_array::<A>(&array, column_name, type_name).cloned())
        .transpose()
}

/// Whether a column exists and holds at least one non-null value
#[must_use]
pub fn has_values(batch: &RecordBatch, column_name: &str) -> bool {
    batch
        .column_by_name(column_name)
        .is_some_and(|column| column.null_count() < column.len())
}

/// Read a column as UTF-8 text
pub fn string_column(batch: &RecordBatch, column_name: &str) -> Result<Option<StringArray>> {
    typed_column(batch, column_name, &DataType::Utf8, "Utf8")
}

/// Read a column as a currency decimal
pub fn decimal_column(batch: &RecordBatch, column_name: &str) -> Result<Option<Decimal128Array>> {
    typed_column(batch, column_name, &CURRENCY_TYPE, "Decimal128")
}

/// Read a column as a date
pub fn date_column(batch: &RecordBatch, column_name: &str) -> Result<Option<Date32Array>> {
    typed_column(batch, column_name, &DataType::Date32, "Date32")
}

/// Read a column as a 32-bit integer
pub fn int32_column(batch: &RecordBatch, column_name: &str) -> Result<Option<Int32Array>> {
    typed_column(batch, column_name, &DataType::Int32, "Int32")
}

/// Read a column as a 64-bit float
pub fn float64_column(batch: &RecordBatch, column_name: &str) -> Result<Option<Float64Array>> {
    typed_column(batch, column_name, &DataType::Float64, "Float64")
}

/// Trimmed, non-empty text at a row
#[must_use]
pub fn text_at(array: &StringArray, row: usize) -> Option<&str> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row).trim();
    (!value.is_empty()).then_some(value)
}
