//! Per-row value helpers used when converting between typed rows and record batches.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Decimal128Array, StringArray};
use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::money::{CURRENCY_PRECISION, CURRENCY_SCALE, Money};
use crate::schema::adapt::date_utils::{date_to_days, days_to_date};

/// Turn an optional column into a required one
pub fn require<T>(column: Option<T>, name: &str) -> Result<T> {
    column.ok_or_else(|| Error::ColumnNotFound {
        column: name.to_string(),
    })
}

/// Amount at a row; null reads as zero
#[must_use]
pub fn money_at(array: &Decimal128Array, row: usize) -> Money {
    if array.is_null(row) {
        Money::ZERO
    } else {
        Money::from_decimal128(array.value(row))
    }
}

/// Nullable amount at a row
#[must_use]
pub fn optional_money_at(array: &Decimal128Array, row: usize) -> Option<Money> {
    array
        .is_valid(row)
        .then(|| Money::from_decimal128(array.value(row)))
}

/// Date at a row
#[must_use]
pub fn date_at(array: &Date32Array, row: usize) -> Option<NaiveDate> {
    if array.is_null(row) {
        None
    } else {
        days_to_date(array.value(row))
    }
}

/// Owned text at a row, keeping empty strings
#[must_use]
pub fn string_at(array: &StringArray, row: usize) -> Option<String> {
    array.is_valid(row).then(|| array.value(row).to_string())
}

/// Build a currency column
pub fn money_array(values: impl IntoIterator<Item = Money>) -> Result<ArrayRef> {
    let array = Decimal128Array::from_iter_values(values.into_iter().map(Money::to_decimal128))
        .with_precision_and_scale(CURRENCY_PRECISION, CURRENCY_SCALE)?;
    Ok(Arc::new(array))
}

/// Build a nullable currency column
pub fn optional_money_array(values: impl IntoIterator<Item = Option<Money>>) -> Result<ArrayRef> {
    let array: Decimal128Array = values
        .into_iter()
        .map(|value| value.map(Money::to_decimal128))
        .collect();
    Ok(Arc::new(
        array.with_precision_and_scale(CURRENCY_PRECISION, CURRENCY_SCALE)?,
    ))
}

/// Build a nullable date column
pub fn date_array(values: impl IntoIterator<Item = Option<NaiveDate>>) -> ArrayRef {
    let array: Date32Array = values.into_iter().map(|d| d.map(date_to_days)).collect();
    Arc::new(array)
}

/// Build a text column from owned strings
pub fn string_array<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.into_iter().collect::<StringArray>())
}
