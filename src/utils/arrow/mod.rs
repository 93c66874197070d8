//! Utilities for working with Arrow arrays and record batches.

pub mod columns;
pub mod rows;

pub use columns::{
    date_column, decimal_column, downcast_array, float64_column, get_column, has_values,
    int32_column, string_column, text_at,
};
pub use rows::{
    date_array, date_at, money_array, money_at, optional_money_array, optional_money_at,
    require, string_array, string_at,
};
