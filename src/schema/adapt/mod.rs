//! Type adaptation for raw columns.
//!
//! Raw extracts arrive as text (CSV) or loosely typed Parquet. This module coerces a single
//! column into the semantic type a descriptor declares for it.

pub mod conversions;
pub mod date_utils;
pub mod types;

pub use conversions::{convert_array, create_null_array};
pub use date_utils::parse_date_string;
pub use types::{AdapterError, DateFormatConfig};
