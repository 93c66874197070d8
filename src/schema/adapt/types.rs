//! Core types and error definitions for type adaptation.

use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};

/// Errors that can occur during type adaptation
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),

    /// Error during type conversion
    #[error("Type conversion error: {0}")]
    ConversionError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Alias for Result with `AdapterError`
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Configuration for date format handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateFormatConfig {
    /// List of date format strings to try when parsing dates
    pub date_formats: Vec<String>,
    /// Enable heuristic format detection
    pub enable_format_detection: bool,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y%m%d".to_string(),   // Claim extracts: 20080115
                "%Y-%m-%d".to_string(), // ISO format: 2008-01-15
                "%Y/%m/%d".to_string(),
                "%m/%d/%Y".to_string(), // US: 01/15/2008
            ],
            enable_format_detection: true,
        }
    }
}
