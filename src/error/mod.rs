//! Error types for the claims pipeline.
//!
//! Structural failures (missing required sources or columns, undeterminable partition keys,
//! storage failures) are represented here and stop the stage that raised them. Recoverable
//! conditions such as reconciliation gaps or absent optional sources are not errors; they are
//! collected as [`crate::validation::ValidationWarning`] values instead.

pub mod util;

use std::path::PathBuf;

use crate::schema::SourceKind;
use crate::schema::adapt::AdapterError;

/// Errors raised by the pipeline, the store and the lookup service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("I/O error on {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting between serde types and Arrow batches
    #[error("Serde Arrow error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Type coercion error
    #[error("Type adaptation error: {0}")]
    Adapter(#[from] AdapterError),

    /// A mandatory upstream table produced zero rows
    #[error("Required source '{table}' produced no rows")]
    MissingRequiredSource { table: String },

    /// Required structural columns could not be located in a batch
    #[error("Missing required columns for {kind}: {}", columns.join(", "))]
    MissingRequiredColumns {
        kind: SourceKind,
        columns: Vec<String>,
    },

    /// No year could be derived for a batch
    #[error("Cannot determine year for {kind} batch from {source_name}")]
    YearUndetermined {
        kind: SourceKind,
        source_name: String,
    },

    /// A raw file name does not map to a known source kind
    #[error("Unknown source kind for file: {path}")]
    UnknownSourceKind { path: PathBuf },

    /// The union of all claim kinds is empty
    #[error("No claims were produced by any claim kind")]
    EmptyClaims,

    /// Two writers claimed the same partition file concurrently
    #[error("Concurrent write to partition {path}")]
    PartitionWriteConflict { path: PathBuf },

    /// A reconciliation descriptor is inconsistent
    #[error("Invalid descriptor for {kind}: {reason}")]
    InvalidDescriptor { kind: SourceKind, reason: String },

    /// Column not found
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// Column has an unexpected data type
    #[error("Invalid data type for column {column}: expected {expected}")]
    InvalidDataType { column: String, expected: String },

    /// Lookup year outside the supported range
    #[error("Year {year} is outside the supported range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Attach a path to an I/O error
    #[must_use]
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Whether this error reports a missing mandatory source
    #[must_use]
    pub const fn is_missing_source(&self) -> bool {
        matches!(self, Self::MissingRequiredSource { .. } | Self::EmptyClaims)
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
