//! Traits shared by every stored row type.

use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::store::{PartitionKey, PartitionScheme};

/// Conversion between a row type and Arrow record batches
pub trait ArrowSchema: Sized {
    /// Get the Arrow schema for this model
    fn schema() -> Schema;

    /// Convert a `RecordBatch` to a vector of this model
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>>;

    /// Convert a slice of this model to a `RecordBatch`
    fn to_record_batch(models: &[Self]) -> Result<RecordBatch>;

    /// Get the schema as `Arc<Schema>`
    fn schema_ref() -> Arc<Schema> {
        Arc::new(Self::schema())
    }
}

/// A row type persisted as a logical table in the partitioned store
pub trait StoredTable: ArrowSchema + Send + Sync {
    /// Directory and file name of the table
    const TABLE_NAME: &'static str;
    /// Partition levels used on disk
    const SCHEME: PartitionScheme;

    /// Partition this row is written to
    fn partition_key(&self) -> PartitionKey;
}
