//! Provider reference rows.

use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::store::{PartitionKey, PartitionScheme};

/// A deduplicated provider with its most frequently observed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: String,
    pub state: String,
    pub provider_type: String,
}

impl ArrowSchema for Provider {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("provider_id", DataType::Utf8, false),
            Field::new("state", DataType::Utf8, false),
            Field::new("provider_type", DataType::Utf8, false),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let fields: Vec<FieldRef> = Self::schema().fields().iter().cloned().collect();
        Ok(serde_arrow::to_record_batch(&fields, &models)?)
    }
}

impl StoredTable for Provider {
    const TABLE_NAME: &'static str = "dim_provider";
    const SCHEME: PartitionScheme = PartitionScheme::Unpartitioned;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::unpartitioned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_through_serde_arrow() {
        let providers = vec![
            Provider {
                provider_id: "P1".to_string(),
                state: "CA".to_string(),
                provider_type: "Unknown".to_string(),
            },
            Provider {
                provider_id: "P2".to_string(),
                state: "Unknown".to_string(),
                provider_type: "Unknown".to_string(),
            },
        ];
        let batch = Provider::to_record_batch(&providers).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(Provider::from_record_batch(&batch).unwrap(), providers);
    }
}
