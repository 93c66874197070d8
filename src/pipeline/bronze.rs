//! Bronze stage: raw extracts normalized into schema-stable partitions.

use std::collections::BTreeMap;
use std::time::Instant;

use arrow::array::{AsArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::normalize::{NormalizedBatch, SchemaNormalizer};
use crate::pipeline::raw::{RawFile, read_raw_file};
use crate::schema::{PREFIX_COLUMN, SourceKind};
use crate::store::{PartitionKey, PartitionScheme, PartitionedStore};
use crate::utils::{create_main_progress_bar, finish_progress_bar};
use crate::validation::ValidationWarning;

/// What the bronze stage wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct BronzeOutcome {
    /// Rows written per source kind
    pub rows: BTreeMap<SourceKind, usize>,
    pub warnings: Vec<ValidationWarning>,
}

/// Normalizes raw files and writes them to the bronze layer
pub struct BronzeStage<'a> {
    normalizer: &'a SchemaNormalizer,
    store: &'a PartitionedStore,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> BronzeStage<'a> {
    #[must_use]
    pub const fn new(
        normalizer: &'a SchemaNormalizer,
        store: &'a PartitionedStore,
        batch_size: usize,
        show_progress: bool,
    ) -> Self {
        Self {
            normalizer,
            store,
            batch_size,
            show_progress,
        }
    }

    /// Normalize and write every file; each kind's bronze table is replaced as a whole
    pub fn run(&self, files: &[RawFile]) -> Result<BronzeOutcome> {
        let start = Instant::now();
        let mut outcome = BronzeOutcome::default();

        for kind in SourceKind::ALL {
            let kind_files: Vec<&RawFile> = files.iter().filter(|f| f.kind == kind).collect();
            if kind_files.is_empty() {
                let warning = ValidationWarning::OptionalSourceAbsent {
                    table: kind.as_str().to_string(),
                };
                log::warn!("{warning}");
                outcome.warnings.push(warning);
                self.store.remove_table(kind.as_str())?;
                continue;
            }

            let normalized = self.normalize_files(kind, &kind_files)?;
            for batch in &normalized {
                if batch.report.rows_dropped() > 0 {
                    outcome.warnings.push(ValidationWarning::DroppedRows {
                        source_name: batch.source_name.clone(),
                        empty: batch.report.empty_rows_dropped,
                        missing_id: batch.report.missing_id_dropped,
                    });
                }
            }

            let partitions = normalized
                .iter()
                .map(split_by_partition)
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect();
            let rows = self
                .store
                .replace_batches(kind.as_str(), PartitionScheme::YearPrefix, partitions)?;
            if rows == 0 {
                outcome.warnings.push(ValidationWarning::EmptyResult {
                    table: kind.as_str().to_string(),
                });
            }
            outcome.rows.insert(kind, rows);
        }

        log::info!("Bronze stage finished in {:?}", start.elapsed());
        Ok(outcome)
    }

    /// Read and normalize files of one kind in parallel; all workers join before returning
    fn normalize_files(&self, kind: SourceKind, files: &[&RawFile]) -> Result<Vec<NormalizedBatch>> {
        let pb = create_main_progress_bar(
            files.len() as u64,
            &format!("Normalizing {kind} files"),
            self.show_progress,
        );

        let per_file = files
            .par_iter()
            .map(|file| {
                let batches = self
                    .normalizer
                    .normalize_file(&read_raw_file(file, self.batch_size)?);
                pb.inc(1);
                batches
            })
            .collect::<Result<Vec<_>>>()?;

        finish_progress_bar(&pb, &format!("Normalized {} {kind} files", files.len()));
        Ok(per_file.into_iter().flatten().collect())
    }
}

/// Split a normalized batch into one batch per partition key
pub fn split_by_partition(normalized: &NormalizedBatch) -> Result<Vec<(PartitionKey, RecordBatch)>> {
    let Some(year) = normalized.year else {
        return Ok(Vec::new());
    };
    let batch = &normalized.batch;
    let prefixes = batch
        .column_by_name(PREFIX_COLUMN)
        .and_then(|column| column.as_string_opt::<i32>())
        .ok_or_else(|| Error::ColumnNotFound {
            column: PREFIX_COLUMN.to_string(),
        })?;

    let mut rows_by_prefix: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for (row, prefix) in prefixes.iter().enumerate() {
        let row = u32::try_from(row).map_err(|_| Error::Config("batch too large".to_string()))?;
        rows_by_prefix.entry(prefix.unwrap_or_default()).or_default().push(row);
    }

    rows_by_prefix
        .into_iter()
        .map(|(prefix, rows)| {
            let part = take_record_batch(batch, &UInt32Array::from(rows))?;
            Ok((PartitionKey::year_prefix(year, prefix), part))
        })
        .collect()
}
