//! Read-only lookups over the gold layer.
//!
//! The service never writes. A patient lookup reads the `patient_api_view` partition of the
//! requested year with the async Parquet reader, keeps the rows of that patient and folds
//! them into a [`PatientView`].

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::StringArray;
use arrow::compute::filter_record_batch;
use arrow::compute::kernels::cmp::eq;
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::models::{ArrowSchema, MemberYearMetrics, PatientView, PatientViewRow, StoredTable, TopDiagnosis};
use crate::store::{PartitionKey, PartitionedStore};
use crate::utils::{log_operation_complete, log_operation_start};

/// Overall state reported by [`LookupService::health`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Which gold tables exist for which years
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub tables: BTreeMap<String, bool>,
}

/// Patient lookups against a gold layer; clones share one store
#[derive(Debug, Clone)]
pub struct LookupService {
    store: Arc<PartitionedStore>,
    years: RangeInclusive<i32>,
    top_k: usize,
}

impl LookupService {
    #[must_use]
    pub fn new(gold_root: impl Into<PathBuf>, years: RangeInclusive<i32>, top_k: usize) -> Self {
        Self {
            store: Arc::new(PartitionedStore::new(gold_root)),
            years,
            top_k,
        }
    }

    /// Lookup service over `gold_root` with the years and cutoff of a pipeline configuration
    #[must_use]
    pub fn from_config(gold_root: impl Into<PathBuf>, config: &PipelineConfig) -> Self {
        Self::new(
            gold_root,
            config.supported_years(),
            usize::try_from(config.top_k).unwrap_or(usize::MAX),
        )
    }

    #[must_use]
    pub fn gold_root(&self) -> &Path {
        self.store.root()
    }

    fn check_year(&self, year: i32) -> Result<()> {
        if self.years.contains(&year) {
            Ok(())
        } else {
            Err(Error::YearOutOfRange {
                year,
                min: *self.years.start(),
                max: *self.years.end(),
            })
        }
    }

    /// Summary of one patient in one year
    ///
    /// Returns `Ok(None)` when the patient has no row in that year, including when the
    /// year partition was never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::YearOutOfRange`] for years outside the supported range.
    pub async fn patient(&self, bene_id: &str, year: i32) -> Result<Option<PatientView>> {
        self.check_year(year)?;
        let path = self
            .store
            .partition_path(PatientViewRow::TABLE_NAME, &PartitionKey::year(year));
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::io_at(&path, e))?
        {
            log::debug!("No patient view partition at {}", path.display());
            return Ok(None);
        }

        let start = Instant::now();
        log_operation_start("Looking up patient in", &path);
        let batches = read_parquet_async(&path).await?;

        let key = StringArray::new_scalar(bene_id);
        let mut rows = Vec::new();
        for batch in &batches {
            let Some(ids) = batch.column_by_name("bene_id") else {
                return Err(Error::ColumnNotFound {
                    column: "bene_id".to_string(),
                });
            };
            let mask = eq(ids, &key)?;
            let matching = filter_record_batch(batch, &mask)?;
            if matching.num_rows() > 0 {
                rows.extend(PatientViewRow::from_record_batch(&matching)?);
            }
        }
        log_operation_complete("matched", &path, rows.len(), Some(start.elapsed()));

        Ok(PatientView::from_rows(&rows, self.top_k))
    }

    /// Report whether every gold table exists for every supported year
    pub async fn health(&self) -> Result<HealthReport> {
        let mut tables = BTreeMap::new();
        for year in self.years.clone() {
            let key = PartitionKey::year(year);
            for (suffix, table) in [
                ("metrics", MemberYearMetrics::TABLE_NAME),
                ("diagnoses", TopDiagnosis::TABLE_NAME),
                ("patient_view", PatientViewRow::TABLE_NAME),
            ] {
                let path = self.store.partition_path(table, &key);
                let exists = tokio::fs::try_exists(&path)
                    .await
                    .map_err(|e| Error::io_at(&path, e))?;
                tables.insert(format!("{year}_{suffix}"), exists);
            }
        }

        let status = if tables.values().all(|exists| *exists) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        Ok(HealthReport { status, tables })
    }
}

/// Read a Parquet file with the async reader
pub async fn read_parquet_async(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io_at(path, e))?;
    let stream = ParquetRecordBatchStreamBuilder::new(file).await?.build()?;
    Ok(stream.try_collect::<Vec<_>>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosisSpend, Money};

    fn row(bene_id: &str, year: i32, diagnosis: Option<(&str, u32)>) -> PatientViewRow {
        PatientViewRow {
            bene_id: bene_id.to_string(),
            year,
            total_allowed: Money::from_units(120),
            total_paid: Money::from_units(100),
            inpatient_stays: 1,
            outpatient_visits: 2,
            rx_fills: 3,
            unique_providers: 2,
            diagnosis: diagnosis.map(|(code, rank)| DiagnosisSpend {
                code: code.to_string(),
                description: "Other diagnosis".to_string(),
                spend: Money::from_units(10),
                rank,
            }),
        }
    }

    fn seeded_gold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path());
        store
            .write_table(&[
                row("B1", 2008, Some(("4019", 1))),
                row("B1", 2008, Some(("25000", 2))),
                row("B2", 2008, None),
            ])
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn finds_a_patient_and_folds_its_diagnoses() {
        let dir = seeded_gold();
        let service = LookupService::new(dir.path(), 2008..=2010, 5);

        let view = service.patient("B1", 2008).await.unwrap().unwrap();
        assert_eq!(view.rx_fills, 3);
        let codes: Vec<&str> = view.top_diagnoses.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["4019", "25000"]);

        let empty = service.patient("B2", 2008).await.unwrap().unwrap();
        assert!(empty.top_diagnoses.is_empty());
    }

    #[tokio::test]
    async fn absent_patients_and_years_are_not_found() {
        let dir = seeded_gold();
        let service = LookupService::new(dir.path(), 2008..=2010, 5);
        assert!(service.patient("B9", 2008).await.unwrap().is_none());
        assert!(service.patient("B1", 2009).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_years_outside_the_range() {
        let dir = seeded_gold();
        let service = LookupService::new(dir.path(), 2008..=2010, 5);
        let err = service.patient("B1", 2011).await.unwrap_err();
        assert!(matches!(err, Error::YearOutOfRange { year: 2011, .. }));
    }

    #[tokio::test]
    async fn clones_serve_concurrent_lookups() {
        let dir = seeded_gold();
        let service = LookupService::new(dir.path(), 2008..=2010, 1);

        let handles: Vec<_> = ["B1", "B2"]
            .into_iter()
            .map(|bene_id| {
                let service = service.clone();
                tokio::spawn(async move { service.patient(bene_id, 2008).await })
            })
            .collect();

        let mut found = Vec::new();
        for handle in handles {
            let view = handle.await.unwrap().unwrap().unwrap();
            found.push((view.bene_id, view.top_diagnoses.len()));
        }
        assert_eq!(found, vec![("B1".to_string(), 1), ("B2".to_string(), 0)]);
        assert_eq!(service.gold_root(), dir.path());
    }

    #[tokio::test]
    async fn health_reports_missing_tables() {
        let dir = seeded_gold();
        let service = LookupService::new(dir.path(), 2008..=2008, 5);
        let report = service.health().await.unwrap();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.tables.get("2008_patient_view"), Some(&true));
        assert_eq!(report.tables.get("2008_metrics"), Some(&false));
        assert_eq!(report.tables.len(), 3);
    }
}
