//! Gold stage: pre-aggregated views over the silver tables.

use std::time::Instant;

use serde::Serialize;

use crate::analytics::{MetricsAggregator, TopKDiagnosisRanker, build_patient_view};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::models::{
    Beneficiary, Claim, DiagnosisLine, MemberYearMetrics, PatientViewRow, PrescriptionEvent,
    StoredTable, TopDiagnosis,
};
use crate::store::PartitionedStore;
use crate::validation::ValidationWarning;

/// Row counts of the gold tables
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoldOutcome {
    pub metrics: usize,
    pub top_diagnoses: usize,
    pub patient_view: usize,
    pub warnings: Vec<ValidationWarning>,
}

/// Builds the gold tables from the silver layer
pub struct GoldStage<'a> {
    config: &'a PipelineConfig,
    silver: &'a PartitionedStore,
    gold: &'a PartitionedStore,
}

impl<'a> GoldStage<'a> {
    #[must_use]
    pub const fn new(
        config: &'a PipelineConfig,
        silver: &'a PartitionedStore,
        gold: &'a PartitionedStore,
    ) -> Self {
        Self {
            config,
            silver,
            gold,
        }
    }

    /// Build and write every gold table
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingRequiredSource`] when `dim_beneficiary` is absent or empty.
    pub fn run(&self) -> Result<GoldOutcome> {
        let start = Instant::now();
        let mut outcome = GoldOutcome::default();

        let beneficiaries = self.silver.read_table::<Beneficiary>()?.ok_or_else(|| {
            Error::MissingRequiredSource {
                table: Beneficiary::TABLE_NAME.to_string(),
            }
        })?;
        let claims = self.silver.read_table::<Claim>()?;
        let prescriptions = self.silver.read_table::<PrescriptionEvent>()?;

        let aggregated = MetricsAggregator::new(self.config.unknown_token.as_str()).aggregate(
            &beneficiaries,
            claims.as_deref(),
            prescriptions.as_deref(),
        )?;
        outcome.warnings.extend(aggregated.warnings);
        outcome.metrics = self.gold.write_table::<MemberYearMetrics>(&aggregated.metrics)?;

        let diagnoses = self.silver.read_table::<DiagnosisLine>()?.unwrap_or_default();
        let ranked = TopKDiagnosisRanker::new(self.config.top_k).rank(&diagnoses);
        outcome.top_diagnoses = self.gold.write_table::<TopDiagnosis>(&ranked)?;
        if ranked.is_empty() {
            outcome.warnings.push(ValidationWarning::EmptyResult {
                table: TopDiagnosis::TABLE_NAME.to_string(),
            });
        }

        // The view is built from what was just written, not from the in-memory rows
        let metrics = self.gold.read_table::<MemberYearMetrics>()?.unwrap_or_default();
        let top = self.gold.read_table::<TopDiagnosis>()?.unwrap_or_default();
        match build_patient_view(&metrics, &top) {
            Ok(rows) => {
                outcome.patient_view = self.gold.write_table::<PatientViewRow>(&rows)?;
            }
            Err(err) if err.is_missing_source() => {
                log::warn!("Skipping {}: {err}", PatientViewRow::TABLE_NAME);
                self.gold.remove_table(PatientViewRow::TABLE_NAME)?;
                outcome.warnings.push(ValidationWarning::EmptyResult {
                    table: PatientViewRow::TABLE_NAME.to_string(),
                });
            }
            Err(err) => return Err(err),
        }

        log::info!(
            "Gold stage wrote {} metrics rows, {} top diagnoses, {} patient view rows in {:?}",
            outcome.metrics,
            outcome.top_diagnoses,
            outcome.patient_view,
            start.elapsed()
        );
        Ok(outcome)
    }
}
