//! Silver stage: bronze tables into the dimensional model.

use std::time::Instant;

use arrow::record_batch::RecordBatch;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::models::{Beneficiary, Claim, DiagnosisLine, PrescriptionEvent, Provider, StoredTable};
use crate::schema::{ClaimKind, ReconciliationConfig, SourceKind};
use crate::store::PartitionedStore;
use crate::transform::{
    BeneficiaryBuilder, ClaimSource, ClaimUnifier, DiagnosisDictionary, PrescriptionNormalizer,
    ProviderExtractor,
};
use crate::validation::ValidationWarning;

/// Row counts of the silver tables
#[derive(Debug, Clone, Default, Serialize)]
pub struct SilverOutcome {
    pub beneficiaries: usize,
    pub claims: usize,
    pub diagnoses: usize,
    pub prescriptions: usize,
    pub providers: usize,
    pub warnings: Vec<ValidationWarning>,
}

/// Builds the silver tables from the bronze layer
pub struct SilverStage<'a> {
    config: &'a PipelineConfig,
    reconciliation: &'a ReconciliationConfig,
    dictionary: &'a DiagnosisDictionary,
    bronze: &'a PartitionedStore,
    silver: &'a PartitionedStore,
}

impl<'a> SilverStage<'a> {
    #[must_use]
    pub const fn new(
        config: &'a PipelineConfig,
        reconciliation: &'a ReconciliationConfig,
        dictionary: &'a DiagnosisDictionary,
        bronze: &'a PartitionedStore,
        silver: &'a PartitionedStore,
    ) -> Self {
        Self {
            config,
            reconciliation,
            dictionary,
            bronze,
            silver,
        }
    }

    fn bronze_batches(&self, kind: SourceKind) -> Result<Vec<RecordBatch>> {
        Ok(self.bronze.read_batches(kind.as_str())?.unwrap_or_default())
    }

    /// Build and write every silver table
    ///
    /// Every table is computed before the first one is written, so a failing run leaves the
    /// previous silver layer untouched.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingRequiredSource`] without beneficiaries and with
    /// [`Error::EmptyClaims`] when no claim kind has rows.
    pub fn run(&self) -> Result<SilverOutcome> {
        let start = Instant::now();
        let mut outcome = SilverOutcome::default();
        let unknown = self.config.unknown_token.as_str();

        let beneficiaries = BeneficiaryBuilder::new(
            self.reconciliation.descriptor(SourceKind::Beneficiary).into_owned(),
            self.config.total_paid_policy,
            unknown,
        )
        .build(&self.bronze_batches(SourceKind::Beneficiary)?)?;
        if beneficiaries.is_empty() {
            return Err(Error::MissingRequiredSource {
                table: SourceKind::Beneficiary.as_str().to_string(),
            });
        }

        let mut providers = ProviderExtractor::new(unknown);
        let mut sources = Vec::new();
        for kind in ClaimKind::ALL {
            let descriptor = self.reconciliation.descriptor(kind.source_kind());
            for (index, batch) in self.bronze_batches(kind.source_kind())?.into_iter().enumerate() {
                providers.observe_batch(&descriptor, &batch)?;
                sources.push(ClaimSource {
                    kind,
                    source_name: format!("bronze/{kind}#{index}"),
                    batch,
                });
            }
        }

        let unified = ClaimUnifier::new(self.reconciliation, self.dictionary, unknown).unify(&sources)?;
        outcome.warnings.extend(unified.warnings);
        providers.observe_claims(&unified.claims);
        if unified.diagnoses.is_empty() {
            outcome.warnings.push(ValidationWarning::EmptyResult {
                table: DiagnosisLine::TABLE_NAME.to_string(),
            });
        }

        let pharmacy = self.reconciliation.descriptor(SourceKind::Pharmacy);
        let pharmacy_batches: Vec<(String, RecordBatch)> = self
            .bronze_batches(SourceKind::Pharmacy)?
            .into_iter()
            .enumerate()
            .map(|(index, batch)| (format!("bronze/{}#{index}", SourceKind::Pharmacy), batch))
            .collect();
        for (_, batch) in &pharmacy_batches {
            providers.observe_batch(&pharmacy, batch)?;
        }
        let prescriptions = PrescriptionNormalizer::new(self.reconciliation, unknown)
            .normalize(&pharmacy_batches)?;
        outcome.warnings.extend(prescriptions.warnings);
        if prescriptions.events.is_empty() {
            let warning = ValidationWarning::OptionalSourceAbsent {
                table: PrescriptionEvent::TABLE_NAME.to_string(),
            };
            log::warn!("{warning}");
            outcome.warnings.push(warning);
        }
        providers.observe_prescriptions(&prescriptions.events);
        let providers = providers.finish();

        outcome.beneficiaries = self.silver.write_table::<Beneficiary>(&beneficiaries)?;
        outcome.claims = self.silver.write_table::<Claim>(&unified.claims)?;
        outcome.diagnoses = self.silver.write_table::<DiagnosisLine>(&unified.diagnoses)?;
        outcome.prescriptions = self.silver.write_table::<PrescriptionEvent>(&prescriptions.events)?;
        outcome.providers = self.silver.write_table::<Provider>(&providers)?;

        log::info!(
            "Silver stage wrote {} beneficiaries, {} claims, {} diagnoses, {} prescriptions, {} providers in {:?}",
            outcome.beneficiaries,
            outcome.claims,
            outcome.diagnoses,
            outcome.prescriptions,
            outcome.providers,
            start.elapsed()
        );
        Ok(outcome)
    }
}
