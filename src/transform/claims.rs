//! Claim unification.
//!
//! Normalized inpatient, outpatient and carrier batches are collapsed into one [`Claim`]
//! stream and one [`DiagnosisLine`] stream. Every per-kind difference (which columns carry
//! the provider, whether payments are aggregate or per line, how many diagnosis slots exist)
//! comes from the kind's [`SchemaDescriptor`]; the code below is the same for all kinds.

use std::borrow::Cow;

use arrow::array::StringArray;
use arrow::record_batch::RecordBatch;
use log::{info, warn};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::models::{Claim, DiagnosisLine, Money};
use crate::reconcile::FieldResolver;
use crate::schema::{
    ClaimKind, LogicalField, PREFIX_COLUMN, ReconciliationConfig, SchemaDescriptor, YEAR_COLUMN,
};
use crate::transform::diagnosis::DiagnosisDictionary;
use crate::utils::arrow::{has_values, int32_column, require, string_column, text_at};
use crate::validation::ValidationWarning;

/// Normalized batches of one claim kind, labelled with where they came from
#[derive(Debug, Clone)]
pub struct ClaimSource {
    pub kind: ClaimKind,
    pub source_name: String,
    pub batch: RecordBatch,
}

/// Output of [`ClaimUnifier::unify`]
#[derive(Debug, Clone, Default)]
pub struct UnifiedClaims {
    pub claims: Vec<Claim>,
    pub diagnoses: Vec<DiagnosisLine>,
    pub warnings: Vec<ValidationWarning>,
}

impl UnifiedClaims {
    fn append(&mut self, mut other: Self) {
        self.claims.append(&mut other.claims);
        self.diagnoses.append(&mut other.diagnoses);
        self.warnings.append(&mut other.warnings);
    }
}

/// Merges claims of every kind into the unified claim and diagnosis models
#[derive(Debug, Clone)]
pub struct ClaimUnifier<'a> {
    reconciliation: &'a ReconciliationConfig,
    dictionary: &'a DiagnosisDictionary,
    unknown_token: &'a str,
}

impl<'a> ClaimUnifier<'a> {
    #[must_use]
    pub const fn new(
        reconciliation: &'a ReconciliationConfig,
        dictionary: &'a DiagnosisDictionary,
        unknown_token: &'a str,
    ) -> Self {
        Self {
            reconciliation,
            dictionary,
            unknown_token,
        }
    }

    fn descriptor(&self, kind: ClaimKind) -> Cow<'a, SchemaDescriptor> {
        self.reconciliation.descriptor(kind.source_kind())
    }

    /// Unify every source batch
    ///
    /// A kind without batches contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyClaims`] when no kind produces a single claim.
    pub fn unify(&self, sources: &[ClaimSource]) -> Result<UnifiedClaims> {
        let parts = sources
            .par_iter()
            .map(|source| self.unify_batch(source))
            .collect::<Result<Vec<_>>>()?;

        let mut unified = UnifiedClaims::default();
        for part in parts {
            unified.append(part);
        }

        for kind in ClaimKind::ALL {
            let count = unified.claims.iter().filter(|c| c.claim_type == kind).count();
            if count == 0 {
                warn!("No {kind} claims found");
            } else {
                info!("Unified {count} {kind} claims");
            }
        }

        if unified.claims.is_empty() {
            return Err(Error::EmptyClaims);
        }
        Ok(unified)
    }

    /// Unify one normalized batch of a single claim kind
    pub fn unify_batch(&self, source: &ClaimSource) -> Result<UnifiedClaims> {
        let descriptor = self.descriptor(source.kind);
        let batch = &source.batch;
        let rows = batch.num_rows();

        let bene_ids = require(string_column(batch, &descriptor.id_column)?, &descriptor.id_column)?;
        let years = require(int32_column(batch, YEAR_COLUMN)?, YEAR_COLUMN)?;
        let prefixes = require(string_column(batch, PREFIX_COLUMN)?, PREFIX_COLUMN)?;

        let mut resolver =
            FieldResolver::new(&descriptor, batch, &source.source_name, self.unknown_token);
        let claim_ids = resolver.texts(LogicalField::ClaimId)?;
        let from_dates = resolver.dates(LogicalField::FromDate)?;
        let thru_dates = resolver.dates(LogicalField::ThruDate)?;
        let providers = resolver.texts(LogicalField::ProviderId)?;
        let program = resolver.amounts(LogicalField::ProgramPayment)?;
        let third_party = resolver.amounts(LogicalField::ThirdPartyPayment)?;

        let slots = diagnosis_slot_columns(&descriptor, batch)?;

        let mut unified = UnifiedClaims {
            claims: Vec::with_capacity(rows),
            diagnoses: Vec::new(),
            warnings: resolver.into_warnings(),
        };

        for row in 0..rows {
            let Some(bene_id) = text_at(&bene_ids, row) else {
                continue;
            };
            let claim_id = claim_ids[row]
                .clone()
                .unwrap_or_else(|| self.unknown_token.to_string());
            let year = years.value(row);
            let prefix = prefixes.value(row).to_string();

            let mut claim = Claim {
                bene_id: bene_id.to_string(),
                claim_id,
                claim_type: source.kind,
                claim_from_date: from_dates[row],
                claim_thru_date: thru_dates[row],
                provider_id: providers[row]
                    .clone()
                    .unwrap_or_else(|| self.unknown_token.to_string()),
                medicare_payment: program[row],
                third_party_payment: third_party[row],
                patient_payment: Money::ZERO,
                total_payment: Money::ZERO,
                year,
                bene_id_prefix: prefix,
            };
            claim.compute_total();

            let codes: SmallVec<[(i32, &str); 10]> = slots
                .iter()
                .filter_map(|(position, column)| {
                    column
                        .as_ref()
                        .and_then(|codes| text_at(codes, row))
                        .map(|code| (*position, code))
                })
                .collect();
            for (position, code) in codes {
                unified.diagnoses.push(DiagnosisLine {
                    bene_id: claim.bene_id.clone(),
                    claim_id: claim.claim_id.clone(),
                    diagnosis_code: code.to_string(),
                    diagnosis_position: position,
                    claim_type: source.kind,
                    payment: claim.medicare_payment,
                    diagnosis_description: self.dictionary.describe(code).to_string(),
                    year,
                    bene_id_prefix: claim.bene_id_prefix.clone(),
                });
            }

            unified.claims.push(claim);
        }

        Ok(unified)
    }
}

/// The column read for each 1-based diagnosis slot, `None` when no candidate holds values
fn diagnosis_slot_columns(
    descriptor: &SchemaDescriptor,
    batch: &RecordBatch,
) -> Result<Vec<(i32, Option<StringArray>)>> {
    let Some(slots) = &descriptor.diagnosis_slots else {
        return Ok(Vec::new());
    };
    (1..=slots.count)
        .map(|slot| {
            let position = i32::try_from(slot).unwrap_or(i32::MAX);
            let column = slots
                .slot_candidates(slot)
                .into_iter()
                .find(|name| has_values(batch, name))
                .map(|name| string_column(batch, &name))
                .transpose()?
                .flatten();
            Ok((position, column))
        })
        .collect()
}
