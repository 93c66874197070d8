//! Per-patient-year metrics aggregation.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::models::{Beneficiary, Claim, MemberYearMetrics, PrescriptionEvent};
use crate::schema::ClaimKind;
use crate::validation::ValidationWarning;

/// Distinct references seen for one (patient, year)
#[derive(Debug, Default)]
struct Counters<'a> {
    inpatient: FxHashSet<&'a str>,
    outpatient: FxHashSet<&'a str>,
    carrier: FxHashSet<&'a str>,
    prescriptions: FxHashSet<&'a str>,
    providers: FxHashSet<&'a str>,
}

impl<'a> Counters<'a> {
    fn claims_of(&mut self, kind: ClaimKind) -> &mut FxHashSet<&'a str> {
        match kind {
            ClaimKind::Inpatient => &mut self.inpatient,
            ClaimKind::Outpatient => &mut self.outpatient,
            ClaimKind::Carrier => &mut self.carrier,
        }
    }
}

fn count(set: &FxHashSet<&str>) -> i64 {
    i64::try_from(set.len()).unwrap_or(i64::MAX)
}

/// Output of [`MetricsAggregator::aggregate`]
#[derive(Debug, Clone, Default)]
pub struct AggregatedMetrics {
    pub metrics: Vec<MemberYearMetrics>,
    pub warnings: Vec<ValidationWarning>,
}

/// Computes [`MemberYearMetrics`] from the silver tables
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    unknown_token: String,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new(unknown_token: impl Into<String>) -> Self {
        Self {
            unknown_token: unknown_token.into(),
        }
    }

    fn is_provider(&self, id: &str) -> bool {
        !id.trim().is_empty() && id != self.unknown_token
    }

    /// Aggregate one row per beneficiary-year
    ///
    /// Claims and prescriptions are optional: when absent, their counts are zero and an
    /// [`ValidationWarning::OptionalSourceAbsent`] is reported. Rows are ordered by patient,
    /// then year.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredSource`] when there are no beneficiaries.
    pub fn aggregate(
        &self,
        beneficiaries: &[Beneficiary],
        claims: Option<&[Claim]>,
        prescriptions: Option<&[PrescriptionEvent]>,
    ) -> Result<AggregatedMetrics> {
        if beneficiaries.is_empty() {
            return Err(Error::MissingRequiredSource {
                table: "dim_beneficiary".to_string(),
            });
        }

        let mut warnings = Vec::new();
        let mut counters: FxHashMap<(&str, i32), Counters<'_>> = FxHashMap::default();

        match claims.filter(|c| !c.is_empty()) {
            Some(claims) => {
                for claim in claims {
                    let entry = counters.entry((claim.bene_id.as_str(), claim.year)).or_default();
                    entry.claims_of(claim.claim_type).insert(&claim.claim_id);
                    if self.is_provider(&claim.provider_id) {
                        entry.providers.insert(&claim.provider_id);
                    }
                }
            }
            None => {
                let warning = ValidationWarning::OptionalSourceAbsent {
                    table: "fact_claims".to_string(),
                };
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }

        match prescriptions.filter(|p| !p.is_empty()) {
            Some(events) => {
                for event in events {
                    let entry = counters.entry((event.bene_id.as_str(), event.year)).or_default();
                    entry.prescriptions.insert(&event.prescription_id);
                    if self.is_provider(&event.provider_id) {
                        entry.providers.insert(&event.provider_id);
                    }
                }
            }
            None => {
                let warning = ValidationWarning::OptionalSourceAbsent {
                    table: "fact_prescription".to_string(),
                };
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }

        let empty = Counters::default();
        let mut metrics: Vec<MemberYearMetrics> = beneficiaries
            .iter()
            .map(|beneficiary| {
                let c = counters
                    .get(&(beneficiary.bene_id.as_str(), beneficiary.year))
                    .unwrap_or(&empty);
                MemberYearMetrics {
                    bene_id: beneficiary.bene_id.clone(),
                    year: beneficiary.year,
                    total_allowed: beneficiary.total_allowed,
                    total_paid: beneficiary.total_paid,
                    inpatient_stays: count(&c.inpatient),
                    outpatient_visits: count(&c.outpatient),
                    carrier_claims: count(&c.carrier),
                    rx_fills: count(&c.prescriptions),
                    unique_providers: count(&c.providers),
                    gender: beneficiary.gender.clone(),
                    race: beneficiary.race.clone(),
                    state: beneficiary.state.clone(),
                }
            })
            .collect();
        metrics.sort_by(|a, b| a.bene_id.cmp(&b.bene_id).then(a.year.cmp(&b.year)));

        log::info!("Aggregated metrics for {} beneficiary-years", metrics.len());
        Ok(AggregatedMetrics { metrics, warnings })
    }
}
