//! Provider dimension extraction.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::models::{Claim, PrescriptionEvent, Provider};
use crate::schema::SchemaDescriptor;
use crate::utils::arrow::{has_values, string_column, text_at};

/// Collects provider references and attributes each provider a state by majority vote
#[derive(Debug, Clone)]
pub struct ProviderExtractor {
    unknown_token: String,
    /// Provider id → observed state → occurrences
    observed: BTreeMap<String, FxHashMap<String, usize>>,
}

impl ProviderExtractor {
    #[must_use]
    pub fn new(unknown_token: impl Into<String>) -> Self {
        Self {
            unknown_token: unknown_token.into(),
            observed: BTreeMap::new(),
        }
    }

    fn is_reference(&self, id: &str) -> bool {
        !id.is_empty() && id != self.unknown_token
    }

    fn observe(&mut self, id: &str, state: Option<&str>) {
        if !self.is_reference(id) {
            return;
        }
        let votes = self.observed.entry(id.to_string()).or_default();
        if let Some(state) = state.filter(|s| *s != self.unknown_token) {
            *votes.entry(state.to_string()).or_default() += 1;
        }
    }

    /// Record every provider column of a normalized claim or pharmacy batch
    pub fn observe_batch(&mut self, descriptor: &SchemaDescriptor, batch: &RecordBatch) -> Result<()> {
        let state = descriptor
            .provider_state_columns
            .iter()
            .find(|name| has_values(batch, name))
            .map(|name| string_column(batch, name))
            .transpose()?
            .flatten();

        for name in &descriptor.provider_columns {
            let Some(ids) = string_column(batch, name)? else {
                continue;
            };
            for row in 0..batch.num_rows() {
                if let Some(id) = text_at(&ids, row) {
                    let state = state.as_ref().and_then(|states| text_at(states, row));
                    self.observe(id, state);
                }
            }
        }
        Ok(())
    }

    /// Record the resolved provider of each claim
    pub fn observe_claims(&mut self, claims: &[Claim]) {
        for claim in claims {
            self.observe(&claim.provider_id, None);
        }
    }

    /// Record the resolved provider of each prescription
    pub fn observe_prescriptions(&mut self, events: &[PrescriptionEvent]) {
        for event in events {
            self.observe(&event.provider_id, None);
        }
    }

    /// One row per distinct provider, sorted by id
    ///
    /// The state is the most frequently observed one; ties go to the alphabetically first
    /// state, and a provider never seen with a state gets the unknown token.
    #[must_use]
    pub fn finish(self) -> Vec<Provider> {
        let unknown = self.unknown_token;
        self.observed
            .into_iter()
            .map(|(provider_id, votes)| {
                let state = votes
                    .into_iter()
                    .max_by(|(state_a, count_a), (state_b, count_b)| {
                        count_a.cmp(count_b).then_with(|| state_b.cmp(state_a))
                    })
                    .map_or_else(|| unknown.clone(), |(state, _)| state);
                Provider {
                    provider_id,
                    state,
                    provider_type: unknown.clone(),
                }
            })
            .collect()
    }
}
