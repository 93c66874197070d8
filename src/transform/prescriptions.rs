//! Prescription drug event normalization.

use std::borrow::Cow;

use arrow::record_batch::RecordBatch;
use rayon::prelude::*;

use crate::error::Result;
use crate::models::PrescriptionEvent;
use crate::reconcile::FieldResolver;
use crate::schema::{
    LogicalField, PREFIX_COLUMN, ReconciliationConfig, SchemaDescriptor, SourceKind, YEAR_COLUMN,
};
use crate::utils::arrow::{int32_column, require, string_column, text_at};
use crate::validation::ValidationWarning;

/// Quantity assumed when the source carries none
pub const DEFAULT_QUANTITY: f64 = 1.0;
/// Days supply assumed when the source carries none
pub const DEFAULT_DAYS_SUPPLY: i32 = 30;

/// Output of [`PrescriptionNormalizer::normalize`]
#[derive(Debug, Clone, Default)]
pub struct NormalizedPrescriptions {
    pub events: Vec<PrescriptionEvent>,
    pub warnings: Vec<ValidationWarning>,
}

/// Turns normalized pharmacy batches into [`PrescriptionEvent`] rows
#[derive(Debug, Clone)]
pub struct PrescriptionNormalizer<'a> {
    descriptor: Cow<'a, SchemaDescriptor>,
    unknown_token: &'a str,
}

impl<'a> PrescriptionNormalizer<'a> {
    #[must_use]
    pub fn new(reconciliation: &'a ReconciliationConfig, unknown_token: &'a str) -> Self {
        Self {
            descriptor: reconciliation.descriptor(SourceKind::Pharmacy),
            unknown_token,
        }
    }

    /// Normalize every batch; `(source name, batch)` pairs
    pub fn normalize(&self, batches: &[(String, RecordBatch)]) -> Result<NormalizedPrescriptions> {
        let parts = batches
            .par_iter()
            .map(|(source_name, batch)| self.normalize_batch(source_name, batch))
            .collect::<Result<Vec<_>>>()?;

        let mut out = NormalizedPrescriptions::default();
        for mut part in parts {
            out.events.append(&mut part.events);
            out.warnings.append(&mut part.warnings);
        }
        log::info!("Normalized {} prescription events", out.events.len());
        Ok(out)
    }

    pub fn normalize_batch(&self, source_name: &str, batch: &RecordBatch) -> Result<NormalizedPrescriptions> {
        let id_column = &self.descriptor.id_column;
        let bene_ids = require(string_column(batch, id_column)?, id_column)?;
        let years = require(int32_column(batch, YEAR_COLUMN)?, YEAR_COLUMN)?;
        let prefixes = require(string_column(batch, PREFIX_COLUMN)?, PREFIX_COLUMN)?;

        let mut resolver = FieldResolver::new(&self.descriptor, batch, source_name, self.unknown_token);
        let prescription_ids = resolver.texts(LogicalField::PrescriptionId)?;
        let service_dates = resolver.dates(LogicalField::ServiceDate)?;
        let providers = resolver.texts(LogicalField::ProviderId)?;
        let products = resolver.texts(LogicalField::ProductId)?;
        let quantities = resolver.numbers(LogicalField::Quantity)?;
        let days_supply = resolver.numbers(LogicalField::DaysSupply)?;
        let patient = resolver.amounts(LogicalField::PatientPayment)?;
        let total = resolver.amounts(LogicalField::TotalCost)?;

        let unknown = || self.unknown_token.to_string();
        let mut events = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let Some(bene_id) = text_at(&bene_ids, row) else {
                continue;
            };
            events.push(PrescriptionEvent {
                bene_id: bene_id.to_string(),
                prescription_id: prescription_ids[row].clone().unwrap_or_else(unknown),
                service_date: service_dates[row],
                product_id: products[row].clone().unwrap_or_else(unknown),
                provider_id: providers[row].clone().unwrap_or_else(unknown),
                quantity_dispensed: quantities[row].unwrap_or(DEFAULT_QUANTITY),
                days_supply: days_supply[row].map_or(DEFAULT_DAYS_SUPPLY, days_from_f64),
                patient_payment: patient[row],
                total_cost: total[row],
                medicare_payment: total[row] - patient[row],
                year: years.value(row),
                bene_id_prefix: prefixes.value(row).to_string(),
            });
        }

        Ok(NormalizedPrescriptions {
            events,
            warnings: resolver.into_warnings(),
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn days_from_f64(days: f64) -> i32 {
    days.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use crate::normalize::{RawBatch, SchemaNormalizer};
    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn pharmacy(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        );
        let arrays = columns
            .iter()
            .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
            .collect();
        let raw = RawBatch {
            kind: SourceKind::Pharmacy,
            source_name: "prescription_drug_events.csv".to_string(),
            batch: RecordBatch::try_new(Arc::new(schema), arrays).unwrap(),
        };
        SchemaNormalizer::new(ReconciliationConfig::default(), "00")
            .normalize(&raw)
            .unwrap()
            .batch
    }

    #[test]
    fn program_payment_is_total_minus_patient() {
        let batch = pharmacy(&[
            ("DESYNPUF_ID", vec![Some("B1"), Some("B1")]),
            ("PDE_ID", vec![Some("R1"), Some("R2")]),
            ("SRVC_DT", vec![Some("20080405"), Some("20080506")]),
            ("PROD_SRVC_ID", vec![Some("NDC1"), None]),
            ("PRSCRBR_ID", vec![Some("P9"), Some("P9")]),
            ("QTY_DSPNSD_NUM", vec![Some("60"), None]),
            ("DAYS_SUPLY_NUM", vec![Some("90"), None]),
            ("PTNT_PAY_AMT", vec![Some("5.00"), None]),
            ("TOT_RX_CST_AMT", vec![Some("25.00"), Some("30.00")]),
        ]);
        let config = ReconciliationConfig::default();
        let out = PrescriptionNormalizer::new(&config, "Unknown")
            .normalize(&[("pde".to_string(), batch)])
            .unwrap();

        assert_eq!(out.events.len(), 2);
        let first = &out.events[0];
        assert_eq!(first.medicare_payment, Money::from_units(20));
        assert_eq!(first.provider_id, "P9");
        assert!((first.quantity_dispensed - 60.0).abs() < f64::EPSILON);
        assert_eq!(first.days_supply, 90);
        assert_eq!(first.year, 2008);

        let second = &out.events[1];
        assert_eq!(second.medicare_payment, Money::from_units(30));
        assert_eq!(second.product_id, "Unknown");
        assert!((second.quantity_dispensed - DEFAULT_QUANTITY).abs() < f64::EPSILON);
        assert_eq!(second.days_supply, DEFAULT_DAYS_SUPPLY);
    }

    #[test]
    fn falls_back_to_claim_id_for_prescription_id() {
        let batch = pharmacy(&[
            ("DESYNPUF_ID", vec![Some("B1")]),
            ("CLM_ID", vec![Some("C7")]),
            ("SRVC_DT", vec![Some("20090101")]),
            ("TOT_RX_CST_AMT", vec![Some("10.00")]),
        ]);
        let config = ReconciliationConfig::default();
        let out = PrescriptionNormalizer::new(&config, "Unknown")
            .normalize_batch("pde", &batch)
            .unwrap();
        assert_eq!(out.events[0].prescription_id, "C7");
        assert_eq!(out.events[0].provider_id, "Unknown");
        assert!(!out.warnings.is_empty());
    }
}
