//! Beneficiary dimension construction from normalized beneficiary summaries.

use arrow::array::{Array, AsArray, BooleanArray};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::config::{DEFAULT_UNKNOWN_TOKEN, TotalPaidPolicy};
use crate::error::Result;
use crate::models::{Beneficiary, Money, PaymentTriad};
use crate::reconcile::{resolve_amount, resolve_date, resolve_text};
use crate::schema::{LogicalField, SchemaDescriptor, SourceKind, YEAR_COLUMN};
use crate::utils::arrow::{int32_column, require, string_column, text_at};

/// Builds one [`Beneficiary`] per (patient, year)
///
/// Every column is located through the beneficiary descriptor, so an overridden descriptor
/// can remap demographics, payments and chronic-condition flags.
#[derive(Debug, Clone)]
pub struct BeneficiaryBuilder {
    descriptor: SchemaDescriptor,
    policy: TotalPaidPolicy,
    unknown_token: String,
}

impl BeneficiaryBuilder {
    #[must_use]
    pub fn new(
        descriptor: SchemaDescriptor,
        policy: TotalPaidPolicy,
        unknown_token: impl Into<String>,
    ) -> Self {
        Self {
            descriptor,
            policy,
            unknown_token: unknown_token.into(),
        }
    }

    #[must_use]
    pub fn with_builtin_descriptor(policy: TotalPaidPolicy) -> Self {
        Self::new(
            SchemaDescriptor::builtin(SourceKind::Beneficiary),
            policy,
            DEFAULT_UNKNOWN_TOKEN,
        )
    }

    /// Convert normalized batches, keeping the first row of any duplicated (patient, year)
    pub fn build(&self, batches: &[RecordBatch]) -> Result<Vec<Beneficiary>> {
        let mut seen: FxHashSet<(String, i32)> = FxHashSet::default();
        let mut duplicates = 0usize;
        let mut rows = Vec::new();

        for batch in batches {
            for beneficiary in self.from_batch(batch)? {
                if seen.insert((beneficiary.bene_id.clone(), beneficiary.year)) {
                    rows.push(beneficiary);
                } else {
                    duplicates += 1;
                }
            }
        }

        if duplicates > 0 {
            log::warn!("Skipped {duplicates} duplicate beneficiary-year rows");
        }
        Ok(rows)
    }

    fn texts(&self, batch: &RecordBatch, field: LogicalField) -> Result<Vec<Option<String>>> {
        let source = self.descriptor.required_field(field)?;
        Ok(resolve_text(batch, source, &self.unknown_token)?.values)
    }

    fn amounts(&self, batch: &RecordBatch, field: LogicalField) -> Result<Vec<Money>> {
        Ok(resolve_amount(batch, self.descriptor.required_field(field)?)?.values)
    }

    /// Convert one normalized batch
    pub fn from_batch(&self, batch: &RecordBatch) -> Result<Vec<Beneficiary>> {
        let id_column = &self.descriptor.id_column;
        let ids = require(string_column(batch, id_column)?, id_column)?;
        let years = require(int32_column(batch, YEAR_COLUMN)?, YEAR_COLUMN)?;
        let birth = resolve_date(batch, self.descriptor.required_field(LogicalField::BirthDate)?)?;
        let death = resolve_date(batch, self.descriptor.required_field(LogicalField::DeathDate)?)?;
        let gender = self.texts(batch, LogicalField::Gender)?;
        let race = self.texts(batch, LogicalField::Race)?;
        let state = self.texts(batch, LogicalField::State)?;
        let esrd: Vec<BooleanArray> = self
            .descriptor
            .required_field(LogicalField::EsrdIndicator)?
            .candidates
            .iter()
            .filter_map(|name| flag_column(batch, name))
            .collect();
        let chronic: Vec<BooleanArray> = self
            .descriptor
            .chronic_condition_columns
            .iter()
            .filter_map(|name| flag_column(batch, name))
            .collect();
        let payments = LogicalField::BENEFICIARY_PAYMENTS
            .iter()
            .map(|setting| {
                setting
                    .iter()
                    .map(|field| self.amounts(batch, *field))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let triad = |setting: usize, row: usize| PaymentTriad {
            medicare: payments[setting][0][row],
            beneficiary: payments[setting][1][row],
            third_party: payments[setting][2][row],
        };

        let mut rows = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let Some(bene_id) = text_at(&ids, row) else {
                continue;
            };
            let chronic_condition_count = chronic
                .iter()
                .filter(|flags| flags.is_valid(row) && flags.value(row))
                .count();

            let mut beneficiary = Beneficiary {
                bene_id: bene_id.to_string(),
                year: years.value(row),
                birth_date: birth.values[row],
                death_date: death.values[row],
                gender: gender[row].clone(),
                race: race[row].clone(),
                state: state[row].clone(),
                esrd: esrd
                    .iter()
                    .find(|flags| flags.is_valid(row))
                    .map(|flags| flags.value(row)),
                chronic_condition_count: i32::try_from(chronic_condition_count).unwrap_or(i32::MAX),
                inpatient: triad(0, row),
                outpatient: triad(1, row),
                carrier: triad(2, row),
                total_allowed: Money::ZERO,
                total_paid: Money::ZERO,
            };
            beneficiary.compute_totals(self.policy);
            rows.push(beneficiary);
        }
        Ok(rows)
    }
}

fn flag_column(batch: &RecordBatch, name: &str) -> Option<BooleanArray> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_boolean_opt().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RawBatch, SchemaNormalizer};
    use crate::schema::ReconciliationConfig;
    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn text_batch(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
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
        RecordBatch::try_new(Arc::new(schema), arrays).unwrap()
    }

    fn normalized(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
        let raw = RawBatch {
            kind: SourceKind::Beneficiary,
            source_name: "DE1_0_2008_Beneficiary_Summary_File.csv".to_string(),
            batch: text_batch(columns),
        };
        SchemaNormalizer::new(ReconciliationConfig::default(), "00")
            .normalize(&raw)
            .unwrap()
            .batch
    }

    #[test]
    fn totals_follow_policy_and_null_components_count_as_zero() {
        let batch = normalized(&[
            ("DESYNPUF_ID", vec![Some("B1")]),
            ("BENE_SEX_IDENT_CD", vec![Some("1")]),
            ("MEDREIMB_IP", vec![Some("100.00")]),
            ("BENRES_IP", vec![Some("20.00")]),
            ("PPPYMT_IP", vec![Some("10.00")]),
            ("MEDREIMB_OP", vec![Some("50.00")]),
            ("BENRES_OP", vec![None]),
            ("SP_CHF", vec![Some("2")]),
            ("SP_COPD", vec![Some("2")]),
            ("SP_CNCR", vec![Some("1")]),
        ]);

        let rows = BeneficiaryBuilder::with_builtin_descriptor(TotalPaidPolicy::ProgramPlusPatient)
            .build(&[batch.clone()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        let b1 = &rows[0];
        assert_eq!(b1.year, 2008);
        assert_eq!(b1.gender.as_deref(), Some("Male"));
        assert_eq!(b1.chronic_condition_count, 2);
        assert_eq!(b1.total_allowed, Money::from_units(180));
        assert_eq!(b1.total_paid, Money::from_units(170));

        let program_only = BeneficiaryBuilder::with_builtin_descriptor(TotalPaidPolicy::ProgramOnly)
            .build(&[batch])
            .unwrap();
        assert_eq!(program_only[0].total_paid, Money::from_units(150));
    }

    #[test]
    fn overridden_descriptor_remaps_columns() {
        let mut descriptor = SchemaDescriptor::builtin(SourceKind::Beneficiary);
        descriptor
            .columns
            .push(crate::schema::ColumnSpec::new("IP_PAID", crate::schema::ColumnType::Decimal));
        descriptor.fields.insert(
            LogicalField::InpatientProgramPayment,
            crate::schema::FieldSource {
                candidates: vec!["IP_PAID".to_string(), "MEDREIMB_IP".to_string()],
                line_components: Vec::new(),
                placeholder: crate::schema::Placeholder::Zero,
            },
        );
        descriptor.chronic_condition_columns = vec!["SP_CHF".to_string()];
        descriptor.validate().unwrap();

        let mut reconciliation = ReconciliationConfig::default();
        reconciliation
            .descriptors
            .insert(SourceKind::Beneficiary, descriptor.clone());
        let raw = RawBatch {
            kind: SourceKind::Beneficiary,
            source_name: "DE1_0_2008_Beneficiary_Summary_File.csv".to_string(),
            batch: text_batch(&[
                ("DESYNPUF_ID", vec![Some("B1")]),
                ("IP_PAID", vec![Some("70.00")]),
                ("MEDREIMB_IP", vec![Some("100.00")]),
                ("SP_CHF", vec![Some("2")]),
                ("SP_COPD", vec![Some("2")]),
            ]),
        };
        let batch = SchemaNormalizer::new(reconciliation, "00")
            .normalize(&raw)
            .unwrap()
            .batch;

        let rows = BeneficiaryBuilder::new(descriptor, TotalPaidPolicy::ProgramOnly, "Unknown")
            .build(&[batch])
            .unwrap();
        assert_eq!(rows[0].inpatient.medicare, Money::from_units(70));
        assert_eq!(rows[0].chronic_condition_count, 1);
    }

    #[test]
    fn duplicate_patient_years_keep_first() {
        let batch = normalized(&[
            ("DESYNPUF_ID", vec![Some("B1"), Some("B1")]),
            ("MEDREIMB_IP", vec![Some("1.00"), Some("2.00")]),
        ]);
        let rows = BeneficiaryBuilder::with_builtin_descriptor(TotalPaidPolicy::ProgramOnly)
            .build(&[batch])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_paid, Money::from_units(1));
    }
}
