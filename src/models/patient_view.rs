//! Denormalized per-patient-year view served by the lookup service.
//!
//! On disk the view is one row per (patient, year, top diagnosis); a patient-year without
//! diagnoses has a single row with the diagnosis columns null. Folding the rows of one
//! patient-year yields a [`PatientView`].

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, Int64Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::metrics::count_column;
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    decimal_column, downcast_array, get_column, int32_column, money_array, money_at,
    optional_money_array, optional_money_at, require, string_array, string_at, string_column,
};

/// Diagnosis spend entry of a patient view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisSpend {
    pub code: String,
    pub description: String,
    pub spend: Money,
    pub rank: u32,
}

/// The unit returned by patient lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientView {
    pub bene_id: String,
    pub year: i32,
    pub total_allowed: Money,
    pub total_paid: Money,
    pub inpatient_stays: i64,
    pub outpatient_visits: i64,
    pub rx_fills: i64,
    pub unique_providers: i64,
    pub top_diagnoses: Vec<DiagnosisSpend>,
}

/// Stored row of the patient view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientViewRow {
    pub bene_id: String,
    pub year: i32,
    pub total_allowed: Money,
    pub total_paid: Money,
    pub inpatient_stays: i64,
    pub outpatient_visits: i64,
    pub rx_fills: i64,
    pub unique_providers: i64,
    pub diagnosis: Option<DiagnosisSpend>,
}

impl PatientView {
    /// Fold the stored rows of one patient-year
    ///
    /// Returns `None` for an empty slice. Diagnoses are ordered by rank, then spend
    /// descending, then code, and cut to `top_k` entries.
    #[must_use]
    pub fn from_rows(rows: &[PatientViewRow], top_k: usize) -> Option<Self> {
        let first = rows.first()?;
        let mut top_diagnoses: Vec<DiagnosisSpend> =
            rows.iter().filter_map(|row| row.diagnosis.clone()).collect();
        top_diagnoses.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then(b.spend.cmp(&a.spend))
                .then(a.code.cmp(&b.code))
        });
        top_diagnoses.truncate(top_k);

        Some(Self {
            bene_id: first.bene_id.clone(),
            year: first.year,
            total_allowed: first.total_allowed,
            total_paid: first.total_paid,
            inpatient_stays: first.inpatient_stays,
            outpatient_visits: first.outpatient_visits,
            rx_fills: first.rx_fills,
            unique_providers: first.unique_providers,
            top_diagnoses,
        })
    }
}

impl ArrowSchema for PatientViewRow {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("total_allowed", CURRENCY_TYPE, false),
            Field::new("total_paid", CURRENCY_TYPE, false),
            Field::new("inpatient_stays", DataType::Int64, false),
            Field::new("outpatient_visits", DataType::Int64, false),
            Field::new("rx_fills", DataType::Int64, false),
            Field::new("unique_providers", DataType::Int64, false),
            Field::new("diagnosis_code", DataType::Utf8, true),
            Field::new("diagnosis_description", DataType::Utf8, true),
            Field::new("diagnosis_payment", CURRENCY_TYPE, true),
            Field::new("diagnosis_rank", DataType::UInt32, true),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let allowed = require(decimal_column(batch, "total_allowed")?, "total_allowed")?;
        let paid = require(decimal_column(batch, "total_paid")?, "total_paid")?;
        let inpatient = count_column(batch, "inpatient_stays")?;
        let outpatient = count_column(batch, "outpatient_visits")?;
        let rx = count_column(batch, "rx_fills")?;
        let providers = count_column(batch, "unique_providers")?;
        let code = require(string_column(batch, "diagnosis_code")?, "diagnosis_code")?;
        let description = require(
            string_column(batch, "diagnosis_description")?,
            "diagnosis_description",
        )?;
        let payment = require(decimal_column(batch, "diagnosis_payment")?, "diagnosis_payment")?;
        let rank_array = get_column(batch, "diagnosis_rank", &DataType::UInt32, true)?
            .ok_or_else(|| Error::ColumnNotFound {
                column: "diagnosis_rank".to_string(),
            })?;
        let rank = downcast_array::<UInt32Array>(&rank_array, "diagnosis_rank", "UInt32")?;

        Ok((0..batch.num_rows())
            .map(|row| {
                let diagnosis = string_at(&code, row).map(|code| DiagnosisSpend {
                    code,
                    description: string_at(&description, row).unwrap_or_default(),
                    spend: optional_money_at(&payment, row).unwrap_or_default(),
                    rank: if rank.is_valid(row) { rank.value(row) } else { 0 },
                });
                Self {
                    bene_id: bene_id.value(row).to_string(),
                    year: year.value(row),
                    total_allowed: money_at(&allowed, row),
                    total_paid: money_at(&paid, row),
                    inpatient_stays: inpatient.value(row),
                    outpatient_visits: outpatient.value(row),
                    rx_fills: rx.value(row),
                    unique_providers: providers.value(row),
                    diagnosis,
                }
            })
            .collect())
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let counts = |f: fn(&Self) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from_iter_values(models.iter().map(f)))
        };
        let diagnoses = || models.iter().map(|m| m.diagnosis.as_ref());
        let columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            money_array(models.iter().map(|m| m.total_allowed))?,
            money_array(models.iter().map(|m| m.total_paid))?,
            counts(|m| m.inpatient_stays),
            counts(|m| m.outpatient_visits),
            counts(|m| m.rx_fills),
            counts(|m| m.unique_providers),
            string_array(diagnoses().map(|d| d.map(|d| d.code.as_str()))),
            string_array(diagnoses().map(|d| d.map(|d| d.description.as_str()))),
            optional_money_array(diagnoses().map(|d| d.map(|d| d.spend)))?,
            Arc::new(diagnoses().map(|d| d.map(|d| d.rank)).collect::<UInt32Array>()),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for PatientViewRow {
    const TABLE_NAME: &'static str = "patient_api_view";
    const SCHEME: PartitionScheme = PartitionScheme::Year;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year(self.year)
    }
}
