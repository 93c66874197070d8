//! Unified claim rows.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::schema::ClaimKind;
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    date_array, date_at, date_column, decimal_column, int32_column, money_array, money_at,
    require, string_array, string_column,
};

/// A claim of any kind in the unified shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub bene_id: String,
    pub claim_id: String,
    pub claim_type: ClaimKind,
    pub claim_from_date: Option<NaiveDate>,
    pub claim_thru_date: Option<NaiveDate>,
    pub provider_id: String,
    pub medicare_payment: Money,
    pub third_party_payment: Money,
    /// Always zero: claims carry no patient-level apportionment
    pub patient_payment: Money,
    pub total_payment: Money,
    pub year: i32,
    pub bene_id_prefix: String,
}

impl Claim {
    /// Recompute `total_payment` from its components
    pub fn compute_total(&mut self) {
        self.total_payment = self.medicare_payment + self.third_party_payment + self.patient_payment;
    }
}

impl ArrowSchema for Claim {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("claim_id", DataType::Utf8, false),
            Field::new("claim_type", DataType::Utf8, false),
            Field::new("claim_from_date", DataType::Date32, true),
            Field::new("claim_thru_date", DataType::Date32, true),
            Field::new("provider_id", DataType::Utf8, false),
            Field::new("medicare_payment", CURRENCY_TYPE, false),
            Field::new("third_party_payment", CURRENCY_TYPE, false),
            Field::new("patient_payment", CURRENCY_TYPE, false),
            Field::new("total_payment", CURRENCY_TYPE, false),
            Field::new("year", DataType::Int32, false),
            Field::new("bene_id_prefix", DataType::Utf8, false),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let claim_id = require(string_column(batch, "claim_id")?, "claim_id")?;
        let claim_type = require(string_column(batch, "claim_type")?, "claim_type")?;
        let from = require(date_column(batch, "claim_from_date")?, "claim_from_date")?;
        let thru = require(date_column(batch, "claim_thru_date")?, "claim_thru_date")?;
        let provider = require(string_column(batch, "provider_id")?, "provider_id")?;
        let medicare = require(decimal_column(batch, "medicare_payment")?, "medicare_payment")?;
        let third_party =
            require(decimal_column(batch, "third_party_payment")?, "third_party_payment")?;
        let patient = require(decimal_column(batch, "patient_payment")?, "patient_payment")?;
        let total = require(decimal_column(batch, "total_payment")?, "total_payment")?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let prefix = require(string_column(batch, "bene_id_prefix")?, "bene_id_prefix")?;

        (0..batch.num_rows())
            .map(|row| {
                Ok(Self {
                    bene_id: bene_id.value(row).to_string(),
                    claim_id: claim_id.value(row).to_string(),
                    claim_type: claim_type.value(row).parse()?,
                    claim_from_date: date_at(&from, row),
                    claim_thru_date: date_at(&thru, row),
                    provider_id: provider.value(row).to_string(),
                    medicare_payment: money_at(&medicare, row),
                    third_party_payment: money_at(&third_party, row),
                    patient_payment: money_at(&patient, row),
                    total_payment: money_at(&total, row),
                    year: year.value(row),
                    bene_id_prefix: prefix.value(row).to_string(),
                })
            })
            .collect()
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            string_array(models.iter().map(|m| Some(m.claim_id.as_str()))),
            string_array(models.iter().map(|m| Some(m.claim_type.as_str()))),
            date_array(models.iter().map(|m| m.claim_from_date)),
            date_array(models.iter().map(|m| m.claim_thru_date)),
            string_array(models.iter().map(|m| Some(m.provider_id.as_str()))),
            money_array(models.iter().map(|m| m.medicare_payment))?,
            money_array(models.iter().map(|m| m.third_party_payment))?,
            money_array(models.iter().map(|m| m.patient_payment))?,
            money_array(models.iter().map(|m| m.total_payment))?,
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            string_array(models.iter().map(|m| Some(m.bene_id_prefix.as_str()))),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for Claim {
    const TABLE_NAME: &'static str = "fact_claims";
    const SCHEME: PartitionScheme = PartitionScheme::YearPrefix;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year_prefix(self.year, &self.bene_id_prefix)
    }
}
