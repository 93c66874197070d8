//! Diagnosis rows: one per populated diagnosis slot, and the ranked per-patient-year spend.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::schema::ClaimKind;
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    decimal_column, downcast_array, get_column, int32_column, money_array, money_at, require,
    string_array, string_column,
};

/// A diagnosis code recorded in one slot of a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisLine {
    pub bene_id: String,
    pub claim_id: String,
    pub diagnosis_code: String,
    /// 1-based slot the code was recorded in
    pub diagnosis_position: i32,
    pub claim_type: ClaimKind,
    /// Program payment of the parent claim
    pub payment: Money,
    pub diagnosis_description: String,
    pub year: i32,
    pub bene_id_prefix: String,
}

impl ArrowSchema for DiagnosisLine {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("claim_id", DataType::Utf8, false),
            Field::new("diagnosis_code", DataType::Utf8, false),
            Field::new("diagnosis_position", DataType::Int32, false),
            Field::new("claim_type", DataType::Utf8, false),
            Field::new("payment", CURRENCY_TYPE, false),
            Field::new("diagnosis_description", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("bene_id_prefix", DataType::Utf8, false),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let claim_id = require(string_column(batch, "claim_id")?, "claim_id")?;
        let code = require(string_column(batch, "diagnosis_code")?, "diagnosis_code")?;
        let position = require(int32_column(batch, "diagnosis_position")?, "diagnosis_position")?;
        let claim_type = require(string_column(batch, "claim_type")?, "claim_type")?;
        let payment = require(decimal_column(batch, "payment")?, "payment")?;
        let description = require(
            string_column(batch, "diagnosis_description")?,
            "diagnosis_description",
        )?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let prefix = require(string_column(batch, "bene_id_prefix")?, "bene_id_prefix")?;

        (0..batch.num_rows())
            .map(|row| {
                Ok(Self {
                    bene_id: bene_id.value(row).to_string(),
                    claim_id: claim_id.value(row).to_string(),
                    diagnosis_code: code.value(row).to_string(),
                    diagnosis_position: position.value(row),
                    claim_type: claim_type.value(row).parse()?,
                    payment: money_at(&payment, row),
                    diagnosis_description: description.value(row).to_string(),
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
            string_array(models.iter().map(|m| Some(m.diagnosis_code.as_str()))),
            Arc::new(Int32Array::from_iter_values(
                models.iter().map(|m| m.diagnosis_position),
            )),
            string_array(models.iter().map(|m| Some(m.claim_type.as_str()))),
            money_array(models.iter().map(|m| m.payment))?,
            string_array(models.iter().map(|m| Some(m.diagnosis_description.as_str()))),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            string_array(models.iter().map(|m| Some(m.bene_id_prefix.as_str()))),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for DiagnosisLine {
    const TABLE_NAME: &'static str = "fact_claim_diagnoses";
    const SCHEME: PartitionScheme = PartitionScheme::YearPrefix;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year_prefix(self.year, &self.bene_id_prefix)
    }
}

/// A diagnosis within the top-K spend of a patient-year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopDiagnosis {
    pub bene_id: String,
    pub year: i32,
    pub diagnosis_code: String,
    pub diagnosis_description: String,
    /// Summed program payment over all lines with this code
    pub diagnosis_payment: Money,
    /// Dense rank by payment, 1 for the highest
    pub diagnosis_rank: u32,
}

impl ArrowSchema for TopDiagnosis {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("diagnosis_code", DataType::Utf8, false),
            Field::new("diagnosis_description", DataType::Utf8, false),
            Field::new("diagnosis_payment", CURRENCY_TYPE, false),
            Field::new("diagnosis_rank", DataType::UInt32, false),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let year = require(int32_column(batch, "year")?, "year")?;
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
            .map(|row| Self {
                bene_id: bene_id.value(row).to_string(),
                year: year.value(row),
                diagnosis_code: code.value(row).to_string(),
                diagnosis_description: description.value(row).to_string(),
                diagnosis_payment: money_at(&payment, row),
                diagnosis_rank: rank.value(row),
            })
            .collect())
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            string_array(models.iter().map(|m| Some(m.diagnosis_code.as_str()))),
            string_array(models.iter().map(|m| Some(m.diagnosis_description.as_str()))),
            money_array(models.iter().map(|m| m.diagnosis_payment))?,
            Arc::new(UInt32Array::from_iter_values(
                models.iter().map(|m| m.diagnosis_rank),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for TopDiagnosis {
    const TABLE_NAME: &'static str = "top_diagnoses_by_member";
    const SCHEME: PartitionScheme = PartitionScheme::Year;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year(self.year)
    }
}
