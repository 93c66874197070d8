//! Prescription drug event rows.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    date_array, date_at, date_column, decimal_column, float64_column, int32_column, money_array,
    money_at, require, string_array, string_column,
};

/// One pharmacy fill
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionEvent {
    pub bene_id: String,
    pub prescription_id: String,
    pub service_date: Option<NaiveDate>,
    pub product_id: String,
    pub provider_id: String,
    pub quantity_dispensed: f64,
    pub days_supply: i32,
    pub patient_payment: Money,
    pub total_cost: Money,
    /// `total_cost - patient_payment`
    pub medicare_payment: Money,
    pub year: i32,
    pub bene_id_prefix: String,
}

impl ArrowSchema for PrescriptionEvent {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("prescription_id", DataType::Utf8, false),
            Field::new("service_date", DataType::Date32, true),
            Field::new("product_id", DataType::Utf8, false),
            Field::new("provider_id", DataType::Utf8, false),
            Field::new("quantity_dispensed", DataType::Float64, false),
            Field::new("days_supply", DataType::Int32, false),
            Field::new("patient_payment", CURRENCY_TYPE, false),
            Field::new("total_cost", CURRENCY_TYPE, false),
            Field::new("medicare_payment", CURRENCY_TYPE, false),
            Field::new("year", DataType::Int32, false),
            Field::new("bene_id_prefix", DataType::Utf8, false),
        ])
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let rx_id = require(string_column(batch, "prescription_id")?, "prescription_id")?;
        let service_date = require(date_column(batch, "service_date")?, "service_date")?;
        let product = require(string_column(batch, "product_id")?, "product_id")?;
        let provider = require(string_column(batch, "provider_id")?, "provider_id")?;
        let quantity = require(float64_column(batch, "quantity_dispensed")?, "quantity_dispensed")?;
        let days = require(int32_column(batch, "days_supply")?, "days_supply")?;
        let patient = require(decimal_column(batch, "patient_payment")?, "patient_payment")?;
        let total = require(decimal_column(batch, "total_cost")?, "total_cost")?;
        let medicare = require(decimal_column(batch, "medicare_payment")?, "medicare_payment")?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let prefix = require(string_column(batch, "bene_id_prefix")?, "bene_id_prefix")?;

        Ok((0..batch.num_rows())
            .map(|row| Self {
                bene_id: bene_id.value(row).to_string(),
                prescription_id: rx_id.value(row).to_string(),
                service_date: date_at(&service_date, row),
                product_id: product.value(row).to_string(),
                provider_id: provider.value(row).to_string(),
                quantity_dispensed: quantity.value(row),
                days_supply: days.value(row),
                patient_payment: money_at(&patient, row),
                total_cost: money_at(&total, row),
                medicare_payment: money_at(&medicare, row),
                year: year.value(row),
                bene_id_prefix: prefix.value(row).to_string(),
            })
            .collect())
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            string_array(models.iter().map(|m| Some(m.prescription_id.as_str()))),
            date_array(models.iter().map(|m| m.service_date)),
            string_array(models.iter().map(|m| Some(m.product_id.as_str()))),
            string_array(models.iter().map(|m| Some(m.provider_id.as_str()))),
            Arc::new(Float64Array::from_iter_values(
                models.iter().map(|m| m.quantity_dispensed),
            )),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.days_supply))),
            money_array(models.iter().map(|m| m.patient_payment))?,
            money_array(models.iter().map(|m| m.total_cost))?,
            money_array(models.iter().map(|m| m.medicare_payment))?,
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            string_array(models.iter().map(|m| Some(m.bene_id_prefix.as_str()))),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for PrescriptionEvent {
    const TABLE_NAME: &'static str = "fact_prescription";
    const SCHEME: PartitionScheme = PartitionScheme::YearPrefix;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year_prefix(self.year, &self.bene_id_prefix)
    }
}
