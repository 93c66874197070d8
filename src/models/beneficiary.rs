//! Beneficiary dimension rows.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Int32Array};
use arrow::record_batch::RecordBatch;
use arrow::datatypes::{DataType, Field, Schema};
use chrono::NaiveDate;

use crate::config::TotalPaidPolicy;
use crate::error::Result;
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    date_array, date_at, date_column, decimal_column, int32_column, money_array, money_at,
    require, string_array, string_at, string_column,
};

/// Payments for one care setting, split by who paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentTriad {
    /// Paid by the program
    pub medicare: Money,
    /// Paid by the patient
    pub beneficiary: Money,
    /// Paid by a primary third-party payer
    pub third_party: Money,
}

impl PaymentTriad {
    #[must_use]
    pub fn total(&self) -> Money {
        self.medicare + self.beneficiary + self.third_party
    }
}

/// One row per (patient, year)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beneficiary {
    pub bene_id: String,
    pub year: i32,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub state: Option<String>,
    pub esrd: Option<bool>,
    pub chronic_condition_count: i32,
    pub inpatient: PaymentTriad,
    pub outpatient: PaymentTriad,
    pub carrier: PaymentTriad,
    /// Sum of all nine payment components
    pub total_allowed: Money,
    /// Program payments, plus patient payments under [`TotalPaidPolicy::ProgramPlusPatient`]
    pub total_paid: Money,
}

impl Beneficiary {
    #[must_use]
    pub fn settings(&self) -> [&PaymentTriad; 3] {
        [&self.inpatient, &self.outpatient, &self.carrier]
    }

    #[must_use]
    pub fn total_medicare(&self) -> Money {
        self.settings().iter().map(|t| t.medicare).sum()
    }

    #[must_use]
    pub fn total_beneficiary(&self) -> Money {
        self.settings().iter().map(|t| t.beneficiary).sum()
    }

    #[must_use]
    pub fn total_third_party(&self) -> Money {
        self.settings().iter().map(|t| t.third_party).sum()
    }

    /// Recompute `total_allowed` and `total_paid` from the components
    pub fn compute_totals(&mut self, policy: TotalPaidPolicy) {
        self.total_allowed = self.settings().iter().map(|t| t.total()).sum();
        self.total_paid = match policy {
            TotalPaidPolicy::ProgramOnly => self.total_medicare(),
            TotalPaidPolicy::ProgramPlusPatient => self.total_medicare() + self.total_beneficiary(),
        };
    }
}

const SETTINGS: [&str; 3] = ["inpatient", "outpatient", "carrier"];
const PAYERS: [&str; 3] = ["medicare", "beneficiary", "third_party"];

fn triad_columns() -> impl Iterator<Item = String> {
    SETTINGS
        .into_iter()
        .flat_map(|setting| PAYERS.into_iter().map(move |payer| format!("{payer}_{setting}")))
}

impl ArrowSchema for Beneficiary {
    fn schema() -> Schema {
        let mut fields = vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("birth_date", DataType::Date32, true),
            Field::new("death_date", DataType::Date32, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("race", DataType::Utf8, true),
            Field::new("state", DataType::Utf8, true),
            Field::new("esrd", DataType::Boolean, true),
            Field::new("chronic_condition_count", DataType::Int32, false),
        ];
        fields.extend(triad_columns().map(|name| Field::new(name, CURRENCY_TYPE, false)));
        fields.extend(
            [
                "total_medicare_payment",
                "total_beneficiary_payment",
                "total_third_party_payment",
                "total_allowed",
                "total_paid",
            ]
            .map(|name| Field::new(name, CURRENCY_TYPE, false)),
        );
        Schema::new(fields)
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let birth_date = require(date_column(batch, "birth_date")?, "birth_date")?;
        let death_date = require(date_column(batch, "death_date")?, "death_date")?;
        let gender = require(string_column(batch, "gender")?, "gender")?;
        let race = require(string_column(batch, "race")?, "race")?;
        let state = require(string_column(batch, "state")?, "state")?;
        let esrd = batch
            .column_by_name("esrd")
            .and_then(|c| c.as_any().downcast_ref::<BooleanArray>().cloned());
        let chronic = int32_column(batch, "chronic_condition_count")?;
        let triads = triad_columns()
            .map(|name| require(decimal_column(batch, &name)?, &name))
            .collect::<Result<Vec<_>>>()?;
        let total_allowed = require(decimal_column(batch, "total_allowed")?, "total_allowed")?;
        let total_paid = require(decimal_column(batch, "total_paid")?, "total_paid")?;

        let triad_at = |setting: usize, row: usize| PaymentTriad {
            medicare: money_at(&triads[setting * 3], row),
            beneficiary: money_at(&triads[setting * 3 + 1], row),
            third_party: money_at(&triads[setting * 3 + 2], row),
        };

        Ok((0..batch.num_rows())
            .map(|row| Self {
                bene_id: bene_id.value(row).to_string(),
                year: year.value(row),
                birth_date: date_at(&birth_date, row),
                death_date: date_at(&death_date, row),
                gender: string_at(&gender, row),
                race: string_at(&race, row),
                state: string_at(&state, row),
                esrd: esrd.as_ref().and_then(|a| a.is_valid(row).then(|| a.value(row))),
                chronic_condition_count: chronic.as_ref().map_or(0, |a| a.value(row)),
                inpatient: triad_at(0, row),
                outpatient: triad_at(1, row),
                carrier: triad_at(2, row),
                total_allowed: money_at(&total_allowed, row),
                total_paid: money_at(&total_paid, row),
            })
            .collect())
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            date_array(models.iter().map(|m| m.birth_date)),
            date_array(models.iter().map(|m| m.death_date)),
            string_array(models.iter().map(|m| m.gender.as_deref())),
            string_array(models.iter().map(|m| m.race.as_deref())),
            string_array(models.iter().map(|m| m.state.as_deref())),
            Arc::new(models.iter().map(|m| m.esrd).collect::<BooleanArray>()),
            Arc::new(Int32Array::from_iter_values(
                models.iter().map(|m| m.chronic_condition_count),
            )),
        ];
        for setting in 0..SETTINGS.len() {
            let triad = |m: &Self| *m.settings()[setting];
            columns.push(money_array(models.iter().map(|m| triad(m).medicare))?);
            columns.push(money_array(models.iter().map(|m| triad(m).beneficiary))?);
            columns.push(money_array(models.iter().map(|m| triad(m).third_party))?);
        }
        columns.push(money_array(models.iter().map(Self::total_medicare))?);
        columns.push(money_array(models.iter().map(Self::total_beneficiary))?);
        columns.push(money_array(models.iter().map(Self::total_third_party))?);
        columns.push(money_array(models.iter().map(|m| m.total_allowed))?);
        columns.push(money_array(models.iter().map(|m| m.total_paid))?);

        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for Beneficiary {
    const TABLE_NAME: &'static str = "dim_beneficiary";
    const SCHEME: PartitionScheme = PartitionScheme::Year;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year(self.year)
    }
}
