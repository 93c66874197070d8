//! Per-patient-year metrics rows.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::money::{CURRENCY_TYPE, Money};
use crate::models::traits::{ArrowSchema, StoredTable};
use crate::store::{PartitionKey, PartitionScheme};
use crate::utils::arrow::{
    decimal_column, downcast_array, get_column, int32_column, money_array, money_at, require,
    string_array, string_at, string_column,
};

/// Utilization, spend and provider breadth of one patient in one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberYearMetrics {
    pub bene_id: String,
    pub year: i32,
    pub total_allowed: Money,
    pub total_paid: Money,
    pub inpatient_stays: i64,
    pub outpatient_visits: i64,
    pub carrier_claims: i64,
    pub rx_fills: i64,
    pub unique_providers: i64,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub state: Option<String>,
}

impl MemberYearMetrics {
    /// Claims of every kind
    #[must_use]
    pub const fn total_claims(&self) -> i64 {
        self.inpatient_stays + self.outpatient_visits + self.carrier_claims
    }
}

const COUNT_COLUMNS: [&str; 5] = [
    "inpatient_stays",
    "outpatient_visits",
    "carrier_claims",
    "rx_fills",
    "unique_providers",
];

/// Read a count column as `Int64`
pub(crate) fn count_column(batch: &RecordBatch, name: &str) -> Result<Int64Array> {
    let array = get_column(batch, name, &DataType::Int64, true)?.ok_or_else(|| {
        Error::ColumnNotFound {
            column: name.to_string(),
        }
    })?;
    Ok(downcast_array::<Int64Array>(&array, name, "Int64")?.clone())
}

impl ArrowSchema for MemberYearMetrics {
    fn schema() -> Schema {
        let mut fields = vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("total_allowed", CURRENCY_TYPE, false),
            Field::new("total_paid", CURRENCY_TYPE, false),
        ];
        fields.extend(COUNT_COLUMNS.map(|name| Field::new(name, DataType::Int64, false)));
        fields.extend([
            Field::new("gender", DataType::Utf8, true),
            Field::new("race", DataType::Utf8, true),
            Field::new("state", DataType::Utf8, true),
        ]);
        Schema::new(fields)
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let bene_id = require(string_column(batch, "bene_id")?, "bene_id")?;
        let year = require(int32_column(batch, "year")?, "year")?;
        let allowed = require(decimal_column(batch, "total_allowed")?, "total_allowed")?;
        let paid = require(decimal_column(batch, "total_paid")?, "total_paid")?;
        let [inpatient, outpatient, carrier, rx, providers] = [
            count_column(batch, COUNT_COLUMNS[0])?,
            count_column(batch, COUNT_COLUMNS[1])?,
            count_column(batch, COUNT_COLUMNS[2])?,
            count_column(batch, COUNT_COLUMNS[3])?,
            count_column(batch, COUNT_COLUMNS[4])?,
        ];
        let gender = require(string_column(batch, "gender")?, "gender")?;
        let race = require(string_column(batch, "race")?, "race")?;
        let state = require(string_column(batch, "state")?, "state")?;

        Ok((0..batch.num_rows())
            .map(|row| Self {
                bene_id: bene_id.value(row).to_string(),
                year: year.value(row),
                total_allowed: money_at(&allowed, row),
                total_paid: money_at(&paid, row),
                inpatient_stays: inpatient.value(row),
                outpatient_visits: outpatient.value(row),
                carrier_claims: carrier.value(row),
                rx_fills: rx.value(row),
                unique_providers: providers.value(row),
                gender: string_at(&gender, row),
                race: string_at(&race, row),
                state: string_at(&state, row),
            })
            .collect())
    }

    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let counts = |f: fn(&Self) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from_iter_values(models.iter().map(f)))
        };
        let columns: Vec<ArrayRef> = vec![
            string_array(models.iter().map(|m| Some(m.bene_id.as_str()))),
            Arc::new(Int32Array::from_iter_values(models.iter().map(|m| m.year))),
            money_array(models.iter().map(|m| m.total_allowed))?,
            money_array(models.iter().map(|m| m.total_paid))?,
            counts(|m| m.inpatient_stays),
            counts(|m| m.outpatient_visits),
            counts(|m| m.carrier_claims),
            counts(|m| m.rx_fills),
            counts(|m| m.unique_providers),
            string_array(models.iter().map(|m| m.gender.as_deref())),
            string_array(models.iter().map(|m| m.race.as_deref())),
            string_array(models.iter().map(|m| m.state.as_deref())),
        ];
        Ok(RecordBatch::try_new(Self::schema_ref(), columns)?)
    }
}

impl StoredTable for MemberYearMetrics {
    const TABLE_NAME: &'static str = "member_year_metrics";
    const SCHEME: PartitionScheme = PartitionScheme::Year;

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::year(self.year)
    }
}
