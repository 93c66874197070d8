//! Partition key derivation for normalized batches.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::DataType;
use chrono::Datelike;
use rustc_hash::FxHashMap;

use crate::schema::adapt::date_utils::days_to_date;

/// Years accepted as plausible partition years
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Two-character partition prefix of a patient identifier
///
/// Falls back to `default` when the identifier is absent or shorter than two characters.
#[must_use]
pub fn partition_prefix(id: Option<&str>, default: &str) -> String {
    match id.map(str::trim) {
        Some(id) if id.chars().count() >= 2 => id.chars().take(2).collect(),
        _ => default.to_string(),
    }
}

/// First four-digit year embedded in a file name
///
/// Digit runs longer than four characters are not treated as years.
#[must_use]
pub fn year_from_file_name(name: &str) -> Option<i32> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .find(|year| YEAR_RANGE.contains(year))
}

/// Most frequent year observed in a date column
///
/// Text values contribute their first four characters, `Date32` values their calendar
/// year. Ties resolve to the smallest year. Returns `None` when no value yields a year.
#[must_use]
pub fn infer_year(column: &ArrayRef) -> Option<i32> {
    let mut counts = YearCounts::default();
    counts.observe(column);
    counts.mode()
}

/// Year occurrences accumulated over one or more date columns
#[derive(Debug, Clone, Default)]
pub struct YearCounts {
    counts: FxHashMap<i32, usize>,
}

impl YearCounts {
    /// Count the year of every value in `column`
    pub fn observe(&mut self, column: &ArrayRef) {
        match column.data_type() {
            DataType::Utf8 => {
                for value in column.as_string::<i32>().iter().flatten() {
                    self.add(year_prefix(value));
                }
            }
            DataType::LargeUtf8 => {
                for value in column.as_string::<i64>().iter().flatten() {
                    self.add(year_prefix(value));
                }
            }
            DataType::Date32 => {
                let dates = column.as_primitive::<arrow::datatypes::Date32Type>();
                for days in dates.iter().flatten() {
                    self.add(days_to_date(days).map(|date| date.year()));
                }
            }
            other => log::debug!("Cannot infer a year from a column of type {other:?}"),
        }
    }

    fn add(&mut self, year: Option<i32>) {
        if let Some(year) = year {
            *self.counts.entry(year).or_default() += 1;
        }
    }

    /// Most frequent year, ties to the smallest
    #[must_use]
    pub fn mode(&self) -> Option<i32> {
        self.counts
            .iter()
            .max_by(|(year_a, count_a), (year_b, count_b)| {
                count_a.cmp(count_b).then_with(|| year_b.cmp(year_a))
            })
            .map(|(year, _)| *year)
    }
}

fn year_prefix(value: &str) -> Option<i32> {
    let value = value.trim();
    let prefix = value.get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok().filter(|year| YEAR_RANGE.contains(year))
}
