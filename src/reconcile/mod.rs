//! The reconciliation strategy.
//!
//! Every logical field of a claim or prescription is resolved the same way, from the
//! [`FieldSource`] its descriptor declares. For each row:
//!
//! 1. the first candidate column holding a value in that row is used directly;
//! 2. otherwise, if any declared line-level component columns hold values in that row, they
//!    are summed, with nulls contributing zero;
//! 3. otherwise the placeholder is emitted.
//!
//! A batch may concatenate extracts of different vintages, so one row can carry an aggregate
//! column while the next only carries line columns. [`choose`] summarizes the batch as a
//! whole and drives gap reporting: a gap is reported when no column holds any value.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::warn;

use crate::error::Result;
use crate::models::Money;
use crate::schema::{FieldSource, LogicalField, Placeholder, SchemaDescriptor};
use crate::utils::arrow::{
    date_at, date_column, decimal_column, float64_column, has_values, money_at, string_column,
    text_at,
};
use crate::validation::ValidationWarning;

/// Which source a logical field was resolved from, summarized over one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single aggregate column
    Aggregate(String),
    /// The sum of the line-level columns that hold values
    LineSum(Vec<String>),
    /// No column was available
    Placeholder,
}

impl Resolution {
    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Resolved per-row values of one logical field
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub values: Vec<T>,
    pub resolution: Resolution,
}

/// Summarize where a field's values come from in this batch
#[must_use]
pub fn choose(batch: &RecordBatch, source: &FieldSource) -> Resolution {
    if let Some(column) = source.candidates.iter().find(|c| has_values(batch, c)) {
        return Resolution::Aggregate(column.clone());
    }
    let lines: Vec<String> = source
        .line_components
        .iter()
        .filter(|c| has_values(batch, c))
        .cloned()
        .collect();
    if lines.is_empty() {
        Resolution::Placeholder
    } else {
        Resolution::LineSum(lines)
    }
}

fn placeholder_amount(placeholder: &Placeholder) -> Money {
    match placeholder {
        Placeholder::Number(value) => Money::from_f64(*value),
        Placeholder::Zero | Placeholder::Unknown | Placeholder::Null => Money::ZERO,
    }
}

fn placeholder_text(placeholder: &Placeholder, unknown_token: &str) -> Option<String> {
    match placeholder {
        Placeholder::Unknown => Some(unknown_token.to_string()),
        Placeholder::Zero => Some("0".to_string()),
        Placeholder::Number(value) => Some(value.to_string()),
        Placeholder::Null => None,
    }
}

fn placeholder_number(placeholder: &Placeholder) -> Option<f64> {
    match placeholder {
        Placeholder::Number(value) => Some(*value),
        Placeholder::Zero => Some(0.0),
        Placeholder::Unknown | Placeholder::Null => None,
    }
}

/// Declared columns of `names` that hold at least one value, typed by `get`
fn present_columns<A>(
    batch: &RecordBatch,
    names: &[String],
    get: impl Fn(&RecordBatch, &str) -> Result<Option<A>>,
) -> Result<Vec<A>> {
    names
        .iter()
        .filter(|name| has_values(batch, name))
        .filter_map(|name| get(batch, name).transpose())
        .collect()
}

/// Resolve a monetary field; the result never holds a missing amount
pub fn resolve_amount(batch: &RecordBatch, source: &FieldSource) -> Result<Resolved<Money>> {
    let resolution = choose(batch, source);
    let candidates = present_columns(batch, &source.candidates, decimal_column)?;
    let lines = present_columns(batch, &source.line_components, decimal_column)?;
    let fallback = placeholder_amount(&source.placeholder);

    let values = (0..batch.num_rows())
        .map(|row| {
            if let Some(column) = candidates.iter().find(|c| c.is_valid(row)) {
                return money_at(column, row);
            }
            let mut present = lines.iter().filter(|c| c.is_valid(row)).peekable();
            if present.peek().is_none() {
                fallback
            } else {
                present.map(|c| money_at(c, row)).sum()
            }
        })
        .collect();
    Ok(Resolved { values, resolution })
}

/// Resolve a text field such as an identifier
///
/// Line components are not meaningful for text; only candidates are consulted.
pub fn resolve_text(
    batch: &RecordBatch,
    source: &FieldSource,
    unknown_token: &str,
) -> Result<Resolved<Option<String>>> {
    let fallback = placeholder_text(&source.placeholder, unknown_token);
    let resolution = match choose(batch, source) {
        Resolution::LineSum(_) => Resolution::Placeholder,
        other => other,
    };
    let candidates = present_columns(batch, &source.candidates, string_column)?;
    let values = (0..batch.num_rows())
        .map(|row| {
            candidates
                .iter()
                .find_map(|c| text_at(c, row))
                .map(ToString::to_string)
                .or_else(|| fallback.clone())
        })
        .collect();
    Ok(Resolved { values, resolution })
}

/// Resolve a date field
pub fn resolve_date(batch: &RecordBatch, source: &FieldSource) -> Result<Resolved<Option<NaiveDate>>> {
    let resolution = match choose(batch, source) {
        Resolution::LineSum(_) => Resolution::Placeholder,
        other => other,
    };
    let candidates = present_columns(batch, &source.candidates, date_column)?;
    let values = (0..batch.num_rows())
        .map(|row| candidates.iter().find_map(|c| date_at(c, row)))
        .collect();
    Ok(Resolved { values, resolution })
}

/// Resolve a numeric, non-monetary field
pub fn resolve_number(batch: &RecordBatch, source: &FieldSource) -> Result<Resolved<Option<f64>>> {
    let resolution = choose(batch, source);
    let candidates = present_columns(batch, &source.candidates, float64_column)?;
    let lines = present_columns(batch, &source.line_components, float64_column)?;
    let fallback = placeholder_number(&source.placeholder);

    let values = (0..batch.num_rows())
        .map(|row| {
            if let Some(column) = candidates.iter().find(|c| c.is_valid(row)) {
                return Some(column.value(row));
            }
            let present: Vec<f64> = lines
                .iter()
                .filter(|c| c.is_valid(row))
                .map(|c| c.value(row))
                .collect();
            if present.is_empty() {
                fallback
            } else {
                Some(present.into_iter().sum())
            }
        })
        .collect();
    Ok(Resolved { values, resolution })
}

/// Resolves the logical fields of one normalized batch and records any gaps
pub struct FieldResolver<'a> {
    descriptor: &'a SchemaDescriptor,
    batch: &'a RecordBatch,
    source_name: &'a str,
    unknown_token: &'a str,
    warnings: Vec<ValidationWarning>,
}

impl<'a> FieldResolver<'a> {
    #[must_use]
    pub const fn new(
        descriptor: &'a SchemaDescriptor,
        batch: &'a RecordBatch,
        source_name: &'a str,
        unknown_token: &'a str,
    ) -> Self {
        Self {
            descriptor,
            batch,
            source_name,
            unknown_token,
            warnings: Vec::new(),
        }
    }

    fn record(&mut self, field: LogicalField, resolution: &Resolution) {
        if resolution.is_gap() && self.batch.num_rows() > 0 {
            let warning = ValidationWarning::ReconciliationGap {
                kind: self.descriptor.kind,
                field,
                source_name: self.source_name.to_string(),
            };
            warn!("{warning}");
            self.warnings.push(warning);
        }
    }

    pub fn amounts(&mut self, field: LogicalField) -> Result<Vec<Money>> {
        let resolved = resolve_amount(self.batch, self.descriptor.required_field(field)?)?;
        self.record(field, &resolved.resolution);
        Ok(resolved.values)
    }

    pub fn texts(&mut self, field: LogicalField) -> Result<Vec<Option<String>>> {
        let resolved = resolve_text(
            self.batch,
            self.descriptor.required_field(field)?,
            self.unknown_token,
        )?;
        self.record(field, &resolved.resolution);
        Ok(resolved.values)
    }

    pub fn dates(&mut self, field: LogicalField) -> Result<Vec<Option<NaiveDate>>> {
        let resolved = resolve_date(self.batch, self.descriptor.required_field(field)?)?;
        self.record(field, &resolved.resolution);
        Ok(resolved.values)
    }

    pub fn numbers(&mut self, field: LogicalField) -> Result<Vec<Option<f64>>> {
        let resolved = resolve_number(self.batch, self.descriptor.required_field(field)?)?;
        self.record(field, &resolved.resolution);
        Ok(resolved.values)
    }

    /// Gaps recorded so far
    #[must_use]
    pub fn into_warnings(self) -> Vec<ValidationWarning> {
        self.warnings
    }
}
