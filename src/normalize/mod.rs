//! Schema normalization of raw source batches.
//!
//! [`SchemaNormalizer`] turns a raw batch of a known [`SourceKind`] into a batch with exactly
//! the columns its descriptor declares, each in its semantic type, followed by the `year` and
//! `bene_id_prefix` partition columns.

pub mod partition;

use std::borrow::Cow;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, DictionaryArray, Int32Array, StringArray,
};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Int32Type};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

pub use partition::{YearCounts, infer_year, partition_prefix, year_from_file_name};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::schema::adapt::{DateFormatConfig, convert_array, create_null_array};
use crate::schema::{
    CodeTables, ColumnSpec, ColumnType, ReconciliationConfig, SchemaDescriptor, SourceKind,
    YearSource,
};
use crate::utils::arrow::{string_column, text_at};

/// A raw batch read from one source file
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub kind: SourceKind,
    /// File name the batch was read from
    pub source_name: String,
    pub batch: RecordBatch,
}

/// Row and column accounting for one normalized batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub rows_in: usize,
    pub empty_rows_dropped: usize,
    pub missing_id_dropped: usize,
    /// Declared columns absent from the source, emitted as all-null
    pub filled_columns: Vec<String>,
}

impl NormalizationReport {
    #[must_use]
    pub const fn rows_dropped(&self) -> usize {
        self.empty_rows_dropped + self.missing_id_dropped
    }
}

/// A schema-stable batch of one source kind
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub kind: SourceKind,
    pub source_name: String,
    /// Partition year; `None` only when no row survived normalization
    pub year: Option<i32>,
    pub batch: RecordBatch,
    pub report: NormalizationReport,
}

/// Coerces raw batches into the declared schema of their source kind
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    reconciliation: ReconciliationConfig,
    code_tables: CodeTables,
    date_config: DateFormatConfig,
    default_prefix: String,
}

impl SchemaNormalizer {
    #[must_use]
    pub fn new(reconciliation: ReconciliationConfig, default_prefix: impl Into<String>) -> Self {
        Self {
            reconciliation,
            code_tables: CodeTables::default(),
            date_config: DateFormatConfig::default(),
            default_prefix: default_prefix.into(),
        }
    }

    /// Build a normalizer from the pipeline configuration, applying descriptor overrides
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(config.reconciliation()?, config.default_prefix.clone()))
    }

    #[must_use]
    pub fn with_code_tables(mut self, code_tables: CodeTables) -> Self {
        self.code_tables = code_tables;
        self
    }

    #[must_use]
    pub fn with_date_config(mut self, date_config: DateFormatConfig) -> Self {
        self.date_config = date_config;
        self
    }

    #[must_use]
    pub fn descriptor(&self, kind: SourceKind) -> Cow<'_, SchemaDescriptor> {
        self.reconciliation.descriptor(kind)
    }

    #[must_use]
    pub const fn reconciliation(&self) -> &ReconciliationConfig {
        &self.reconciliation
    }

    /// Normalize one raw batch
    ///
    /// The batch is treated as a whole source file: its partition year is derived from its
    /// own rows. Use [`SchemaNormalizer::normalize_file`] for a file read in several chunks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredColumns`] when a required column group has no member in
    /// the source, and [`Error::YearUndetermined`] when rows remain but no year can be derived.
    pub fn normalize(&self, raw: &RawBatch) -> Result<NormalizedBatch> {
        let mut out = self.normalize_file(std::slice::from_ref(raw))?;
        out.pop().ok_or_else(|| Error::Config("normalization produced no batch".to_string()))
    }

    /// Normalize every chunk read from one source file
    ///
    /// The partition year is derived once over the surviving rows of all chunks and applied to
    /// each of them, so a file never straddles two year partitions. Chunks keep their order.
    pub fn normalize_file(&self, chunks: &[RawBatch]) -> Result<Vec<NormalizedBatch>> {
        let Some(first) = chunks.first() else {
            return Ok(Vec::new());
        };
        let descriptor = self.descriptor(first.kind);

        let kept = chunks
            .iter()
            .map(|raw| self.drop_unusable_rows(&descriptor, raw))
            .collect::<Result<Vec<_>>>()?;
        let year = self.file_year(&descriptor, first, kept.iter().map(|(rows, _)| rows))?;

        chunks
            .iter()
            .zip(kept)
            .map(|(raw, (rows, report))| {
                let year = (rows.num_rows() > 0).then_some(year).flatten();
                self.assemble(&descriptor, raw, &rows, report, year)
            })
            .collect()
    }

    /// Drop blank rows and rows without an identifier
    fn drop_unusable_rows(
        &self,
        descriptor: &SchemaDescriptor,
        raw: &RawBatch,
    ) -> Result<(RecordBatch, NormalizationReport)> {
        check_required_columns(descriptor, &raw.batch)?;

        let mut report = NormalizationReport {
            rows_in: raw.batch.num_rows(),
            ..NormalizationReport::default()
        };

        let non_empty = filter_record_batch(&raw.batch, &non_empty_mask(&raw.batch))?;
        report.empty_rows_dropped = report.rows_in - non_empty.num_rows();

        let ids = string_column(&non_empty, &descriptor.id_column)?;
        let id_mask: BooleanArray = (0..non_empty.num_rows())
            .map(|row| Some(ids.as_ref().is_some_and(|ids| text_at(ids, row).is_some())))
            .collect();
        let rows = filter_record_batch(&non_empty, &id_mask)?;
        report.missing_id_dropped = non_empty.num_rows() - rows.num_rows();

        if report.rows_dropped() > 0 {
            warn!(
                "Dropped {} empty and {} unidentified rows from {}",
                report.empty_rows_dropped, report.missing_id_dropped, raw.source_name
            );
        }
        Ok((rows, report))
    }

    /// Partition year of a file; `None` when no row survived
    fn file_year<'b>(
        &self,
        descriptor: &SchemaDescriptor,
        raw: &RawBatch,
        chunks: impl Iterator<Item = &'b RecordBatch> + Clone,
    ) -> Result<Option<i32>> {
        if chunks.clone().all(|rows| rows.num_rows() == 0) {
            return Ok(None);
        }
        let year = match &descriptor.year_source {
            YearSource::FileName => year_from_file_name(&raw.source_name),
            YearSource::DateColumns(candidates) => candidates.iter().find_map(|name| {
                let mut counts = YearCounts::default();
                for rows in chunks.clone() {
                    if let Some(column) = rows.column_by_name(name) {
                        counts.observe(column);
                    }
                }
                counts.mode()
            }),
        };
        year.map(Some).ok_or_else(|| Error::YearUndetermined {
            kind: raw.kind,
            source_name: raw.source_name.clone(),
        })
    }

    fn assemble(
        &self,
        descriptor: &SchemaDescriptor,
        raw: &RawBatch,
        rows: &RecordBatch,
        mut report: NormalizationReport,
        year: Option<i32>,
    ) -> Result<NormalizedBatch> {
        let mut columns = Vec::with_capacity(descriptor.columns.len() + 2);
        for spec in &descriptor.columns {
            match rows.column_by_name(&spec.name) {
                Some(source) => columns.push(self.coerce_column(spec, source)?),
                None => {
                    report.filled_columns.push(spec.name.clone());
                    columns.push(create_null_array(&spec.column_type.data_type(), rows.num_rows())?);
                }
            }
        }
        if !report.filled_columns.is_empty() {
            debug!(
                "{}: {} declared columns absent, filled with nulls",
                raw.source_name,
                report.filled_columns.len()
            );
        }

        let ids = string_column(rows, &descriptor.id_column)?;
        let prefixes: StringArray = (0..rows.num_rows())
            .map(|row| {
                let id = ids.as_ref().and_then(|ids| text_at(ids, row));
                Some(partition_prefix(id, &self.default_prefix))
            })
            .collect();
        columns.push(Arc::new(Int32Array::from(vec![
            year.unwrap_or_default();
            rows.num_rows()
        ])));
        columns.push(Arc::new(prefixes));

        let batch = RecordBatch::try_new(Arc::new(descriptor.normalized_schema()), columns)?;
        Ok(NormalizedBatch {
            kind: raw.kind,
            source_name: raw.source_name.clone(),
            year,
            batch,
            report,
        })
    }

    fn coerce_column(&self, spec: &ColumnSpec, source: &ArrayRef) -> Result<ArrayRef> {
        match &spec.column_type {
            ColumnType::Categorical { table } => {
                let table = self.code_tables.get(*table);
                let text = convert_array(source, &DataType::Utf8, &self.date_config)?;
                let labels: DictionaryArray<Int32Type> = text
                    .as_string::<i32>()
                    .iter()
                    .map(|code| code.and_then(|code| table.lookup(code)))
                    .collect();
                Ok(Arc::new(labels))
            }
            ColumnType::Flag {
                true_code,
                false_code,
            } => {
                let text = convert_array(source, &DataType::Utf8, &self.date_config)?;
                let flags: BooleanArray = text
                    .as_string::<i32>()
                    .iter()
                    .map(|code| match code.map(str::trim) {
                        Some(code) if code == true_code => Some(true),
                        Some(code) if code == false_code => Some(false),
                        _ => None,
                    })
                    .collect();
                Ok(Arc::new(flags))
            }
            column_type => {
                let target = column_type.data_type();
                match convert_array(source, &target, &self.date_config) {
                    Ok(converted) => Ok(converted),
                    Err(err) => {
                        warn!("Column {} could not be coerced to {target:?}: {err}", spec.name);
                        Ok(create_null_array(&target, source.len())?)
                    }
                }
            }
        }
    }
}

fn check_required_columns(descriptor: &SchemaDescriptor, batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let missing: Vec<String> = descriptor
        .required
        .iter()
        .filter(|group| group.iter().all(|name| schema.index_of(name).is_err()))
        .map(|group| group.join("|"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingRequiredColumns {
            kind: descriptor.kind,
            columns: missing,
        })
    }
}

/// Rows holding at least one non-null, non-blank value
fn non_empty_mask(batch: &RecordBatch) -> BooleanArray {
    let mut keep = vec![false; batch.num_rows()];
    for column in batch.columns() {
        let text = match column.data_type() {
            DataType::Utf8 => Some(column.as_string::<i32>()),
            _ => None,
        };
        for (row, flag) in keep.iter_mut().enumerate() {
            if *flag || column.is_null(row) {
                continue;
            }
            *flag = text.is_none_or(|text| !text.value(row).trim().is_empty());
        }
    }
    BooleanArray::from(keep)
}
