//! Validation reporting.
//!
//! Non-fatal conditions raised while the pipeline runs are collected as
//! [`ValidationWarning`] values. After a layer is written, [`validate_layer`] samples its
//! partition files and records row counts and data-quality issues per table. Both end up in a
//! [`ValidationReport`] persisted as JSON next to the layers.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use arrow::array::Array;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{LogicalField, SourceKind};
use crate::store::{PartitionedStore, read_parquet_file};
use crate::utils::logging::{log_operation_complete, log_warning};

/// File name of the persisted report under the output root
pub const REPORT_FILE_NAME: &str = "validation_report.json";

/// A condition worth reporting that does not stop the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// An optional upstream table had no data; dependent metrics were zero-filled
    OptionalSourceAbsent { table: String },
    /// No candidate column for a logical field was available; the placeholder was used
    ReconciliationGap {
        kind: SourceKind,
        field: LogicalField,
        source_name: String,
    },
    /// Output rows without a patient identifier
    NullIdentifiers { table: String, rows: usize },
    /// Raw rows dropped during normalization
    DroppedRows {
        source_name: String,
        empty: usize,
        missing_id: usize,
    },
    /// A table was produced without rows
    EmptyResult { table: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OptionalSourceAbsent { table } => {
                write!(f, "optional source {table} is absent")
            }
            Self::ReconciliationGap {
                kind,
                field,
                source_name,
            } => write!(
                f,
                "no column available for {field:?} in {kind} source {source_name}; placeholder used"
            ),
            Self::NullIdentifiers { table, rows } => {
                write!(f, "{rows} rows in {table} have a null bene_id")
            }
            Self::DroppedRows {
                source_name,
                empty,
                missing_id,
            } => write!(
                f,
                "{source_name}: dropped {empty} empty rows and {missing_id} rows without an identifier"
            ),
            Self::EmptyResult { table } => write!(f, "table {table} has no rows"),
        }
    }
}

/// Outcome of validating one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Valid,
    Warning,
    Error,
}

/// Sampled statistics of one partition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSample {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub null_bene_ids: usize,
}

/// Validation result for one table of a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableValidation {
    pub status: TableStatus,
    pub total_files: usize,
    pub sampled_rows: usize,
    pub samples: Vec<FileSample>,
    pub issues: Vec<String>,
}

/// Validation result for one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerValidation {
    pub layer: String,
    pub tables: BTreeMap<String, TableValidation>,
}

impl LayerValidation {
    /// Worst status over all tables; `Error` when the layer has no tables
    #[must_use]
    pub fn status(&self) -> TableStatus {
        self.tables
            .values()
            .map(|table| table.status)
            .max_by_key(|status| match status {
                TableStatus::Valid => 0,
                TableStatus::Warning => 1,
                TableStatus::Error => 2,
            })
            .unwrap_or(TableStatus::Error)
    }

    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.tables.values().map(|table| table.issues.len()).sum()
    }
}

/// Sample every table under a layer root
///
/// Each subdirectory of the root is a table. Up to `sample_files` partition files are read
/// per table, chosen at random.
pub fn validate_layer(layer: &str, root: &Path, sample_files: usize) -> Result<LayerValidation> {
    let mut validation = LayerValidation {
        layer: layer.to_string(),
        tables: BTreeMap::new(),
    };
    if !root.is_dir() {
        log_warning("Layer directory does not exist", Some(root));
        return Ok(validation);
    }

    let store = PartitionedStore::new(root);
    let mut table_names = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| Error::io_at(root, e))? {
        let entry = entry.map_err(|e| Error::io_at(root, e))?;
        if entry.path().is_dir() {
            table_names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    table_names.sort();

    let mut rng = rand::rng();
    for table in table_names {
        let files = store.partition_files(&table)?;
        let chosen: Vec<&PathBuf> = files.choose_multiple(&mut rng, sample_files).collect();
        let result = validate_table(&files, &chosen)?;
        validation.tables.insert(table, result);
    }

    log_operation_complete(
        "validated",
        root,
        validation.tables.len(),
        None,
    );
    Ok(validation)
}

fn validate_table(files: &[PathBuf], chosen: &[&PathBuf]) -> Result<TableValidation> {
    if files.is_empty() {
        return Ok(TableValidation {
            status: TableStatus::Error,
            total_files: 0,
            sampled_rows: 0,
            samples: Vec::new(),
            issues: vec!["no partition files".to_string()],
        });
    }

    let mut samples = Vec::with_capacity(chosen.len());
    let mut issues = Vec::new();
    for path in chosen {
        let sample = sample_file(path)?;
        if sample.rows == 0 {
            issues.push(format!("{}: empty file", path.display()));
        }
        if sample.null_bene_ids > 0 {
            issues.push(format!(
                "{}: {} null bene_id values",
                path.display(),
                sample.null_bene_ids
            ));
        }
        samples.push(sample);
    }

    Ok(TableValidation {
        status: if issues.is_empty() {
            TableStatus::Valid
        } else {
            TableStatus::Warning
        },
        total_files: files.len(),
        sampled_rows: samples.iter().map(|s| s.rows).sum(),
        samples,
        issues,
    })
}

fn sample_file(path: &Path) -> Result<FileSample> {
    let batches = read_parquet_file(path)?;
    let mut sample = FileSample {
        path: path.to_path_buf(),
        rows: 0,
        columns: 0,
        null_bene_ids: 0,
    };
    for batch in &batches {
        sample.rows += batch.num_rows();
        sample.columns = batch.num_columns();
        if let Some(ids) = batch.column_by_name("bene_id") {
            sample.null_bene_ids += ids.null_count();
        }
    }
    Ok(sample)
}

/// Everything a run has to report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub generated_at: String,
    pub layers: Vec<LayerValidation>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            layers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a warning and log it
    pub fn warn(&mut self, warning: ValidationWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record warnings that were already logged where they arose
    pub fn extend(&mut self, warnings: impl IntoIterator<Item = ValidationWarning>) {
        self.warnings.extend(warnings);
    }

    pub fn add_layer(&mut self, layer: LayerValidation) {
        self.layers.push(layer);
    }

    /// Whether anything in the report deserves attention
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
            || self
                .layers
                .iter()
                .any(|layer| layer.status() != TableStatus::Valid)
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::error::util::ensure_directory(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io_at(path, e))?;
        log::info!("Validation report saved to {}", path.display());
        Ok(())
    }

    /// Read a report written by [`ValidationReport::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = crate::error::util::safe_open_file(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
