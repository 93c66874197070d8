//! Raw source discovery and loading.
//!
//! Raw extracts are CSV or Parquet files. CSV columns are all read as nullable text; the
//! normalizer assigns the semantic types afterwards.

use std::fs;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::util::safe_open_file;
use crate::error::{Error, Result};
use crate::normalize::RawBatch;
use crate::schema::SourceKind;
use crate::utils::logging::log_warning;

/// Text values read as null, in addition to empty fields
pub const NULL_TOKENS: [&str; 5] = ["NA", "NULL", "null", "NaN", "nan"];

/// On-disk format of a raw file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    Csv,
    Parquet,
}

impl RawFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// A raw source file with its detected kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub format: RawFormat,
}

impl RawFile {
    /// Describe a file explicitly declared as `kind`
    pub fn with_kind(path: impl Into<PathBuf>, kind: SourceKind) -> Result<Self> {
        let path = path.into();
        let format = RawFormat::from_path(&path).ok_or_else(|| Error::UnknownSourceKind {
            path: path.clone(),
        })?;
        Ok(Self { path, kind, format })
    }

    #[must_use]
    pub fn source_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Find every CSV or Parquet file below `dir` whose name maps to a source kind
///
/// Files of another kind of name are skipped with a warning. The result is sorted by path.
pub fn discover_raw_files(dir: &Path) -> Result<Vec<RawFile>> {
    crate::error::util::validate_directory(dir)?;
    let mut paths = Vec::new();
    collect_files(dir, &mut paths)?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(format) = RawFormat::from_path(&path) else {
            continue;
        };
        match SourceKind::detect(&path) {
            Some(kind) => files.push(RawFile { path, kind, format }),
            None => log_warning("Skipping file of unknown source kind", Some(&path)),
        }
    }
    log::info!("Discovered {} raw files in {}", files.len(), dir.display());
    Ok(files)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))? {
        let path = entry.map_err(|e| Error::io_at(dir, e))?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Read a raw file into batches of at most `batch_size` rows
pub fn read_raw_file(file: &RawFile, batch_size: usize) -> Result<Vec<RawBatch>> {
    let batches = match file.format {
        RawFormat::Csv => read_csv(&file.path, batch_size)?,
        RawFormat::Parquet => {
            let reader = ParquetRecordBatchReaderBuilder::try_new(safe_open_file(&file.path)?)?
                .with_batch_size(batch_size)
                .build()?;
            reader.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let source_name = file.source_name();
    Ok(batches
        .into_iter()
        .map(|batch| RawBatch {
            kind: file.kind,
            source_name: source_name.clone(),
            batch,
        })
        .collect())
}

/// Read a CSV file with a header, every column as nullable text
pub fn read_csv(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let mut file = safe_open_file(path)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(BufReader::new(&mut file), Some(0))?;
    file.seek(SeekFrom::Start(0)).map_err(|e| Error::io_at(path, e))?;

    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(schema)
        .with_format(format)
        .with_batch_size(batch_size)
        .build(BufReader::new(file))?;

    reader
        .map(|batch| mask_null_tokens(&batch?))
        .collect()
}

/// Replace null tokens in text columns with nulls
fn mask_null_tokens(batch: &RecordBatch) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|column| {
            if column.data_type() != &DataType::Utf8 {
                return column.clone();
            }
            let masked: StringArray = column
                .as_string::<i32>()
                .iter()
                .map(|value| value.filter(|v| !NULL_TOKENS.contains(&v.trim())))
                .collect();
            Arc::new(masked) as ArrayRef
        })
        .collect();
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}
