//! Partitioned Parquet storage.
//!
//! A logical table lives under `root/<table>/`, with one file per partition:
//! `root/<table>/year=<Y>/[bene_id_prefix=<PP>/]<table>.parquet`. Writes replace the
//! partition file through a temporary file and a rename; reads discover and concatenate every
//! partition file beneath the table root.

pub mod partition;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

pub use partition::{PartitionKey, PartitionScheme, PREFIX_PARTITION, YEAR_PARTITION};

use crate::error::util::ensure_directory;
use crate::error::{Error, Result};
use crate::models::traits::StoredTable;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// File extension of partition files
pub const PARQUET_EXTENSION: &str = "parquet";

/// Root of a layer (bronze, silver or gold) holding partitioned tables
#[derive(Debug)]
pub struct PartitionedStore {
    root: PathBuf,
    in_flight: Mutex<FxHashSet<PathBuf>>,
}

/// Releases a claimed partition path when dropped
struct PartitionClaim<'a> {
    store: &'a PartitionedStore,
    path: PathBuf,
}

impl Drop for PartitionClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.store.in_flight.lock() {
            in_flight.remove(&self.path);
        }
    }
}

impl PartitionedStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            in_flight: Mutex::new(FxHashSet::default()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn table_root(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    /// Path of the file holding one partition of a table
    #[must_use]
    pub fn partition_path(&self, table: &str, key: &PartitionKey) -> PathBuf {
        self.table_root(table)
            .join(key.relative_dir())
            .join(format!("{table}.{PARQUET_EXTENSION}"))
    }

    fn claim(&self, path: &Path) -> Result<PartitionClaim<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| Error::Config("partition registry lock poisoned".to_string()))?;
        if !in_flight.insert(path.to_path_buf()) {
            return Err(Error::PartitionWriteConflict {
                path: path.to_path_buf(),
            });
        }
        Ok(PartitionClaim {
            store: self,
            path: path.to_path_buf(),
        })
    }

    /// Write one partition file, replacing any existing file at that path
    pub fn write_partition(&self, table: &str, key: &PartitionKey, batch: &RecordBatch) -> Result<PathBuf> {
        let path = self.partition_path(table, key);
        let _claim = self.claim(&path)?;

        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        let tmp_path = path.with_extension(format!("{PARQUET_EXTENSION}.tmp"));
        let file = File::create(&tmp_path).map_err(|e| Error::io_at(&tmp_path, e))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .set_statistics_enabled(EnabledStatistics::Page)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;

        fs::rename(&tmp_path, &path).map_err(|e| Error::io_at(&path, e))?;
        log::debug!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(path)
    }

    /// Write partitions of a table in parallel
    ///
    /// Batches sharing a key (after restricting it to `scheme`) are concatenated first, so
    /// every partition file is written by exactly one worker.
    pub fn write_batches(
        &self,
        table: &str,
        scheme: PartitionScheme,
        batches: Vec<(PartitionKey, RecordBatch)>,
    ) -> Result<usize> {
        let start = Instant::now();
        let mut grouped: BTreeMap<PartitionKey, Vec<RecordBatch>> = BTreeMap::new();
        for (key, batch) in batches {
            if batch.num_rows() > 0 {
                grouped.entry(key.for_scheme(scheme)).or_default().push(batch);
            }
        }

        let rows = grouped
            .into_iter()
            .collect_vec()
            .into_par_iter()
            .map(|(key, parts)| {
                let schema = parts[0].schema();
                let batch = concat_batches(&schema, &parts)?;
                self.write_partition(table, &key, &batch)?;
                Ok(batch.num_rows())
            })
            .collect::<Result<Vec<usize>>>()?
            .into_iter()
            .sum();

        log_operation_complete("wrote", &self.table_root(table), rows, Some(start.elapsed()));
        Ok(rows)
    }

    /// Delete a table and write it anew
    pub fn replace_batches(
        &self,
        table: &str,
        scheme: PartitionScheme,
        batches: Vec<(PartitionKey, RecordBatch)>,
    ) -> Result<usize> {
        self.remove_table(table)?;
        self.write_batches(table, scheme, batches)
    }

    /// Remove every partition of a table
    pub fn remove_table(&self, table: &str) -> Result<()> {
        let table_root = self.table_root(table);
        if table_root.exists() {
            fs::remove_dir_all(&table_root).map_err(|e| Error::io_at(&table_root, e))?;
        }
        Ok(())
    }

    /// Every partition file beneath a table root, in path order
    pub fn partition_files(&self, table: &str) -> Result<Vec<PathBuf>> {
        let table_root = self.table_root(table);
        let mut files = Vec::new();
        if table_root.is_dir() {
            collect_parquet_files(&table_root, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    /// Whether the table has at least one partition file
    #[must_use]
    pub fn table_exists(&self, table: &str) -> bool {
        self.partition_files(table).is_ok_and(|files| !files.is_empty())
    }

    /// Read every partition of a table
    ///
    /// Returns `Ok(None)` when the table root is missing or holds no partition files.
    pub fn read_batches(&self, table: &str) -> Result<Option<Vec<RecordBatch>>> {
        let table_root = self.table_root(table);
        let files = self.partition_files(table)?;
        if files.is_empty() {
            log_warning("No partition files found", Some(&table_root));
            return Ok(None);
        }

        log_operation_start("Reading table", &table_root);
        let start = Instant::now();
        let per_file = files
            .par_iter()
            .map(|path| read_parquet_file(path))
            .collect::<Result<Vec<_>>>()?;
        let batches: Vec<RecordBatch> = per_file.into_iter().flatten().collect();

        let rows = batches.iter().map(RecordBatch::num_rows).sum();
        log_operation_complete("read", &table_root, rows, Some(start.elapsed()));
        Ok(Some(batches))
    }

    /// Replace a typed table with `rows`
    ///
    /// An empty slice leaves the table absent, which readers see as "no data".
    pub fn write_table<T: StoredTable + Clone>(&self, rows: &[T]) -> Result<usize> {
        let mut grouped: BTreeMap<PartitionKey, Vec<T>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.partition_key().for_scheme(T::SCHEME))
                .or_default()
                .push(row.clone());
        }

        let batches = grouped
            .into_iter()
            .map(|(key, part)| Ok((key, T::to_record_batch(&part)?)))
            .collect::<Result<Vec<_>>>()?;
        self.replace_batches(T::TABLE_NAME, T::SCHEME, batches)
    }

    /// Read a typed table
    pub fn read_table<T: StoredTable>(&self) -> Result<Option<Vec<T>>> {
        let Some(batches) = self.read_batches(T::TABLE_NAME)? else {
            return Ok(None);
        };
        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(T::from_record_batch(batch)?);
        }
        Ok(Some(rows))
    }
}

fn collect_parquet_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))? {
        let path = entry.map_err(|e| Error::io_at(dir, e))?.path();
        if path.is_dir() {
            collect_parquet_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == PARQUET_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

/// Read all record batches of one Parquet file
pub fn read_parquet_file(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = crate::error::util::safe_open_file(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}
