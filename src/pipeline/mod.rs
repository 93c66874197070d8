//! Stage orchestration: raw extracts through bronze and silver into gold.
//!
//! Stages run strictly in sequence and each one fully materializes its tables before the
//! next reads them. Warnings raised along the way are collected into one
//! [`ValidationReport`], together with a sampled validation of every layer.

pub mod bronze;
pub mod gold;
pub mod raw;
pub mod silver;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::config::{LayerPaths, PipelineConfig};
use crate::error::Result;
use crate::error::util::validate_directory;
use crate::normalize::SchemaNormalizer;
use crate::schema::ReconciliationConfig;
use crate::store::PartitionedStore;
use crate::transform::DiagnosisDictionary;
use crate::validation::{REPORT_FILE_NAME, ValidationReport, validate_layer};

pub use bronze::{BronzeOutcome, BronzeStage, split_by_partition};
pub use gold::{GoldOutcome, GoldStage};
pub use raw::{RawFile, RawFormat, discover_raw_files, read_raw_file};
pub use silver::{SilverOutcome, SilverStage};

/// Size the global rayon pool
///
/// The global pool can only be built once per process; later calls keep the existing pool.
pub fn init_thread_pool(workers: usize) {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build_global()
    {
        Ok(()) => log::debug!("Initialized thread pool with {workers} workers"),
        Err(err) => log::debug!("Keeping existing thread pool: {err}"),
    }
}

/// Row counts of a complete run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub bronze_rows: usize,
    pub beneficiaries: usize,
    pub claims: usize,
    pub diagnoses: usize,
    pub prescriptions: usize,
    pub providers: usize,
    pub member_years: usize,
    pub top_diagnoses: usize,
    pub patient_view_rows: usize,
    pub warnings: usize,
}

/// The three-layer claims pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    paths: LayerPaths,
    output_root: PathBuf,
    reconciliation: ReconciliationConfig,
    dictionary: DiagnosisDictionary,
}

impl Pipeline {
    /// Create a pipeline reading `raw` and writing every layer beneath `output_root`
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the descriptor overrides cannot be loaded.
    pub fn new(
        config: PipelineConfig,
        raw: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;
        let reconciliation = config.reconciliation()?;
        let output_root = output_root.into();
        Ok(Self {
            paths: LayerPaths::under(raw, &output_root),
            output_root,
            config,
            reconciliation,
            dictionary: DiagnosisDictionary::default(),
        })
    }

    #[must_use]
    pub fn with_dictionary(mut self, dictionary: DiagnosisDictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub const fn paths(&self) -> &LayerPaths {
        &self.paths
    }

    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.output_root.join(REPORT_FILE_NAME)
    }

    fn store(path: &Path) -> PartitionedStore {
        PartitionedStore::new(path)
    }

    /// Normalize every raw file into the bronze layer
    pub fn bronze(&self) -> Result<BronzeOutcome> {
        validate_directory(&self.paths.raw)?;
        let files = discover_raw_files(&self.paths.raw)?;
        let normalizer =
            SchemaNormalizer::new(self.reconciliation.clone(), self.config.default_prefix.as_str());
        let store = Self::store(&self.paths.bronze);
        BronzeStage::new(
            &normalizer,
            &store,
            self.config.csv_batch_size,
            self.config.show_progress,
        )
        .run(&files)
    }

    /// Build the dimensional model from the bronze layer
    pub fn silver(&self) -> Result<SilverOutcome> {
        let bronze = Self::store(&self.paths.bronze);
        let silver = Self::store(&self.paths.silver);
        SilverStage::new(
            &self.config,
            &self.reconciliation,
            &self.dictionary,
            &bronze,
            &silver,
        )
        .run()
    }

    /// Build the analytical views from the silver layer
    pub fn gold(&self) -> Result<GoldOutcome> {
        let silver = Self::store(&self.paths.silver);
        let gold = Self::store(&self.paths.gold);
        GoldStage::new(&self.config, &silver, &gold).run()
    }

    /// Sample every table of every layer
    pub fn validate(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        for (layer, root) in [
            ("bronze", &self.paths.bronze),
            ("silver", &self.paths.silver),
            ("gold", &self.paths.gold),
        ] {
            report.add_layer(validate_layer(
                layer,
                root,
                self.config.validation_sample_files,
            )?);
        }
        Ok(report)
    }

    /// Run all stages, validate the layers and save the report next to them
    ///
    /// Structural errors stop the run; warnings only end up in the report.
    pub fn run(&self) -> Result<(RunSummary, ValidationReport)> {
        let start = Instant::now();
        init_thread_pool(self.config.workers);

        let bronze = self.bronze()?;
        let silver = self.silver()?;
        let gold = self.gold()?;

        let mut report = self.validate()?;
        report.extend(bronze.warnings);
        report.extend(silver.warnings);
        report.extend(gold.warnings);
        report.save(&self.report_path())?;

        let summary = RunSummary {
            bronze_rows: bronze.rows.values().sum(),
            beneficiaries: silver.beneficiaries,
            claims: silver.claims,
            diagnoses: silver.diagnoses,
            prescriptions: silver.prescriptions,
            providers: silver.providers,
            member_years: gold.metrics,
            top_diagnoses: gold.top_diagnoses,
            patient_view_rows: gold.patient_view,
            warnings: report.warnings.len(),
        };
        log::info!("Pipeline finished in {:?}: {summary:?}", start.elapsed());
        Ok((summary, report))
    }
}
