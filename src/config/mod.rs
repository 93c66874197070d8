//! Pipeline configuration.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::ReconciliationConfig;

/// Definition of `total_paid` on the beneficiary dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalPaidPolicy {
    /// Program-paid amounts only
    ProgramOnly,
    /// Program-paid plus patient-paid amounts
    #[default]
    ProgramPlusPatient,
}

/// Directories of the raw input and the three output layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPaths {
    pub raw: PathBuf,
    pub bronze: PathBuf,
    pub silver: PathBuf,
    pub gold: PathBuf,
}

impl LayerPaths {
    /// Lay the output layers out beneath a single root
    #[must_use]
    pub fn under(raw: impl Into<PathBuf>, output_root: &Path) -> Self {
        Self {
            raw: raw.into(),
            bronze: output_root.join("bronze"),
            silver: output_root.join("silver"),
            gold: output_root.join("gold"),
        }
    }
}

/// Placeholder for unresolvable identifiers unless configured otherwise
pub const DEFAULT_UNKNOWN_TOKEN: &str = "Unknown";

/// Configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rank cutoff for the top diagnoses per patient-year
    pub top_k: u32,
    pub total_paid_policy: TotalPaidPolicy,
    /// Partition prefix used when a patient identifier is missing or too short
    pub default_prefix: String,
    /// Placeholder emitted for unresolvable identifiers
    pub unknown_token: String,
    /// First and last year served by the lookup service
    pub first_year: i32,
    pub last_year: i32,
    /// Worker threads for parallel stages
    pub workers: usize,
    /// Rows per record batch when reading CSV extracts
    pub csv_batch_size: usize,
    pub show_progress: bool,
    /// Files sampled per table by the validation report
    pub validation_sample_files: usize,
    /// Optional JSON file replacing built-in schema descriptors
    pub descriptor_overrides: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            total_paid_policy: TotalPaidPolicy::default(),
            default_prefix: "00".to_string(),
            unknown_token: DEFAULT_UNKNOWN_TOKEN.to_string(),
            first_year: 2008,
            last_year: 2010,
            workers: num_cpus::get(),
            csv_batch_size: 8192,
            show_progress: true,
            validation_sample_files: 3,
            descriptor_overrides: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub const fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub const fn with_total_paid_policy(mut self, policy: TotalPaidPolicy) -> Self {
        self.total_paid_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[must_use]
    pub const fn with_years(mut self, first_year: i32, last_year: i32) -> Self {
        self.first_year = first_year;
        self.last_year = last_year;
        self
    }

    #[must_use]
    pub fn with_descriptor_overrides(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor_overrides = Some(path.into());
        self
    }

    #[must_use]
    pub const fn supported_years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    /// Check the configuration for values no stage can work with
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".to_string()));
        }
        if self.first_year > self.last_year {
            return Err(Error::Config(format!(
                "first year {} is after last year {}",
                self.first_year, self.last_year
            )));
        }
        if self.default_prefix.is_empty() || self.unknown_token.is_empty() {
            return Err(Error::Config(
                "default prefix and unknown token must not be empty".to_string(),
            ));
        }
        if self.csv_batch_size == 0 {
            return Err(Error::Config("csv_batch_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Built-in descriptors with any configured overrides applied
    pub fn reconciliation(&self) -> Result<ReconciliationConfig> {
        let config = ReconciliationConfig::default();
        match &self.descriptor_overrides {
            Some(path) => config.with_overrides_from(path),
            None => Ok(config),
        }
    }
}
