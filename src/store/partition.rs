//! Partition keys and their directory layout.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory name prefix for the year partition level
pub const YEAR_PARTITION: &str = "year";
/// Directory name prefix for the patient-id-prefix partition level
pub const PREFIX_PARTITION: &str = "bene_id_prefix";

/// How a table is laid out beneath its root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionScheme {
    /// A single file directly under the table root
    Unpartitioned,
    /// `year=<Y>/`
    Year,
    /// `year=<Y>/bene_id_prefix=<PP>/`
    YearPrefix,
}

/// The partition a row belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub year: Option<i32>,
    pub prefix: Option<String>,
}

impl PartitionKey {
    #[must_use]
    pub const fn unpartitioned() -> Self {
        Self {
            year: None,
            prefix: None,
        }
    }

    #[must_use]
    pub const fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            prefix: None,
        }
    }

    #[must_use]
    pub fn year_prefix(year: i32, prefix: impl Into<String>) -> Self {
        Self {
            year: Some(year),
            prefix: Some(prefix.into()),
        }
    }

    /// Restrict the key to the levels a scheme actually uses
    #[must_use]
    pub fn for_scheme(&self, scheme: PartitionScheme) -> Self {
        match scheme {
            PartitionScheme::Unpartitioned => Self::unpartitioned(),
            PartitionScheme::Year => Self {
                year: self.year,
                prefix: None,
            },
            PartitionScheme::YearPrefix => self.clone(),
        }
    }

    /// Directory of this partition relative to the table root
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        if let Some(year) = self.year {
            dir.push(format!("{YEAR_PARTITION}={year}"));
        }
        if let Some(prefix) = &self.prefix {
            dir.push(format!("{PREFIX_PARTITION}={prefix}"));
        }
        dir
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.year, &self.prefix) {
            (None, None) => write!(f, "<unpartitioned>"),
            _ => write!(f, "{}", self.relative_dir().display()),
        }
    }
}
