//! Diagnosis code descriptions.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::error::util::safe_open_file;

/// Length of the ICD-9 family prefix used for lookups
pub const FAMILY_PREFIX_LEN: usize = 3;

/// Description given to non-empty codes outside the dictionary
pub const OTHER_DIAGNOSIS: &str = "Other diagnosis";

const DEFAULT_FAMILIES: [(&str, &str); 10] = [
    ("250", "Diabetes mellitus"),
    ("401", "Essential hypertension"),
    ("272", "Disorders of lipoid metabolism"),
    ("414", "Other forms of chronic ischemic heart disease"),
    ("427", "Cardiac dysrhythmias"),
    ("428", "Heart failure"),
    ("496", "Chronic airway obstruction"),
    ("311", "Depressive disorder"),
    ("715", "Osteoarthrosis"),
    ("724", "Other and unspecified disorders of back"),
];

/// Maps diagnosis code families to descriptions
///
/// Matching is coarse: only the first three characters of a code are compared, even when
/// a more specific entry could exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisDictionary {
    families: BTreeMap<String, String>,
}

impl Default for DiagnosisDictionary {
    fn default() -> Self {
        Self {
            families: DEFAULT_FAMILIES
                .iter()
                .map(|(code, description)| ((*code).to_string(), (*description).to_string()))
                .collect(),
        }
    }
}

impl DiagnosisDictionary {
    /// Load a `{ "family": "description" }` JSON object
    pub fn from_json(path: &Path) -> Result<Self> {
        let file = safe_open_file(path)?;
        let families: BTreeMap<String, String> =
            serde_json::from_reader(std::io::BufReader::new(file))?;
        log::info!("Loaded {} diagnosis families from {}", families.len(), path.display());
        Ok(Self { families })
    }

    /// Description of a non-empty code
    #[must_use]
    pub fn describe(&self, code: &str) -> &str {
        let code = code.trim();
        let family: String = code.chars().take(FAMILY_PREFIX_LEN).collect();
        self.families
            .get(&family)
            .map_or(OTHER_DIAGNOSIS, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
