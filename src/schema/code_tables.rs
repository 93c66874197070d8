//! Fixed code tables for categorical source columns.
//!
//! Tables are immutable statics; the normalizer receives them through [`CodeTables`].

use serde::{Deserialize, Serialize};

/// Which code table a categorical column is resolved through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeTableId {
    Sex,
    Race,
    State,
}

/// A code → label table
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    pub name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    #[must_use]
    pub const fn new(name: &'static str, entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { name, entries }
    }

    /// Resolve a code; numeric codes also match their zero-padded two-digit form
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<&'static str> {
        let code = code.trim();
        self.find(code).or_else(|| {
            let padded = format!("{:02}", code.parse::<u32>().ok()?);
            self.find(&padded)
        })
    }

    fn find(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == code)
            .map(|(_, label)| *label)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub static SEX_CODES: CodeTable = CodeTable::new("sex", &[("1", "Male"), ("2", "Female")]);

pub static RACE_CODES: CodeTable = CodeTable::new(
    "race",
    &[("1", "White"), ("2", "Black"), ("3", "Others"), ("5", "Hispanic")],
);

pub static STATE_CODES: CodeTable = CodeTable::new(
    "state",
    &[
        ("01", "AL"),
        ("02", "AK"),
        ("03", "AZ"),
        ("04", "AR"),
        ("05", "CA"),
        ("06", "CO"),
        ("07", "CT"),
        ("08", "DE"),
        ("09", "DC"),
        ("10", "FL"),
        ("11", "GA"),
        ("12", "HI"),
        ("13", "ID"),
        ("14", "IL"),
        ("15", "IN"),
        ("16", "IA"),
        ("17", "KS"),
        ("18", "KY"),
        ("19", "LA"),
        ("20", "ME"),
        ("21", "MD"),
        ("22", "MA"),
        ("23", "MI"),
        ("24", "MN"),
        ("25", "MS"),
        ("26", "MO"),
        ("27", "MT"),
        ("28", "NE"),
        ("29", "NV"),
        ("30", "NH"),
        ("31", "NJ"),
        ("32", "NM"),
        ("33", "NY"),
        ("34", "NC"),
        ("35", "ND"),
        ("36", "OH"),
        ("37", "OK"),
        ("38", "OR"),
        ("39", "PA"),
        ("40", "RI"),
        ("41", "SC"),
        ("42", "SD"),
        ("43", "TN"),
        ("44", "TX"),
        ("45", "UT"),
        ("46", "VT"),
        ("47", "VA"),
        ("48", "WA"),
        ("49", "WV"),
        ("50", "WI"),
        ("51", "WY"),
        ("52", "PR"),
        ("53", "VI"),
        ("54", "GU"),
        ("55", "AS"),
        ("56", "MP"),
        ("99", "Unknown"),
    ],
);

/// The set of code tables injected into the normalizer
#[derive(Debug, Clone, Copy)]
pub struct CodeTables {
    pub sex: &'static CodeTable,
    pub race: &'static CodeTable,
    pub state: &'static CodeTable,
}

impl CodeTables {
    #[must_use]
    pub const fn get(&self, id: CodeTableId) -> &'static CodeTable {
        match id {
            CodeTableId::Sex => self.sex,
            CodeTableId::Race => self.race,
            CodeTableId::State => self.state,
        }
    }
}

impl Default for CodeTables {
    fn default() -> Self {
        Self {
            sex: &SEX_CODES,
            race: &RACE_CODES,
            state: &STATE_CODES,
        }
    }
}
