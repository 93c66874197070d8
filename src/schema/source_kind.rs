//! Source kinds and claim kinds.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kind of raw extract a record batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Beneficiary,
    Inpatient,
    Outpatient,
    Carrier,
    Pharmacy,
}

impl SourceKind {
    pub const ALL: [Self; 5] = [
        Self::Beneficiary,
        Self::Inpatient,
        Self::Outpatient,
        Self::Carrier,
        Self::Pharmacy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beneficiary => "beneficiary",
            Self::Inpatient => "inpatient",
            Self::Outpatient => "outpatient",
            Self::Carrier => "carrier",
            Self::Pharmacy => "pharmacy",
        }
    }

    /// The claim kind for claim-grain sources
    #[must_use]
    pub const fn claim_kind(self) -> Option<ClaimKind> {
        match self {
            Self::Inpatient => Some(ClaimKind::Inpatient),
            Self::Outpatient => Some(ClaimKind::Outpatient),
            Self::Carrier => Some(ClaimKind::Carrier),
            Self::Beneficiary | Self::Pharmacy => None,
        }
    }

    /// Detect the source kind from an extract's file name
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.contains("beneficiary") {
            Some(Self::Beneficiary)
        } else if name.contains("inpatient") {
            Some(Self::Inpatient)
        } else if name.contains("outpatient") {
            Some(Self::Outpatient)
        } else if name.contains("carrier") {
            Some(Self::Carrier)
        } else if name.contains("prescription_drug") || name.contains("pde") {
            Some(Self::Pharmacy)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown source kind '{s}'")))
    }
}

/// The structural category of a unified claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Inpatient,
    Outpatient,
    Carrier,
}

impl ClaimKind {
    pub const ALL: [Self; 3] = [Self::Inpatient, Self::Outpatient, Self::Carrier];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inpatient => "inpatient",
            Self::Outpatient => "outpatient",
            Self::Carrier => "carrier",
        }
    }

    #[must_use]
    pub const fn source_kind(self) -> SourceKind {
        match self {
            Self::Inpatient => SourceKind::Inpatient,
            Self::Outpatient => SourceKind::Outpatient,
            Self::Carrier => SourceKind::Carrier,
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown claim kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kind_from_file_name() {
        let cases = [
            ("DE1_0_2008_Beneficiary_Summary_File_Sample_1.csv", Some(SourceKind::Beneficiary)),
            ("DE1_0_2008_to_2010_Inpatient_Claims_Sample_1.csv", Some(SourceKind::Inpatient)),
            ("DE1_0_2008_to_2010_Outpatient_Claims_Sample_1.csv", Some(SourceKind::Outpatient)),
            ("DE1_0_2008_to_2010_Carrier_Claims_Sample_1A.csv", Some(SourceKind::Carrier)),
            (
                "DE1_0_2008_to_2010_Prescription_Drug_Events_Sample_1.csv",
                Some(SourceKind::Pharmacy),
            ),
            ("readme.txt", None),
        ];
        for (name, expected) in cases {
            assert_eq!(SourceKind::detect(Path::new(name)), expected, "{name}");
        }
    }

    #[test]
    fn claim_kinds_round_trip_through_names() {
        for kind in ClaimKind::ALL {
            assert_eq!(kind.as_str().parse::<ClaimKind>().unwrap(), kind);
            assert_eq!(kind.source_kind().claim_kind(), Some(kind));
        }
        assert!(SourceKind::Pharmacy.claim_kind().is_none());
    }
}
