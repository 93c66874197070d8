use std::fs;
use std::path::{Path, PathBuf};

use claims_lakehouse::{Pipeline, PipelineConfig};
use tempfile::TempDir;

pub const BENEFICIARY_2008: &str = "DE1_0_2008_Beneficiary_Summary_File_Sample_1.csv";
pub const INPATIENT: &str = "DE1_0_2008_to_2010_Inpatient_Claims_Sample_1.csv";
pub const OUTPATIENT: &str = "DE1_0_2008_to_2010_Outpatient_Claims_Sample_1.csv";
pub const PRESCRIPTIONS: &str = "DE1_0_2008_to_2010_Prescription_Drug_Events_Sample_1.csv";

/// Scratch directory holding raw extracts and the layers built from them
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("raw")).expect("Failed to create raw dir");
        Self { dir }
    }

    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("lakehouse")
    }

    #[must_use]
    pub fn layer_dir(&self, layer: &str) -> PathBuf {
        self.output_dir().join(layer)
    }

    /// Write a CSV extract; empty fields stay empty
    pub fn write_csv(&self, name: &str, header: &[&str], rows: &[&[&str]]) -> PathBuf {
        let path = self.raw_dir().join(name);
        let mut content = header.join(",");
        content.push('\n');
        for row in rows {
            content.push_str(&row.join(","));
            content.push('\n');
        }
        fs::write(&path, content).expect("Failed to write fixture CSV");
        path
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.raw_dir().join(name)).expect("Failed to remove fixture");
    }

    #[must_use]
    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(config, self.raw_dir(), self.output_dir()).expect("Invalid pipeline")
    }
}

/// Configuration without progress bars
#[must_use]
pub fn quiet_config() -> PipelineConfig {
    PipelineConfig::default().with_progress(false).with_workers(2)
}

const BENEFICIARY_HEADER: [&str; 16] = [
    "DESYNPUF_ID",
    "BENE_BIRTH_DT",
    "BENE_SEX_IDENT_CD",
    "BENE_RACE_CD",
    "SP_STATE_CODE",
    "SP_CHF",
    "SP_DIABETES",
    "MEDREIMB_IP",
    "BENRES_IP",
    "PPPYMT_IP",
    "MEDREIMB_OP",
    "BENRES_OP",
    "PPPYMT_OP",
    "MEDREIMB_CAR",
    "BENRES_CAR",
    "PPPYMT_CAR",
];

const INSTITUTIONAL_HEADER: [&str; 9] = [
    "DESYNPUF_ID",
    "CLM_ID",
    "CLM_FROM_DT",
    "CLM_THRU_DT",
    "PRVDR_NUM",
    "CLM_PMT_AMT",
    "NCH_PRMRY_PYR_CLM_PD_AMT",
    "ICD9_DGNS_CD_1",
    "ICD9_DGNS_CD_2",
];

const PRESCRIPTION_HEADER: [&str; 7] = [
    "DESYNPUF_ID",
    "PDE_ID",
    "SRVC_DT",
    "PROD_SRVC_ID",
    "PRVDR_ID",
    "PTNT_PAY_AMT",
    "TOT_RX_CST_AMT",
];

pub fn write_beneficiaries(fixture: &Fixture, name: &str, rows: &[&[&str]]) -> PathBuf {
    fixture.write_csv(name, &BENEFICIARY_HEADER, rows)
}

pub fn write_institutional(fixture: &Fixture, name: &str, rows: &[&[&str]]) -> PathBuf {
    fixture.write_csv(name, &INSTITUTIONAL_HEADER, rows)
}

pub fn write_prescriptions(fixture: &Fixture, rows: &[&[&str]]) -> PathBuf {
    fixture.write_csv(PRESCRIPTIONS, &PRESCRIPTION_HEADER, rows)
}

/// Patient B1 in 2008: one inpatient stay without a provider, one outpatient visit and two
/// fills at the outpatient provider
pub fn write_b1_scenario(fixture: &Fixture) {
    write_beneficiaries(
        fixture,
        BENEFICIARY_2008,
        &[&[
            "B1", "19400101", "1", "1", "05", "2", "1", "100", "0", "10", "50", "0", "0", "0",
            "0", "0",
        ]],
    );
    write_institutional(
        fixture,
        INPATIENT,
        &[&["B1", "C1", "20080110", "20080115", "", "100", "10", "4019", "25000"]],
    );
    write_institutional(
        fixture,
        OUTPATIENT,
        &[&["B1", "C2", "20080301", "20080301", "P100", "50", "0", "4019", ""]],
    );
    write_prescriptions(
        fixture,
        &[
            &["B1", "R1", "20080305", "00071015523", "P100", "5", "25"],
            &["B1", "R2", "20080405", "00071015523", "P100", "5", "35"],
        ],
    );
}

/// Every parquet file below a directory, sorted
#[must_use]
pub fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}
