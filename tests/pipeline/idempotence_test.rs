use std::fs;

use claims_lakehouse::PartitionedStore;
use claims_lakehouse::models::{MemberYearMetrics, PatientViewRow, TopDiagnosis};

use crate::utils::{Fixture, parquet_files, quiet_config, write_b1_scenario};

fn gold_snapshot(
    fixture: &Fixture,
) -> claims_lakehouse::Result<(Vec<MemberYearMetrics>, Vec<TopDiagnosis>, Vec<PatientViewRow>)> {
    let gold = PartitionedStore::new(fixture.layer_dir("gold"));
    Ok((
        gold.read_table()?.unwrap_or_default(),
        gold.read_table()?.unwrap_or_default(),
        gold.read_table()?.unwrap_or_default(),
    ))
}

#[test]
fn test_rerun_produces_identical_layers() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    let pipeline = fixture.pipeline(quiet_config());

    pipeline.run()?;
    let files_first = parquet_files(&fixture.output_dir());
    let gold_first = gold_snapshot(&fixture)?;

    pipeline.run()?;
    let files_second = parquet_files(&fixture.output_dir());
    let gold_second = gold_snapshot(&fixture)?;

    assert_eq!(files_first, files_second);
    assert_eq!(gold_first, gold_second);
    Ok(())
}

#[test]
fn test_rerun_drops_partitions_of_removed_rows() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    crate::utils::write_beneficiaries(
        &fixture,
        "DE1_0_2009_Beneficiary_Summary_File_Sample_1.csv",
        &[&[
            "B1", "19400101", "1", "1", "05", "1", "1", "0", "0", "0", "0", "0", "0", "0", "0",
            "0",
        ]],
    );
    let pipeline = fixture.pipeline(quiet_config());
    pipeline.run()?;
    let metrics_2009 = fixture.layer_dir("gold").join("member_year_metrics/year=2009");
    assert!(metrics_2009.is_dir());

    fixture.remove("DE1_0_2009_Beneficiary_Summary_File_Sample_1.csv");
    pipeline.run()?;
    assert!(!metrics_2009.exists());
    let beneficiary_years: Vec<_> = fs::read_dir(fixture.layer_dir("silver").join("dim_beneficiary"))
        .map_err(claims_lakehouse::Error::Io)?
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(beneficiary_years, vec!["year=2008".to_string()]);
    Ok(())
}
