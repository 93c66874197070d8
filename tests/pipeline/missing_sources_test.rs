use claims_lakehouse::models::{Beneficiary, MemberYearMetrics};
use claims_lakehouse::{Error, PartitionedStore, ValidationWarning};

use crate::utils::{
    BENEFICIARY_2008, Fixture, INPATIENT, OUTPATIENT, PRESCRIPTIONS, quiet_config,
    write_b1_scenario, write_beneficiaries, write_institutional,
};

#[test]
fn test_missing_pharmacy_is_a_warning() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    fixture.remove(PRESCRIPTIONS);

    let (summary, report) = fixture.pipeline(quiet_config()).run()?;
    assert_eq!(summary.prescriptions, 0);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        ValidationWarning::OptionalSourceAbsent { table } if table == "pharmacy"
    )));

    let gold = PartitionedStore::new(fixture.layer_dir("gold"));
    let metrics = gold.read_table::<MemberYearMetrics>()?.expect("metrics");
    assert_eq!(metrics[0].rx_fills, 0);
    assert_eq!(metrics[0].outpatient_visits, 1);
    Ok(())
}

#[test]
fn test_missing_beneficiaries_stop_the_run() {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    fixture.remove(BENEFICIARY_2008);

    let err = fixture.pipeline(quiet_config()).run().unwrap_err();
    assert!(matches!(err, Error::MissingRequiredSource { .. }));
}

#[test]
fn test_no_claims_of_any_kind_stop_the_run() {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    fixture.remove(INPATIENT);
    fixture.remove(OUTPATIENT);

    let err = fixture.pipeline(quiet_config()).run().unwrap_err();
    assert!(matches!(err, Error::EmptyClaims));
}

#[test]
fn test_failed_silver_run_keeps_previous_tables() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    let pipeline = fixture.pipeline(quiet_config());
    pipeline.run()?;

    let silver = PartitionedStore::new(fixture.layer_dir("silver"));
    let before = silver.read_table::<Beneficiary>()?.expect("beneficiaries");
    assert_eq!(before.len(), 1);

    write_beneficiaries(
        &fixture,
        BENEFICIARY_2008,
        &[
            &[
                "B1", "19400101", "1", "1", "05", "2", "1", "100", "0", "10", "50", "0", "0", "0",
                "0", "0",
            ],
            &[
                "B2", "19500101", "2", "1", "05", "2", "2", "0", "0", "0", "0", "0", "0", "0", "0",
                "0",
            ],
        ],
    );
    fixture.remove(INPATIENT);
    fixture.remove(OUTPATIENT);

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, Error::EmptyClaims));

    let after = silver.read_table::<Beneficiary>()?.expect("beneficiaries");
    assert_eq!(before, after);
    Ok(())
}

#[test]
fn test_rows_without_patient_id_are_dropped() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    write_institutional(
        &fixture,
        OUTPATIENT,
        &[
            &["B1", "C2", "20080301", "20080301", "P100", "50", "0", "4019", ""],
            &["", "C3", "20080302", "20080302", "P200", "70", "0", "4019", ""],
        ],
    );

    let pipeline = fixture.pipeline(quiet_config());
    let bronze = pipeline.bronze()?;
    assert!(bronze.warnings.iter().any(|w| matches!(
        w,
        ValidationWarning::DroppedRows { missing_id: 1, .. }
    )));
    let silver = pipeline.silver()?;
    assert_eq!(silver.claims, 2);
    Ok(())
}
