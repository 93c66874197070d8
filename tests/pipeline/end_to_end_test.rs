use claims_lakehouse::models::{
    Beneficiary, Claim, DiagnosisLine, MemberYearMetrics, Money, PrescriptionEvent, Provider,
    TopDiagnosis,
};
use claims_lakehouse::{ClaimKind, PartitionedStore, ValidationReport, ValidationWarning};

use crate::utils::{Fixture, parquet_files, quiet_config, write_b1_scenario};

#[test]
fn test_b1_scenario_end_to_end() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    let pipeline = fixture.pipeline(quiet_config());

    let (summary, report) = pipeline.run()?;
    assert_eq!(summary.beneficiaries, 1);
    assert_eq!(summary.claims, 2);
    assert_eq!(summary.prescriptions, 2);
    assert_eq!(summary.member_years, 1);

    let gold = PartitionedStore::new(fixture.layer_dir("gold"));
    let metrics = gold.read_table::<MemberYearMetrics>()?.expect("metrics written");
    assert_eq!(metrics.len(), 1);
    let b1 = &metrics[0];
    assert_eq!((b1.bene_id.as_str(), b1.year), ("B1", 2008));
    assert_eq!(b1.inpatient_stays, 1);
    assert_eq!(b1.outpatient_visits, 1);
    assert_eq!(b1.carrier_claims, 0);
    assert_eq!(b1.rx_fills, 2);
    assert_eq!(b1.unique_providers, 1);
    // Totals come from the beneficiary summary, not from the claims
    assert_eq!(b1.total_allowed, Money::from_units(160));
    assert_eq!(b1.total_paid, Money::from_units(150));
    assert_eq!(b1.gender.as_deref(), Some("Male"));
    assert_eq!(b1.state.as_deref(), Some("CA"));

    // Carrier extracts are absent from the fixture
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        ValidationWarning::OptionalSourceAbsent { table } if table == "carrier"
    )));
    let saved = ValidationReport::load(&pipeline.report_path())?;
    assert_eq!(saved.warnings.len(), report.warnings.len());

    Ok(())
}

#[test]
fn test_silver_tables_reconcile_claim_kinds() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    let pipeline = fixture.pipeline(quiet_config());
    pipeline.bronze()?;
    pipeline.silver()?;

    let silver = PartitionedStore::new(fixture.layer_dir("silver"));

    let beneficiaries = silver.read_table::<Beneficiary>()?.expect("beneficiaries");
    assert_eq!(beneficiaries[0].chronic_condition_count, 1);

    let mut claims = silver.read_table::<Claim>()?.expect("claims");
    claims.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
    assert_eq!(claims[0].claim_type, ClaimKind::Inpatient);
    assert_eq!(claims[0].medicare_payment, Money::from_units(100));
    assert_eq!(claims[0].third_party_payment, Money::from_units(10));
    assert_eq!(claims[0].provider_id, "Unknown");
    assert_eq!(claims[1].claim_type, ClaimKind::Outpatient);
    assert_eq!(claims[1].provider_id, "P100");
    assert!(claims.iter().all(|c| c.bene_id_prefix == "B1"));

    let diagnoses = silver.read_table::<DiagnosisLine>()?.expect("diagnoses");
    assert_eq!(diagnoses.len(), 3);
    let hypertension: Vec<&DiagnosisLine> =
        diagnoses.iter().filter(|d| d.diagnosis_code == "4019").collect();
    assert_eq!(hypertension.len(), 2);
    assert!(
        hypertension
            .iter()
            .all(|d| d.diagnosis_description == "Essential hypertension")
    );

    let mut fills = silver.read_table::<PrescriptionEvent>()?.expect("prescriptions");
    fills.sort_by(|a, b| a.prescription_id.cmp(&b.prescription_id));
    assert_eq!(fills[0].medicare_payment, Money::from_units(20));
    assert_eq!(fills[1].medicare_payment, Money::from_units(30));
    assert_eq!(fills[0].days_supply, 30);

    let providers = silver.read_table::<Provider>()?.expect("providers");
    let ids: Vec<&str> = providers.iter().map(|p| p.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["P100"]);

    // Partition layout: year, then patient-id prefix
    let claim_files = parquet_files(&silver.table_root("fact_claims"));
    assert_eq!(claim_files.len(), 1);
    assert!(claim_files[0].ends_with("year=2008/bene_id_prefix=B1/fact_claims.parquet"));

    Ok(())
}

#[test]
fn test_top_diagnoses_are_ranked_by_claim_payment() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    fixture.pipeline(quiet_config()).run()?;

    let gold = PartitionedStore::new(fixture.layer_dir("gold"));
    let mut top = gold.read_table::<TopDiagnosis>()?.expect("top diagnoses");
    top.sort_by_key(|d| d.diagnosis_rank);
    let ranked: Vec<(&str, u32, Money)> = top
        .iter()
        .map(|d| (d.diagnosis_code.as_str(), d.diagnosis_rank, d.diagnosis_payment))
        .collect();
    assert_eq!(
        ranked,
        vec![
            ("4019", 1, Money::from_units(150)),
            ("25000", 2, Money::from_units(100)),
        ]
    );
    Ok(())
}
