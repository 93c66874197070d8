use claims_lakehouse::models::{Claim, Money};
use claims_lakehouse::{ClaimKind, PartitionedStore};

use crate::utils::{
    BENEFICIARY_2008, Fixture, INPATIENT, quiet_config, write_beneficiaries, write_institutional,
};

fn silver_claims(fixture: &Fixture) -> claims_lakehouse::Result<Vec<Claim>> {
    let silver = PartitionedStore::new(fixture.layer_dir("silver"));
    let mut claims = silver.read_table::<Claim>()?.expect("claims");
    claims.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
    Ok(claims)
}

fn write_single_beneficiary(fixture: &Fixture) {
    write_beneficiaries(
        fixture,
        BENEFICIARY_2008,
        &[&[
            "B1", "19400101", "1", "1", "05", "2", "2", "0", "0", "0", "0", "0", "0", "0", "0", "0",
        ]],
    );
}

#[test]
fn test_carrier_files_with_different_payment_layouts() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_single_beneficiary(&fixture);
    fixture.write_csv(
        "DE1_0_2008_to_2010_Carrier_Claims_Sample_1A.csv",
        &["DESYNPUF_ID", "CLM_ID", "CLM_FROM_DT", "CLM_PMT_AMT"],
        &[&["B1", "K1", "20080101", "100"]],
    );
    fixture.write_csv(
        "DE1_0_2008_to_2010_Carrier_Claims_Sample_1B.csv",
        &["DESYNPUF_ID", "CLM_ID", "CLM_FROM_DT", "LINE_NCH_PMT_AMT_1", "LINE_NCH_PMT_AMT_2"],
        &[&["B1", "K2", "20080201", "30", "10"]],
    );

    fixture.pipeline(quiet_config()).run()?;

    let claims = silver_claims(&fixture)?;
    assert_eq!(claims.len(), 2);
    assert!(claims.iter().all(|c| c.claim_type == ClaimKind::Carrier));
    assert_eq!(claims[0].claim_id, "K1");
    assert_eq!(claims[0].medicare_payment, Money::from_units(100));
    assert_eq!(claims[1].claim_id, "K2");
    assert_eq!(claims[1].medicare_payment, Money::from_units(40));
    Ok(())
}

#[test]
fn test_year_is_decided_once_per_file() -> claims_lakehouse::Result<()> {
    let fixture = Fixture::new();
    write_single_beneficiary(&fixture);
    write_institutional(
        &fixture,
        INPATIENT,
        &[
            &["B1", "C1", "20080110", "20080115", "P1", "10", "0", "4019", ""],
            &["B1", "C2", "20080210", "20080215", "P1", "10", "0", "4019", ""],
            &["B1", "C3", "20090110", "20090115", "P1", "10", "0", "4019", ""],
            &["B1", "C4", "20090210", "20090215", "P1", "10", "0", "4019", ""],
        ],
    );

    let mut config = quiet_config();
    config.csv_batch_size = 2;
    fixture.pipeline(config).run()?;

    let claims = silver_claims(&fixture)?;
    assert_eq!(claims.len(), 4);
    assert!(claims.iter().all(|c| c.year == 2008));
    Ok(())
}
