use claims_lakehouse::models::Money;
use claims_lakehouse::{Error, HealthStatus, LookupService};

use crate::utils::{Fixture, quiet_config, write_b1_scenario};

fn built_fixture() -> Fixture {
    let fixture = Fixture::new();
    write_b1_scenario(&fixture);
    fixture
        .pipeline(quiet_config())
        .run()
        .expect("Pipeline run failed");
    fixture
}

#[tokio::test]
async fn test_lookup_returns_the_patient_view() -> claims_lakehouse::Result<()> {
    let fixture = built_fixture();
    let service = LookupService::from_config(fixture.layer_dir("gold"), &quiet_config());

    let view = service.patient("B1", 2008).await?.expect("B1 has a view");
    assert_eq!(view.total_paid, Money::from_units(150));
    assert_eq!(view.inpatient_stays, 1);
    assert_eq!(view.outpatient_visits, 1);
    assert_eq!(view.rx_fills, 2);
    assert_eq!(view.unique_providers, 1);
    let codes: Vec<&str> = view.top_diagnoses.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["4019", "25000"]);
    assert_eq!(view.top_diagnoses[0].description, "Essential hypertension");

    let json = serde_json::to_value(&view).expect("view serializes");
    assert_eq!(json["bene_id"], "B1");
    Ok(())
}

#[tokio::test]
async fn test_lookup_not_found_and_out_of_range() -> claims_lakehouse::Result<()> {
    let fixture = built_fixture();
    let service = LookupService::from_config(fixture.layer_dir("gold"), &quiet_config());

    assert!(service.patient("B404", 2008).await?.is_none());
    assert!(service.patient("B1", 2010).await?.is_none());
    assert!(matches!(
        service.patient("B1", 2007).await,
        Err(Error::YearOutOfRange { year: 2007, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_health_depends_on_the_supported_years() -> claims_lakehouse::Result<()> {
    let fixture = built_fixture();

    let only_2008 = LookupService::new(fixture.layer_dir("gold"), 2008..=2008, 5);
    let report = only_2008.health().await?;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.tables.values().all(|exists| *exists));

    let all_years = LookupService::from_config(fixture.layer_dir("gold"), &quiet_config());
    let report = all_years.health().await?;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.tables.get("2009_metrics"), Some(&false));
    assert_eq!(report.tables.len(), 9);
    Ok(())
}
