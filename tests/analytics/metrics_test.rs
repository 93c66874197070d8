use std::collections::{BTreeMap, BTreeSet};

use claims_lakehouse::models::{Beneficiary, Claim, Money, PaymentTriad, PrescriptionEvent};
use claims_lakehouse::{ClaimKind, MetricsAggregator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn beneficiary(bene_id: &str, year: i32) -> Beneficiary {
    let inpatient = PaymentTriad {
        medicare: Money::from_units(100),
        beneficiary: Money::from_units(10),
        third_party: Money::ZERO,
    };
    Beneficiary {
        bene_id: bene_id.to_string(),
        year,
        birth_date: None,
        death_date: None,
        gender: None,
        race: None,
        state: None,
        esrd: None,
        chronic_condition_count: 0,
        inpatient,
        outpatient: PaymentTriad::default(),
        carrier: PaymentTriad::default(),
        total_allowed: inpatient.total(),
        total_paid: inpatient.medicare + inpatient.beneficiary,
    }
}

fn claim(bene_id: &str, year: i32, claim_id: String, kind: ClaimKind, provider: String) -> Claim {
    Claim {
        bene_id: bene_id.to_string(),
        claim_id,
        claim_type: kind,
        claim_from_date: None,
        claim_thru_date: None,
        provider_id: provider,
        medicare_payment: Money::from_units(1),
        third_party_payment: Money::ZERO,
        patient_payment: Money::ZERO,
        total_payment: Money::from_units(1),
        year,
        bene_id_prefix: bene_id.chars().take(2).collect(),
    }
}

fn fill(bene_id: &str, year: i32, prescription_id: String, provider: String) -> PrescriptionEvent {
    PrescriptionEvent {
        bene_id: bene_id.to_string(),
        prescription_id,
        service_date: None,
        product_id: "NDC".to_string(),
        provider_id: provider,
        quantity_dispensed: 1.0,
        days_supply: 30,
        patient_payment: Money::ZERO,
        total_cost: Money::from_units(5),
        medicare_payment: Money::from_units(5),
        year,
        bene_id_prefix: bene_id.chars().take(2).collect(),
    }
}

/// Claim counts equal distinct claim ids per kind, and provider breadth the distinct
/// providers over claims and fills, for randomly generated inputs with duplicated ids
#[test]
fn test_counts_match_distinct_identifiers() -> claims_lakehouse::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let patients = ["P1", "P2", "P3"];
    let years = [2008, 2009];
    let beneficiaries: Vec<Beneficiary> = patients
        .iter()
        .flat_map(|p| years.iter().map(move |y| beneficiary(p, *y)))
        .collect();

    let mut claims = Vec::new();
    let mut fills = Vec::new();
    for _ in 0..400 {
        let bene = patients[rng.random_range(0..patients.len())];
        let year = years[rng.random_range(0..years.len())];
        let kind = ClaimKind::ALL[rng.random_range(0..3)];
        let provider = if rng.random_bool(0.1) {
            "Unknown".to_string()
        } else {
            format!("PR{}", rng.random_range(0..6))
        };
        // Small id space so the same claim appears on several rows
        claims.push(claim(bene, year, format!("C{}", rng.random_range(0..40)), kind, provider));
        fills.push(fill(
            bene,
            year,
            format!("R{}", rng.random_range(0..30)),
            format!("PR{}", rng.random_range(3..9)),
        ));
    }

    let aggregated = MetricsAggregator::new("Unknown").aggregate(
        &beneficiaries,
        Some(claims.as_slice()),
        Some(fills.as_slice()),
    )?;
    assert_eq!(aggregated.metrics.len(), beneficiaries.len());
    assert!(aggregated.warnings.is_empty());

    let mut expected_claims: BTreeMap<(&str, i32, ClaimKind), BTreeSet<&str>> = BTreeMap::new();
    let mut expected_providers: BTreeMap<(&str, i32), BTreeSet<&str>> = BTreeMap::new();
    for c in &claims {
        expected_claims
            .entry((c.bene_id.as_str(), c.year, c.claim_type))
            .or_default()
            .insert(&c.claim_id);
        if c.provider_id != "Unknown" {
            expected_providers
                .entry((c.bene_id.as_str(), c.year))
                .or_default()
                .insert(&c.provider_id);
        }
    }
    let mut expected_fills: BTreeMap<(&str, i32), BTreeSet<&str>> = BTreeMap::new();
    for f in &fills {
        expected_fills
            .entry((f.bene_id.as_str(), f.year))
            .or_default()
            .insert(&f.prescription_id);
        expected_providers
            .entry((f.bene_id.as_str(), f.year))
            .or_default()
            .insert(&f.provider_id);
    }

    let count = |set: Option<&BTreeSet<&str>>| set.map_or(0, |s| s.len() as i64);
    for m in &aggregated.metrics {
        let key = (m.bene_id.as_str(), m.year);
        assert_eq!(
            m.inpatient_stays,
            count(expected_claims.get(&(key.0, key.1, ClaimKind::Inpatient)))
        );
        assert_eq!(
            m.outpatient_visits,
            count(expected_claims.get(&(key.0, key.1, ClaimKind::Outpatient)))
        );
        assert_eq!(
            m.carrier_claims,
            count(expected_claims.get(&(key.0, key.1, ClaimKind::Carrier)))
        );
        assert_eq!(m.rx_fills, count(expected_fills.get(&key)));
        assert_eq!(m.unique_providers, count(expected_providers.get(&key)));
        assert_eq!(m.total_paid, Money::from_units(110));
    }
    Ok(())
}

#[test]
fn test_beneficiaries_without_activity_get_zero_counts() -> claims_lakehouse::Result<()> {
    let beneficiaries = vec![beneficiary("B1", 2008), beneficiary("B2", 2008)];
    let claims = vec![claim(
        "B1",
        2008,
        "C1".to_string(),
        ClaimKind::Carrier,
        "PR1".to_string(),
    )];

    let aggregated = MetricsAggregator::new("Unknown").aggregate(
        &beneficiaries,
        Some(claims.as_slice()),
        None,
    )?;
    let b2 = aggregated
        .metrics
        .iter()
        .find(|m| m.bene_id == "B2")
        .expect("B2 keeps its row");
    assert_eq!(b2.total_claims(), 0);
    assert_eq!(b2.unique_providers, 0);
    assert_eq!(aggregated.warnings.len(), 1);
    Ok(())
}
