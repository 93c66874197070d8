use std::collections::BTreeMap;

use claims_lakehouse::models::{DiagnosisLine, Money, TopDiagnosis};
use claims_lakehouse::{ClaimKind, TopKDiagnosisRanker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn line(bene_id: &str, year: i32, claim: usize, code: &str, units: i64) -> DiagnosisLine {
    DiagnosisLine {
        bene_id: bene_id.to_string(),
        claim_id: format!("C{claim}"),
        diagnosis_code: code.to_string(),
        diagnosis_position: 1,
        claim_type: ClaimKind::Outpatient,
        payment: Money::from_units(units),
        diagnosis_description: "Other diagnosis".to_string(),
        year,
        bene_id_prefix: bene_id.chars().take(2).collect(),
    }
}

fn codes_and_ranks(rows: &[TopDiagnosis]) -> Vec<(&str, u32)> {
    rows.iter()
        .map(|row| (row.diagnosis_code.as_str(), row.diagnosis_rank))
        .collect()
}

#[test]
fn test_payments_are_summed_across_claims_before_ranking() {
    // A: 300 + 200 over two claims, B: 500 on one claim, C: 400
    let lines = vec![
        line("P1", 2009, 1, "A", 300),
        line("P1", 2009, 2, "A", 200),
        line("P1", 2009, 3, "B", 500),
        line("P1", 2009, 4, "C", 400),
    ];
    let ranked = TopKDiagnosisRanker::new(5).rank(&lines);
    assert_eq!(codes_and_ranks(&ranked), vec![("A", 1), ("B", 1), ("C", 2)]);
    assert_eq!(ranked[0].diagnosis_payment, Money::from_units(500));
}

#[test]
fn test_ties_at_the_cutoff_are_all_kept() {
    let payments = [("A", 500), ("B", 500), ("C", 300), ("D", 200), ("E", 200), ("F", 100)];
    let lines: Vec<DiagnosisLine> = payments
        .iter()
        .enumerate()
        .map(|(i, (code, units))| line("P1", 2009, i, code, *units))
        .collect();

    let ranked = TopKDiagnosisRanker::new(3).rank(&lines);
    assert_eq!(
        codes_and_ranks(&ranked),
        vec![("A", 1), ("B", 1), ("C", 2), ("D", 3), ("E", 3)]
    );
}

/// Ranks within every patient-year form `1..=R` with `R <= K`, rows only exceed K on ties,
/// and payments never increase as the rank grows
#[test]
fn test_dense_rank_invariants_hold_for_random_input() {
    let mut rng = StdRng::seed_from_u64(42);
    let codes = ["250", "401", "272", "414", "427", "428", "496", "311"];
    let mut lines = Vec::new();
    for claim in 0..500 {
        let bene = ["P1", "P2", "P3", "P4"][rng.random_range(0..4)];
        let year = rng.random_range(2008..=2010);
        let code = codes[rng.random_range(0..codes.len())];
        // Coarse amounts so that ties are common
        lines.push(line(bene, year, claim, code, rng.random_range(1..4) * 100));
    }

    for k in 1..=5u32 {
        let ranked = TopKDiagnosisRanker::new(k).rank(&lines);
        let mut groups: BTreeMap<(&str, i32), Vec<&TopDiagnosis>> = BTreeMap::new();
        for row in &ranked {
            groups.entry((row.bene_id.as_str(), row.year)).or_default().push(row);
        }
        assert!(!groups.is_empty());

        for rows in groups.values() {
            let max_rank = rows.iter().map(|r| r.diagnosis_rank).max().unwrap_or(0);
            assert!(max_rank <= k);
            for expected in 1..=max_rank {
                assert!(rows.iter().any(|r| r.diagnosis_rank == expected));
            }
            for pair in rows.windows(2) {
                assert!(pair[0].diagnosis_rank <= pair[1].diagnosis_rank);
                if pair[0].diagnosis_rank == pair[1].diagnosis_rank {
                    assert_eq!(pair[0].diagnosis_payment, pair[1].diagnosis_payment);
                } else {
                    assert!(pair[0].diagnosis_payment > pair[1].diagnosis_payment);
                }
            }
            if rows.len() > k as usize {
                let distinct: std::collections::BTreeSet<Money> =
                    rows.iter().map(|r| r.diagnosis_payment).collect();
                assert!(distinct.len() < rows.len());
            }
        }
    }
}
