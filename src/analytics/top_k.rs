//! Top-K diagnoses by spend with dense ranking.

use std::collections::BTreeMap;

use itertools::Itertools;
use rayon::prelude::*;

use crate::models::{DiagnosisLine, Money, TopDiagnosis};

/// Ranks the diagnoses of each patient-year by summed payment
#[derive(Debug, Clone, Copy)]
pub struct TopKDiagnosisRanker {
    top_k: u32,
}

impl TopKDiagnosisRanker {
    #[must_use]
    pub const fn new(top_k: u32) -> Self {
        Self { top_k }
    }

    #[must_use]
    pub const fn top_k(&self) -> u32 {
        self.top_k
    }

    /// Rank every patient-year
    ///
    /// Payments are summed per (patient, year, code). Within a patient-year the highest sum
    /// gets rank 1 and each next distinct sum the next rank, so tied codes share a rank and
    /// a group can hold more than K rows. Rows with a rank above K are dropped. The output is
    /// ordered by patient, year, rank, payment descending, then code.
    #[must_use]
    pub fn rank(&self, lines: &[DiagnosisLine]) -> Vec<TopDiagnosis> {
        let mut spend: BTreeMap<(&str, i32), BTreeMap<&str, (Money, &str)>> = BTreeMap::new();
        for line in lines {
            let entry = spend
                .entry((line.bene_id.as_str(), line.year))
                .or_default()
                .entry(line.diagnosis_code.as_str())
                .or_insert((Money::ZERO, line.diagnosis_description.as_str()));
            entry.0 += line.payment;
        }

        let groups: Vec<_> = spend.into_iter().collect();
        let ranked: Vec<Vec<TopDiagnosis>> = groups
            .into_par_iter()
            .map(|((bene_id, year), codes)| self.rank_group(bene_id, year, codes))
            .collect();
        ranked.into_iter().flatten().collect()
    }

    fn rank_group(
        &self,
        bene_id: &str,
        year: i32,
        codes: BTreeMap<&str, (Money, &str)>,
    ) -> Vec<TopDiagnosis> {
        let ordered = codes
            .into_iter()
            .sorted_by(|(code_a, (pay_a, _)), (code_b, (pay_b, _))| {
                pay_b.cmp(pay_a).then(code_a.cmp(code_b))
            });

        let mut out = Vec::new();
        let mut rank = 0u32;
        let mut previous: Option<Money> = None;
        for (code, (payment, description)) in ordered {
            if previous != Some(payment) {
                rank += 1;
                previous = Some(payment);
            }
            if rank > self.top_k {
                break;
            }
            out.push(TopDiagnosis {
                bene_id: bene_id.to_string(),
                year,
                diagnosis_code: code.to_string(),
                diagnosis_description: description.to_string(),
                diagnosis_payment: payment,
                diagnosis_rank: rank,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ClaimKind;

    fn line(code: &str, units: i64) -> DiagnosisLine {
        DiagnosisLine {
            bene_id: "P1".to_string(),
            claim_id: format!("C-{code}-{units}"),
            diagnosis_code: code.to_string(),
            diagnosis_position: 1,
            claim_type: ClaimKind::Inpatient,
            payment: Money::from_units(units),
            diagnosis_description: "Other diagnosis".to_string(),
            year: 2009,
            bene_id_prefix: "P1".to_string(),
        }
    }

    fn tied_lines() -> Vec<DiagnosisLine> {
        vec![
            line("F", 100),
            line("A", 300),
            line("A", 200),
            line("B", 500),
            line("C", 300),
            line("D", 200),
            line("E", 200),
        ]
    }

    fn summary(top: &[TopDiagnosis]) -> Vec<(&str, u32)> {
        top.iter()
            .map(|t| (t.diagnosis_code.as_str(), t.diagnosis_rank))
            .collect()
    }

    #[test]
    fn ties_share_a_rank_and_can_exceed_k() {
        let top = TopKDiagnosisRanker::new(5).rank(&tied_lines());
        assert_eq!(
            summary(&top),
            vec![("A", 1), ("B", 1), ("C", 2), ("D", 3), ("E", 3), ("F", 4)]
        );
        assert_eq!(top[0].diagnosis_payment, Money::from_units(500));
    }

    #[test]
    fn cutoff_drops_ranks_above_k() {
        let top = TopKDiagnosisRanker::new(3).rank(&tied_lines());
        assert_eq!(summary(&top), vec![("A", 1), ("B", 1), ("C", 2), ("D", 3), ("E", 3)]);

        let top = TopKDiagnosisRanker::new(2).rank(&tied_lines());
        assert_eq!(summary(&top), vec![("A", 1), ("B", 1), ("C", 2)]);
    }

    #[test]
    fn groups_are_ranked_independently() {
        let mut lines = tied_lines();
        let mut other = line("Z", 1);
        other.year = 2010;
        lines.push(other);
        let top = TopKDiagnosisRanker::new(1).rank(&lines);
        assert_eq!(summary(&top), vec![("A", 1), ("B", 1), ("Z", 1)]);
    }
}
