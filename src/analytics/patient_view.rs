//! Combined patient view: metrics joined with the top diagnoses.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::models::{DiagnosisSpend, MemberYearMetrics, PatientViewRow, TopDiagnosis};

/// Join metrics with top diagnoses, one row per (patient, year, diagnosis)
///
/// A patient-year without diagnoses still gets one row, with no diagnosis.
///
/// # Errors
///
/// Returns [`Error::MissingRequiredSource`] when either input is empty.
pub fn build_patient_view(
    metrics: &[MemberYearMetrics],
    top_diagnoses: &[TopDiagnosis],
) -> Result<Vec<PatientViewRow>> {
    if metrics.is_empty() {
        return Err(Error::MissingRequiredSource {
            table: "member_year_metrics".to_string(),
        });
    }
    if top_diagnoses.is_empty() {
        return Err(Error::MissingRequiredSource {
            table: "top_diagnoses_by_member".to_string(),
        });
    }

    let mut by_member: FxHashMap<(&str, i32), Vec<&TopDiagnosis>> = FxHashMap::default();
    for diagnosis in top_diagnoses {
        by_member
            .entry((diagnosis.bene_id.as_str(), diagnosis.year))
            .or_default()
            .push(diagnosis);
    }

    let mut rows = Vec::with_capacity(top_diagnoses.len().max(metrics.len()));
    for m in metrics {
        let row = |diagnosis: Option<DiagnosisSpend>| PatientViewRow {
            bene_id: m.bene_id.clone(),
            year: m.year,
            total_allowed: m.total_allowed,
            total_paid: m.total_paid,
            inpatient_stays: m.inpatient_stays,
            outpatient_visits: m.outpatient_visits,
            rx_fills: m.rx_fills,
            unique_providers: m.unique_providers,
            diagnosis,
        };
        match by_member.get(&(m.bene_id.as_str(), m.year)) {
            Some(diagnoses) => rows.extend(diagnoses.iter().map(|d| {
                row(Some(DiagnosisSpend {
                    code: d.diagnosis_code.clone(),
                    description: d.diagnosis_description.clone(),
                    spend: d.diagnosis_payment,
                    rank: d.diagnosis_rank,
                }))
            })),
            None => rows.push(row(None)),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, PatientView};

    fn metrics(bene_id: &str) -> MemberYearMetrics {
        MemberYearMetrics {
            bene_id: bene_id.to_string(),
            year: 2008,
            total_allowed: Money::from_units(10),
            total_paid: Money::from_units(8),
            inpatient_stays: 1,
            outpatient_visits: 0,
            carrier_claims: 0,
            rx_fills: 0,
            unique_providers: 1,
            gender: None,
            race: None,
            state: None,
        }
    }

    fn top(bene_id: &str, code: &str, rank: u32) -> TopDiagnosis {
        TopDiagnosis {
            bene_id: bene_id.to_string(),
            year: 2008,
            diagnosis_code: code.to_string(),
            diagnosis_description: "Heart failure".to_string(),
            diagnosis_payment: Money::from_units(5),
            diagnosis_rank: rank,
        }
    }

    #[test]
    fn one_row_per_diagnosis_and_placeholder_row_without() {
        let rows = build_patient_view(
            &[metrics("B1"), metrics("B2")],
            &[top("B1", "4280", 1), top("B1", "25000", 2)],
        )
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[2].diagnosis.is_none());

        let view = PatientView::from_rows(&rows[..2], 5).unwrap();
        assert_eq!(view.top_diagnoses.len(), 2);
        assert_eq!(view.top_diagnoses[0].code, "4280");
    }

    #[test]
    fn requires_both_inputs() {
        assert!(build_patient_view(&[], &[top("B1", "1", 1)]).is_err());
        assert!(build_patient_view(&[metrics("B1")], &[]).is_err());
    }
}
