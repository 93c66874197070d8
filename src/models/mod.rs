//! Typed rows of every stored table.

pub mod beneficiary;
pub mod claim;
pub mod diagnosis;
pub mod metrics;
pub mod money;
pub mod patient_view;
pub mod prescription;
pub mod provider;
pub mod traits;

pub use beneficiary::{Beneficiary, PaymentTriad};
pub use claim::Claim;
pub use diagnosis::{DiagnosisLine, TopDiagnosis};
pub use metrics::MemberYearMetrics;
pub use money::Money;
pub use patient_view::{DiagnosisSpend, PatientView, PatientViewRow};
pub use prescription::PrescriptionEvent;
pub use provider::Provider;
pub use traits::{ArrowSchema, StoredTable};
