//! Silver-layer transformations: bronze batches into the dimensional model.

pub mod beneficiary;
pub mod claims;
pub mod diagnosis;
pub mod prescriptions;
pub mod providers;

pub use beneficiary::BeneficiaryBuilder;
pub use claims::{ClaimSource, ClaimUnifier, UnifiedClaims};
pub use diagnosis::{DiagnosisDictionary, OTHER_DIAGNOSIS};
pub use prescriptions::{NormalizedPrescriptions, PrescriptionNormalizer};
pub use providers::ProviderExtractor;
