//! Gold-layer analytics computed from the dimensional model.

pub mod metrics;
pub mod patient_view;
pub mod top_k;

pub use metrics::{AggregatedMetrics, MetricsAggregator};
pub use patient_view::build_patient_view;
pub use top_k::TopKDiagnosisRanker;
