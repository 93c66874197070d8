//! Layered Parquet datasets built from healthcare claim extracts.
//!
//! Raw beneficiary, claim and prescription extracts are normalized into a schema-stable
//! bronze layer, reconciled into a dimensional silver layer and aggregated into gold views
//! (per patient-year metrics, top diagnoses by spend and a denormalized patient view) that
//! the async [`lookup::LookupService`] serves.

pub mod analytics;
pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod transform;
pub mod utils;
pub mod validation;

// Core types
pub use config::{LayerPaths, PipelineConfig, TotalPaidPolicy};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use store::PartitionedStore;

// Stage components
pub use analytics::{MetricsAggregator, TopKDiagnosisRanker, build_patient_view};
pub use normalize::SchemaNormalizer;
pub use schema::{ClaimKind, ReconciliationConfig, SourceKind};
pub use transform::{ClaimUnifier, DiagnosisDictionary, PrescriptionNormalizer, ProviderExtractor};

// Serving and reporting
pub use lookup::{HealthReport, HealthStatus, LookupService};
pub use validation::{ValidationReport, ValidationWarning};

// Arrow types
pub use arrow::record_batch::RecordBatch;
