//! Source schemas: source kinds, declarative descriptors, code tables and type adaptation.

pub mod adapt;
pub mod code_tables;
pub mod descriptor;
pub mod source_kind;

pub use code_tables::{CodeTable, CodeTableId, CodeTables};
pub use descriptor::{
    ColumnSpec, ColumnType, DiagnosisSlots, FieldSource, LogicalField, Placeholder,
    ReconciliationConfig, SchemaDescriptor, YearSource, PREFIX_COLUMN, YEAR_COLUMN,
};
pub use source_kind::{ClaimKind, SourceKind};
