//! Per-source-kind schema descriptors.
//!
//! A descriptor declares everything the pipeline needs to know about one source kind as
//! data: the typed columns it expects, which of them are structurally required, where the
//! year comes from, the candidate columns for each logical field, and the ordinal diagnosis
//! slots. Descriptors can be replaced from JSON without touching the aggregation code.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::money::CURRENCY_TYPE;
use crate::schema::code_tables::CodeTableId;
use crate::schema::source_kind::SourceKind;

/// Name of the partition year column added to normalized batches
pub const YEAR_COLUMN: &str = "year";
/// Name of the partition prefix column added to normalized batches
pub const PREFIX_COLUMN: &str = "bene_id_prefix";

/// Number of line items carried by a carrier claim
pub const CARRIER_LINE_ITEMS: usize = 13;

/// Semantic type of a normalized column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Decimal,
    Date,
    /// Coded value resolved through a code table; unmapped codes become null
    Categorical { table: CodeTableId },
    /// Two-valued indicator; any other value becomes null
    Flag { true_code: String, false_code: String },
}

impl ColumnType {
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Integer => DataType::Int32,
            Self::Float => DataType::Float64,
            Self::Decimal => CURRENCY_TYPE,
            Self::Date => DataType::Date32,
            Self::Categorical { .. } => {
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            }
            Self::Flag { .. } => DataType::Boolean,
        }
    }

    fn flag(true_code: &str, false_code: &str) -> Self {
        Self::Flag {
            true_code: true_code.to_string(),
            false_code: false_code.to_string(),
        }
    }
}

/// An expected column and its semantic type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Logical fields resolved through the reconciliation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    ClaimId,
    FromDate,
    ThruDate,
    ProviderId,
    ProgramPayment,
    ThirdPartyPayment,
    PrescriptionId,
    ServiceDate,
    ProductId,
    Quantity,
    DaysSupply,
    PatientPayment,
    TotalCost,
    BirthDate,
    DeathDate,
    Gender,
    Race,
    State,
    EsrdIndicator,
    InpatientProgramPayment,
    InpatientPatientPayment,
    InpatientThirdPartyPayment,
    OutpatientProgramPayment,
    OutpatientPatientPayment,
    OutpatientThirdPartyPayment,
    CarrierProgramPayment,
    CarrierPatientPayment,
    CarrierThirdPartyPayment,
}

impl LogicalField {
    pub const CLAIM_FIELDS: [Self; 6] = [
        Self::ClaimId,
        Self::FromDate,
        Self::ThruDate,
        Self::ProviderId,
        Self::ProgramPayment,
        Self::ThirdPartyPayment,
    ];

    pub const PRESCRIPTION_FIELDS: [Self; 8] = [
        Self::PrescriptionId,
        Self::ServiceDate,
        Self::ProviderId,
        Self::ProductId,
        Self::Quantity,
        Self::DaysSupply,
        Self::PatientPayment,
        Self::TotalCost,
    ];

    /// Beneficiary payment fields as (program, patient, third party) per care setting, in
    /// inpatient, outpatient, carrier order
    pub const BENEFICIARY_PAYMENTS: [[Self; 3]; 3] = [
        [
            Self::InpatientProgramPayment,
            Self::InpatientPatientPayment,
            Self::InpatientThirdPartyPayment,
        ],
        [
            Self::OutpatientProgramPayment,
            Self::OutpatientPatientPayment,
            Self::OutpatientThirdPartyPayment,
        ],
        [
            Self::CarrierProgramPayment,
            Self::CarrierPatientPayment,
            Self::CarrierThirdPartyPayment,
        ],
    ];

    pub const BENEFICIARY_FIELDS: [Self; 6] = [
        Self::BirthDate,
        Self::DeathDate,
        Self::Gender,
        Self::Race,
        Self::State,
        Self::EsrdIndicator,
    ];
}

/// Value emitted when no candidate column is available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Placeholder {
    /// Zero amount
    Zero,
    /// The configured unknown-identifier token
    Unknown,
    /// A fixed numeric default
    Number(f64),
    /// Null
    Null,
}

/// Where a logical field's value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSource {
    /// Aggregate columns in priority order
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Line-level columns summed when no aggregate column is available
    #[serde(default)]
    pub line_components: Vec<String>,
    pub placeholder: Placeholder,
}

impl FieldSource {
    fn of(candidates: &[&str], placeholder: Placeholder) -> Self {
        Self {
            candidates: candidates.iter().map(ToString::to_string).collect(),
            line_components: Vec::new(),
            placeholder,
        }
    }

    fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.line_components = lines;
        self
    }

    fn columns(&self) -> impl Iterator<Item = &String> {
        self.candidates.iter().chain(&self.line_components)
    }
}

/// Ordinal diagnosis-code columns of a claim kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisSlots {
    /// Column-name prefixes in priority order; slot `i` is `<prefix><i>`
    pub prefixes: Vec<String>,
    /// Number of slots, numbered from 1
    pub count: usize,
}

impl DiagnosisSlots {
    /// Candidate column names for a 1-based slot
    #[must_use]
    pub fn slot_candidates(&self, slot: usize) -> Vec<String> {
        self.prefixes
            .iter()
            .map(|prefix| format!("{prefix}{slot}"))
            .collect()
    }

    fn columns(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.count).flat_map(|slot| self.slot_candidates(slot))
    }
}

/// Where a batch's partition year comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "columns", rename_all = "snake_case")]
pub enum YearSource {
    /// A four-digit year embedded in the source file name
    FileName,
    /// The most frequent year prefix of the first available date column
    DateColumns(Vec<String>),
}

/// Declarative description of one source kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub kind: SourceKind,
    /// Patient identifier column
    pub id_column: String,
    /// Structural columns; each group needs at least one of its members present
    pub required: Vec<Vec<String>>,
    /// Every column a normalized batch of this kind carries
    pub columns: Vec<ColumnSpec>,
    pub year_source: YearSource,
    #[serde(default)]
    pub fields: BTreeMap<LogicalField, FieldSource>,
    #[serde(default)]
    pub diagnosis_slots: Option<DiagnosisSlots>,
    /// Columns holding provider references
    #[serde(default)]
    pub provider_columns: Vec<String>,
    /// Columns holding a provider's state, in priority order
    #[serde(default)]
    pub provider_state_columns: Vec<String>,
    /// Boolean chronic-condition indicators counted per beneficiary
    #[serde(default)]
    pub chronic_condition_columns: Vec<String>,
}

impl SchemaDescriptor {
    /// The built-in descriptor for a source kind
    #[must_use]
    pub fn builtin(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Beneficiary => beneficiary_descriptor(),
            SourceKind::Inpatient => institutional_descriptor(SourceKind::Inpatient),
            SourceKind::Outpatient => institutional_descriptor(SourceKind::Outpatient),
            SourceKind::Carrier => carrier_descriptor(),
            SourceKind::Pharmacy => pharmacy_descriptor(),
        }
    }

    #[must_use]
    pub fn field(&self, field: LogicalField) -> Option<&FieldSource> {
        self.fields.get(&field)
    }

    /// Look up a field the caller cannot do without
    pub fn required_field(&self, field: LogicalField) -> Result<&FieldSource> {
        self.field(field).ok_or_else(|| Error::InvalidDescriptor {
            kind: self.kind,
            reason: format!("no source declared for {field:?}"),
        })
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.name == name)
    }

    /// Arrow schema of a normalized batch, including the partition columns
    #[must_use]
    pub fn normalized_schema(&self) -> Schema {
        let mut fields: Vec<Field> = self
            .columns
            .iter()
            .map(|spec| Field::new(&spec.name, spec.column_type.data_type(), true))
            .collect();
        fields.push(Field::new(YEAR_COLUMN, DataType::Int32, false));
        fields.push(Field::new(PREFIX_COLUMN, DataType::Utf8, false));
        Schema::new(fields)
    }

    /// Check that every column the descriptor refers to is declared
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            kind: self.kind,
            reason,
        };

        let declared: BTreeSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        if declared.len() != self.columns.len() {
            return Err(invalid("duplicate column declarations".to_string()));
        }
        if declared.contains(YEAR_COLUMN) || declared.contains(PREFIX_COLUMN) {
            return Err(invalid("partition column names are reserved".to_string()));
        }
        if self.required.iter().any(Vec::is_empty) {
            return Err(invalid("empty required column group".to_string()));
        }

        let year_columns: Vec<String> = match &self.year_source {
            YearSource::FileName => Vec::new(),
            YearSource::DateColumns(columns) if columns.is_empty() => {
                return Err(invalid("no year date columns declared".to_string()));
            }
            YearSource::DateColumns(columns) => columns.clone(),
        };

        let referenced = std::iter::once(self.id_column.clone())
            .chain(self.required.iter().flatten().cloned())
            .chain(year_columns)
            .chain(self.fields.values().flat_map(FieldSource::columns).cloned())
            .chain(self.diagnosis_slots.iter().flat_map(DiagnosisSlots::columns))
            .chain(self.provider_columns.iter().cloned())
            .chain(self.provider_state_columns.iter().cloned())
            .chain(self.chronic_condition_columns.iter().cloned());

        for column in referenced {
            if !declared.contains(column.as_str()) {
                return Err(invalid(format!("column {column} is referenced but not declared")));
            }
        }

        let beneficiary_fields: Vec<LogicalField> = LogicalField::BENEFICIARY_FIELDS
            .into_iter()
            .chain(LogicalField::BENEFICIARY_PAYMENTS.into_iter().flatten())
            .collect();
        let expected_fields: &[LogicalField] = match self.kind {
            SourceKind::Beneficiary => &beneficiary_fields,
            SourceKind::Inpatient | SourceKind::Outpatient | SourceKind::Carrier => {
                &LogicalField::CLAIM_FIELDS
            }
            SourceKind::Pharmacy => &LogicalField::PRESCRIPTION_FIELDS,
        };
        for field in expected_fields {
            self.required_field(*field)?;
        }

        Ok(())
    }
}

/// Descriptors for every source kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub descriptors: BTreeMap<SourceKind, SchemaDescriptor>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            descriptors: SourceKind::ALL
                .into_iter()
                .map(|kind| (kind, SchemaDescriptor::builtin(kind)))
                .collect(),
        }
    }
}

impl ReconciliationConfig {
    /// Descriptor for a kind, falling back to the built-in one
    #[must_use]
    pub fn descriptor(&self, kind: SourceKind) -> std::borrow::Cow<'_, SchemaDescriptor> {
        self.descriptors.get(&kind).map_or_else(
            || std::borrow::Cow::Owned(SchemaDescriptor::builtin(kind)),
            std::borrow::Cow::Borrowed,
        )
    }

    /// Replace built-in descriptors with the ones listed in a JSON file
    pub fn with_overrides_from(mut self, path: &Path) -> Result<Self> {
        let file = crate::error::util::safe_open_file(path)?;
        let overrides: BTreeMap<SourceKind, SchemaDescriptor> =
            serde_json::from_reader(std::io::BufReader::new(file))?;
        for (kind, descriptor) in overrides {
            if descriptor.kind != kind {
                return Err(Error::InvalidDescriptor {
                    kind,
                    reason: format!("descriptor declares kind {}", descriptor.kind),
                });
            }
            log::info!("Using overridden descriptor for {kind}");
            self.descriptors.insert(kind, descriptor);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.descriptors.values().try_for_each(SchemaDescriptor::validate)
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn typed(names: &[&str], column_type: &ColumnType) -> Vec<ColumnSpec> {
    names
        .iter()
        .map(|name| ColumnSpec::new(*name, column_type.clone()))
        .collect()
}

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

fn numbered_specs(prefix: &str, count: usize, column_type: &ColumnType) -> Vec<ColumnSpec> {
    numbered(prefix, count)
        .into_iter()
        .map(|name| ColumnSpec::new(name, column_type.clone()))
        .collect()
}

/// Chronic-condition indicators on the beneficiary summary
const CHRONIC_CONDITION_COLUMNS: [&str; 11] = [
    "SP_ALZHDMTA",
    "SP_CHF",
    "SP_CHRNKIDN",
    "SP_CNCR",
    "SP_COPD",
    "SP_DEPRESSN",
    "SP_DIABETES",
    "SP_ISCHMCHT",
    "SP_OSTEOPRS",
    "SP_RA_OA",
    "SP_STRKETIA",
];

/// Beneficiary payment columns as (program, patient, third party) per care setting
const BENEFICIARY_PAYMENT_COLUMNS: [[&str; 3]; 3] = [
    ["MEDREIMB_IP", "BENRES_IP", "PPPYMT_IP"],
    ["MEDREIMB_OP", "BENRES_OP", "PPPYMT_OP"],
    ["MEDREIMB_CAR", "BENRES_CAR", "PPPYMT_CAR"],
];

fn beneficiary_descriptor() -> SchemaDescriptor {
    let mut columns = vec![
        ColumnSpec::new("DESYNPUF_ID", ColumnType::String),
        ColumnSpec::new("BENE_BIRTH_DT", ColumnType::Date),
        ColumnSpec::new("BENE_DEATH_DT", ColumnType::Date),
        ColumnSpec::new(
            "BENE_SEX_IDENT_CD",
            ColumnType::Categorical {
                table: CodeTableId::Sex,
            },
        ),
        ColumnSpec::new(
            "BENE_RACE_CD",
            ColumnType::Categorical {
                table: CodeTableId::Race,
            },
        ),
        ColumnSpec::new("BENE_ESRD_IND", ColumnType::flag("Y", "0")),
        ColumnSpec::new(
            "SP_STATE_CODE",
            ColumnType::Categorical {
                table: CodeTableId::State,
            },
        ),
        ColumnSpec::new("BENE_COUNTY_CD", ColumnType::String),
    ];
    columns.extend(typed(
        &[
            "BENE_HI_CVRAGE_TOT_MONS",
            "BENE_SMI_CVRAGE_TOT_MONS",
            "BENE_HMO_CVRAGE_TOT_MONS",
            "PLAN_CVRG_MOS_NUM",
        ],
        &ColumnType::Integer,
    ));
    columns.extend(typed(&CHRONIC_CONDITION_COLUMNS, &ColumnType::flag("2", "1")));
    columns.extend(typed(
        &BENEFICIARY_PAYMENT_COLUMNS.concat(),
        &ColumnType::Decimal,
    ));

    let mut fields = BTreeMap::from([
        (LogicalField::BirthDate, FieldSource::of(&["BENE_BIRTH_DT"], Placeholder::Null)),
        (LogicalField::DeathDate, FieldSource::of(&["BENE_DEATH_DT"], Placeholder::Null)),
        (LogicalField::Gender, FieldSource::of(&["BENE_SEX_IDENT_CD"], Placeholder::Null)),
        (LogicalField::Race, FieldSource::of(&["BENE_RACE_CD"], Placeholder::Null)),
        (LogicalField::State, FieldSource::of(&["SP_STATE_CODE"], Placeholder::Null)),
        (LogicalField::EsrdIndicator, FieldSource::of(&["BENE_ESRD_IND"], Placeholder::Null)),
    ]);
    for (setting, columns) in LogicalField::BENEFICIARY_PAYMENTS
        .into_iter()
        .zip(BENEFICIARY_PAYMENT_COLUMNS)
    {
        for (field, column) in setting.into_iter().zip(columns) {
            fields.insert(field, FieldSource::of(&[column], Placeholder::Zero));
        }
    }

    SchemaDescriptor {
        kind: SourceKind::Beneficiary,
        id_column: "DESYNPUF_ID".to_string(),
        required: vec![strings(&["DESYNPUF_ID"])],
        columns,
        year_source: YearSource::FileName,
        fields,
        diagnosis_slots: None,
        provider_columns: Vec::new(),
        provider_state_columns: Vec::new(),
        chronic_condition_columns: strings(&CHRONIC_CONDITION_COLUMNS),
    }
}

const DIAGNOSIS_PREFIXES: [&str; 2] = ["ICD9_DGNS_CD_", "DGNS_CD_"];

fn diagnosis_slots(count: usize) -> DiagnosisSlots {
    DiagnosisSlots {
        prefixes: strings(&DIAGNOSIS_PREFIXES),
        count,
    }
}

fn claim_header_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("DESYNPUF_ID", ColumnType::String),
        ColumnSpec::new("CLM_ID", ColumnType::String),
        ColumnSpec::new("SEGMENT", ColumnType::Integer),
        ColumnSpec::new("CLM_FROM_DT", ColumnType::Date),
        ColumnSpec::new("CLM_THRU_DT", ColumnType::Date),
        ColumnSpec::new("PRVDR_NUM", ColumnType::String),
        ColumnSpec::new("PRVDR_STATE_CD", ColumnType::String),
        ColumnSpec::new("CLM_PMT_AMT", ColumnType::Decimal),
    ]
}

fn claim_fields(provider_candidates: &[&str]) -> BTreeMap<LogicalField, FieldSource> {
    BTreeMap::from([
        (LogicalField::ClaimId, FieldSource::of(&["CLM_ID"], Placeholder::Unknown)),
        (LogicalField::FromDate, FieldSource::of(&["CLM_FROM_DT"], Placeholder::Null)),
        (LogicalField::ThruDate, FieldSource::of(&["CLM_THRU_DT"], Placeholder::Null)),
        (
            LogicalField::ProviderId,
            FieldSource::of(provider_candidates, Placeholder::Unknown),
        ),
        (
            LogicalField::ProgramPayment,
            FieldSource::of(&["CLM_PMT_AMT"], Placeholder::Zero),
        ),
        (
            LogicalField::ThirdPartyPayment,
            FieldSource::of(&["NCH_PRMRY_PYR_CLM_PD_AMT"], Placeholder::Zero),
        ),
    ])
}

fn institutional_descriptor(kind: SourceKind) -> SchemaDescriptor {
    let slots = diagnosis_slots(10);
    let mut columns = claim_header_columns();
    columns.push(ColumnSpec::new("NCH_PRMRY_PYR_CLM_PD_AMT", ColumnType::Decimal));
    columns.extend(typed(
        &["AT_PHYSN_NPI", "OP_PHYSN_NPI", "OT_PHYSN_NPI", "ADMTNG_ICD9_DGNS_CD"],
        &ColumnType::String,
    ));
    if kind == SourceKind::Inpatient {
        columns.extend(typed(
            &["CLM_ADMSN_DT", "NCH_BENE_DSCHRG_DT"],
            &ColumnType::Date,
        ));
        columns.extend(typed(
            &["CLM_PASS_THRU_PER_DIEM_AMT", "NCH_BENE_IP_DDCTBL_AMT"],
            &ColumnType::Decimal,
        ));
        columns.push(ColumnSpec::new("CLM_UTLZTN_DAY_CNT", ColumnType::Integer));
    } else {
        columns.extend(typed(
            &["NCH_BENE_PTB_DDCTBL_AMT", "NCH_BENE_PTB_COINSRNC_AMT"],
            &ColumnType::Decimal,
        ));
    }
    for prefix in DIAGNOSIS_PREFIXES {
        columns.extend(numbered_specs(prefix, slots.count, &ColumnType::String));
    }

    SchemaDescriptor {
        kind,
        id_column: "DESYNPUF_ID".to_string(),
        required: vec![
            strings(&["DESYNPUF_ID"]),
            strings(&["CLM_ID"]),
            strings(&["CLM_FROM_DT"]),
        ],
        columns,
        year_source: YearSource::DateColumns(strings(&["CLM_FROM_DT"])),
        fields: claim_fields(&["PRVDR_NUM"]),
        diagnosis_slots: Some(slots),
        provider_columns: strings(&["PRVDR_NUM", "AT_PHYSN_NPI", "OP_PHYSN_NPI", "OT_PHYSN_NPI"]),
        provider_state_columns: strings(&["PRVDR_STATE_CD"]),
        chronic_condition_columns: Vec::new(),
    }
}

fn carrier_descriptor() -> SchemaDescriptor {
    let slots = diagnosis_slots(8);
    let program_lines = numbered("LINE_NCH_PMT_AMT_", CARRIER_LINE_ITEMS);
    let third_party_lines = numbered("LINE_BENE_PRMRY_PYR_PD_AMT_", CARRIER_LINE_ITEMS);

    let mut columns = claim_header_columns();
    columns.extend(typed(&["PRVDR_NPI", "PRF_PHYSN_NPI_1"], &ColumnType::String));
    columns.push(ColumnSpec::new("CLM_OP_PRVDR_PMT_AMT", ColumnType::Decimal));
    columns.extend(numbered_specs("LINE_NCH_PMT_AMT_", CARRIER_LINE_ITEMS, &ColumnType::Decimal));
    columns.extend(numbered_specs(
        "LINE_BENE_PRMRY_PYR_PD_AMT_",
        CARRIER_LINE_ITEMS,
        &ColumnType::Decimal,
    ));
    for prefix in DIAGNOSIS_PREFIXES {
        columns.extend(numbered_specs(prefix, slots.count, &ColumnType::String));
    }

    let provider_candidates = ["PRVDR_NUM", "PRVDR_NPI", "PRF_PHYSN_NPI_1"];
    let mut fields = claim_fields(&provider_candidates);
    fields.insert(
        LogicalField::ProgramPayment,
        FieldSource::of(&["CLM_PMT_AMT"], Placeholder::Zero).with_lines(program_lines),
    );
    fields.insert(
        LogicalField::ThirdPartyPayment,
        FieldSource::of(&["CLM_OP_PRVDR_PMT_AMT"], Placeholder::Zero)
            .with_lines(third_party_lines),
    );

    SchemaDescriptor {
        kind: SourceKind::Carrier,
        id_column: "DESYNPUF_ID".to_string(),
        required: vec![
            strings(&["DESYNPUF_ID"]),
            strings(&["CLM_ID"]),
            strings(&["CLM_FROM_DT"]),
        ],
        columns,
        year_source: YearSource::DateColumns(strings(&["CLM_FROM_DT"])),
        fields,
        diagnosis_slots: Some(slots),
        provider_columns: strings(&provider_candidates),
        provider_state_columns: strings(&["PRVDR_STATE_CD"]),
        chronic_condition_columns: Vec::new(),
    }
}

fn pharmacy_descriptor() -> SchemaDescriptor {
    let mut columns = typed(
        &[
            "DESYNPUF_ID",
            "PDE_ID",
            "CLM_ID",
            "PROD_SRVC_ID",
            "PRDUCT_ID",
            "NDC",
            "PRVDR_ID",
            "PRSCRBR_ID",
            "PHRMCY_ID",
        ],
        &ColumnType::String,
    );
    columns.push(ColumnSpec::new("SRVC_DT", ColumnType::Date));
    columns.push(ColumnSpec::new("QTY_DSPNSD_NUM", ColumnType::Float));
    columns.push(ColumnSpec::new("DAYS_SUPLY_NUM", ColumnType::Integer));
    columns.extend(typed(&["PTNT_PAY_AMT", "TOT_RX_CST_AMT"], &ColumnType::Decimal));

    let provider_candidates = ["PRVDR_ID", "PRSCRBR_ID", "PHRMCY_ID"];
    let fields = BTreeMap::from([
        (
            LogicalField::PrescriptionId,
            FieldSource::of(&["PDE_ID", "CLM_ID"], Placeholder::Unknown),
        ),
        (LogicalField::ServiceDate, FieldSource::of(&["SRVC_DT"], Placeholder::Null)),
        (
            LogicalField::ProviderId,
            FieldSource::of(&provider_candidates, Placeholder::Unknown),
        ),
        (
            LogicalField::ProductId,
            FieldSource::of(&["PROD_SRVC_ID", "PRDUCT_ID", "NDC"], Placeholder::Unknown),
        ),
        (
            LogicalField::Quantity,
            FieldSource::of(&["QTY_DSPNSD_NUM"], Placeholder::Number(1.0)),
        ),
        (
            LogicalField::DaysSupply,
            FieldSource::of(&["DAYS_SUPLY_NUM"], Placeholder::Number(30.0)),
        ),
        (
            LogicalField::PatientPayment,
            FieldSource::of(&["PTNT_PAY_AMT"], Placeholder::Zero),
        ),
        (
            LogicalField::TotalCost,
            FieldSource::of(&["TOT_RX_CST_AMT"], Placeholder::Zero),
        ),
    ]);

    SchemaDescriptor {
        kind: SourceKind::Pharmacy,
        id_column: "DESYNPUF_ID".to_string(),
        required: vec![
            strings(&["DESYNPUF_ID"]),
            strings(&["PDE_ID", "CLM_ID"]),
            strings(&["SRVC_DT"]),
            strings(&["TOT_RX_CST_AMT"]),
        ],
        columns,
        year_source: YearSource::DateColumns(strings(&["SRVC_DT"])),
        fields,
        diagnosis_slots: None,
        provider_columns: strings(&provider_candidates),
        provider_state_columns: Vec::new(),
        chronic_condition_columns: Vec::new(),
    }
}
