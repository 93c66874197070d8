use std::fs::File;
use std::sync::Arc;

use arrow::array::{Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use claims_lakehouse::models::{Beneficiary, Money, PaymentTriad, Provider, StoredTable};
use claims_lakehouse::store::{PartitionKey, PartitionScheme};
use claims_lakehouse::PartitionedStore;
use parquet::basic::Compression;
use parquet::file::reader::{FileReader, SerializedFileReader};

fn beneficiary(bene_id: &str, year: i32) -> Beneficiary {
    let triad = |units: i64| PaymentTriad {
        medicare: Money::from_cents(units * 100 + 25),
        beneficiary: Money::from_units(units),
        third_party: Money::ZERO,
    };
    let mut row = Beneficiary {
        bene_id: bene_id.to_string(),
        year,
        birth_date: NaiveDate::from_ymd_opt(1931, 5, 1),
        death_date: None,
        gender: Some("Female".to_string()),
        race: Some("White".to_string()),
        state: Some("TX".to_string()),
        esrd: Some(false),
        chronic_condition_count: 3,
        inpatient: triad(100),
        outpatient: triad(20),
        carrier: triad(5),
        total_allowed: Money::ZERO,
        total_paid: Money::ZERO,
    };
    row.compute_totals(claims_lakehouse::TotalPaidPolicy::ProgramPlusPatient);
    row
}

#[test]
fn test_typed_round_trip_keeps_cents_and_dates() -> claims_lakehouse::Result<()> {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = PartitionedStore::new(dir.path());
    let rows = vec![beneficiary("B1", 2008), beneficiary("B2", 2009)];

    assert_eq!(store.write_table(&rows)?, 2);
    let mut back = store.read_table::<Beneficiary>()?.expect("table written");
    back.sort_by(|a, b| a.bene_id.cmp(&b.bene_id));
    assert_eq!(back, rows);
    assert_eq!(back[0].inpatient.medicare, Money::from_cents(10_025));

    let files = store.partition_files(Beneficiary::TABLE_NAME)?;
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("dim_beneficiary/year=2008/dim_beneficiary.parquet"));
    Ok(())
}

#[test]
fn test_partition_files_are_zstd_compressed() -> claims_lakehouse::Result<()> {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = PartitionedStore::new(dir.path());
    store.write_table(&[beneficiary("B1", 2008)])?;

    let path = store.partition_path(Beneficiary::TABLE_NAME, &PartitionKey::year(2008));
    let reader = SerializedFileReader::new(File::open(&path).expect("partition file"))?;
    let column = reader.metadata().row_group(0).column(0);
    assert!(matches!(column.compression(), Compression::ZSTD(_)));
    assert!(column.statistics().is_some());
    Ok(())
}

#[test]
fn test_unpartitioned_table_is_a_single_file() -> claims_lakehouse::Result<()> {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = PartitionedStore::new(dir.path());
    let providers = vec![
        Provider {
            provider_id: "P1".to_string(),
            state: "CA".to_string(),
            provider_type: "Unknown".to_string(),
        },
        Provider {
            provider_id: "P2".to_string(),
            state: "Unknown".to_string(),
            provider_type: "Unknown".to_string(),
        },
    ];
    store.write_table(&providers)?;

    let files = store.partition_files(Provider::TABLE_NAME)?;
    assert_eq!(files, vec![dir.path().join("dim_provider/dim_provider.parquet")]);
    assert_eq!(store.read_table::<Provider>()?.expect("providers"), providers);
    Ok(())
}

#[test]
fn test_batches_sharing_a_partition_are_written_once() -> claims_lakehouse::Result<()> {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = PartitionedStore::new(dir.path());
    let schema = Arc::new(Schema::new(vec![
        Field::new("bene_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
    ]));
    let batch = |ids: Vec<&str>, year: i32| {
        let years = Int32Array::from(vec![year; ids.len()]);
        RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(ids)), Arc::new(years)],
        )
    };

    let written = store.write_batches(
        "bronze_like",
        PartitionScheme::YearPrefix,
        vec![
            (PartitionKey::year_prefix(2008, "AB"), batch(vec!["AB1", "AB2"], 2008)?),
            (PartitionKey::year_prefix(2008, "AB"), batch(vec!["AB3"], 2008)?),
            (PartitionKey::year_prefix(2009, "CD"), batch(vec!["CD1"], 2009)?),
        ],
    )?;
    assert_eq!(written, 4);

    let files = store.partition_files("bronze_like")?;
    assert_eq!(files.len(), 2);
    let rows: usize = store
        .read_batches("bronze_like")?
        .expect("data")
        .iter()
        .map(RecordBatch::num_rows)
        .sum();
    assert_eq!(rows, 4);
    Ok(())
}
