//! Reading fixture files from disk, trimming them with the dependency search
//! and writing the result back out.

use dbfixture_core::{FixtureConfig, ForeignKeyInfo, KeyFollowing, RowKey, Value};
use dbfixture_dataset::{
    CsvDataSetReader, CsvDataSetWriter, DataSet, FlatXmlReader, FlatXmlWriter, ReplacementDataSet,
    Table, restrict, sequence,
};
use dbfixture_search::{Direction, FilteredSearch, SeedRows};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;

const SHOP_XML: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <dataset>
      <orders id="10" customer_id="1" note="[NULL]"/>
      <orders id="11" customer_id="2" note="gift"/>
      <customers id="1" name="Ada"/>
      <customers id="2" name="Grace"/>
    </dataset>
"#};

/// Declare the keys flat XML cannot carry
fn with_keys(mut dataset: DataSet) -> DataSet {
    let customers = dataset.remove_table("customers").unwrap();
    let orders = dataset.remove_table("orders").unwrap();

    let (mut meta, rows) = orders.into_parts();
    meta.primary_key = vec!["id".into()];
    meta.foreign_keys = vec![ForeignKeyInfo::new(["customer_id"], "customers", ["id"])];
    let mut orders = Table::new(meta);
    for row in rows {
        orders.add_row(row).unwrap();
    }

    dataset.add_table(orders).unwrap();
    dataset.add_table(customers.primary_key(["id"])).unwrap();
    dataset
}

#[test]
fn test_xml_fixture_is_trimmed_to_seed_and_written_as_csv() {
    let config = FixtureConfig::default().with_key_following(KeyFollowing::Imported);
    let dataset = with_keys(FlatXmlReader::new(&config).read_str(SHOP_XML).unwrap());
    let dataset = ReplacementDataSet::new()
        .replace("[NULL]", Value::Null)
        .apply(&dataset);

    let result = FilteredSearch::new(&dataset, &dataset, &config)
        .filter_by_seed(&SeedRows::new().with("orders", ["10"]))
        .unwrap();
    assert_eq!(
        result.restrictions().keys("customers").cloned().collect::<Vec<_>>(),
        vec![RowKey::from("1")]
    );

    let trimmed = restrict(&dataset, result.restrictions(), &config).unwrap();
    assert_eq!(trimmed.table_names(), vec!["customers", "orders"]);

    let dir = tempfile::tempdir().unwrap();
    CsvDataSetWriter::new(&config).write_dir(&trimmed, dir.path()).unwrap();
    let orders_csv = fs::read_to_string(dir.path().join("orders.csv")).unwrap();
    assert_eq!(orders_csv, "id,customer_id,note\n10,1,null\n");

    let read_back = CsvDataSetReader::new(&config).read_dir(dir.path()).unwrap();
    assert_eq!(read_back.row_count(), 2);
    assert_eq!(
        read_back.table("orders").unwrap().value(0, "note").unwrap(),
        &Value::Null
    );
}

#[test]
fn test_sequenced_dataset_round_trips_through_xml() {
    let config = FixtureConfig::default();
    let dataset = with_keys(FlatXmlReader::new(&config).read_str(SHOP_XML).unwrap());

    let for_delete = sequence(&dataset, Direction::Delete, &config).unwrap();
    assert_eq!(for_delete.table_names(), vec!["orders", "customers"]);

    let xml = FlatXmlWriter::write_string(&for_delete).unwrap();
    let read = FlatXmlReader::new(&config).read_str(&xml).unwrap();
    assert_eq!(read.table_names(), vec!["orders", "customers"]);
    assert_eq!(read.row_count(), 4);
}
