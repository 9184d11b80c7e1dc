//! Materialization of a restriction set

use crate::dataset::DataSet;
use crate::error::Result;
use crate::table::Table;
use dbfixture_core::FixtureConfig;
use dbfixture_search::{Direction, RestrictionSet, order_tables};

/// Rows of `dataset` whose primary keys are in `restrictions`.
///
/// Only restricted tables are kept, ordered parents first. Restricted tables
/// missing from the dataset are skipped.
pub fn restrict(
    dataset: &DataSet,
    restrictions: &RestrictionSet,
    config: &FixtureConfig,
) -> Result<DataSet> {
    let names: Vec<&str> = restrictions
        .tables()
        .filter(|t| dataset.contains(t))
        .collect();
    let ordered = order_tables(dataset, &names, Direction::Insert, config)?;

    let mut restricted = DataSet::with_config(config);
    for name in ordered {
        let source = dataset.table(&name)?;
        let mut table = Table::new(source.metadata().clone());
        for row in 0..source.row_count() {
            if restrictions.contains(&name, &source.row_key(row)?) {
                table.add_row(source.row_values(row)?.to_vec())?;
            }
        }
        restricted.add_table(table)?;
    }

    tracing::debug!(
        tables = restricted.len(),
        rows = restricted.row_count(),
        "materialized restricted dataset"
    );
    Ok(restricted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbfixture_core::{ForeignKeyInfo, TableMetadata, Value};
    use dbfixture_search::{FilteredSearch, SeedRows};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_restrict_keeps_found_rows_in_insert_order() {
        let orders = Table::new(
            TableMetadata::with_column_names("orders", ["id", "customer_id"])
                .primary_key(["id"])
                .foreign_key(ForeignKeyInfo::new(["customer_id"], "customers", ["id"])),
        )
        .row([Value::from(10i64), Value::from(1i64)])
        .unwrap()
        .row([Value::from(11i64), Value::from(2i64)])
        .unwrap();
        let customers = Table::with_columns("customers", ["id"])
            .primary_key(["id"])
            .row([Value::from(1i64)])
            .unwrap()
            .row([Value::from(2i64)])
            .unwrap();
        let dataset = DataSet::from_tables([orders, customers]).unwrap();
        let config = FixtureConfig::default();

        let result = FilteredSearch::new(&dataset, &dataset, &config)
            .filter_by_seed(&SeedRows::new().with("orders", [11i64]))
            .unwrap();
        let restricted = restrict(&dataset, result.restrictions(), &config).unwrap();

        assert_eq!(restricted.table_names(), vec!["customers", "orders"]);
        assert_eq!(restricted.table("customers").unwrap().rows(), &[vec![Value::from(2i64)]]);
        assert_eq!(
            restricted.table("orders").unwrap().rows(),
            &[vec![Value::from(11i64), Value::from(2i64)]]
        );
    }
}
