//! Tests for the filtered search

use super::*;
use crate::fixtures::{MemorySchema, abc_schema};
use dbfixture_core::{ForeignKeyInfo, KeyFollowing, TableMetadata};

fn search(schema: &MemorySchema, config: &FixtureConfig, seed: SeedRows) -> Result<SearchResult> {
    FilteredSearch::new(schema, schema, config).filter_by_seed(&seed)
}

fn keys(result: &SearchResult, table: &str) -> Vec<RowKey> {
    result.restrictions().keys(table).cloned().collect()
}

fn str_keys(values: &[&str]) -> Vec<RowKey> {
    values.iter().map(|v| RowKey::from(*v)).collect()
}

mod scenario_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seed_row_pulls_in_its_parents_and_their_children() {
        let schema = abc_schema();
        let result = search(&schema, &FixtureConfig::default(), SeedRows::new().with("A", ["A1"])).unwrap();

        assert_eq!(keys(&result, "A"), str_keys(&["A1"]));
        assert_eq!(keys(&result, "B"), str_keys(&["B1"]));
        assert_eq!(keys(&result, "C"), str_keys(&["C1", "C2"]));
        assert_eq!(result.restrictions().len(), 4);
    }

    #[test]
    fn test_table_order_covers_restricted_tables() {
        let schema = abc_schema();
        let result = search(&schema, &FixtureConfig::default(), SeedRows::new().with("A", ["A1"])).unwrap();

        assert_eq!(result.table_order(Direction::Insert), vec!["C", "B", "A"]);
        assert_eq!(result.table_order(Direction::Delete), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_keyless_related_table_is_skipped() {
        let schema = abc_schema().table(
            TableMetadata::with_column_names("AUDIT", ["A_ID", "NOTE"])
                .foreign_key(ForeignKeyInfo::new(["A_ID"], "A", ["ID"]).named("FK_AUDIT_A")),
            vec![vec![Value::from("A1"), Value::from("created")]],
        );
        let result = search(&schema, &FixtureConfig::default(), SeedRows::new().with("A", ["A1"])).unwrap();

        assert_eq!(keys(&result, "A"), str_keys(&["A1"]));
        assert_eq!(keys(&result, "C"), str_keys(&["C1", "C2"]));
        assert!(!result.restrictions().contains_table("AUDIT"));
        assert_eq!(result.table_order(Direction::Insert), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_repeated_seed_keys_collapse() {
        let schema = abc_schema();
        let config = FixtureConfig::default().with_key_following(KeyFollowing::Imported);
        let seed = SeedRows::new().with("C", ["C1", "C2", "C1", "C2", "C1"]);
        let result = search(&schema, &config, seed).unwrap();

        assert_eq!(keys(&result, "C"), str_keys(&["C1", "C2"]));
        assert_eq!(result.restrictions().tables().collect::<Vec<_>>(), vec!["C"]);
    }

    #[test]
    fn test_inverted_seed_is_sorted_under_natural_ordering() {
        let schema = abc_schema();
        let config = FixtureConfig::default().with_key_following(KeyFollowing::Imported);
        let result = search(&schema, &config, SeedRows::new().with("C", ["C2", "C1"])).unwrap();

        assert_eq!(keys(&result, "C"), str_keys(&["C1", "C2"]));
    }

    #[test]
    fn test_discovery_ordering_keeps_first_seen_order() {
        let schema = abc_schema();
        let config = FixtureConfig::default()
            .with_key_following(KeyFollowing::Imported)
            .with_key_ordering(KeyOrdering::Discovery);
        let result = search(&schema, &config, SeedRows::new().with("C", ["C2", "C1"])).unwrap();

        assert_eq!(keys(&result, "C"), str_keys(&["C2", "C1"]));
    }
}

mod property_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_equal_seeds_give_equal_results() {
        let schema = abc_schema();
        let config = FixtureConfig::default();
        let first = search(
            &schema,
            &config,
            SeedRows::new().with("A", ["A2"]).with("C", ["C2", "C1"]),
        )
        .unwrap();
        let second = search(
            &schema,
            &config,
            SeedRows::new().with("C", ["C1", "C2", "C1"]).with("a", ["A2"]),
        )
        .unwrap();

        assert_eq!(first.restrictions(), second.restrictions());
    }

    #[test]
    fn test_reseeding_with_result_adds_nothing() {
        let schema = abc_schema();
        let config = FixtureConfig::default();
        let first = search(&schema, &config, SeedRows::new().with("B", ["B2"])).unwrap();
        let second = search(&schema, &config, first.restrictions().all_rows()).unwrap();

        assert_eq!(first.restrictions(), second.restrictions());
    }

    #[test]
    fn test_cyclic_rows_terminate() {
        // Two tables referencing each other, rows pointing at each other
        let schema = MemorySchema::new()
            .table(
                TableMetadata::with_column_names("emp", ["id", "dept_id"])
                    .primary_key(["id"])
                    .foreign_key(ForeignKeyInfo::new(["dept_id"], "dept", ["id"])),
                vec![vec![Value::from(1i64), Value::from(10i64)]],
            )
            .table(
                TableMetadata::with_column_names("dept", ["id", "manager_id"])
                    .primary_key(["id"])
                    .foreign_key(ForeignKeyInfo::new(["manager_id"], "emp", ["id"])),
                vec![vec![Value::from(10i64), Value::from(1i64)]],
            );
        let result = search(&schema, &FixtureConfig::default(), SeedRows::new().with("emp", [1i64])).unwrap();

        assert_eq!(keys(&result, "emp"), vec![RowKey::from(1i64)]);
        assert_eq!(keys(&result, "dept"), vec![RowKey::from(10i64)]);
    }
}

mod direction_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exported_only_collects_children() {
        let schema = abc_schema();
        let config = FixtureConfig::default().with_key_following(KeyFollowing::Exported);
        let result = search(&schema, &config, SeedRows::new().with("B", ["B1"])).unwrap();

        assert_eq!(keys(&result, "B"), str_keys(&["B1"]));
        assert_eq!(keys(&result, "A"), str_keys(&["A1"]));
        assert!(!result.restrictions().contains_table("C"));
    }

    #[test]
    fn test_null_foreign_key_references_nothing() {
        let schema = abc_schema();
        let config = FixtureConfig::default().with_key_following(KeyFollowing::Imported);
        let result = search(&schema, &config, SeedRows::new().with("C", ["C3"])).unwrap();

        assert_eq!(keys(&result, "C"), str_keys(&["C3"]));
    }

    #[test]
    fn test_composite_keys_follow_exported_relations() {
        let schema = MemorySchema::new()
            .table(
                TableMetadata::with_column_names("orders", ["id"]).primary_key(["id"]),
                vec![vec![Value::from(1i64)], vec![Value::from(2i64)]],
            )
            .table(
                TableMetadata::with_column_names("order_lines", ["order_id", "line_no", "sku"])
                    .primary_key(["order_id", "line_no"])
                    .foreign_key(ForeignKeyInfo::new(["order_id"], "orders", ["id"])),
                vec![
                    vec![Value::from(1i64), Value::from(2i64), Value::from("b")],
                    vec![Value::from(1i64), Value::from(1i64), Value::from("a")],
                    vec![Value::from(2i64), Value::from(1i64), Value::from("c")],
                ],
            );
        let config = FixtureConfig::default().with_key_following(KeyFollowing::Exported);
        let result = search(&schema, &config, SeedRows::new().with("orders", [1i64])).unwrap();

        assert_eq!(
            keys(&result, "order_lines"),
            vec![
                RowKey::new(vec![Value::from(1i64), Value::from(1i64)]),
                RowKey::new(vec![Value::from(1i64), Value::from(2i64)]),
            ]
        );
    }

    #[test]
    fn test_seed_keys_are_normalized_by_the_row_source() {
        let schema = MemorySchema::new().table(
            TableMetadata::with_column_names("items", ["id"]).primary_key(["id"]),
            vec![vec![Value::from(7i64)]],
        );
        let result = search(
            &schema,
            &FixtureConfig::default(),
            SeedRows::new().with("items", ["7"]).with("items", [7i64]),
        )
        .unwrap();

        assert_eq!(keys(&result, "items"), vec![RowKey::from(7i64)]);
    }
}

mod error_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_seed_row() {
        let schema = abc_schema();
        let err = search(&schema, &FixtureConfig::default(), SeedRows::new().with("A", ["A9"])).unwrap_err();

        match err {
            SearchError::MissingSeedRow { table, key } => {
                assert_eq!(table, "A");
                assert_eq!(key, RowKey::from("A9"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_seed_table() {
        let schema = abc_schema();
        let err = search(&schema, &FixtureConfig::default(), SeedRows::new().with("Z", ["Z1"])).unwrap_err();
        assert!(matches!(err, SearchError::MissingMetadata(_)));
    }

    #[test]
    fn test_seed_key_arity() {
        let schema = abc_schema();
        let seed = SeedRows::new().with(
            "A",
            [RowKey::new(vec![Value::from("A1"), Value::from("extra")])],
        );
        let err = search(&schema, &FixtureConfig::default(), seed).unwrap_err();
        assert!(matches!(
            err,
            SearchError::KeyArity {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_table_without_primary_key() {
        let schema = MemorySchema::new().table(
            TableMetadata::with_column_names("log", ["message"]),
            vec![vec![Value::from("hello")]],
        );
        let err = search(&schema, &FixtureConfig::default(), SeedRows::new().with("log", ["hello"])).unwrap_err();
        assert!(matches!(err, SearchError::NoPrimaryKey(ref t) if t == "log"));
    }
}
