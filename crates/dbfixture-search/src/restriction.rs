//! Seed rows and restriction sets

use dbfixture_core::{RowKey, name_key};
use indexmap::{IndexMap, IndexSet};

/// Caller-supplied starting rows of a filtered search, grouped by table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedRows {
    entries: Vec<(String, Vec<RowKey>)>,
}

impl SeedRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `keys` for `table`
    pub fn with<K, I>(mut self, table: impl Into<String>, keys: I) -> Self
    where
        K: Into<RowKey>,
        I: IntoIterator<Item = K>,
    {
        let table = table.into();
        for key in keys {
            self.add(table.clone(), key);
        }
        self
    }

    /// Add one key for `table`
    pub fn add(&mut self, table: impl Into<String>, key: impl Into<RowKey>) {
        let table = table.into();
        let key = key.into();
        match self.entries.iter_mut().find(|(name, _)| *name == table) {
            Some((_, keys)) => keys.push(key),
            None => self.entries.push((table, vec![key])),
        }
    }

    /// Tables in the order they were first added
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Every (table, key) pair in insertion order, duplicates included
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowKey)> {
        self.entries
            .iter()
            .flat_map(|(name, keys)| keys.iter().map(move |key| (name.as_str(), key)))
    }

    /// Number of keys, duplicates included
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, keys)| keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableKeys {
    name: String,
    keys: IndexSet<RowKey>,
}

/// Primary keys in scope, per table.
///
/// Each table's keys form a set; inserting a key twice is a no-op. Equality
/// ignores both table order and key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionSet {
    case_sensitive: bool,
    tables: IndexMap<String, TableKeys>,
}

impl RestrictionSet {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            tables: IndexMap::new(),
        }
    }

    fn key(&self, table: &str) -> String {
        name_key(table, self.case_sensitive)
    }

    /// Add `key` to `table`; returns `false` when it was already present
    pub fn insert(&mut self, table: &str, key: RowKey) -> bool {
        let key_name = self.key(table);
        let entry = self.tables.entry(key_name).or_insert_with(|| TableKeys {
            name: table.to_string(),
            keys: IndexSet::new(),
        });
        entry.keys.insert(key)
    }

    pub fn contains(&self, table: &str, key: &RowKey) -> bool {
        self.tables
            .get(&self.key(table))
            .is_some_and(|t| t.keys.contains(key))
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(&self.key(table))
    }

    /// Keys of `table` in the set's current order
    pub fn keys<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a RowKey> + use<'a> {
        self.tables
            .get(&self.key(table))
            .into_iter()
            .flat_map(|t| t.keys.iter())
    }

    /// Number of keys for `table`
    pub fn key_count(&self, table: &str) -> usize {
        self.tables
            .get(&self.key(table))
            .map_or(0, |t| t.keys.len())
    }

    /// Table names in the order they were first restricted
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|t| t.name.as_str())
    }

    /// Every (table, key) pair
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowKey)> {
        self.tables
            .values()
            .flat_map(|t| t.keys.iter().map(move |key| (t.name.as_str(), key)))
    }

    /// Total number of keys across tables
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole set as seed rows
    pub fn all_rows(&self) -> SeedRows {
        let mut seed = SeedRows::new();
        for (table, key) in self.iter() {
            seed.add(table, key.clone());
        }
        seed
    }

    /// Put every table's keys in canonical order
    pub(crate) fn sort_keys(&mut self) {
        for table in self.tables.values_mut() {
            table.keys.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seed_rows_group_by_table() {
        let seed = SeedRows::new()
            .with("C", ["C1", "C2"])
            .with("A", ["A1"])
            .with("C", ["C1"]);
        assert_eq!(seed.tables().collect::<Vec<_>>(), vec!["C", "A"]);
        assert_eq!(seed.len(), 4);
    }

    #[test]
    fn test_restriction_set_collapses_duplicates() {
        let mut set = RestrictionSet::new(false);
        assert!(set.insert("C", RowKey::from("C1")));
        assert!(set.insert("C", RowKey::from("C2")));
        assert!(!set.insert("c", RowKey::from("C1")));
        assert_eq!(set.key_count("C"), 2);
        assert!(set.contains("c", &RowKey::from("C2")));
    }

    #[test]
    fn test_restriction_set_equality_ignores_order() {
        let mut left = RestrictionSet::new(false);
        left.insert("A", RowKey::from("A1"));
        left.insert("C", RowKey::from("C2"));
        left.insert("C", RowKey::from("C1"));

        let mut right = RestrictionSet::new(false);
        right.insert("C", RowKey::from("C1"));
        right.insert("C", RowKey::from("C2"));
        right.insert("A", RowKey::from("A1"));

        assert_eq!(left, right);
    }

    #[test]
    fn test_sort_keys_uses_natural_order() {
        let mut set = RestrictionSet::new(false);
        set.insert("T", RowKey::from(3i64));
        set.insert("T", RowKey::from(1i64));
        set.insert("T", RowKey::from(2i64));
        set.sort_keys();
        let keys: Vec<_> = set.keys("T").cloned().collect();
        assert_eq!(keys, vec![RowKey::from(1i64), RowKey::from(2i64), RowKey::from(3i64)]);
    }

    #[test]
    fn test_all_rows_round_trips_through_seed() {
        let mut set = RestrictionSet::new(false);
        set.insert("A", RowKey::from("A1"));
        set.insert("B", RowKey::from("B1"));
        let seed = set.all_rows();
        assert_eq!(seed.tables().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(seed.len(), 2);
    }
}
