//! Explicit configuration for fixture loading, searching and database operations
//!
//! Every component takes its configuration as a constructor argument; nothing
//! is read from globals. A `FixtureConfig` can be built in code or loaded from
//! a TOML file:
//!
//! ```toml
//! case_sensitive_table_names = false
//!
//! [search]
//! key_ordering = "natural"
//! follow = "both"
//!
//! [operation]
//! batch_size = 500
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordering of the keys collected for one table during a filtered search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrdering {
    /// Canonical key order, independent of seed order and discovery order
    #[default]
    Natural,
    /// Order in which each key was first discovered
    Discovery,
}

/// Which foreign key directions a filtered search follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFollowing {
    /// Only rows referenced by rows in scope (parents)
    Imported,
    /// Only rows referencing rows in scope (children)
    Exported,
    /// Both parents and children
    #[default]
    Both,
}

impl KeyFollowing {
    pub fn follows_imported(self) -> bool {
        matches!(self, KeyFollowing::Imported | KeyFollowing::Both)
    }

    pub fn follows_exported(self) -> bool {
        matches!(self, KeyFollowing::Exported | KeyFollowing::Both)
    }
}

/// Filtered search settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub key_ordering: KeyOrdering,
    pub follow: KeyFollowing,
}

/// Database operation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    /// Rows per multi-row INSERT statement
    pub batch_size: usize,
    /// Run each operation inside a transaction
    pub use_transaction: bool,
    /// Process tables in foreign key order instead of dataset order
    pub order_by_dependencies: bool,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            use_transaction: true,
            order_by_dependencies: true,
        }
    }
}

/// Fixture file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetConfig {
    /// Text that stands for NULL in CSV files
    pub null_token: String,
    /// Union the attributes of every flat XML row instead of trusting the first
    pub column_sensing: bool,
    /// CSV field delimiter
    pub csv_delimiter: char,
}

impl Default for DataSetConfig {
    fn default() -> Self {
        Self {
            null_token: "null".to_string(),
            column_sensing: true,
            csv_delimiter: ',',
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Match table and column names exactly instead of ignoring ASCII case
    pub case_sensitive_table_names: bool,
    /// Product name used to pick a type mapper, overriding the connection's
    pub datatype_product: Option<String>,
    pub search: SearchConfig,
    pub operation: OperationConfig,
    pub dataset: DataSetConfig,
}

impl FixtureConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading fixture config");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize the config to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.operation.batch_size == 0 {
            return Err(crate::FixtureError::Configuration(
                "operation.batch_size must be at least 1".into(),
            ));
        }
        if self.dataset.csv_delimiter == '"' {
            return Err(crate::FixtureError::Configuration(
                "dataset.csv_delimiter cannot be the quote character".into(),
            ));
        }
        Ok(())
    }

    /// Match names exactly
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive_table_names = true;
        self
    }

    /// Set the key ordering used by filtered searches
    pub fn with_key_ordering(mut self, ordering: KeyOrdering) -> Self {
        self.search.key_ordering = ordering;
        self
    }

    /// Set which key directions filtered searches follow
    pub fn with_key_following(mut self, follow: KeyFollowing) -> Self {
        self.search.follow = follow;
        self
    }

    /// Set the insert batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.operation.batch_size = size;
        self
    }

    /// Force a type mapper product
    pub fn with_datatype_product(mut self, product: impl Into<String>) -> Self {
        self.datatype_product = Some(product.into());
        self
    }

    /// Set the CSV null token
    pub fn with_null_token(mut self, token: impl Into<String>) -> Self {
        self.dataset.null_token = token.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = FixtureConfig::default();
        assert!(!config.case_sensitive_table_names);
        assert_eq!(config.search.key_ordering, KeyOrdering::Natural);
        assert_eq!(config.search.follow, KeyFollowing::Both);
        assert_eq!(config.operation.batch_size, 100);
        assert_eq!(config.dataset.null_token, "null");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FixtureConfig::from_toml_str(indoc! {r#"
            case_sensitive_table_names = true

            [search]
            key_ordering = "discovery"
            follow = "imported"

            [operation]
            batch_size = 500
        "#})
        .unwrap();

        assert!(config.case_sensitive_table_names);
        assert_eq!(config.search.key_ordering, KeyOrdering::Discovery);
        assert_eq!(config.search.follow, KeyFollowing::Imported);
        assert_eq!(config.operation.batch_size, 500);
        assert!(config.operation.use_transaction);
        assert!(config.dataset.column_sensing);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let err = FixtureConfig::from_toml_str("[operation]\nbatch_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_load_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.toml");
        let config = FixtureConfig::new()
            .with_datatype_product("PostgreSQL")
            .with_batch_size(25);
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(FixtureConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_key_following_directions() {
        assert!(KeyFollowing::Both.follows_imported());
        assert!(KeyFollowing::Both.follows_exported());
        assert!(!KeyFollowing::Imported.follows_exported());
        assert!(!KeyFollowing::Exported.follows_imported());
    }
}
