//! dbfixture core - shared abstractions for the fixture framework
//!
//! This crate provides the types every other dbfixture crate depends on:
//!
//! - `Value` / `RowKey` - cell values with a total order, and primary key tuples
//! - `TableMetadata`, `ColumnMeta`, `ForeignKeyInfo` - table descriptions
//! - `MetadataProvider` / `RowSource` - the seams the search engine consumes
//! - `FixtureConfig` - explicit configuration passed into constructors
//! - `TypeMapper` / `TypeMapperRegistry` - per-vendor native type mapping

mod config;
mod error;
mod schema;
mod type_mapping;
mod types;

pub use config::*;
pub use error::*;
pub use schema::*;
pub use type_mapping::*;
pub use types::*;
