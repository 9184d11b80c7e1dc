//! Dependency search over foreign key graphs
//!
//! Given table metadata and a row source, this crate answers two questions
//! fixtures need before touching a database:
//!
//! - In which order can a group of tables be inserted (parents first) or
//!   deleted (children first) without violating referential integrity?
//! - Starting from a few seed rows, which rows of which tables must come along
//!   so the extracted fixture is self-contained?
//!
//! # Example
//!
//! ```rust,ignore
//! let search = FilteredSearch::new(&metadata, &rows, &config);
//! let result = search.filter_by_seed(&SeedRows::new().with("orders", [1i64]))?;
//! for table in result.table_order(Direction::Insert) {
//!     println!("{table}: {:?}", result.restrictions().keys(&table).collect::<Vec<_>>());
//! }
//! ```

mod dependency;
mod error;
mod graph;
mod ordering;
mod restriction;
mod search;

#[cfg(test)]
mod fixtures;

pub use dependency::{dependency_closure, dependents_of, depends_on};
pub use error::SearchError;
pub use graph::{GraphBuilder, KeyRelation, TableGraph, TableNode};
pub use ordering::{Direction, order_tables};
pub use restriction::{RestrictionSet, SeedRows};
pub use search::{FilteredSearch, SearchResult};

pub use dbfixture_core::{KeyFollowing, KeyOrdering};
