//! Table-level dependency helpers

use crate::error::Result;
use crate::graph::GraphBuilder;
use crate::ordering::Direction;
use dbfixture_core::{FixtureConfig, KeyFollowing, MetadataProvider, names_match};

/// Every table `table` transitively references, parents first
pub fn depends_on<M>(provider: &M, table: &str, config: &FixtureConfig) -> Result<Vec<String>>
where
    M: MetadataProvider + ?Sized,
{
    let graph = GraphBuilder::new(provider, config).build_reachable(&[table], KeyFollowing::Imported)?;
    Ok(without(graph.ordered(Direction::Insert), table, config))
}

/// Every table transitively referencing `table`, children first
pub fn dependents_of<M>(provider: &M, table: &str, config: &FixtureConfig) -> Result<Vec<String>>
where
    M: MetadataProvider + ?Sized,
{
    let graph = GraphBuilder::new(provider, config).build_reachable(&[table], KeyFollowing::Exported)?;
    Ok(without(graph.ordered(Direction::Delete), table, config))
}

/// `tables` plus everything they transitively reference, in insert order
pub fn dependency_closure<M, S>(provider: &M, tables: &[S], config: &FixtureConfig) -> Result<Vec<String>>
where
    M: MetadataProvider + ?Sized,
    S: AsRef<str>,
{
    let graph = GraphBuilder::new(provider, config).build_reachable(tables, KeyFollowing::Imported)?;
    Ok(graph.ordered(Direction::Insert))
}

fn without(tables: Vec<String>, table: &str, config: &FixtureConfig) -> Vec<String> {
    tables
        .into_iter()
        .filter(|t| !names_match(t, table, config.case_sensitive_table_names))
        .collect()
}
