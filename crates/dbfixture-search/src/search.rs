//! Key-restricted filtered search
//!
//! Starting from seed rows, the search walks foreign keys row by row: for a
//! row in scope it reads the row's key values, asks the row source which rows
//! of the related table match, and brings every newly seen primary key into
//! the restriction set. The walk stops at a fixed point, when the queue of
//! newly discovered (table, key) pairs is empty. Because every pair enters the
//! queue at most once, cyclic schemas terminate.

use crate::error::{Result, SearchError};
use crate::graph::{GraphBuilder, KeyRelation, TableGraph, TableNode};
use crate::ordering::Direction;
use crate::restriction::{RestrictionSet, SeedRows};
use dbfixture_core::{FixtureConfig, KeyOrdering, MetadataProvider, RowKey, RowSource, Value};
use std::collections::VecDeque;

/// Outcome of a filtered search: the graph it ran on and the rows it found
#[derive(Debug, Clone)]
pub struct SearchResult {
    graph: TableGraph,
    restrictions: RestrictionSet,
}

impl SearchResult {
    pub fn graph(&self) -> &TableGraph {
        &self.graph
    }

    pub fn restrictions(&self) -> &RestrictionSet {
        &self.restrictions
    }

    pub fn into_restrictions(self) -> RestrictionSet {
        self.restrictions
    }

    /// Restricted tables in dependency order
    pub fn table_order(&self, direction: Direction) -> Vec<String> {
        self.graph
            .ordered(direction)
            .into_iter()
            .filter(|table| self.restrictions.contains_table(table))
            .collect()
    }
}

/// Runs table ordering and filtered searches against one metadata provider and
/// one row source
pub struct FilteredSearch<'a, M: ?Sized, R: ?Sized> {
    metadata: &'a M,
    rows: &'a R,
    config: &'a FixtureConfig,
}

impl<'a, M, R> FilteredSearch<'a, M, R>
where
    M: MetadataProvider + ?Sized,
    R: RowSource + ?Sized,
{
    pub fn new(metadata: &'a M, rows: &'a R, config: &'a FixtureConfig) -> Self {
        Self {
            metadata,
            rows,
            config,
        }
    }

    /// Order `tables` for `direction`
    pub fn order_tables<S: AsRef<str>>(&self, tables: &[S], direction: Direction) -> Result<Vec<String>> {
        crate::ordering::order_tables(self.metadata, tables, direction, self.config)
    }

    /// Every row transitively related to `seed` along the configured key
    /// directions.
    ///
    /// Seed keys are normalized through the row source, so `"1"` and `1` for
    /// an integer key name the same row. A seed key that matches no row fails
    /// with `MissingSeedRow`.
    pub fn filter_by_seed(&self, seed: &SeedRows) -> Result<SearchResult> {
        let follow = self.config.search.follow;
        let seed_tables: Vec<&str> = seed.tables().collect();
        let graph =
            GraphBuilder::new(self.metadata, self.config).build_reachable(&seed_tables, follow)?;

        for node in graph.nodes().filter(|n| !n.has_primary_key()) {
            tracing::warn!(table = %node.name, "table has no primary key, its rows are not followed");
        }

        let mut restrictions = RestrictionSet::new(graph.case_sensitive());
        let mut queue: VecDeque<(String, RowKey)> = VecDeque::new();

        for (table, key) in seed.iter() {
            let node = keyed_node(&graph, table)?;
            let found = self.seed_row(node, key)?;
            if restrictions.insert(&node.name, found.clone()) {
                queue.push_back((node.name.clone(), found));
            }
        }
        tracing::debug!(
            seed_rows = seed.len(),
            distinct = restrictions.len(),
            ?follow,
            "starting filtered search"
        );

        while let Some((table, key)) = queue.pop_front() {
            if follow.follows_imported() {
                for relation in graph.imported(&table) {
                    let discovered = self.follow_relation(&graph, relation, &table, &key, true)?;
                    enqueue(&mut restrictions, &mut queue, &relation.parent, discovered);
                }
            }
            if follow.follows_exported() {
                for relation in graph.exported(&table) {
                    let discovered = self.follow_relation(&graph, relation, &table, &key, false)?;
                    enqueue(&mut restrictions, &mut queue, &relation.child, discovered);
                }
            }
        }

        if self.config.search.key_ordering == KeyOrdering::Natural {
            restrictions.sort_keys();
        }
        tracing::debug!(
            tables = restrictions.tables().count(),
            rows = restrictions.len(),
            "filtered search reached fixed point"
        );

        Ok(SearchResult {
            graph,
            restrictions,
        })
    }

    fn seed_row(&self, node: &TableNode, key: &RowKey) -> Result<RowKey> {
        if key.len() != node.primary_key.len() {
            return Err(SearchError::KeyArity {
                table: node.name.clone(),
                key: key.clone(),
                expected: node.primary_key.len(),
                actual: key.len(),
            });
        }
        let missing = || SearchError::MissingSeedRow {
            table: node.name.clone(),
            key: key.clone(),
        };
        if key.has_null() {
            return Err(missing());
        }
        self.rows
            .keys_matching(&node.name, &node.primary_key, key.values())?
            .into_iter()
            .next()
            .ok_or_else(missing)
    }

    /// Keys on the far side of `relation` for the row `key` of `table`.
    ///
    /// `towards_parent` walks from the child row to the rows it references,
    /// otherwise from the parent row to the rows referencing it. A far table
    /// without a primary key contributes nothing.
    fn follow_relation(
        &self,
        graph: &TableGraph,
        relation: &KeyRelation,
        table: &str,
        key: &RowKey,
        towards_parent: bool,
    ) -> Result<Vec<RowKey>> {
        let (near_columns, far_table, far_columns) = if towards_parent {
            (&relation.child_columns, &relation.parent, &relation.parent_columns)
        } else {
            (&relation.parent_columns, &relation.child, &relation.child_columns)
        };

        let far = graph
            .node(far_table)
            .ok_or_else(|| SearchError::MissingMetadata(format!("table '{}'", far_table)))?;
        // rows of a keyless table cannot enter the restriction set
        if !far.has_primary_key() {
            return Ok(Vec::new());
        }

        let Some(values) = self.rows.row_values(table, key, near_columns)? else {
            return Ok(Vec::new());
        };
        // NULL key values never reference a row
        if values.iter().any(Value::is_null) {
            return Ok(Vec::new());
        }

        let keys = self.rows.keys_matching(&far.name, far_columns, &values)?;
        tracing::trace!(
            from = %table,
            to = %far.name,
            %key,
            matched = keys.len(),
            "followed foreign key"
        );
        Ok(keys)
    }
}

fn keyed_node<'g>(graph: &'g TableGraph, table: &str) -> Result<&'g TableNode> {
    let node = graph
        .node(table)
        .ok_or_else(|| SearchError::MissingMetadata(format!("table '{}'", table)))?;
    if !node.has_primary_key() {
        return Err(SearchError::NoPrimaryKey(node.name.clone()));
    }
    Ok(node)
}

fn enqueue(
    restrictions: &mut RestrictionSet,
    queue: &mut VecDeque<(String, RowKey)>,
    table: &str,
    keys: Vec<RowKey>,
) {
    for key in keys {
        if restrictions.insert(table, key.clone()) {
            queue.push_back((table.to_string(), key));
        }
    }
}

#[cfg(test)]
mod tests;
