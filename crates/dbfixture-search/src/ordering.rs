//! Dependency ordering of tables
//!
//! Tables are ordered so that every parent precedes its children for inserts
//! (and follows them for deletes). Foreign key cycles are collapsed into
//! strongly connected groups first, so a cyclic schema still yields a total,
//! deterministic order: a group is emitted as a unit with its members in the
//! graph's node order. Among tables with no ordering constraint between them,
//! the node order wins.

use crate::error::Result;
use crate::graph::{GraphBuilder, TableGraph};
use dbfixture_core::{FixtureConfig, MetadataProvider};
use std::collections::BTreeSet;

/// Which way foreign keys constrain the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Parents before children
    #[default]
    Insert,
    /// Children before parents
    Delete,
}

/// Order `tables` for `direction`, reading foreign keys from `provider`.
///
/// Every table must be known to the provider. Foreign keys to tables outside
/// the list and self references do not constrain the order.
pub fn order_tables<M, S>(
    provider: &M,
    tables: &[S],
    direction: Direction,
    config: &FixtureConfig,
) -> Result<Vec<String>>
where
    M: MetadataProvider + ?Sized,
    S: AsRef<str>,
{
    let graph = GraphBuilder::new(provider, config).build(tables)?;
    Ok(graph.ordered(direction))
}

impl TableGraph {
    /// Table names in dependency order for `direction`
    pub fn ordered(&self, direction: Direction) -> Vec<String> {
        let names: Vec<&str> = self.nodes().map(|n| n.name.as_str()).collect();
        let components = self.components();
        let mut order = Vec::with_capacity(self.len());
        for component in condensed_order(&components, &self.adjacency()) {
            order.extend(components[component].iter().map(|&idx| names[idx].to_string()));
        }
        if direction == Direction::Delete {
            order.reverse();
        }
        tracing::trace!(?direction, tables = ?order, "ordered tables");
        order
    }

    /// Groups of tables that reference each other in a cycle
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let names: Vec<&str> = self.nodes().map(|n| n.name.as_str()).collect();
        self.components()
            .into_iter()
            .filter(|c| c.len() > 1)
            .map(|c| c.into_iter().map(|idx| names[idx].to_string()).collect())
            .collect()
    }

    /// parent index -> child indices, self references left out
    fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.len()];
        for relation in self.relations() {
            if relation.is_self_reference() {
                continue;
            }
            if let (Some(parent), Some(child)) =
                (self.index_of(&relation.parent), self.index_of(&relation.child))
            {
                if !adjacency[parent].contains(&child) {
                    adjacency[parent].push(child);
                }
            }
        }
        adjacency
    }

    /// Strongly connected components, each sorted by node index, ordered by
    /// their smallest member
    fn components(&self) -> Vec<Vec<usize>> {
        let adjacency = self.adjacency();
        let mut tarjan = Tarjan::new(&adjacency);
        for v in 0..adjacency.len() {
            if tarjan.index[v] == UNVISITED {
                tarjan.visit(v);
            }
        }
        let mut components = tarjan.components;
        components.sort_by_key(|c| c[0]);
        components
    }
}

/// Kahn's algorithm over the component DAG, smallest ready component first
fn condensed_order(components: &[Vec<usize>], adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut component_of = vec![0; adjacency.len()];
    for (c, members) in components.iter().enumerate() {
        for &v in members {
            component_of[v] = c;
        }
    }

    let mut children: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    for (parent, kids) in adjacency.iter().enumerate() {
        for &child in kids {
            let (pc, cc) = (component_of[parent], component_of[child]);
            if pc != cc {
                children[pc].insert(cc);
            }
        }
    }
    let mut in_degree = vec![0usize; components.len()];
    for kids in &children {
        for &c in kids {
            in_degree[c] += 1;
        }
    }

    // Components are sorted by smallest member, so the component index is
    // already the input-order tie break.
    let mut ready: BTreeSet<usize> = (0..components.len())
        .filter(|&c| in_degree[c] == 0)
        .collect();
    let mut order = Vec::with_capacity(components.len());
    while let Some(c) = ready.pop_first() {
        order.push(c);
        for &child in &children[c] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }
    order
}

const UNVISITED: usize = usize::MAX;

struct Tarjan<'a> {
    adjacency: &'a [Vec<usize>],
    index: Vec<usize>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next: usize,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(adjacency: &'a [Vec<usize>]) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            index: vec![UNVISITED; n],
            low: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next: 0,
            components: Vec::new(),
        }
    }

    fn enter(&mut self, v: usize) {
        self.index[v] = self.next;
        self.low[v] = self.next;
        self.next += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }

    /// Iterative depth-first walk from `root`; each frame is (node, next edge)
    fn visit(&mut self, root: usize) {
        self.enter(root);
        let mut frames = vec![(root, 0usize)];

        while let Some(frame) = frames.last_mut() {
            let (v, edge) = *frame;
            let next = self.adjacency[v].get(edge).copied();
            if let Some(w) = next {
                frame.1 += 1;
                if self.index[w] == UNVISITED {
                    self.enter(w);
                    frames.push((w, 0));
                } else if self.on_stack[w] {
                    self.low[v] = self.low[v].min(self.index[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.low[parent] = self.low[parent].min(self.low[v]);
            }
            if self.low[v] == self.index[v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                self.components.push(component);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchError;
    use crate::fixtures::{MemorySchema, abc_schema};
    use dbfixture_core::{ForeignKeyInfo, TableMetadata};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table(name: &str, parents: &[&str]) -> TableMetadata {
        let mut columns = vec!["id".to_string()];
        columns.extend(parents.iter().map(|p| format!("{}_id", p)));
        let mut meta = TableMetadata::with_column_names(name, columns).primary_key(["id"]);
        for parent in parents {
            meta = meta.foreign_key(ForeignKeyInfo::new([format!("{}_id", parent)], *parent, ["id"]));
        }
        meta
    }

    fn schema(tables: &[(&str, &[&str])]) -> MemorySchema {
        tables.iter().fold(MemorySchema::new(), |schema, (name, parents)| {
            schema.table(table(name, parents), Vec::new())
        })
    }

    #[rstest]
    #[case(&["A", "B", "C"])]
    #[case(&["C", "B", "A"])]
    #[case(&["B", "A", "C"])]
    fn test_insert_order_puts_parents_first(#[case] input: &[&str]) {
        let order = order_tables(&abc_schema(), input, Direction::Insert, &FixtureConfig::default())
            .unwrap();
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_delete_order_puts_children_first() {
        let order = order_tables(
            &abc_schema(),
            &["C", "A", "B"],
            Direction::Delete,
            &FixtureConfig::default(),
        )
        .unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unrelated_tables_keep_input_order() {
        let schema = schema(&[("x", &[]), ("y", &[]), ("z", &[])]);
        let order =
            order_tables(&schema, &["z", "x", "y"], Direction::Insert, &FixtureConfig::default())
                .unwrap();
        assert_eq!(order, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_ties_resolve_by_input_order() {
        // orders and reviews both depend on customers only
        let schema = schema(&[
            ("customers", &[]),
            ("reviews", &["customers"]),
            ("orders", &["customers"]),
        ]);
        let order = order_tables(
            &schema,
            &["orders", "reviews", "customers"],
            Direction::Insert,
            &FixtureConfig::default(),
        )
        .unwrap();
        assert_eq!(order, vec!["customers", "orders", "reviews"]);
    }

    #[test]
    fn test_long_chain_components() {
        // 0 -> 1 -> ... -> n-1, with the last edge closing a cycle over the tail
        let n = 200_000;
        let mut adjacency: Vec<Vec<usize>> = (0..n).map(|v| vec![v + 1]).collect();
        adjacency[n - 1] = vec![n - 3];

        let mut tarjan = Tarjan::new(&adjacency);
        tarjan.visit(0);
        assert!(tarjan.index.iter().all(|&i| i != UNVISITED));
        assert_eq!(tarjan.components.len(), n - 2);
        assert_eq!(tarjan.components[0], vec![n - 3, n - 2, n - 1]);

        let mut components = tarjan.components;
        components.sort_by_key(|c| c[0]);
        let order = condensed_order(&components, &adjacency);
        assert_eq!(order.first(), Some(&0));
        assert_eq!(order.len(), n - 2);
    }

    #[test]
    fn test_cycles_are_ordered_deterministically() {
        // a <-> b cycle, c depends on b, d is unrelated
        let schema = schema(&[("a", &["b"]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
        let config = FixtureConfig::default();
        let first = order_tables(&schema, &["c", "b", "d", "a"], Direction::Insert, &config).unwrap();
        let second = order_tables(&schema, &["c", "b", "d", "a"], Direction::Insert, &config).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_cycles_reports_groups() {
        let schema = schema(&[("a", &["b"]), ("b", &["a"]), ("c", &["b"])]);
        let graph = GraphBuilder::new(&schema, &FixtureConfig::default())
            .build(&["c", "a", "b"])
            .unwrap();
        assert_eq!(graph.cycles(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_self_reference_does_not_constrain_order() {
        let order = order_tables(&abc_schema(), &["C"], Direction::Insert, &FixtureConfig::default())
            .unwrap();
        assert_eq!(order, vec!["C"]);
    }

    #[test]
    fn test_no_table_appears_twice() {
        let order = order_tables(
            &abc_schema(),
            &["A", "a", "B", "A"],
            Direction::Insert,
            &FixtureConfig::default(),
        )
        .unwrap();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn test_unknown_table_fails() {
        let err = order_tables(&abc_schema(), &["A", "nope"], Direction::Insert, &FixtureConfig::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingMetadata(_)));
    }
}
