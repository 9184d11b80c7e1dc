//! Foreign key graph model and builder
//!
//! A `TableGraph` is built once per search from a `MetadataProvider` and is
//! immutable afterwards. Nodes are tables; edges (`KeyRelation`s) run from the
//! child table holding a foreign key to the parent table it references.

use crate::error::{Result, SearchError};
use dbfixture_core::{FixtureConfig, KeyFollowing, MetadataProvider, TableMetadata, name_key};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// A foreign key edge between two tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRelation {
    /// Constraint name, when the metadata provides one
    pub name: Option<String>,
    /// Table holding the foreign key
    pub child: String,
    /// Foreign key columns of the child
    pub child_columns: Vec<String>,
    /// Referenced table
    pub parent: String,
    /// Referenced columns of the parent, aligned with `child_columns`
    pub parent_columns: Vec<String>,
}

impl KeyRelation {
    pub fn is_self_reference(&self) -> bool {
        self.child == self.parent
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({} -> {})", name, self.child, self.parent),
            None => format!("{} -> {}", self.child, self.parent),
        }
    }
}

/// A table in the graph
#[derive(Debug, Clone)]
pub struct TableNode {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    imported: Vec<usize>,
    exported: Vec<usize>,
}

impl TableNode {
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// Foreign key graph over a set of tables
#[derive(Debug, Clone)]
pub struct TableGraph {
    nodes: IndexMap<String, TableNode>,
    relations: Vec<KeyRelation>,
    external: Vec<KeyRelation>,
    case_sensitive: bool,
}

impl TableGraph {
    fn new(case_sensitive: bool) -> Self {
        Self {
            nodes: IndexMap::new(),
            relations: Vec::new(),
            external: Vec::new(),
            case_sensitive,
        }
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.nodes.contains_key(&name_key(table, self.case_sensitive))
    }

    pub fn node(&self, table: &str) -> Option<&TableNode> {
        self.nodes.get(&name_key(table, self.case_sensitive))
    }

    /// Position of a table in the graph's node order
    pub fn index_of(&self, table: &str) -> Option<usize> {
        self.nodes.get_index_of(&name_key(table, self.case_sensitive))
    }

    /// Tables in node order (the order they were requested or discovered)
    pub fn nodes(&self) -> impl Iterator<Item = &TableNode> {
        self.nodes.values()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.nodes.values().map(|n| n.name.as_str()).collect()
    }

    /// Relations between tables of the graph
    pub fn relations(&self) -> &[KeyRelation] {
        &self.relations
    }

    /// Relations from a graph table to a table outside the graph
    pub fn external_relations(&self) -> &[KeyRelation] {
        &self.external
    }

    /// Foreign keys held by `table` (edges to its parents)
    pub fn imported(&self, table: &str) -> Vec<&KeyRelation> {
        self.node(table)
            .map(|n| n.imported.iter().map(|&i| &self.relations[i]).collect())
            .unwrap_or_default()
    }

    /// Foreign keys referencing `table` (edges from its children)
    pub fn exported(&self, table: &str) -> Vec<&KeyRelation> {
        self.node(table)
            .map(|n| n.exported.iter().map(|&i| &self.relations[i]).collect())
            .unwrap_or_default()
    }

    pub(crate) fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn add_node(&mut self, node: TableNode) {
        self.nodes
            .insert(name_key(&node.name, self.case_sensitive), node);
    }

    fn add_relation(&mut self, relation: KeyRelation) {
        let child_key = name_key(&relation.child, self.case_sensitive);
        let parent_key = name_key(&relation.parent, self.case_sensitive);
        if !self.nodes.contains_key(&parent_key) {
            tracing::trace!(relation = %relation.describe(), "foreign key leaves the graph");
            self.external.push(relation);
            return;
        }
        let idx = self.relations.len();
        self.relations.push(relation);
        if let Some(child) = self.nodes.get_mut(&child_key) {
            child.imported.push(idx);
        }
        if let Some(parent) = self.nodes.get_mut(&parent_key) {
            parent.exported.push(idx);
        }
    }
}

/// Metadata snapshot used while building one graph
struct Catalog<'a, M: MetadataProvider + ?Sized> {
    provider: &'a M,
    case_sensitive: bool,
    names: HashMap<String, String>,
    tables: HashMap<String, TableMetadata>,
}

impl<'a, M: MetadataProvider + ?Sized> Catalog<'a, M> {
    fn load(provider: &'a M, case_sensitive: bool) -> Result<Self> {
        let names = provider
            .table_names()?
            .into_iter()
            .map(|name| (name_key(&name, case_sensitive), name))
            .collect();
        Ok(Self {
            provider,
            case_sensitive,
            names,
            tables: HashMap::new(),
        })
    }

    fn key(&self, name: &str) -> String {
        name_key(name, self.case_sensitive)
    }

    /// Canonical name of a table known to the provider
    fn resolve(&self, name: &str) -> Result<String> {
        self.names
            .get(&self.key(name))
            .cloned()
            .ok_or_else(|| SearchError::MissingMetadata(format!("table '{}'", name)))
    }

    fn metadata(&mut self, canonical: &str) -> Result<&TableMetadata> {
        let key = self.key(canonical);
        if !self.tables.contains_key(&key) {
            let meta = self.provider.table_metadata(canonical)?;
            self.tables.insert(key.clone(), meta);
        }
        self.tables
            .get(&key)
            .ok_or_else(|| SearchError::MissingMetadata(format!("table '{}'", canonical)))
    }

    fn resolve_column(&self, meta: &TableMetadata, column: &str) -> Result<String> {
        meta.column_index(column, self.case_sensitive)
            .map(|idx| meta.columns[idx].name.clone())
            .ok_or_else(|| {
                SearchError::MissingMetadata(format!("column '{}.{}'", meta.name, column))
            })
    }

    fn node(&mut self, canonical: &str) -> Result<TableNode> {
        let meta = self.metadata(canonical)?.clone();
        let primary_key = meta
            .primary_key
            .iter()
            .map(|c| self.resolve_column(&meta, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(TableNode {
            name: canonical.to_string(),
            columns: meta.columns.iter().map(|c| c.name.clone()).collect(),
            primary_key,
            imported: Vec::new(),
            exported: Vec::new(),
        })
    }

    /// Validated foreign keys declared by `canonical`
    fn relations_of(&mut self, canonical: &str) -> Result<Vec<KeyRelation>> {
        let child = self.metadata(canonical)?.clone();
        let mut relations = Vec::with_capacity(child.foreign_keys.len());

        for fk in &child.foreign_keys {
            let parent_name = self.resolve(&fk.referenced_table).map_err(|_| {
                SearchError::MissingMetadata(format!(
                    "table '{}' referenced by '{}'",
                    fk.referenced_table, child.name
                ))
            })?;
            let parent = self.metadata(&parent_name)?.clone();

            let child_columns = fk
                .columns
                .iter()
                .map(|c| self.resolve_column(&child, c))
                .collect::<Result<Vec<_>>>()?;
            // An empty column list references the parent's primary key
            let referenced = if fk.referenced_columns.is_empty() {
                &parent.primary_key
            } else {
                &fk.referenced_columns
            };
            let parent_columns = referenced
                .iter()
                .map(|c| self.resolve_column(&parent, c))
                .collect::<Result<Vec<_>>>()?;

            if child_columns.is_empty() || child_columns.len() != parent_columns.len() {
                return Err(SearchError::MissingMetadata(format!(
                    "foreign key of '{}' has {} columns but references {} columns of '{}'",
                    child.name,
                    child_columns.len(),
                    parent_columns.len(),
                    parent.name
                )));
            }

            relations.push(KeyRelation {
                name: fk.name.clone(),
                child: child.name.clone(),
                child_columns,
                parent: parent.name.clone(),
                parent_columns,
            });
        }

        Ok(relations)
    }

    /// Parent key -> child tables, over every table the provider knows.
    ///
    /// Foreign keys pointing at unknown tables are left out here; they are
    /// reported once their table becomes part of a graph.
    fn children_index(&mut self) -> Result<HashMap<String, Vec<String>>> {
        let mut all: Vec<String> = self.provider.table_names()?;
        all.dedup();
        let mut index: HashMap<String, Vec<String>> = HashMap::new();
        for table in all {
            let foreign_keys = self.metadata(&table)?.foreign_keys.clone();
            for fk in foreign_keys {
                let Ok(parent) = self.resolve(&fk.referenced_table) else {
                    continue;
                };
                let children = index.entry(self.key(&parent)).or_default();
                if !children.contains(&table) {
                    children.push(table.clone());
                }
            }
        }
        Ok(index)
    }
}

/// Builds `TableGraph`s from a metadata provider
pub struct GraphBuilder<'a, M: MetadataProvider + ?Sized> {
    provider: &'a M,
    case_sensitive: bool,
}

impl<'a, M: MetadataProvider + ?Sized> GraphBuilder<'a, M> {
    pub fn new(provider: &'a M, config: &FixtureConfig) -> Self {
        Self {
            provider,
            case_sensitive: config.case_sensitive_table_names,
        }
    }

    /// Graph over exactly `tables`, in the given order.
    ///
    /// Foreign keys to tables outside the list are kept as external relations.
    /// Unknown tables and columns fail with `MissingMetadata`.
    pub fn build<S: AsRef<str>>(&self, tables: &[S]) -> Result<TableGraph> {
        let mut catalog = Catalog::load(self.provider, self.case_sensitive)?;
        let names = tables
            .iter()
            .map(|t| catalog.resolve(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.build_with(&mut catalog, names)
    }

    /// Graph over `seeds` and every table reachable from them along the
    /// key directions selected by `follow`, in discovery order.
    pub fn build_reachable<S: AsRef<str>>(
        &self,
        seeds: &[S],
        follow: KeyFollowing,
    ) -> Result<TableGraph> {
        let mut catalog = Catalog::load(self.provider, self.case_sensitive)?;
        let children = if follow.follows_exported() {
            catalog.children_index()?
        } else {
            HashMap::new()
        };

        let mut visited: IndexMap<String, String> = IndexMap::new();
        let mut queue = VecDeque::new();
        for seed in seeds {
            let table = catalog.resolve(seed.as_ref())?;
            if visited.insert(catalog.key(&table), table.clone()).is_none() {
                queue.push_back(table);
            }
        }

        while let Some(table) = queue.pop_front() {
            let mut next = Vec::new();
            if follow.follows_imported() {
                next.extend(catalog.relations_of(&table)?.into_iter().map(|r| r.parent));
            }
            if let Some(kids) = children.get(&catalog.key(&table)) {
                next.extend(kids.iter().cloned());
            }
            for neighbour in next {
                if visited
                    .insert(catalog.key(&neighbour), neighbour.clone())
                    .is_none()
                {
                    queue.push_back(neighbour);
                }
            }
        }

        self.build_with(&mut catalog, visited.into_values().collect())
    }

    fn build_with(&self, catalog: &mut Catalog<'_, M>, tables: Vec<String>) -> Result<TableGraph> {
        let mut graph = TableGraph::new(self.case_sensitive);
        for table in &tables {
            if graph.contains(table) {
                continue;
            }
            graph.add_node(catalog.node(table)?);
        }
        let members: Vec<String> = graph.nodes().map(|n| n.name.clone()).collect();
        for table in &members {
            for relation in catalog.relations_of(table)? {
                graph.add_relation(relation);
            }
        }

        tracing::debug!(
            tables = graph.len(),
            relations = graph.relations.len(),
            external = graph.external.len(),
            "built foreign key graph"
        );
        Ok(graph)
    }
}
