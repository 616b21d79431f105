//! The in-memory catalog: node store plus the table of live queries
//!
//! Databases and tables are discovered once by [`refresh`]; afterwards only
//! user-created queries change the namespace.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::client::SqlClient;
use crate::error::{FsError, Result};
use crate::node::Node;
use crate::path;
use crate::query::{Query, QueryId};
use crate::store::NodeStore;

/// Name of the per-table link created when count links are enabled
pub const COUNT_LINK_NAME: &str = "count";

/// Options for catalog discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Create a `count` query link in every discovered table
    pub count_links: bool,
}

/// Summary of one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Databases newly added
    pub databases: usize,
    /// Tables newly added
    pub tables: usize,
    /// Databases whose table listing failed
    pub failed_databases: usize,
}

#[derive(Debug)]
pub struct Catalog {
    nodes: NodeStore,
    queries: HashMap<QueryId, Query>,
    next_query: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a catalog holding only the root directory
    pub fn new() -> Self {
        let mut nodes = NodeStore::new();
        nodes.insert(path::ROOT, Node::root());
        Self {
            nodes,
            queries: HashMap::new(),
            next_query: 1,
        }
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn query(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(&id)
    }

    pub fn query_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.queries.get_mut(&id)
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Add `/name`; returns `false` if it was already known
    pub fn add_database(&mut self, name: &str) -> bool {
        self.nodes.insert(&path::join(path::ROOT, name), Node::database())
    }

    /// Add `/database/table`; returns `false` if it was already known
    pub fn add_table(&mut self, database: &str, table: &str) -> bool {
        let db_path = path::join(path::ROOT, database);
        self.nodes
            .insert(&path::join(&db_path, table), Node::table())
    }

    /// Add the tables of a known database, with count links if enabled
    ///
    /// Returns how many tables were new.
    pub fn add_tables(
        &mut self,
        database: &str,
        tables: Vec<String>,
        options: &LoaderOptions,
    ) -> usize {
        let mut added = 0;
        for table in tables {
            if table.is_empty() || table.contains(path::SEPARATOR) {
                tracing::warn!(database = %database, table = %table, "skipping table with unusable name");
                continue;
            }
            if !self.add_table(database, &table) {
                continue;
            }
            added += 1;

            if options.count_links {
                let table_path = path::join(&path::join(path::ROOT, database), &table);
                let link = path::join(&table_path, COUNT_LINK_NAME);
                let text = format!("SELECT COUNT(*) FROM {}.{}", database, table);
                if let Err(e) = self.create_query(&link, &text) {
                    tracing::warn!(path = %link, error = %e, "failed to create count link");
                }
            }
        }
        added
    }

    /// Create a query link at `link_path` and its paired target
    ///
    /// The target lives next to the link, named by the query text itself.
    /// Nothing is inserted if either path is taken.
    pub fn create_query(&mut self, link_path: &str, text: &str) -> Result<QueryId> {
        if text.trim().is_empty() {
            return Err(FsError::InvalidArgument("empty query".to_string()));
        }
        if text.contains(path::SEPARATOR) {
            return Err(FsError::InvalidArgument(
                "query text cannot contain '/'".to_string(),
            ));
        }

        let link_path = path::normalize(link_path);
        let dir = path::parent(&link_path);
        match self.nodes.get(&dir) {
            Some(node) if node.is_dir() => {}
            _ => return Err(FsError::NotFound),
        }

        let target_path = path::join(&dir, text);
        if self.nodes.contains(&link_path) || self.nodes.contains(&target_path) {
            return Err(FsError::AlreadyExists);
        }

        let id = QueryId(self.next_query);
        self.next_query += 1;

        let query = Query::new(text, link_path.clone(), target_path.clone());
        self.nodes.insert(&link_path, Node::query_link(id));
        self.nodes
            .insert(&target_path, Node::query_target(id, query.class));
        self.queries.insert(id, query);

        Ok(id)
    }

    /// Remove a query together with both of its nodes
    pub fn remove_query(&mut self, id: QueryId) -> Option<Query> {
        let query = self.queries.remove(&id)?;
        self.nodes.remove(&query.link_path);
        self.nodes.remove(&query.target_path);
        Some(query)
    }
}

/// Discover databases and tables not yet in the catalog
///
/// A failed database listing is fatal. A failed table listing only leaves
/// that database empty.
pub async fn refresh(
    catalog: &RwLock<Catalog>,
    client: &mut dyn SqlClient,
    options: &LoaderOptions,
) -> Result<RefreshStats> {
    let databases = client.list_databases().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list databases");
        FsError::CatalogUnavailable(e.to_string())
    })?;

    let mut stats = RefreshStats::default();

    for database in databases {
        if database.is_empty() || database.contains(path::SEPARATOR) {
            tracing::warn!(database = %database, "skipping database with unusable name");
            continue;
        }
        if !catalog.write().add_database(&database) {
            continue;
        }
        stats.databases += 1;

        let tables = match client.list_tables(&database).await {
            Ok(tables) => tables,
            Err(e) => {
                tracing::warn!(database = %database, error = %e, "failed to list tables");
                stats.failed_databases += 1;
                continue;
            }
        };

        stats.tables += catalog.write().add_tables(&database, tables, options);

        tracing::debug!(database = %database, "database discovered");
    }

    tracing::info!(
        databases = stats.databases,
        tables = stats.tables,
        failed = stats.failed_databases,
        "catalog refreshed"
    );

    Ok(stats)
}
