//! Path → node mapping
//!
//! There are no parent/child links: directory listings scan every stored
//! path for the directory's prefix. That is linear in the number of nodes,
//! which is fine at catalog scale.

use std::collections::BTreeMap;

use crate::error::{FsError, Result};
use crate::node::Node;
use crate::path;

#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: BTreeMap<String, Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Node> {
        self.nodes.get(&path::normalize(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(&path::normalize(path))
    }

    /// Insert a node unless one already exists at `path`
    ///
    /// Returns `false` and leaves the store untouched on collision.
    pub fn insert(&mut self, path: &str, node: Node) -> bool {
        let key = path::normalize(path);
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(key, node);
        true
    }

    pub fn remove(&mut self, path: &str) -> Option<Node> {
        self.nodes.remove(&path::normalize(path))
    }

    /// Names of the immediate children of a directory node
    pub fn children(&self, dir: &str) -> Result<Vec<String>> {
        let node = self.get(dir).ok_or(FsError::NotFound)?;
        if !node.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let prefix = path::child_prefix(dir);
        Ok(self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains(path::SEPARATOR)).then(|| rest.to_string())
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(path, node)| (path.as_str(), node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::query::QueryId;

    fn sample() -> NodeStore {
        let mut store = NodeStore::new();
        store.insert("/", Node::root());
        store.insert("/shop", Node::database());
        store.insert("/shop/orders", Node::table());
        store.insert("/shop/users", Node::table());
        store.insert("/hr", Node::database());
        store.insert("/hr/staff", Node::table());
        store
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut store = sample();
        assert!(!store.insert("/shop", Node::table()));
        assert_eq!(store.get("/shop"), Some(&Node::database()));
    }

    #[test]
    fn test_lookup_normalizes() {
        let store = sample();
        assert!(store.get("/shop/orders/").is_some());
        assert!(store.get("shop").is_some());
        assert!(store.get("/nope").is_none());
    }

    #[test]
    fn test_children_of_root() {
        let store = sample();
        assert_eq!(store.children("/").unwrap(), vec!["hr", "shop"]);
    }

    #[test]
    fn test_children_are_immediate_only() {
        let mut store = sample();
        let id = QueryId(1);
        store.insert("/shop/orders/q.csv", Node::query_link(id));
        store.insert(
            "/shop/orders/SELECT 1",
            Node::query_target(id, Classification::of("SELECT 1")),
        );

        assert_eq!(store.children("/shop").unwrap(), vec!["orders", "users"]);
        assert_eq!(
            store.children("/shop/orders").unwrap(),
            vec!["SELECT 1", "q.csv"]
        );
        assert!(store.children("/shop/users").unwrap().is_empty());
    }

    #[test]
    fn test_children_prefix_does_not_match_siblings() {
        let mut store = sample();
        store.insert("/shopping", Node::database());
        store.insert("/shopping/carts", Node::table());
        assert_eq!(store.children("/shop").unwrap(), vec!["orders", "users"]);
    }

    #[test]
    fn test_children_errors() {
        let mut store = sample();
        store.insert("/shop/orders/q", Node::query_link(QueryId(2)));
        assert_eq!(store.children("/missing"), Err(FsError::NotFound));
        assert_eq!(
            store.children("/shop/orders/q"),
            Err(FsError::NotADirectory)
        );
    }
}
