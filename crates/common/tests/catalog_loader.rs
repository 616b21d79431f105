//! Integration tests for catalog discovery

mod common;

use ::common::{Engine, FsError, LoaderOptions, NodeKind};

use crate::common::{num, setup_engine, ScriptedClient};

#[tokio::test]
async fn test_root_lists_databases() {
    let client = ScriptedClient::new()
        .database("shop", &["orders"])
        .database("hr", &["staff"]);
    let engine = setup_engine(client, LoaderOptions::default()).await;

    assert_eq!(engine.list_directory("/").unwrap(), vec!["hr", "shop"]);
    assert_eq!(engine.list_directory("/shop").unwrap(), vec!["orders"]);
    assert_eq!(engine.list_directory("/hr").unwrap(), vec!["staff"]);
    assert!(engine.list_directory("/shop/orders").unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_table_listing_keeps_empty_database() {
    let client = ScriptedClient::new()
        .broken_database("locked")
        .database("shop", &["orders"]);
    let engine = Engine::new(Box::new(client), LoaderOptions::default());

    let stats = engine.refresh().await.unwrap();
    assert_eq!(stats.databases, 2);
    assert_eq!(stats.tables, 1);
    assert_eq!(stats.failed_databases, 1);

    assert!(engine.list_directory("/locked").unwrap().is_empty());
    assert_eq!(engine.list_directory("/shop").unwrap(), vec!["orders"]);
}

#[tokio::test]
async fn test_database_listing_failure_is_fatal() {
    let engine = Engine::new(
        Box::new(ScriptedClient::new().unavailable()),
        LoaderOptions::default(),
    );

    let err = engine.refresh().await.unwrap_err();
    assert!(matches!(err, FsError::CatalogUnavailable(_)));
    assert!(engine.list_directory("/").unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let client = ScriptedClient::new().database("shop", &["orders", "users"]);
    let engine = setup_engine(client, LoaderOptions::default()).await;

    let stats = engine.refresh().await.unwrap();
    assert_eq!(stats.databases, 0);
    assert_eq!(stats.tables, 0);
    assert_eq!(engine.catalog().nodes().len(), 4);
}

#[tokio::test]
async fn test_duplicate_names_are_inserted_once() {
    let client = ScriptedClient::new()
        .database("shop", &["orders", "orders"])
        .database("shop", &["orders"]);
    let engine = setup_engine(client, LoaderOptions::default()).await;

    assert_eq!(engine.list_directory("/").unwrap(), vec!["shop"]);
    assert_eq!(engine.list_directory("/shop").unwrap(), vec!["orders"]);
}

#[tokio::test]
async fn test_count_links() {
    let client = ScriptedClient::new()
        .database("shop", &["orders"])
        .result("SELECT COUNT(*) FROM shop.orders", &["COUNT(*)"], vec![vec![num(42)]]);
    let engine = setup_engine(client, LoaderOptions { count_links: true }).await;

    let link = "/shop/orders/count";
    assert_eq!(
        engine.read_link(link).unwrap(),
        "SELECT COUNT(*) FROM shop.orders"
    );

    let target = "/shop/orders/SELECT COUNT(*) FROM shop.orders";
    let node_kind = engine.catalog().nodes().get(target).map(|n| n.kind);
    assert!(matches!(node_kind, Some(NodeKind::QueryTarget { .. })));

    engine.open(target, ::common::OpenMode::READ_ONLY).await.unwrap();
    assert_eq!(engine.read(target, 64, 0).unwrap(), b"42\n");
}

#[tokio::test]
async fn test_count_links_disabled_by_default() {
    let client = ScriptedClient::new().database("shop", &["orders"]);
    let engine = setup_engine(client, LoaderOptions::default()).await;

    assert!(engine.list_directory("/shop/orders").unwrap().is_empty());
    assert_eq!(engine.catalog().query_count(), 0);
}
