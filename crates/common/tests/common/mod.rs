//! Shared fixtures: a scripted in-memory SQL client

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use ::common::{ClientError, Datum, Engine, LoaderOptions, Row, RowSet, SqlClient};

/// Canned result for one statement
#[derive(Clone)]
pub struct Canned {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// SQL client answering from fixed tables
///
/// Statements without a canned result succeed with an empty row set when
/// they are writes and fail otherwise. Every executed statement is recorded,
/// and so is every bound execution together with its values.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    pub databases: Option<Vec<String>>,
    pub tables: HashMap<String, Result<Vec<String>, ClientError>>,
    pub results: HashMap<String, Result<Canned, ClientError>>,
    pub rejected_rows: HashMap<Vec<Option<String>>, String>,
    pub executed: Arc<Mutex<Vec<String>>>,
    pub bound: Arc<Mutex<Vec<(String, Vec<Option<String>>)>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            databases: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn database(mut self, name: &str, tables: &[&str]) -> Self {
        self.databases
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
        self.tables.insert(
            name.to_string(),
            Ok(tables.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn broken_database(mut self, name: &str) -> Self {
        self.databases
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
        self.tables.insert(
            name.to_string(),
            Err(ClientError::Query("access denied".to_string())),
        );
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.databases = None;
        self
    }

    pub fn result(mut self, sql: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        self.results.insert(
            sql.to_string(),
            Ok(Canned {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            }),
        );
        self
    }

    pub fn failing(mut self, sql: &str, message: &str) -> Self {
        self.results
            .insert(sql.to_string(), Err(ClientError::Query(message.to_string())));
        self
    }

    /// Fail any bound execution whose values are exactly `values`
    pub fn failing_row(mut self, values: &[&str], message: &str) -> Self {
        let values = values.iter().map(|v| Some(v.to_string())).collect();
        self.rejected_rows.insert(values, message.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Bound executions that succeeded, in order
    pub fn bound(&self) -> Vec<(String, Vec<Option<String>>)> {
        self.bound.lock().clone()
    }
}

#[async_trait]
impl SqlClient for ScriptedClient {
    async fn list_databases(&mut self) -> Result<Vec<String>, ClientError> {
        self.databases
            .clone()
            .ok_or_else(|| ClientError::Connection("server has gone away".to_string()))
    }

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, ClientError> {
        self.tables.get(database).cloned().unwrap_or(Ok(Vec::new()))
    }

    async fn execute(&mut self, sql: &str) -> Result<RowSet, ClientError> {
        self.executed.lock().push(sql.to_string());
        match self.results.get(sql) {
            Some(Ok(canned)) => Ok(RowSet::new(canned.columns.clone(), canned.rows.clone())),
            Some(Err(e)) => Err(e.clone()),
            None if ::common::Classification::of(sql).write => Ok(RowSet::empty()),
            None => Err(ClientError::Query(format!("unexpected statement: {}", sql))),
        }
    }

    async fn execute_bound(
        &mut self,
        template: &str,
        values: &[Option<String>],
    ) -> Result<u64, ClientError> {
        let placeholders = template.matches('?').count();
        if placeholders != values.len() {
            return Err(ClientError::Query(format!(
                "statement has {} placeholders but {} values were given",
                placeholders,
                values.len()
            )));
        }
        if let Some(message) = self.rejected_rows.get(values) {
            return Err(ClientError::Query(message.clone()));
        }

        self.bound
            .lock()
            .push((template.to_string(), values.to_vec()));
        Ok(1)
    }
}

pub fn row(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

pub fn num(n: i64) -> Option<Datum> {
    Some(Datum::number(n))
}

pub fn text(s: &str) -> Option<Datum> {
    Some(Datum::text(s))
}

/// Route engine logs to the test harness; set RUST_LOG to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Engine over `client` with the catalog already discovered
pub async fn setup_engine(client: ScriptedClient, options: LoaderOptions) -> Engine {
    init_tracing();
    let engine = Engine::new(Box::new(client), options);
    engine.refresh().await.unwrap();
    engine
}

/// Standard fixture: `shop` with two tables, `SELECT 1` and a two-row table
pub fn shop_client() -> ScriptedClient {
    ScriptedClient::new()
        .database("shop", &["orders", "users"])
        .result("SELECT 1", &["1"], vec![vec![num(1)]])
        .result(
            "SELECT * FROM t",
            &["col1", "col2"],
            vec![vec![num(1), text("a")], vec![num(2), None]],
        )
}
