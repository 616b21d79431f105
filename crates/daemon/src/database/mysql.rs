//! [`SqlClient`] over a single MySQL session
//!
//! Statements go through the text protocol so that `SHOW` and `DESC` work
//! the same as `SELECT`, and every cell arrives as its textual rendering.
//! Row writes are prepared once per row and take their values as bound
//! parameters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::ConnectOptions as _;
use sqlx::{
    Column, Connection, Either, Executor as _, Row as _, Statement as _, TypeInfo, ValueRef,
};

use common::{ClientError, Datum, Row, RowSet, SqlClient};

/// Column types rendered bare rather than quoted
const NUMERIC_TYPES: &[&str] = &[
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "INT",
    "BIGINT",
    "DECIMAL",
    "FLOAT",
    "DOUBLE",
    "YEAR",
];

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
        }
    }
}

pub struct MySqlClient {
    conn: MySqlConnection,
}

impl MySqlClient {
    pub async fn connect(options: &ConnectOptions) -> Result<Self, ClientError> {
        tracing::info!(host = %options.host, port = options.port, user = %options.user, "connecting to mysql");

        let conn = MySqlConnectOptions::new()
            .host(&options.host)
            .port(options.port)
            .username(&options.user)
            .password(&options.password)
            .connect()
            .await
            .map_err(client_error)?;

        Ok(Self { conn })
    }

    pub async fn close(self) -> Result<(), ClientError> {
        self.conn.close().await.map_err(client_error)
    }

    async fn fetch(&mut self, sql: &str) -> Result<Vec<MySqlRow>, ClientError> {
        (&mut self.conn)
            .fetch_all(sqlx::raw_sql(sql))
            .await
            .map_err(client_error)
    }

    /// Column names from statement metadata, for results without rows
    async fn describe_columns(&mut self, sql: &str) -> Vec<String> {
        match (&mut self.conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "no column metadata for empty result");
                Vec::new()
            }
        }
    }

    /// First column of every row, as text
    async fn names(&mut self, sql: &str) -> Result<Vec<String>, ClientError> {
        let rows = self.fetch(sql).await?;
        rows.iter()
            .map(|row| {
                let bytes: Vec<u8> = row.try_get_unchecked(0usize).map_err(client_error)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            })
            .collect()
    }
}

#[async_trait]
impl SqlClient for MySqlClient {
    async fn list_databases(&mut self) -> Result<Vec<String>, ClientError> {
        self.names("SHOW DATABASES").await
    }

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, ClientError> {
        let sql = format!("SHOW TABLES FROM {}", quote_identifier(database));
        self.names(&sql).await
    }

    async fn execute(&mut self, sql: &str) -> Result<RowSet, ClientError> {
        let rows = self.fetch(sql).await?;

        // the text protocol only carries column metadata alongside rows
        let columns: Vec<String> = match rows.first() {
            Some(row) => row
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
            None => self.describe_columns(sql).await,
        };

        let rows = rows
            .iter()
            .map(convert_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(client_error)?;

        tracing::debug!(rows = rows.len(), "statement executed");
        Ok(RowSet::new(columns, rows))
    }

    async fn execute_bound(
        &mut self,
        template: &str,
        values: &[Option<String>],
    ) -> Result<u64, ClientError> {
        let statement = (&mut self.conn)
            .prepare(template)
            .await
            .map_err(client_error)?;

        let expected = match statement.parameters() {
            Some(Either::Left(types)) => types.len(),
            Some(Either::Right(count)) => count,
            None => values.len(),
        };
        check_arity(expected, values.len())?;

        let mut query = statement.query();
        for value in values {
            query = query.bind(value.clone());
        }

        let result = query.execute(&mut self.conn).await.map_err(client_error)?;
        tracing::trace!(affected = result.rows_affected(), "row executed");
        Ok(result.rows_affected())
    }
}

fn check_arity(placeholders: usize, values: usize) -> Result<(), ClientError> {
    if placeholders == values {
        return Ok(());
    }
    Err(ClientError::Query(format!(
        "statement has {} placeholders but the row has {} values",
        placeholders, values
    )))
}

fn convert_row(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            if row.try_get_raw(index)?.is_null() {
                return Ok(None);
            }

            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            let value = String::from_utf8_lossy(&bytes).into_owned();
            let datum = if is_numeric(column.type_info().name()) {
                Datum::Number(value)
            } else {
                Datum::Text(value)
            };
            Ok(Some(datum))
        })
        .collect()
}

fn is_numeric(type_name: &str) -> bool {
    let base = type_name.trim_end_matches(" UNSIGNED");
    NUMERIC_TYPES.contains(&base)
}

/// Backtick-quote an identifier
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn client_error(err: sqlx::Error) -> ClientError {
    match err {
        sqlx::Error::Database(e) => ClientError::Query(e.message().to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => ClientError::Query(err.to_string()),
        other => ClientError::Connection(other.to_string()),
    }
}
