//! PostgreSQL + Apache AGE backend implementation.
//!
//! # Example
//!
//! ```ignore
//! use graph_ogm::graph::backends::postgres::PostgresClient;
//! use graph_ogm::graph::QueryExt;
//!
//! let client = PostgresClient::connect("postgresql://localhost/mydb", "my_graph", 16).await?;
//!
//! let rows = client.query("MATCH (n:Person) RETURN n")
//!     .returns(["n"])
//!     .fetch_all()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use futures::TryStreamExt;
use serde_json::Value as JsonValue;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::NoTls;

use crate::error::OgmError;
use crate::graph::row::{Row, RowStream};
use crate::graph::statement::Statement;
use crate::graph::traits::CypherExecutor;
use crate::metadata::is_identifier;

/// Wrapper for AGE agtype parameter values.
///
/// AGE's `cypher()` function takes its parameter map as `agtype`, whose
/// binary format is a version byte (1) followed by JSON text.
///
/// Parameters travel as typed binary data through the extended query
/// protocol and are never interpolated into the Cypher text.
#[derive(Debug, Clone)]
struct Agtype(String);

impl ToSql for Agtype {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.extend_from_slice(&[1]);
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        // OID varies per installation
        ty.name() == "agtype"
    }

    to_sql_checked!();
}

/// PostgreSQL + Apache AGE graph client.
///
/// Cheap to clone: the connection pool is `Arc`-based.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
    graph_name: Arc<str>,
}

impl PostgresClient {
    /// Creates a new client with a pool of at most `pool_size` connections.
    ///
    /// The graph name must be a plain identifier; it is embedded in SQL.
    pub async fn connect(
        connection_string: &str,
        graph_name: &str,
        pool_size: usize,
    ) -> Result<Self, OgmError> {
        if !is_identifier(graph_name) {
            return Err(OgmError::InvalidMapping(format!(
                "graph name '{}' is not a valid identifier",
                graph_name
            )));
        }

        let pg_config: tokio_postgres::Config = connection_string.parse().map_err(|e| {
            OgmError::Connection(format!("Invalid PostgreSQL connection string: {}", e))
        })?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(pool_size)
            .build()
            .map_err(|e| OgmError::Connection(format!("Failed to create connection pool: {}", e)))?;

        tracing::debug!(graph = graph_name, pool_size, "PostgreSQL pool created");

        Ok(Self {
            pool,
            graph_name: Arc::from(graph_name),
        })
    }

    /// Gets a connection from the pool with AGE session setup.
    async fn get_connection(&self) -> Result<Object, OgmError> {
        let conn = self.pool.get().await.map_err(|e| {
            OgmError::Connection(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.batch_execute("LOAD 'age'; SET search_path = ag_catalog, public;")
            .await
            .map_err(|e| OgmError::Connection(format!("Failed to initialize AGE session: {}", e)))?;

        Ok(conn)
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    /// Ensures the AGE graph exists, creating it if necessary.
    pub async fn ensure_graph_exists(&self) -> Result<(), OgmError> {
        let conn = self.get_connection().await?;

        // AGE has no IF NOT EXISTS for create_graph
        let sql = format!(
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (
                    SELECT 1 FROM ag_catalog.ag_graph WHERE name = '{}'
                ) THEN
                    PERFORM ag_catalog.create_graph('{}');
                END IF;
            END $$;
            "#,
            self.graph_name, self.graph_name
        );

        conn.batch_execute(&sql)
            .await
            .map_err(|e| OgmError::Query {
                message: format!("Failed to ensure graph exists: {}", e),
                query: sql.clone(),
            })?;

        tracing::info!(graph = %self.graph_name, "Graph ready");
        Ok(())
    }
}

#[async_trait]
impl CypherExecutor for PostgresClient {
    async fn execute(&self, statement: Statement) -> Result<RowStream<'_>, OgmError> {
        let conn = self.get_connection().await?;
        execute_pg_cypher_owned(conn, self.graph_name.clone(), statement)
    }
}

/// Executes a statement via AGE on an owned connection.
///
/// The generator captures the connection, keeping it checked out for the
/// stream's lifetime.
fn execute_pg_cypher_owned(
    conn: Object,
    graph_name: Arc<str>,
    statement: Statement,
) -> Result<RowStream<'static>, OgmError> {
    use async_stream::try_stream;

    let (sql, agtype_param) = build_age_query(&graph_name, &statement)?;
    let cypher = statement.cypher;

    tracing::debug!(cypher = %cypher, "Executing Cypher");

    Ok(Box::pin(try_stream! {
        let stream = match &agtype_param {
            None => conn.query_raw::<_, &Agtype, _>(&sql, std::iter::empty()).await,
            Some(param) => conn.query_raw(&sql, std::iter::once(param)).await,
        };

        let stream = stream.map_err(|e| {
            let detail = e
                .as_db_error()
                .map(|db_err| {
                    format!(
                        "{}: {} ({})",
                        db_err.severity(),
                        db_err.message(),
                        db_err.code().code()
                    )
                })
                .unwrap_or_else(|| e.to_string());
            OgmError::Query {
                message: format!("Cypher query failed: {}", detail),
                query: cypher.clone(),
            }
        })?;

        futures::pin_mut!(stream);
        while let Some(pg_row) = stream.try_next().await.map_err(|e| {
            OgmError::Connection(format!("Failed to fetch row: {}", e))
        })? {
            yield parse_pg_row(&pg_row);
        }
    }))
}

/// Builds the AGE SQL wrapper for a Cypher statement.
///
/// AGE requires the SQL column list to match the RETURN clause, so the
/// statement's declared columns become `agtype` columns. Statements without
/// columns (writes) get a placeholder column.
///
/// For `columns = ["n"]` and a non-empty parameter map this produces
/// `SELECT * FROM cypher('g', $$ ... $$, $1) as ("n" agtype)`.
fn build_age_query(
    graph_name: &str,
    statement: &Statement,
) -> Result<(String, Option<Agtype>), OgmError> {
    if statement.cypher.contains("$$") {
        return Err(OgmError::Query {
            message: "Cypher text may not contain '$$'".into(),
            query: statement.cypher.clone(),
        });
    }

    let columns_sql = if statement.columns.is_empty() {
        "result agtype".to_string()
    } else {
        statement
            .columns
            .iter()
            // Always quoted: columns like "count" are reserved words
            .map(|name| format!("\"{}\" agtype", name.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(", ")
    };

    if statement.params.is_empty() {
        let sql = format!(
            "SELECT * FROM cypher('{}', $$ {} $$) as ({})",
            graph_name, statement.cypher, columns_sql
        );
        Ok((sql, None))
    } else {
        let sql = format!(
            "SELECT * FROM cypher('{}', $$ {} $$, $1) as ({})",
            graph_name, statement.cypher, columns_sql
        );
        let params_json = serde_json::to_string(&statement.params)
            .map_err(|e| OgmError::Internal(format!("Failed to serialize parameters: {}", e)))?;
        Ok((sql, Some(Agtype(params_json))))
    }
}

/// Parses a PostgreSQL row into our generic Row type.
///
/// AGE columns are decoded as agtype; the few plain SQL types AGE sessions
/// produce are mapped to their JSON equivalents.
fn parse_pg_row(pg_row: &tokio_postgres::Row) -> Row {
    let mut data = HashMap::new();

    for (idx, column) in pg_row.columns().iter().enumerate() {
        let name = column.name().to_string();

        let value = match column.type_().name() {
            "agtype" => pg_row
                .try_get::<_, AgtypeValue>(idx)
                .ok()
                .map(|v| v.0),
            "int8" => pg_row
                .try_get::<_, i64>(idx)
                .ok()
                .map(|v| JsonValue::Number(v.into())),
            "bool" => pg_row.try_get::<_, bool>(idx).ok().map(JsonValue::Bool),
            "json" | "jsonb" => pg_row.try_get::<_, JsonValue>(idx).ok(),
            _ => pg_row.try_get::<_, String>(idx).ok().map(JsonValue::String),
        };

        data.insert(name, value.unwrap_or(JsonValue::Null));
    }

    Row::new(data)
}

/// Wrapper for reading agtype values from PostgreSQL.
#[derive(Debug)]
struct AgtypeValue(JsonValue);

impl<'a> tokio_postgres::types::FromSql<'a> for AgtypeValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.is_empty() {
            return Ok(AgtypeValue(JsonValue::Null));
        }

        let json_bytes = if raw[0] == 1 { &raw[1..] } else { raw };
        let json_str = std::str::from_utf8(json_bytes)?;

        Ok(AgtypeValue(parse_agtype_text(json_str)?))
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "agtype"
    }
}

/// Parses agtype text, dropping the `::vertex` / `::edge` / `::path` suffix.
fn parse_agtype_text(text: &str) -> Result<JsonValue, serde_json::Error> {
    let clean = text
        .trim_end_matches("::vertex")
        .trim_end_matches("::edge")
        .trim_end_matches("::path");
    serde_json::from_str(clean)
}
