//! Cypher statements and the fluent query builder.

use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::OgmError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::CypherExecutor;

/// A Cypher statement ready to be handed to a [`CypherExecutor`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// The Cypher text. Values are always passed as parameters.
    pub cypher: String,
    /// Parameters referenced as `$name` in the Cypher text.
    pub params: Params,
    /// Column names produced by the RETURN clause, in order.
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            ..Self::default()
        }
    }
}

/// A builder for constructing and executing Cypher queries.
///
/// # Example
///
/// ```ignore
/// let rows = Query::new(&client, "MATCH (n:Person) WHERE id(n) = $id RETURN n")
///     .returns(["n"])
///     .param("id", 42)
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: CypherExecutor + ?Sized> {
    executor: &'a E,
    statement: Statement,
    error: Option<OgmError>,
}

impl<'a, E: CypherExecutor + ?Sized> Query<'a, E> {
    /// Creates a new query builder for the given Cypher text.
    pub fn new(executor: &'a E, cypher: &str) -> Self {
        Self::from_statement(executor, Statement::new(cypher))
    }

    /// Wraps an already-built statement.
    pub fn from_statement(executor: &'a E, statement: Statement) -> Self {
        Self {
            executor,
            statement,
            error: None,
        }
    }

    /// Declares the columns produced by the RETURN clause.
    pub fn returns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a parameter to the query.
    ///
    /// A value that fails to serialize is reported when the query executes.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(json_value) => {
                self.statement.params.insert(name.to_string(), json_value);
            }
            Err(e) => {
                self.error.get_or_insert_with(|| {
                    OgmError::Internal(format!("failed to serialize parameter '{}': {}", name, e))
                });
            }
        }
        self
    }

    /// Adds a parameter that's already a JSON value.
    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.statement.params.insert(name.to_string(), value);
        self
    }

    /// Executes the query and returns a stream of rows.
    pub async fn execute(self) -> Result<RowStream<'a>, OgmError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.executor.execute(self.statement).await
    }

    /// Executes the query and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, OgmError> {
        self.execute().await?.try_collect().await
    }

    /// Executes the query and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, OgmError> {
        let mut stream = self.execute().await?;
        stream.next().await.transpose()
    }

    /// Executes the query and drains its results.
    ///
    /// Use this for mutations (CREATE, MERGE, DELETE, SET).
    pub async fn run(self) -> Result<(), OgmError> {
        let mut stream = self.execute().await?;
        while let Some(result) = stream.next().await {
            result?;
        }
        Ok(())
    }
}

/// Extension trait providing a convenient `query()` method.
pub trait QueryExt: CypherExecutor {
    /// Creates a new query builder for this executor.
    fn query(&self, cypher: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, cypher)
    }
}

impl<E: CypherExecutor> QueryExt for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockExecutor {
        expected: Statement,
    }

    #[async_trait::async_trait]
    impl CypherExecutor for MockExecutor {
        async fn execute(&self, statement: Statement) -> Result<RowStream<'_>, OgmError> {
            assert_eq!(statement, self.expected);
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    #[tokio::test]
    async fn test_query_no_params() {
        let executor = MockExecutor {
            expected: Statement {
                cypher: "MATCH (n) RETURN n".to_string(),
                params: HashMap::new(),
                columns: vec!["n".to_string()],
            },
        };

        let rows = executor
            .query("MATCH (n) RETURN n")
            .returns(["n"])
            .fetch_all()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_query_with_params() {
        let mut params = HashMap::new();
        params.insert("id".to_string(), serde_json::json!(7));
        params.insert("name".to_string(), serde_json::json!("Ada"));

        let executor = MockExecutor {
            expected: Statement {
                cypher: "MATCH (n) WHERE id(n) = $id AND n.name = $name RETURN n".to_string(),
                params,
                columns: vec!["n".to_string()],
            },
        };

        let row = executor
            .query("MATCH (n) WHERE id(n) = $id AND n.name = $name RETURN n")
            .returns(["n"])
            .param("id", 7)
            .param_raw("name", serde_json::json!("Ada"))
            .fetch_one()
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_query_run_without_columns() {
        let executor = MockExecutor {
            expected: Statement::new("CREATE (n:Person)"),
        };

        assert!(executor.query("CREATE (n:Person)").run().await.is_ok());
    }

    #[tokio::test]
    async fn test_unserializable_param_reported_on_execute() {
        let executor = MockExecutor {
            expected: Statement::default(),
        };

        let mut bad_key = HashMap::new();
        bad_key.insert(vec![1u8], 1);

        let result = executor.query("RETURN 1").param("bad", bad_key).run().await;
        assert!(matches!(result, Err(OgmError::Internal(_))));
    }
}
