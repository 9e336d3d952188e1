//! Core trait for graph database backends.

use async_trait::async_trait;

use crate::error::OgmError;
use crate::graph::row::RowStream;
use crate::graph::statement::Statement;

/// Executes Cypher statements against a graph database.
///
/// This is the seam every backend implements. Persisters only ever talk to
/// the database through it, so the trait must stay object safe.
#[async_trait]
pub trait CypherExecutor: Send + Sync {
    /// Executes a statement and returns a stream of result rows.
    ///
    /// The statement's `columns` name the values produced by its RETURN
    /// clause, in order. Statements without a RETURN clause use no columns.
    async fn execute(&self, statement: Statement) -> Result<RowStream<'_>, OgmError>;
}
