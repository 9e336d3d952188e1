//! Persister that generates Cypher.
//!
//! Generated statements have these shapes:
//!
//! ```text
//! MATCH (n:Person) WHERE n.name = $p0 AND n.age = $p1 RETURN n ORDER BY n.name ASC SKIP 10 LIMIT 5
//! MATCH (n:Person) WHERE id(n) = $id RETURN n
//! MATCH (n:Person)-[:FRIEND_OF]->(m:Person) WHERE id(n) = $id RETURN DISTINCT m ORDER BY id(m)
//! ```
//!
//! Labels, keys and relationship types come from validated metadata; every
//! criterion value is a parameter.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::criteria::{Criteria, OrderBy, Pagination};
use crate::error::OgmError;
use crate::graph::{CypherExecutor, Node, Params, Query, Statement};
use crate::metadata::{NodeEntityMetadata, RelationshipDirection, RelationshipMetadata};
use crate::persister::{EntityPersister, PersisterFactory};

/// Persister for one class, executing generated Cypher.
pub struct CypherPersister {
    executor: Arc<dyn CypherExecutor>,
    metadata: Arc<NodeEntityMetadata>,
}

impl CypherPersister {
    pub fn new(executor: Arc<dyn CypherExecutor>, metadata: Arc<NodeEntityMetadata>) -> Self {
        Self { executor, metadata }
    }

    /// Builds the statement behind [`load_all`](EntityPersister::load_all).
    pub fn select_statement(
        &self,
        criteria: &Criteria,
        order_by: &OrderBy,
        pagination: Pagination,
    ) -> Result<Statement, OgmError> {
        let mut cypher = format!("MATCH (n:{})", self.metadata.label());
        let mut params = Params::new();

        let mut conditions = Vec::with_capacity(criteria.len());
        for (idx, (field, value)) in criteria.iter().enumerate() {
            let key = self.metadata.property_key(field)?;
            let name = format!("p{}", idx);
            conditions.push(format!("n.{} = ${}", key, name));
            params.insert(name, value.clone());
        }
        if !conditions.is_empty() {
            cypher.push_str(" WHERE ");
            cypher.push_str(&conditions.join(" AND "));
        }

        cypher.push_str(" RETURN n");

        if !order_by.is_empty() {
            let keys = order_by
                .iter()
                .map(|(field, order)| {
                    self.metadata
                        .property_key(field)
                        .map(|key| format!("n.{} {}", key, order))
                })
                .collect::<Result<Vec<_>, _>>()?;
            cypher.push_str(" ORDER BY ");
            cypher.push_str(&keys.join(", "));
        }

        if let Some(first) = pagination.first {
            cypher.push_str(&format!(" SKIP {}", first));
        }
        if let Some(max) = pagination.max {
            cypher.push_str(&format!(" LIMIT {}", max));
        }

        Ok(Statement {
            cypher,
            params,
            columns: vec!["n".to_string()],
        })
    }

    /// Builds the statement behind [`load_one_by_id`](EntityPersister::load_one_by_id).
    pub fn by_id_statement(&self, id: i64) -> Statement {
        let mut params = Params::new();
        params.insert("id".to_string(), id.into());
        Statement {
            cypher: format!("MATCH (n:{}) WHERE id(n) = $id RETURN n", self.metadata.label()),
            params,
            columns: vec!["n".to_string()],
        }
    }

    /// Builds the statement behind [`load_related`](EntityPersister::load_related).
    pub fn related_statement(
        &self,
        id: i64,
        relationship: &RelationshipMetadata,
        target: &NodeEntityMetadata,
    ) -> Statement {
        let rel_type = relationship.rel_type();
        let pattern = match relationship.direction() {
            RelationshipDirection::Outgoing => format!("-[:{}]->", rel_type),
            RelationshipDirection::Incoming => format!("<-[:{}]-", rel_type),
            RelationshipDirection::Both => format!("-[:{}]-", rel_type),
        };

        let mut params = Params::new();
        params.insert("id".to_string(), id.into());
        Statement {
            cypher: format!(
                "MATCH (n:{}){}(m:{}) WHERE id(n) = $id RETURN DISTINCT m ORDER BY id(m)",
                self.metadata.label(),
                pattern,
                target.label()
            ),
            params,
            columns: vec!["m".to_string()],
        }
    }

    async fn fetch_nodes(&self, statement: Statement) -> Result<Vec<Node>, OgmError> {
        tracing::debug!(
            class = self.metadata.class_name(),
            cypher = %statement.cypher,
            "Loading nodes"
        );

        let column = statement.columns.first().cloned().unwrap_or_default();
        Query::from_statement(self.executor.as_ref(), statement)
            .execute()
            .await?
            .and_then(|row| futures::future::ready(row.get::<Node>(&column)))
            .try_collect()
            .await
    }
}

#[async_trait]
impl EntityPersister for CypherPersister {
    fn metadata(&self) -> &NodeEntityMetadata {
        &self.metadata
    }

    async fn load_all(
        &self,
        criteria: &Criteria,
        order_by: &OrderBy,
        pagination: Pagination,
    ) -> Result<Vec<Node>, OgmError> {
        let statement = self.select_statement(criteria, order_by, pagination)?;
        self.fetch_nodes(statement).await
    }

    async fn load(&self, criteria: &Criteria, order_by: &OrderBy) -> Result<Option<Node>, OgmError> {
        let statement = self.select_statement(criteria, order_by, Pagination::new().max(1))?;
        Ok(self.fetch_nodes(statement).await?.into_iter().next())
    }

    async fn load_one_by_id(&self, id: i64) -> Result<Option<Node>, OgmError> {
        let statement = self.by_id_statement(id);
        Ok(self.fetch_nodes(statement).await?.into_iter().next())
    }

    async fn load_related(
        &self,
        id: i64,
        relationship: &RelationshipMetadata,
        target: &NodeEntityMetadata,
    ) -> Result<Vec<Node>, OgmError> {
        let statement = self.related_statement(id, relationship, target);
        self.fetch_nodes(statement).await
    }
}

/// Creates a [`CypherPersister`] per class, all sharing one executor.
#[derive(Clone)]
pub struct CypherBackend {
    executor: Arc<dyn CypherExecutor>,
}

impl CypherBackend {
    pub fn new<E: CypherExecutor + 'static>(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }
}

impl PersisterFactory for CypherBackend {
    fn create(&self, metadata: Arc<NodeEntityMetadata>) -> Arc<dyn EntityPersister> {
        Arc::new(CypherPersister::new(self.executor.clone(), metadata))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::graph::{Row, RowStream};

    /// Records statements and answers each with the same canned rows.
    #[derive(Default)]
    struct RecordingExecutor {
        rows: Vec<Row>,
        statements: Mutex<Vec<Statement>>,
    }

    #[async_trait]
    impl CypherExecutor for RecordingExecutor {
        async fn execute(&self, statement: Statement) -> Result<RowStream<'_>, OgmError> {
            self.statements.lock().push(statement);
            let rows: Vec<Result<Row, OgmError>> = self.rows.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(rows)))
        }
    }

    fn vertex_row(column: &str, id: i64, name: &str) -> Row {
        let mut data = HashMap::new();
        data.insert(
            column.to_string(),
            json!({"id": id, "label": "Person", "properties": {"name": name}}),
        );
        Row::new(data)
    }

    fn person() -> Arc<NodeEntityMetadata> {
        Arc::new(
            NodeEntityMetadata::builder("app::Person", "Person")
                .property("name")
                .property_as("born", "born_year")
                .build()
                .unwrap(),
        )
    }

    fn persister(rows: Vec<Row>) -> (Arc<RecordingExecutor>, CypherPersister) {
        let executor = Arc::new(RecordingExecutor {
            rows,
            ..Default::default()
        });
        let persister = CypherPersister::new(executor.clone(), person());
        (executor, persister)
    }

    #[test]
    fn test_backend_creates_persister_per_class() {
        let backend = CypherBackend::new(RecordingExecutor::default());
        let persister = backend.create(person());

        assert_eq!(persister.metadata().class_name(), "app::Person");
    }

    #[test]
    fn test_select_all() {
        let (_, persister) = persister(vec![]);
        let stmt = persister
            .select_statement(&Criteria::new(), &OrderBy::new(), Pagination::new())
            .unwrap();

        assert_eq!(stmt.cypher, "MATCH (n:Person) RETURN n");
        assert!(stmt.params.is_empty());
        assert_eq!(stmt.columns, vec!["n"]);
    }

    #[test]
    fn test_select_with_criteria_order_and_window() {
        let (_, persister) = persister(vec![]);
        let stmt = persister
            .select_statement(
                &Criteria::new().equals("name", "Ada").equals("born", 1815),
                &OrderBy::new().asc("name").desc("born"),
                Pagination::new().first(10).max(5),
            )
            .unwrap();

        assert_eq!(
            stmt.cypher,
            "MATCH (n:Person) WHERE n.name = $p0 AND n.born_year = $p1 RETURN n \
             ORDER BY n.name ASC, n.born_year DESC SKIP 10 LIMIT 5"
        );
        assert_eq!(stmt.params.get("p0"), Some(&json!("Ada")));
        assert_eq!(stmt.params.get("p1"), Some(&json!(1815)));
    }

    #[test]
    fn test_select_rejects_unknown_fields() {
        let (_, persister) = persister(vec![]);

        let by_criteria = persister.select_statement(
            &Criteria::new().equals("email", "x"),
            &OrderBy::new(),
            Pagination::new(),
        );
        assert!(matches!(by_criteria, Err(OgmError::UnknownProperty { .. })));

        let by_order = persister.select_statement(
            &Criteria::new(),
            &OrderBy::new().desc("born_year"),
            Pagination::new(),
        );
        assert!(matches!(by_order, Err(OgmError::UnknownProperty { .. })));
    }

    #[test]
    fn test_related_statement_directions() {
        let (_, persister) = persister(vec![]);
        let target = person();

        let outgoing =
            RelationshipMetadata::new("boss", "REPORTS_TO", RelationshipDirection::Outgoing, "app::Person");
        let incoming =
            RelationshipMetadata::new("reports", "REPORTS_TO", RelationshipDirection::Incoming, "app::Person");
        let both =
            RelationshipMetadata::new("peers", "KNOWS", RelationshipDirection::Both, "app::Person");

        assert_eq!(
            persister.related_statement(3, &outgoing, &target).cypher,
            "MATCH (n:Person)-[:REPORTS_TO]->(m:Person) WHERE id(n) = $id RETURN DISTINCT m ORDER BY id(m)"
        );
        assert!(persister
            .related_statement(3, &incoming, &target)
            .cypher
            .starts_with("MATCH (n:Person)<-[:REPORTS_TO]-(m:Person)"));
        let stmt = persister.related_statement(3, &both, &target);
        assert!(stmt.cypher.starts_with("MATCH (n:Person)-[:KNOWS]-(m:Person)"));
        assert_eq!(stmt.params.get("id"), Some(&json!(3)));
        assert_eq!(stmt.columns, vec!["m"]);
    }

    #[tokio::test]
    async fn test_load_all_decodes_nodes() {
        let (executor, persister) =
            persister(vec![vertex_row("n", 1, "Ada"), vertex_row("n", 2, "Grace")]);

        let nodes = persister
            .load_all(&Criteria::new(), &OrderBy::new(), Pagination::new())
            .await
            .unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].property("name"), Some(&json!("Grace")));
        assert_eq!(executor.statements.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_load_limits_to_one() {
        let (executor, persister) = persister(vec![vertex_row("n", 1, "Ada")]);

        let node = persister
            .load(&Criteria::new().equals("name", "Ada"), &OrderBy::new().asc("name"))
            .await
            .unwrap();

        assert_eq!(node.map(|n| n.id), Some(1));
        let statements = executor.statements.lock();
        assert!(statements[0].cypher.ends_with("ORDER BY n.name ASC LIMIT 1"));
    }

    #[tokio::test]
    async fn test_load_one_by_id_empty() {
        let (executor, persister) = persister(vec![]);

        assert!(persister.load_one_by_id(99).await.unwrap().is_none());
        let statements = executor.statements.lock();
        assert_eq!(
            statements[0].cypher,
            "MATCH (n:Person) WHERE id(n) = $id RETURN n"
        );
        assert_eq!(statements[0].params.get("id"), Some(&json!(99)));
    }

    #[tokio::test]
    async fn test_malformed_row_is_error() {
        let mut data = HashMap::new();
        data.insert("n".to_string(), json!("not a vertex"));
        let (_, persister) = persister(vec![Row::new(data)]);

        let result = persister.load_one_by_id(1).await;
        assert!(matches!(result, Err(OgmError::Internal(_))));
    }
}
