//! In-memory graph and its persister.
//!
//! [`MemoryGraph`] keeps nodes and typed edges behind a shared lock. Node ids
//! are assigned in creation order starting at 1, and results with no
//! explicit ordering come back in ascending id order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::criteria::{Criteria, Order, OrderBy, Pagination};
use crate::error::OgmError;
use crate::graph::Node;
use crate::metadata::{is_identifier, NodeEntityMetadata, RelationshipDirection, RelationshipMetadata};
use crate::persister::{EntityPersister, PersisterFactory};

#[derive(Debug, Clone)]
struct Edge {
    from: i64,
    rel_type: String,
    to: i64,
}

#[derive(Debug, Default)]
struct GraphData {
    next_id: i64,
    nodes: BTreeMap<i64, Node>,
    edges: Vec<Edge>,
}

/// A shared in-memory property graph.
///
/// Cloning yields another handle on the same graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    data: Arc<RwLock<GraphData>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its identifier.
    ///
    /// `properties` must be a JSON object (or `null` for none).
    pub fn create_node(&self, label: &str, properties: JsonValue) -> Result<i64, OgmError> {
        if !is_identifier(label) {
            return Err(OgmError::InvalidMapping(format!("invalid label '{}'", label)));
        }
        let properties = match properties {
            JsonValue::Object(map) => map,
            JsonValue::Null => Default::default(),
            other => {
                return Err(OgmError::Internal(format!(
                    "node properties must be an object, got {}",
                    other
                )))
            }
        };

        let mut data = self.data.write();
        data.next_id += 1;
        let id = data.next_id;
        data.nodes.insert(
            id,
            Node {
                id,
                label: label.to_string(),
                properties,
            },
        );
        Ok(id)
    }

    /// Adds a `(from)-[:rel_type]->(to)` edge.
    pub fn relate(&self, from: i64, rel_type: &str, to: i64) -> Result<(), OgmError> {
        if !is_identifier(rel_type) {
            return Err(OgmError::InvalidMapping(format!(
                "invalid relationship type '{}'",
                rel_type
            )));
        }

        let mut data = self.data.write();
        for id in [from, to] {
            if !data.nodes.contains_key(&id) {
                return Err(OgmError::Internal(format!("no node with id {}", id)));
            }
        }
        data.edges.push(Edge {
            from,
            rel_type: rel_type.to_string(),
            to,
        });
        Ok(())
    }

    pub fn node(&self, id: i64) -> Option<Node> {
        self.data.read().nodes.get(&id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }
}

impl PersisterFactory for MemoryGraph {
    fn create(&self, metadata: Arc<NodeEntityMetadata>) -> Arc<dyn EntityPersister> {
        Arc::new(MemoryPersister::new(self.clone(), metadata))
    }
}

/// Persister for one class over a [`MemoryGraph`].
///
/// Equality follows Cypher: a `null` criterion never matches and numbers
/// compare by value. When sorting, missing and `null` values come last in
/// ascending order and first in descending order; values of different types
/// order as map, list, string, boolean, number.
pub struct MemoryPersister {
    graph: MemoryGraph,
    metadata: Arc<NodeEntityMetadata>,
}

impl MemoryPersister {
    pub fn new(graph: MemoryGraph, metadata: Arc<NodeEntityMetadata>) -> Self {
        Self { graph, metadata }
    }

    fn select(
        &self,
        criteria: &Criteria,
        order_by: &OrderBy,
        pagination: Pagination,
    ) -> Result<Vec<Node>, OgmError> {
        let filters = criteria
            .iter()
            .map(|(field, value)| self.metadata.property_key(field).map(|key| (key, value)))
            .collect::<Result<Vec<_>, _>>()?;
        let sort_keys = order_by
            .iter()
            .map(|(field, order)| self.metadata.property_key(field).map(|key| (key, order)))
            .collect::<Result<Vec<_>, _>>()?;

        let data = self.graph.data.read();
        let mut matched: Vec<&Node> = data
            .nodes
            .values()
            .filter(|node| node.label == self.metadata.label())
            .filter(|node| {
                filters.iter().all(|(key, expected)| {
                    node.property(key)
                        .map_or(false, |actual| values_equal(actual, expected))
                })
            })
            .collect();

        // Stable, so ties keep ascending id order.
        if !sort_keys.is_empty() {
            matched.sort_by(|a, b| {
                sort_keys
                    .iter()
                    .map(|(key, order)| {
                        let ordering = compare_values(a.property(key), b.property(key));
                        match order {
                            Order::Ascending => ordering,
                            Order::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = pagination.first.map_or(0, saturating_usize);
        let take = pagination.max.map_or(usize::MAX, saturating_usize);
        Ok(matched.into_iter().skip(skip).take(take).cloned().collect())
    }
}

#[async_trait]
impl EntityPersister for MemoryPersister {
    fn metadata(&self) -> &NodeEntityMetadata {
        &self.metadata
    }

    async fn load_all(
        &self,
        criteria: &Criteria,
        order_by: &OrderBy,
        pagination: Pagination,
    ) -> Result<Vec<Node>, OgmError> {
        let nodes = self.select(criteria, order_by, pagination)?;
        tracing::debug!(
            class = self.metadata.class_name(),
            count = nodes.len(),
            "Loaded nodes from memory"
        );
        Ok(nodes)
    }

    async fn load(&self, criteria: &Criteria, order_by: &OrderBy) -> Result<Option<Node>, OgmError> {
        Ok(self
            .select(criteria, order_by, Pagination::new().max(1))?
            .into_iter()
            .next())
    }

    async fn load_one_by_id(&self, id: i64) -> Result<Option<Node>, OgmError> {
        Ok(self
            .graph
            .node(id)
            .filter(|node| node.label == self.metadata.label()))
    }

    async fn load_related(
        &self,
        id: i64,
        relationship: &RelationshipMetadata,
        target: &NodeEntityMetadata,
    ) -> Result<Vec<Node>, OgmError> {
        let data = self.graph.data.read();
        match data.nodes.get(&id) {
            Some(owner) if owner.label == self.metadata.label() => {}
            _ => return Ok(Vec::new()),
        }

        let direction = relationship.direction();
        let neighbours: BTreeSet<i64> = data
            .edges
            .iter()
            .filter(|edge| edge.rel_type == relationship.rel_type())
            .filter_map(|edge| {
                let outgoing = edge.from == id
                    && matches!(
                        direction,
                        RelationshipDirection::Outgoing | RelationshipDirection::Both
                    );
                let incoming = edge.to == id
                    && matches!(
                        direction,
                        RelationshipDirection::Incoming | RelationshipDirection::Both
                    );
                if outgoing {
                    Some(edge.to)
                } else if incoming {
                    Some(edge.from)
                } else {
                    None
                }
            })
            .collect();

        Ok(neighbours
            .into_iter()
            .filter_map(|neighbour| data.nodes.get(&neighbour))
            .filter(|node| node.label == target.label())
            .cloned()
            .collect())
    }
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Cypher equality: `null` equals nothing and numbers compare by value,
/// so `30 = 30.0`.
fn values_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Null, _) | (_, JsonValue::Null) => false,
        (JsonValue::Number(_), JsonValue::Number(_)) => {
            compare_values(Some(actual), Some(expected)) == Ordering::Equal
        }
        _ => actual == expected,
    }
}

/// Rank of a JSON type when values of different types are compared, in
/// Cypher's ascending order: map, list, string, boolean, number, then `null`.
fn type_rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Object(_) => 0,
        JsonValue::Array(_) => 1,
        JsonValue::String(_) => 2,
        JsonValue::Bool(_) => 3,
        JsonValue::Number(_) => 4,
        JsonValue::Null => 5,
    }
}

/// Ascending comparison; a missing value sorts like `null`.
fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let a = a.unwrap_or(&JsonValue::Null);
    let b = b.unwrap_or(&JsonValue::Null);

    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(_), JsonValue::Array(_)) | (JsonValue::Object(_), JsonValue::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Arc<NodeEntityMetadata> {
        Arc::new(
            NodeEntityMetadata::builder("app::Person", "Person")
                .property("name")
                .property_as("age", "age_years")
                .build()
                .unwrap(),
        )
    }

    fn company() -> NodeEntityMetadata {
        NodeEntityMetadata::builder("app::Company", "Company")
            .property("name")
            .build()
            .unwrap()
    }

    fn people() -> (MemoryGraph, MemoryPersister) {
        let graph = MemoryGraph::new();
        graph
            .create_node("Person", json!({"name": "Cleo", "age_years": 30}))
            .unwrap();
        graph
            .create_node("Person", json!({"name": "Ada", "age_years": 36}))
            .unwrap();
        graph
            .create_node("Person", json!({"name": "Bo", "age_years": 30}))
            .unwrap();
        graph.create_node("Person", json!({"name": "Dee"})).unwrap();
        graph.create_node("Company", json!({"name": "Ada"})).unwrap();
        let persister = MemoryPersister::new(graph.clone(), person());
        (graph, persister)
    }

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes
            .iter()
            .map(|n| n.property("name").and_then(JsonValue::as_str).unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_create_node_validation() {
        let graph = MemoryGraph::new();
        assert!(matches!(
            graph.create_node("Bad Label", JsonValue::Null),
            Err(OgmError::InvalidMapping(_))
        ));
        assert!(matches!(
            graph.create_node("Person", json!([1, 2])),
            Err(OgmError::Internal(_))
        ));

        let id = graph.create_node("Person", JsonValue::Null).unwrap();
        assert_eq!(id, 1);
        assert!(matches!(graph.relate(id, "KNOWS", 42), Err(OgmError::Internal(_))));
        assert_eq!(graph.node_count(), 1);
    }

    #[tokio::test]
    async fn test_load_all_filters_by_label_in_id_order() {
        let (_, persister) = people();
        let nodes = persister
            .load_all(&Criteria::new(), &OrderBy::new(), Pagination::new())
            .await
            .unwrap();

        assert_eq!(names(&nodes), vec!["Cleo", "Ada", "Bo", "Dee"]);
    }

    #[tokio::test]
    async fn test_criteria_use_stored_keys() {
        let (_, persister) = people();
        let nodes = persister
            .load_all(
                &Criteria::new().equals("age", 30),
                &OrderBy::new(),
                Pagination::new(),
            )
            .await
            .unwrap();
        assert_eq!(names(&nodes), vec!["Cleo", "Bo"]);

        let none = persister
            .load_all(
                &Criteria::new().equals("age", JsonValue::Null),
                &OrderBy::new(),
                Pagination::new(),
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_numeric_criteria_compare_by_value() {
        let (_, persister) = people();

        let as_int = persister
            .load_all(&Criteria::new().equals("age", 30), &OrderBy::new(), Pagination::new())
            .await
            .unwrap();
        let as_float = persister
            .load_all(&Criteria::new().equals("age", 30.0), &OrderBy::new(), Pagination::new())
            .await
            .unwrap();

        assert_eq!(names(&as_int), vec!["Cleo", "Bo"]);
        assert_eq!(names(&as_float), names(&as_int));

        let as_string = persister
            .load_all(&Criteria::new().equals("age", "30"), &OrderBy::new(), Pagination::new())
            .await
            .unwrap();
        assert!(as_string.is_empty());
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(30), &json!(30.0)));
        assert!(!values_equal(&json!(30), &json!(30.5)));
        assert!(values_equal(&json!("a"), &json!("a")));
        assert!(!values_equal(&JsonValue::Null, &JsonValue::Null));
    }

    #[tokio::test]
    async fn test_mixed_type_ordering() {
        let graph = MemoryGraph::new();
        for value in [json!(5), json!(true), json!("x"), JsonValue::Null] {
            graph.create_node("Person", json!({"name": value})).unwrap();
        }
        let persister = MemoryPersister::new(graph, person());

        let sorted = persister
            .load_all(&Criteria::new(), &OrderBy::new().asc("name"), Pagination::new())
            .await
            .unwrap();
        assert_eq!(sorted.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 2, 1, 4]);
    }

    #[tokio::test]
    async fn test_ordering_with_missing_values() {
        let (_, persister) = people();

        let asc = persister
            .load_all(&Criteria::new(), &OrderBy::new().asc("age"), Pagination::new())
            .await
            .unwrap();
        assert_eq!(names(&asc), vec!["Cleo", "Bo", "Ada", "Dee"]);

        let desc = persister
            .load_all(
                &Criteria::new(),
                &OrderBy::new().desc("age").asc("name"),
                Pagination::new(),
            )
            .await
            .unwrap();
        assert_eq!(names(&desc), vec!["Dee", "Ada", "Bo", "Cleo"]);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let (_, persister) = people();
        let page = persister
            .load_all(
                &Criteria::new(),
                &OrderBy::new().asc("name"),
                Pagination::new().first(1).max(2),
            )
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["Bo", "Cleo"]);

        let past_end = persister
            .load_all(&Criteria::new(), &OrderBy::new(), Pagination::new().first(10))
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_load_first_and_by_id() {
        let (_, persister) = people();

        let first = persister
            .load(&Criteria::new().equals("age", 30), &OrderBy::new().asc("name"))
            .await
            .unwrap();
        assert_eq!(first.map(|n| n.id), Some(3));

        assert_eq!(persister.load_one_by_id(2).await.unwrap().map(|n| n.id), Some(2));
        // Node 5 is a Company.
        assert!(persister.load_one_by_id(5).await.unwrap().is_none());
        assert!(persister.load_one_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_field_rejected() {
        let (_, persister) = people();
        let result = persister
            .load_all(&Criteria::new(), &OrderBy::new().asc("email"), Pagination::new())
            .await;
        assert!(matches!(result, Err(OgmError::UnknownProperty { .. })));
    }

    #[tokio::test]
    async fn test_load_related_by_direction() {
        let (graph, persister) = people();
        graph.relate(1, "WORKS_AT", 5).unwrap();
        graph.relate(2, "WORKS_AT", 5).unwrap();
        graph.relate(1, "KNOWS", 2).unwrap();
        graph.relate(3, "KNOWS", 1).unwrap();

        let employer = RelationshipMetadata::new(
            "employer",
            "WORKS_AT",
            RelationshipDirection::Outgoing,
            "app::Company",
        );
        let related = persister.load_related(1, &employer, &company()).await.unwrap();
        assert_eq!(related.iter().map(|n| n.id).collect::<Vec<_>>(), vec![5]);

        let knows = |direction| {
            RelationshipMetadata::new("friends", "KNOWS", direction, "app::Person").collection()
        };
        let outgoing = persister
            .load_related(1, &knows(RelationshipDirection::Outgoing), &person())
            .await
            .unwrap();
        let incoming = persister
            .load_related(1, &knows(RelationshipDirection::Incoming), &person())
            .await
            .unwrap();
        let both = persister
            .load_related(1, &knows(RelationshipDirection::Both), &person())
            .await
            .unwrap();

        assert_eq!(outgoing.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(incoming.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(both.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_compare_values_ranks_types() {
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(1.5)), Some(&json!(1))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(true)), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(true)), Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!({"a": 1})), Some(&json!([1]))), Ordering::Less);
        assert_eq!(compare_values(None, Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(None, Some(&JsonValue::Null)), Ordering::Equal);
    }
}
