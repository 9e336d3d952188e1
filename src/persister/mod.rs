//! Entity persisters: turn find parameters into backend reads.
//!
//! A persister is bound to one entity class. It resolves field names to
//! stored keys through the class metadata, queries the backend and returns
//! the matching [`Node`]s; turning nodes into entities is left to the
//! [`EntityManager`](crate::EntityManager).
//!
//! | Persister | Backend |
//! |-----------|---------|
//! | [`CypherPersister`] | any [`CypherExecutor`](crate::graph::CypherExecutor) |
//! | [`MemoryPersister`] | [`MemoryGraph`] |

pub mod cypher;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::criteria::{Criteria, OrderBy, Pagination};
use crate::error::OgmError;
use crate::graph::Node;
use crate::metadata::{NodeEntityMetadata, RelationshipMetadata};

pub use cypher::{CypherBackend, CypherPersister};
pub use memory::{MemoryGraph, MemoryPersister};

/// Loads the nodes of one entity class.
#[async_trait]
pub trait EntityPersister: Send + Sync {
    /// The class this persister is bound to.
    fn metadata(&self) -> &NodeEntityMetadata;

    /// All nodes matching every criterion, sorted and windowed.
    async fn load_all(
        &self,
        criteria: &Criteria,
        order_by: &OrderBy,
        pagination: Pagination,
    ) -> Result<Vec<Node>, OgmError>;

    /// The first node matching every criterion under `order_by`.
    async fn load(&self, criteria: &Criteria, order_by: &OrderBy) -> Result<Option<Node>, OgmError>;

    /// The node of this class with the given identifier.
    async fn load_one_by_id(&self, id: i64) -> Result<Option<Node>, OgmError>;

    /// Nodes of class `target` reached from node `id` through `relationship`,
    /// in ascending id order.
    async fn load_related(
        &self,
        id: i64,
        relationship: &RelationshipMetadata,
        target: &NodeEntityMetadata,
    ) -> Result<Vec<Node>, OgmError>;
}

/// Creates the persister for each registered class.
pub trait PersisterFactory: Send + Sync {
    fn create(&self, metadata: Arc<NodeEntityMetadata>) -> Arc<dyn EntityPersister>;
}
