//! Repository facade over one entity type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::criteria::{Criteria, OrderBy, Pagination};
use crate::entity::NodeEntity;
use crate::error::OgmError;
use crate::manager::EntityManager;
use crate::metadata::NodeEntityMetadata;

/// Read operations for entities of type `E`.
///
/// Obtained from [`EntityManager::repository`]. A repository is bound to
/// `E` and its metadata for its whole life. Every call fetches the persister
/// from the manager and delegates to it; results go through the manager's
/// identity map, so the same node always yields the same `Arc<E>`.
///
/// Field names in criteria and ordering are checked against the metadata
/// before anything reaches the persister.
pub struct Repository<E: NodeEntity> {
    manager: EntityManager,
    metadata: Arc<NodeEntityMetadata>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: NodeEntity> Repository<E> {
    pub(crate) fn new(manager: EntityManager, metadata: Arc<NodeEntityMetadata>) -> Self {
        Self {
            manager,
            metadata,
            _entity: PhantomData,
        }
    }

    /// The class name this repository serves.
    pub fn class_name(&self) -> &str {
        self.metadata.class_name()
    }

    pub fn metadata(&self) -> &NodeEntityMetadata {
        &self.metadata
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// Every entity of this type. Same as `find_by` with no criteria.
    pub async fn find_all(&self) -> Result<Vec<Arc<E>>, OgmError> {
        self.find_by(&Criteria::new(), None, None, None).await
    }

    /// Entities matching all `criteria`, sorted by `order_by`, skipping
    /// `offset` results and returning at most `limit`.
    pub async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Arc<E>>, OgmError> {
        let order_by = self.checked(criteria, order_by)?;
        let persister = self.manager.entity_persister(self.class_name())?;

        let nodes = persister
            .load_all(criteria, &order_by, Pagination::from_limit_offset(limit, offset))
            .await?;

        nodes
            .into_iter()
            .map(|node| self.manager.materialize(&self.metadata, node))
            .collect()
    }

    /// The first entity matching `criteria` under `order_by`, if any.
    ///
    /// Equal to the first element of [`find_by`](Self::find_by) with the
    /// same criteria and ordering.
    pub async fn find_one_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
    ) -> Result<Option<Arc<E>>, OgmError> {
        let order_by = self.checked(criteria, order_by)?;
        let persister = self.manager.entity_persister(self.class_name())?;

        persister
            .load(criteria, &order_by)
            .await?
            .map(|node| self.manager.materialize(&self.metadata, node))
            .transpose()
    }

    /// The entity with node identifier `id`, if any.
    pub async fn find_one_by_id(&self, id: i64) -> Result<Option<Arc<E>>, OgmError> {
        let persister = self.manager.entity_persister(self.class_name())?;

        persister
            .load_one_by_id(id)
            .await?
            .map(|node| self.manager.materialize(&self.metadata, node))
            .transpose()
    }

    fn checked(&self, criteria: &Criteria, order_by: Option<&OrderBy>) -> Result<OrderBy, OgmError> {
        criteria.validate(&self.metadata)?;
        let order_by = order_by.cloned().unwrap_or_default();
        order_by.validate(&self.metadata)?;
        Ok(order_by)
    }
}

impl<E: NodeEntity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self::new(self.manager.clone(), self.metadata.clone())
    }
}

impl<E: NodeEntity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("class", &self.metadata.class_name())
            .finish()
    }
}
