//! Lazy placeholders for relationship fields.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::OnceCell;

use crate::entity::NodeEntity;
use crate::error::OgmError;
use crate::manager::ManagerInner;
use crate::metadata::RelationshipMetadata;

/// Where a placeholder loads from: the owning node and the relationship.
#[derive(Clone)]
struct Source {
    manager: Weak<ManagerInner>,
    owner_class: String,
    owner_id: i64,
    relationship: Arc<RelationshipMetadata>,
}

impl Source {
    async fn load<T: NodeEntity>(&self) -> Result<Vec<Arc<T>>, OgmError> {
        let manager = self.manager.upgrade().ok_or(OgmError::ManagerClosed)?;
        manager
            .load_related::<T>(&self.owner_class, self.owner_id, &self.relationship)
            .await
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("owner_class", &self.owner_class)
            .field("owner_id", &self.owner_id)
            .field("relationship", &self.relationship.field())
            .finish()
    }
}

/// Placeholder for a single related entity, loaded on first [`get`](Lazy::get).
pub struct Lazy<T: NodeEntity> {
    source: Source,
    cell: OnceCell<Option<Arc<T>>>,
}

impl<T: NodeEntity> Lazy<T> {
    pub(crate) fn new(
        manager: Weak<ManagerInner>,
        owner_class: &str,
        owner_id: i64,
        relationship: Arc<RelationshipMetadata>,
    ) -> Self {
        Self {
            source: Source {
                manager,
                owner_class: owner_class.to_string(),
                owner_id,
                relationship,
            },
            cell: OnceCell::new(),
        }
    }

    /// Resolves the related entity, querying the persister the first time only.
    ///
    /// If the graph holds several matching nodes the first one (lowest id
    /// for ordered backends) is used.
    pub async fn get(&self) -> Result<Option<Arc<T>>, OgmError> {
        let value = self
            .cell
            .get_or_try_init(|| async {
                let related = self.source.load::<T>().await?;
                if related.len() > 1 {
                    tracing::warn!(
                        owner = %self.source.owner_class,
                        owner_id = self.source.owner_id,
                        field = self.source.relationship.field(),
                        count = related.len(),
                        "Single-valued relationship matched several nodes"
                    );
                }
                Ok::<_, OgmError>(related.into_iter().next())
            })
            .await?;
        Ok(value.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn owner_id(&self) -> i64 {
        self.source.owner_id
    }

    pub fn relationship(&self) -> &RelationshipMetadata {
        &self.source.relationship
    }
}

impl<T: NodeEntity> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: NodeEntity> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("source", &self.source)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Placeholder for a collection of related entities.
pub struct LazyCollection<T: NodeEntity> {
    source: Source,
    cell: OnceCell<Vec<Arc<T>>>,
}

impl<T: NodeEntity> LazyCollection<T> {
    pub(crate) fn new(
        manager: Weak<ManagerInner>,
        owner_class: &str,
        owner_id: i64,
        relationship: Arc<RelationshipMetadata>,
    ) -> Self {
        Self {
            source: Source {
                manager,
                owner_class: owner_class.to_string(),
                owner_id,
                relationship,
            },
            cell: OnceCell::new(),
        }
    }

    /// Resolves the related entities, querying the persister the first time only.
    pub async fn get(&self) -> Result<Vec<Arc<T>>, OgmError> {
        let value = self
            .cell
            .get_or_try_init(|| self.source.load::<T>())
            .await?;
        Ok(value.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn owner_id(&self) -> i64 {
        self.source.owner_id
    }

    pub fn relationship(&self) -> &RelationshipMetadata {
        &self.source.relationship
    }
}

impl<T: NodeEntity> Clone for LazyCollection<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: NodeEntity> fmt::Debug for LazyCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection")
            .field("source", &self.source)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
