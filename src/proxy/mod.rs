//! Lazy-loading placeholders for related entities.
//!
//! Relationship fields are never loaded while their owner is hydrated.
//! Instead the owner receives a [`Lazy`] or [`LazyCollection`] that queries
//! the owner's persister the first time it is read, then keeps the result.
//!
//! Placeholders hold a weak handle on the entity manager, so they never keep
//! it alive; reading one after the manager is gone fails with
//! [`OgmError::ManagerClosed`](crate::OgmError::ManagerClosed).

mod lazy;

use std::sync::{Arc, Weak};

pub use lazy::{Lazy, LazyCollection};

use crate::entity::NodeEntity;
use crate::manager::ManagerInner;
use crate::metadata::RelationshipMetadata;

/// Creates placeholders bound to one entity manager.
///
/// Built once per manager and shared by every hydration it performs.
#[derive(Clone)]
pub struct ProxyFactory {
    manager: Weak<ManagerInner>,
}

impl ProxyFactory {
    pub(crate) fn new(manager: Weak<ManagerInner>) -> Self {
        Self { manager }
    }

    /// A factory bound to no manager. Its placeholders never resolve.
    pub fn detached() -> Self {
        Self {
            manager: Weak::new(),
        }
    }

    pub fn single<T: NodeEntity>(
        &self,
        owner_class: &str,
        owner_id: i64,
        relationship: &Arc<RelationshipMetadata>,
    ) -> Lazy<T> {
        Lazy::new(
            self.manager.clone(),
            owner_class,
            owner_id,
            relationship.clone(),
        )
    }

    pub fn collection<T: NodeEntity>(
        &self,
        owner_class: &str,
        owner_id: i64,
        relationship: &Arc<RelationshipMetadata>,
    ) -> LazyCollection<T> {
        LazyCollection::new(
            self.manager.clone(),
            owner_class,
            owner_id,
            relationship.clone(),
        )
    }
}
