//! graph-ogm - object-graph mapper for graph databases.
//!
//! Binds application types to graph nodes. A [`Repository`] serves read
//! operations for one entity type by delegating to the persister the
//! [`EntityManager`] holds for that type; relationship fields are filled with
//! lazy placeholders that load on first access.

pub mod cli;
pub mod config;
pub mod criteria;
pub mod entity;
pub mod error;
pub mod graph;
pub mod hydrator;
pub mod manager;
pub mod metadata;
pub mod persister;
pub mod proxy;
pub mod repository;

pub use criteria::{Criteria, Order, OrderBy, Pagination};
pub use entity::NodeEntity;
pub use error::OgmError;
pub use hydrator::Hydrator;
pub use manager::{EntityManager, EntityManagerBuilder};
pub use metadata::{
    MetadataRegistry, NodeEntityMetadata, RelationshipDirection, RelationshipMetadata,
};
pub use persister::{EntityPersister, MemoryGraph, PersisterFactory};
pub use proxy::{Lazy, LazyCollection, ProxyFactory};
pub use repository::Repository;
