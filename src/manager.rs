//! The entity manager: persister registry, identity map and proxy factory.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entity::NodeEntity;
use crate::error::OgmError;
use crate::graph::Node;
use crate::hydrator::Hydrator;
use crate::metadata::{MetadataRegistry, NodeEntityMetadata, RelationshipMetadata};
use crate::persister::{EntityPersister, PersisterFactory};
use crate::proxy::ProxyFactory;
use crate::repository::Repository;

type ManagedEntity = Arc<dyn Any + Send + Sync>;

/// Central access point for mapped entities.
///
/// Holds one persister per registered class and an identity map guaranteeing
/// that a node is materialized at most once per manager. Cloning is cheap;
/// clones share all state.
///
/// ```ignore
/// let manager = EntityManager::builder(MemoryGraph::new())
///     .register::<Person>()?
///     .register::<Company>()?
///     .build()?;
///
/// let people = manager.repository::<Person>()?;
/// let ada = people.find_one_by(&Criteria::new().equals("name", "Ada"), None).await?;
/// ```
#[derive(Clone)]
pub struct EntityManager {
    inner: Arc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    registry: MetadataRegistry,
    persisters: HashMap<String, Arc<dyn EntityPersister>>,
    identity_map: RwLock<HashMap<(String, i64), ManagedEntity>>,
    proxies: ProxyFactory,
}

impl EntityManager {
    pub fn builder<F: PersisterFactory + 'static>(factory: F) -> EntityManagerBuilder {
        EntityManagerBuilder {
            factory: Arc::new(factory),
            registry: MetadataRegistry::new(),
        }
    }

    /// The persister bound to `class_name`.
    pub fn entity_persister(&self, class_name: &str) -> Result<Arc<dyn EntityPersister>, OgmError> {
        self.inner.entity_persister(class_name)
    }

    /// A repository for `E`.
    pub fn repository<E: NodeEntity>(&self) -> Result<Repository<E>, OgmError> {
        let metadata = self.inner.registry.for_type::<E>()?;
        Ok(Repository::new(self.clone(), metadata))
    }

    pub fn metadata(&self, class_name: &str) -> Result<Arc<NodeEntityMetadata>, OgmError> {
        self.inner.registry.get(class_name)
    }

    /// Number of entities currently in the identity map.
    pub fn managed_count(&self) -> usize {
        self.inner.identity_map.read().len()
    }

    /// Forgets every managed entity; later loads hydrate fresh instances.
    pub fn clear(&self) {
        let mut map = self.inner.identity_map.write();
        tracing::debug!(count = map.len(), "Clearing identity map");
        map.clear();
    }

    pub(crate) fn materialize<E: NodeEntity>(
        &self,
        metadata: &NodeEntityMetadata,
        node: Node,
    ) -> Result<Arc<E>, OgmError> {
        self.inner.materialize(metadata, node)
    }
}

impl ManagerInner {
    fn entity_persister(&self, class_name: &str) -> Result<Arc<dyn EntityPersister>, OgmError> {
        self.persisters
            .get(class_name)
            .cloned()
            .ok_or_else(|| OgmError::UnmappedType(class_name.to_string()))
    }

    /// Returns the managed instance for `node`, hydrating it on first sight.
    fn materialize<E: NodeEntity>(
        &self,
        metadata: &NodeEntityMetadata,
        node: Node,
    ) -> Result<Arc<E>, OgmError> {
        let key = (metadata.class_name().to_string(), node.id);

        let existing = self.identity_map.read().get(&key).cloned();
        if let Some(existing) = existing {
            return downcast(metadata, existing);
        }

        let entity: Arc<E> = Arc::new(E::hydrate(&Hydrator::new(metadata, &node, &self.proxies))?);

        // Another task may have hydrated the same node meanwhile; keep the first.
        let managed = self
            .identity_map
            .write()
            .entry(key)
            .or_insert_with(|| entity.clone() as ManagedEntity)
            .clone();
        downcast(metadata, managed)
    }

    /// Loads the entities behind a relationship placeholder.
    pub(crate) async fn load_related<T: NodeEntity>(
        &self,
        owner_class: &str,
        owner_id: i64,
        relationship: &RelationshipMetadata,
    ) -> Result<Vec<Arc<T>>, OgmError> {
        let target = self.registry.get(relationship.target_class())?;
        let requested = self.registry.for_type::<T>()?;
        if requested.class_name() != target.class_name() {
            return Err(OgmError::InvalidMapping(format!(
                "{}.{} targets {}, not {}",
                owner_class,
                relationship.field(),
                target.class_name(),
                requested.class_name()
            )));
        }

        let persister = self.entity_persister(owner_class)?;
        let nodes = persister
            .load_related(owner_id, relationship, &target)
            .await?;

        tracing::debug!(
            owner = owner_class,
            owner_id,
            field = relationship.field(),
            count = nodes.len(),
            "Resolved relationship"
        );

        nodes
            .into_iter()
            .map(|node| self.materialize(&target, node))
            .collect()
    }
}

fn downcast<E: NodeEntity>(
    metadata: &NodeEntityMetadata,
    managed: ManagedEntity,
) -> Result<Arc<E>, OgmError> {
    managed.downcast::<E>().map_err(|_| {
        OgmError::Internal(format!(
            "identity map holds another type for {}",
            metadata.class_name()
        ))
    })
}

/// Collects entity registrations, then builds an [`EntityManager`].
pub struct EntityManagerBuilder {
    factory: Arc<dyn PersisterFactory>,
    registry: MetadataRegistry,
}

impl EntityManagerBuilder {
    /// Registers `E`. Registering the same type twice is a no-op.
    pub fn register<E: NodeEntity>(mut self) -> Result<Self, OgmError> {
        self.registry.register::<E>()?;
        Ok(self)
    }

    /// Checks relationship targets and creates one persister per class.
    pub fn build(self) -> Result<EntityManager, OgmError> {
        self.registry.validate()?;

        let persisters: HashMap<_, _> = self
            .registry
            .iter()
            .map(|metadata| {
                (
                    metadata.class_name().to_string(),
                    self.factory.create(metadata.clone()),
                )
            })
            .collect();

        tracing::info!(classes = persisters.len(), "Built entity manager");

        let registry = self.registry;
        let inner = Arc::new_cyclic(|weak| ManagerInner {
            registry,
            persisters,
            identity_map: RwLock::new(HashMap::new()),
            proxies: ProxyFactory::new(weak.clone()),
        });
        Ok(EntityManager { inner })
    }
}
