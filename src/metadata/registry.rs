//! Type-descriptor table keyed by class name.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::NodeEntity;
use crate::error::OgmError;
use crate::metadata::NodeEntityMetadata;

/// Descriptor table for every mapped entity type.
///
/// Filled during start-up through [`register`](Self::register); once handed
/// to an [`EntityManager`](crate::EntityManager) it is only read. Entries
/// are never evicted.
#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    by_class: HashMap<String, Arc<NodeEntityMetadata>>,
    by_type: HashMap<TypeId, String>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes and stores the descriptor for `E`.
    ///
    /// Registering the same type again returns the stored descriptor without
    /// calling `E::metadata()`. A different type claiming an already
    /// registered class name is rejected.
    pub fn register<E: NodeEntity>(&mut self) -> Result<Arc<NodeEntityMetadata>, OgmError> {
        if let Some(class_name) = self.by_type.get(&TypeId::of::<E>()) {
            return self.get(class_name);
        }

        let metadata = Arc::new(E::metadata()?);
        let class_name = metadata.class_name().to_string();

        if self.by_class.contains_key(&class_name) {
            return Err(OgmError::InvalidMapping(format!(
                "class name '{}' is already registered by another type",
                class_name
            )));
        }

        tracing::debug!(class = %class_name, label = metadata.label(), "Registered entity");

        self.by_type.insert(TypeId::of::<E>(), class_name.clone());
        self.by_class.insert(class_name, metadata.clone());
        Ok(metadata)
    }

    /// Looks up a descriptor by class name.
    pub fn get(&self, class_name: &str) -> Result<Arc<NodeEntityMetadata>, OgmError> {
        self.by_class
            .get(class_name)
            .cloned()
            .ok_or_else(|| OgmError::UnmappedType(class_name.to_string()))
    }

    /// Looks up the descriptor registered for `E`.
    pub fn for_type<E: 'static>(&self) -> Result<Arc<NodeEntityMetadata>, OgmError> {
        match self.by_type.get(&TypeId::of::<E>()) {
            Some(class_name) => self.get(class_name),
            None => Err(OgmError::UnmappedType(std::any::type_name::<E>().to_string())),
        }
    }

    /// Checks that every relationship points at a registered class.
    pub fn validate(&self) -> Result<(), OgmError> {
        for metadata in self.by_class.values() {
            for relationship in metadata.relationships() {
                if !self.by_class.contains_key(relationship.target_class()) {
                    tracing::warn!(
                        class = metadata.class_name(),
                        field = relationship.field(),
                        target = relationship.target_class(),
                        "Relationship targets an unmapped class"
                    );
                    return Err(OgmError::UnmappedType(
                        relationship.target_class().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NodeEntityMetadata>> {
        self.by_class.values()
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}
