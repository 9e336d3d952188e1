//! Typed access to a loaded node while building an entity.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::entity::NodeEntity;
use crate::error::OgmError;
use crate::graph::Node;
use crate::metadata::{NodeEntityMetadata, RelationshipMetadata};
use crate::proxy::{Lazy, LazyCollection, ProxyFactory};

/// Handed to [`NodeEntity::hydrate`]; reads mapped properties and creates
/// lazy placeholders for mapped relationships.
pub struct Hydrator<'a> {
    metadata: &'a NodeEntityMetadata,
    node: &'a Node,
    proxies: &'a ProxyFactory,
}

impl<'a> Hydrator<'a> {
    pub fn new(metadata: &'a NodeEntityMetadata, node: &'a Node, proxies: &'a ProxyFactory) -> Self {
        Self {
            metadata,
            node,
            proxies,
        }
    }

    /// The node identifier.
    pub fn id(&self) -> i64 {
        self.node.id
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn metadata(&self) -> &NodeEntityMetadata {
        self.metadata
    }

    /// Reads a mapped, required property.
    pub fn property<T: DeserializeOwned>(&self, field: &str) -> Result<T, OgmError> {
        let key = self.metadata.property_key(field)?;
        let value = self
            .node
            .property(key)
            .ok_or_else(|| self.error(format!("missing property '{}'", key)))?;
        self.deserialize(field, value)
    }

    /// Reads a mapped property, treating absence and `null` as `None`.
    pub fn property_opt<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, OgmError> {
        let key = self.metadata.property_key(field)?;
        match self.node.property(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => self.deserialize(field, value).map(Some),
        }
    }

    /// Deserializes the whole stored property map.
    ///
    /// Keys are the stored property keys, not field names.
    pub fn properties<T: DeserializeOwned>(&self) -> Result<T, OgmError> {
        serde_json::from_value(JsonValue::Object(self.node.properties.clone()))
            .map_err(|e| self.error(e))
    }

    /// Placeholder for a single-valued relationship field.
    pub fn related<T: NodeEntity>(&self, field: &str) -> Result<Lazy<T>, OgmError> {
        let relationship = self.relationship(field, false)?;
        Ok(self
            .proxies
            .single(self.metadata.class_name(), self.node.id, relationship))
    }

    /// Placeholder for a collection relationship field.
    pub fn related_many<T: NodeEntity>(&self, field: &str) -> Result<LazyCollection<T>, OgmError> {
        let relationship = self.relationship(field, true)?;
        Ok(self
            .proxies
            .collection(self.metadata.class_name(), self.node.id, relationship))
    }

    fn relationship(
        &self,
        field: &str,
        collection: bool,
    ) -> Result<&std::sync::Arc<RelationshipMetadata>, OgmError> {
        let relationship = self.metadata.relationship(field).ok_or_else(|| {
            OgmError::InvalidMapping(format!(
                "{} has no relationship field '{}'",
                self.metadata.class_name(),
                field
            ))
        })?;

        if relationship.is_collection() != collection {
            return Err(OgmError::InvalidMapping(format!(
                "{}.{} is mapped as a {} relationship",
                self.metadata.class_name(),
                field,
                if relationship.is_collection() {
                    "collection"
                } else {
                    "single-valued"
                }
            )));
        }

        Ok(relationship)
    }

    fn deserialize<T: DeserializeOwned>(&self, field: &str, value: &JsonValue) -> Result<T, OgmError> {
        serde_json::from_value(value.clone())
            .map_err(|e| self.error(format!("field '{}': {}", field, e)))
    }

    fn error(&self, message: impl std::fmt::Display) -> OgmError {
        OgmError::hydration(self.metadata.class_name(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{RelationshipDirection, RelationshipMetadata};
    use serde::Deserialize;

    fn metadata() -> NodeEntityMetadata {
        NodeEntityMetadata::builder("app::Person", "Person")
            .property("name")
            .property_as("born", "born_year")
            .property("nickname")
            .relationship(RelationshipMetadata::new(
                "employer",
                "WORKS_AT",
                RelationshipDirection::Outgoing,
                "app::Company",
            ))
            .build()
            .unwrap()
    }

    fn node() -> Node {
        Node::new(7, "Person")
            .with_property("name", "Ada")
            .with_property("born_year", 1815)
            .with_property("nickname", JsonValue::Null)
    }

    struct Company;

    impl NodeEntity for Company {
        fn metadata() -> Result<NodeEntityMetadata, OgmError> {
            NodeEntityMetadata::builder("app::Company", "Company").build()
        }

        fn hydrate(_hydrator: &Hydrator<'_>) -> Result<Self, OgmError> {
            Ok(Company)
        }
    }

    #[test]
    fn test_reads_properties_through_keys() {
        let (metadata, node, proxies) = (metadata(), node(), ProxyFactory::detached());
        let h = Hydrator::new(&metadata, &node, &proxies);

        assert_eq!(h.id(), 7);
        assert_eq!(h.property::<String>("name").unwrap(), "Ada");
        assert_eq!(h.property::<i32>("born").unwrap(), 1815);
        assert_eq!(h.property_opt::<String>("nickname").unwrap(), None);
    }

    #[test]
    fn test_type_mismatch_is_hydration_error() {
        let (metadata, node, proxies) = (metadata(), node(), ProxyFactory::detached());
        let h = Hydrator::new(&metadata, &node, &proxies);

        let err = h.property::<i64>("name").unwrap_err();
        assert!(matches!(err, OgmError::Hydration { class, .. } if class == "app::Person"));
    }

    #[test]
    fn test_missing_required_property() {
        let metadata = metadata();
        let node = Node::new(1, "Person");
        let proxies = ProxyFactory::detached();
        let h = Hydrator::new(&metadata, &node, &proxies);

        assert!(matches!(h.property::<String>("name"), Err(OgmError::Hydration { .. })));
        assert!(matches!(
            h.property::<String>("email"),
            Err(OgmError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_properties_as_struct() {
        #[derive(Deserialize)]
        struct Stored {
            name: String,
            born_year: u32,
        }

        let (metadata, node, proxies) = (metadata(), node(), ProxyFactory::detached());
        let stored: Stored = Hydrator::new(&metadata, &node, &proxies)
            .properties()
            .unwrap();
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.born_year, 1815);
    }

    #[test]
    fn test_relationship_cardinality_checked() {
        let (metadata, node, proxies) = (metadata(), node(), ProxyFactory::detached());
        let h = Hydrator::new(&metadata, &node, &proxies);

        let employer = h.related::<Company>("employer").unwrap();
        assert!(!employer.is_initialized());
        assert_eq!(employer.owner_id(), 7);

        assert!(matches!(
            h.related_many::<Company>("employer"),
            Err(OgmError::InvalidMapping(_))
        ));
        assert!(matches!(
            h.related::<Company>("friends"),
            Err(OgmError::InvalidMapping(_))
        ));
    }
}
