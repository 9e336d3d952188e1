//! Entity descriptors: labels, properties and relationships.

use std::fmt;
use std::sync::Arc;

use crate::error::OgmError;
use crate::metadata::is_identifier;

/// A mapped property: the entity field and the node property key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub field: String,
    pub key: String,
}

/// Direction of a relationship, seen from the owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipDirection {
    /// `(owner)-[:TYPE]->(target)`
    Outgoing,
    /// `(owner)<-[:TYPE]-(target)`
    Incoming,
    /// Either direction.
    Both,
}

/// A mapped relationship field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMetadata {
    field: String,
    rel_type: String,
    direction: RelationshipDirection,
    target_class: String,
    collection: bool,
}

impl RelationshipMetadata {
    /// Describes a single-valued relationship; see [`collection`](Self::collection).
    pub fn new(
        field: impl Into<String>,
        rel_type: impl Into<String>,
        direction: RelationshipDirection,
        target_class: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rel_type: rel_type.into(),
            direction,
            target_class: target_class.into(),
            collection: false,
        }
    }

    /// Marks the relationship as holding any number of targets.
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    pub fn direction(&self) -> RelationshipDirection {
        self.direction
    }

    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }
}

/// Persisted shape of a node entity class.
///
/// Built once through [`NodeEntityMetadata::builder`] and immutable afterwards.
/// Every label, property key and relationship type is checked to be a plain
/// identifier, so persisters may embed them in generated Cypher.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntityMetadata {
    class_name: String,
    label: String,
    properties: Vec<PropertyMetadata>,
    relationships: Vec<Arc<RelationshipMetadata>>,
}

impl NodeEntityMetadata {
    pub fn builder(
        class_name: impl Into<String>,
        label: impl Into<String>,
    ) -> NodeEntityMetadataBuilder {
        NodeEntityMetadataBuilder {
            class_name: class_name.into(),
            label: label.into(),
            properties: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    pub fn relationships(&self) -> &[Arc<RelationshipMetadata>] {
        &self.relationships
    }

    pub fn property(&self, field: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.field == field)
    }

    pub fn relationship(&self, field: &str) -> Option<&Arc<RelationshipMetadata>> {
        self.relationships.iter().find(|r| r.field == field)
    }

    /// Resolves a field name to its stored property key.
    pub fn property_key(&self, field: &str) -> Result<&str, OgmError> {
        self.property(field)
            .map(|p| p.key.as_str())
            .ok_or_else(|| OgmError::UnknownProperty {
                class: self.class_name.clone(),
                property: field.to_string(),
            })
    }
}

impl fmt::Display for NodeEntityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (:{})", self.class_name, self.label)
    }
}

/// Builder for [`NodeEntityMetadata`].
#[derive(Debug)]
pub struct NodeEntityMetadataBuilder {
    class_name: String,
    label: String,
    properties: Vec<PropertyMetadata>,
    relationships: Vec<RelationshipMetadata>,
}

impl NodeEntityMetadataBuilder {
    /// Maps a field stored under a property key of the same name.
    pub fn property(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.property_as(name.clone(), name)
    }

    /// Maps a field stored under a different property key.
    pub fn property_as(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.properties.push(PropertyMetadata {
            field: field.into(),
            key: key.into(),
        });
        self
    }

    pub fn relationship(mut self, relationship: RelationshipMetadata) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn build(self) -> Result<NodeEntityMetadata, OgmError> {
        let invalid = |what: &str, value: &str| {
            OgmError::InvalidMapping(format!(
                "{}: {} '{}' is not a valid identifier",
                self.class_name, what, value
            ))
        };

        if self.class_name.is_empty() {
            return Err(OgmError::InvalidMapping("class name is empty".into()));
        }
        if !is_identifier(&self.label) {
            return Err(invalid("label", &self.label));
        }

        let mut fields: Vec<&str> = Vec::new();
        for property in &self.properties {
            if !is_identifier(&property.key) {
                return Err(invalid("property key", &property.key));
            }
            fields.push(&property.field);
        }
        for relationship in &self.relationships {
            if !is_identifier(&relationship.rel_type) {
                return Err(invalid("relationship type", &relationship.rel_type));
            }
            fields.push(&relationship.field);
        }

        fields.sort_unstable();
        if let Some(pair) = fields.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(OgmError::InvalidMapping(format!(
                "{}: field '{}' is mapped twice",
                self.class_name, pair[0]
            )));
        }

        Ok(NodeEntityMetadata {
            class_name: self.class_name,
            label: self.label,
            properties: self.properties,
            relationships: self.relationships.into_iter().map(Arc::new).collect(),
        })
    }
}
