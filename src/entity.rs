//! The trait implemented by mapped entity types.

use crate::error::OgmError;
use crate::hydrator::Hydrator;
use crate::metadata::NodeEntityMetadata;

/// An application type stored as a graph node.
///
/// # Example
///
/// ```ignore
/// struct Person {
///     id: i64,
///     name: String,
///     friends: LazyCollection<Person>,
/// }
///
/// impl NodeEntity for Person {
///     fn metadata() -> Result<NodeEntityMetadata, OgmError> {
///         NodeEntityMetadata::builder("app::Person", "Person")
///             .property("name")
///             .relationship(
///                 RelationshipMetadata::new("friends", "FRIEND_OF", RelationshipDirection::Both, "app::Person")
///                     .collection(),
///             )
///             .build()
///     }
///
///     fn hydrate(h: &Hydrator<'_>) -> Result<Self, OgmError> {
///         Ok(Self {
///             id: h.id(),
///             name: h.property("name")?,
///             friends: h.related_many("friends")?,
///         })
///     }
/// }
/// ```
pub trait NodeEntity: Send + Sync + Sized + 'static {
    /// Describes the persisted shape. Called once, at registration.
    fn metadata() -> Result<NodeEntityMetadata, OgmError>;

    /// Builds an instance from a loaded node.
    fn hydrate(hydrator: &Hydrator<'_>) -> Result<Self, OgmError>;
}
