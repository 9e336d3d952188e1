//! Mapping metadata for node entities.

mod class;
mod registry;

pub use class::{
    NodeEntityMetadata, NodeEntityMetadataBuilder, PropertyMetadata, RelationshipDirection,
    RelationshipMetadata,
};
pub use registry::MetadataRegistry;

/// Returns true for plain Cypher identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
