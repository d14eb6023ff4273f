use thiserror::Error;

use crate::types::EntityId;

/// Registry invariant violations. These are programming errors on the
/// caller's side and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The record has no Identity facet, so it has no key
    #[error("Record has no Identity facet and cannot be stored in the registry")]
    MissingIdentity,

    /// `add` was called for an id that is already present
    #[error("Entity {entity_id} is already registered")]
    AlreadyRegistered { entity_id: EntityId },

    /// The operation targets an id that is not present
    #[error("Cannot {operation} entity {entity_id}, it is not registered")]
    NotRegistered {
        entity_id: EntityId,
        operation: &'static str,
    },

    /// A write would replace or drop a record's Identity
    #[error("Entity {entity_id} cannot change its Identity once registered")]
    IdentityChanged { entity_id: EntityId },

    /// `clear_facet` was called for a facet the record does not carry
    #[error("Entity {entity_id} has no {type_name} facet")]
    FacetNotFound {
        entity_id: EntityId,
        type_name: &'static str,
    },
}
