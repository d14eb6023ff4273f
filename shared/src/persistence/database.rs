use crate::{facet::facet::Facet, persistence::error::DatabaseError, types::EntityId};

/// A facet that a [`PlayerDatabase`] stores. Its own id is the primary key.
pub trait StoredFacet: Facet {
    fn storage_id(&self) -> &EntityId;
}

/// Storage for one facet type, keyed by entity id.
///
/// File-based and remote backends are interchangeable behind this trait.
/// Calls run off the tick loop, so implementations may block.
pub trait PlayerDatabase: Send + Sync + 'static {
    type Facet: StoredFacet;

    fn contains(&self, entity_id: &EntityId) -> Result<bool, DatabaseError>;

    fn get(&self, entity_id: &EntityId) -> Result<Self::Facet, DatabaseError>;

    /// Inserts or overwrites the entry keyed by `facet.storage_id()`
    fn set(&self, facet: &Self::Facet) -> Result<(), DatabaseError>;
}
