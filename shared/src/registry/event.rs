use crate::{
    facet::facet_kind::FacetKind, messages::broadcast::SyncReason,
    registry::phase::RegistryPhase, types::EntityId,
};

/// Notifications queued after the authoritative write has landed.
/// Drain them with `take_events()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    Added {
        entity_id: EntityId,
    },
    Removed {
        entity_id: EntityId,
    },
    Updated {
        entity_id: EntityId,
        kind: FacetKind,
    },
    /// The whole map was replaced by the server
    Synced {
        reason: SyncReason,
    },
    PhaseChanged {
        previous: RegistryPhase,
        current: RegistryPhase,
    },
    /// A persisted facet was attached to a registered record
    LoadApplied {
        entity_id: EntityId,
        kind: FacetKind,
    },
}
