use serde::{Deserialize, Serialize};

use crate::{facet::facet::Facet, permissions::Handler, types::EntityId};

/// Mandatory facet carrying the registry key of a record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    entity_id: EntityId,
    local_player_index: Option<u32>,
}

impl Identity {
    pub fn new(entity_id: impl Into<EntityId>) -> Self {
        Self {
            entity_id: entity_id.into(),
            local_player_index: None,
        }
    }

    /// An identity with a freshly generated id
    pub fn generate() -> Self {
        Self::new(EntityId::generate())
    }

    /// Marks which local player slot (split-screen seat, controller) owns this record
    pub fn with_local_player_index(mut self, index: u32) -> Self {
        self.local_player_index = Some(index);
        self
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn local_player_index(&self) -> Option<u32> {
        self.local_player_index
    }
}

impl Facet for Identity {
    const TYPE_NAME: &'static str = "Identity";

    fn required_visibility() -> Option<Handler> {
        Some(Handler::Everyone)
    }
}
