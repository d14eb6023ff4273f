use serde::{Deserialize, Serialize};

use crate::{
    facet::facet::Facet,
    permissions::Handler,
    types::{EntityId, PeerId},
};

/// Marks a record as networked and names the peer that owns it.
///
/// `owner == None` means the record belongs to the server host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    owner: Option<PeerId>,
    peer_entities: Vec<EntityId>,
}

impl NetworkIdentity {
    pub fn server_owned() -> Self {
        Self::default()
    }

    pub fn owned_by(peer: PeerId) -> Self {
        Self {
            owner: Some(peer),
            peer_entities: Vec::new(),
        }
    }

    /// Other records the owning peer submitted alongside this one
    pub fn with_peer_entities(mut self, peer_entities: Vec<EntityId>) -> Self {
        self.peer_entities = peer_entities;
        self
    }

    pub fn owner(&self) -> Option<PeerId> {
        self.owner
    }

    pub fn is_owned_by(&self, peer: &PeerId) -> bool {
        self.owner.as_ref() == Some(peer)
    }

    pub fn is_server_owned(&self) -> bool {
        self.owner.is_none()
    }

    pub fn peer_entities(&self) -> &[EntityId] {
        &self.peer_entities
    }
}

impl Facet for NetworkIdentity {
    const TYPE_NAME: &'static str = "NetworkIdentity";

    fn required_visibility() -> Option<Handler> {
        Some(Handler::Everyone)
    }
}
