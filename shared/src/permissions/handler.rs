use crate::{facet::network_identity::NetworkIdentity, types::PeerId};

/// Policy deciding which peers may see or write a facet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Any peer
    Everyone,
    /// Only the peer owning the record. The server is the evaluator and is
    /// always allowed.
    OwnerAndServer,
    /// No remote peer, not even the owner
    ServerOnly,
}

impl Handler {
    pub fn allows(&self, network_identity: &NetworkIdentity, peer: &PeerId) -> bool {
        match self {
            Handler::Everyone => true,
            Handler::OwnerAndServer => network_identity.is_owned_by(peer),
            Handler::ServerOnly => false,
        }
    }
}
