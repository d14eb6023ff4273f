use thiserror::Error;

use crate::types::PeerId;

/// Errors a transport reports when a payload cannot be handed off
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The session is not active
    #[error("Transport is not connected")]
    NotConnected,

    /// The addressed peer is not connected
    #[error("Peer {peer} is not connected")]
    UnknownPeer { peer: PeerId },

    /// The underlying channel refused the payload
    #[error("Failed to send payload: {reason}")]
    SendFailed { reason: String },
}
