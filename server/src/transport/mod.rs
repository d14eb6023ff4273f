use roster_shared::{PeerId, TransportError};

/// What the server socket reported since the last poll
#[derive(Debug, PartialEq, Eq)]
pub enum ServerEvent {
    Connected(PeerId),
    Disconnected(PeerId),
    Payload(PeerId, Box<[u8]>),
}

pub trait PacketSender: Send + Sync {
    /// Sends a payload to one connected peer. Delivery to a single peer
    /// must preserve send order.
    fn send(&self, peer: &PeerId, payload: &[u8]) -> Result<(), TransportError>;
    /// Drops a peer's connection
    fn disconnect(&self, peer: &PeerId);
}

pub trait PacketReceiver: Send + Sync {
    /// Receives the next socket event, if any
    fn receive(&mut self) -> Result<Option<ServerEvent>, TransportError>;
    /// Whether the server socket is still listening
    fn is_active(&self) -> bool;
}
