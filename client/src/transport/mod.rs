use roster_shared::TransportError;

pub trait PacketSender: Send + Sync {
    /// Sends a payload to the server. Delivery must preserve send order.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;
    /// Closes the connection to the server
    fn disconnect(&self);
}

pub trait PacketReceiver: Send + Sync {
    /// Receives the next payload from the server, if any
    fn receive(&mut self) -> Result<Option<Box<[u8]>>, TransportError>;
    /// Whether the session with the server is up
    fn is_connected(&self) -> bool;
}
