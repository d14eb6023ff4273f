use roster_shared::{PeerId, TransportError};

use crate::transport::{PacketReceiver, PacketSender, ServerEvent};

pub struct Io {
    packet_sender: Option<Box<dyn PacketSender>>,
    packet_receiver: Option<Box<dyn PacketReceiver>>,
}

impl Io {
    pub fn new() -> Self {
        Self {
            packet_sender: None,
            packet_receiver: None,
        }
    }

    pub fn load(
        &mut self,
        packet_sender: Box<dyn PacketSender>,
        packet_receiver: Box<dyn PacketReceiver>,
    ) {
        if self.packet_sender.is_some() {
            panic!("Server Error: Cannot load Socket into an Io that has already been loaded");
        }
        self.packet_sender = Some(packet_sender);
        self.packet_receiver = Some(packet_receiver);
    }

    pub fn is_active(&self) -> bool {
        self.packet_receiver
            .as_ref()
            .is_some_and(|receiver| receiver.is_active())
    }

    pub fn send_payload(&self, peer: &PeerId, payload: &[u8]) -> Result<(), TransportError> {
        let Some(sender) = self.packet_sender.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        sender.send(peer, payload)
    }

    pub fn recv_event(&mut self) -> Result<Option<ServerEvent>, TransportError> {
        match self.packet_receiver.as_mut() {
            Some(receiver) => receiver.receive(),
            None => Ok(None),
        }
    }

    pub fn disconnect(&self, peer: &PeerId) {
        if let Some(sender) = self.packet_sender.as_ref() {
            sender.disconnect(peer);
        }
    }
}
