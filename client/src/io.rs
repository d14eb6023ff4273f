use roster_shared::TransportError;

use crate::transport::{PacketReceiver, PacketSender};

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
            panic!("Client Error: Cannot load Socket into an Io that has already been loaded");
        }
        self.packet_sender = Some(packet_sender);
        self.packet_receiver = Some(packet_receiver);
    }

    pub fn is_connected(&self) -> bool {
        self.packet_receiver
            .as_ref()
            .is_some_and(|receiver| receiver.is_connected())
    }

    pub fn send_payload(&self, payload: &[u8]) -> Result<(), TransportError> {
        let Some(sender) = self.packet_sender.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        sender.send(payload)
    }

    pub fn recv_payload(&mut self) -> Result<Option<Box<[u8]>>, TransportError> {
        match self.packet_receiver.as_mut() {
            Some(receiver) => receiver.receive(),
            None => Ok(None),
        }
    }

    pub fn disconnect(&self) {
        if let Some(sender) = self.packet_sender.as_ref() {
            sender.disconnect();
        }
    }
}
