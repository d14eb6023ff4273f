/// In-memory transport for end-to-end testing
/// Routes payloads between one server and any number of clients without network I/O

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use roster_client::transport::{
    PacketReceiver as ClientPacketReceiver, PacketSender as ClientPacketSender,
};
use roster_server::transport::{
    PacketReceiver as ServerPacketReceiver, PacketSender as ServerPacketSender, ServerEvent,
};
use roster_shared::{PeerId, TransportError};

#[derive(Default)]
struct HubState {
    listening: bool,
    next_peer: u64,
    connected: HashSet<PeerId>,
    server_inbox: VecDeque<ServerEvent>,
    client_inboxes: HashMap<PeerId, VecDeque<Box<[u8]>>>,
}

/// Shared switchboard. Every clone routes through the same queues.
#[derive(Clone)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

/// Client end of a hub connection
pub struct LocalClientSocket {
    pub peer: PeerId,
    pub sender: Box<dyn ClientPacketSender>,
    pub receiver: Box<dyn ClientPacketReceiver>,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHub {
    pub fn new() -> Self {
        let state = HubState {
            listening: true,
            next_peer: 1,
            ..HubState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn server_socket(&self) -> (Box<dyn ServerPacketSender>, Box<dyn ServerPacketReceiver>) {
        let sender = Box::new(LocalServerSender { hub: self.clone() });
        let receiver = Box::new(LocalServerReceiver { hub: self.clone() });
        (sender, receiver)
    }

    /// Opens a new client connection and announces it to the server
    pub fn connect_client(&self) -> LocalClientSocket {
        let peer = {
            let mut state = self.state();
            let peer = PeerId::new(state.next_peer);
            state.next_peer += 1;
            state.connected.insert(peer);
            state.client_inboxes.insert(peer, VecDeque::new());
            state.server_inbox.push_back(ServerEvent::Connected(peer));
            peer
        };

        LocalClientSocket {
            peer,
            sender: Box::new(LocalClientSender {
                hub: self.clone(),
                peer,
            }),
            receiver: Box::new(LocalClientReceiver {
                hub: self.clone(),
                peer,
            }),
        }
    }

    /// Simulates the link to `peer` going down. Both ends notice.
    pub fn drop_client(&self, peer: &PeerId) {
        let mut state = self.state();
        if state.connected.remove(peer) {
            state.client_inboxes.remove(peer);
            state.server_inbox.push_back(ServerEvent::Disconnected(*peer));
        }
    }

    /// Brings the link to `peer` back up after [`LocalHub::drop_client`].
    /// The client keeps its peer id.
    pub fn reconnect_client(&self, peer: &PeerId) {
        let mut state = self.state();
        if state.listening && state.connected.insert(*peer) {
            state.client_inboxes.insert(*peer, VecDeque::new());
            state.server_inbox.push_back(ServerEvent::Connected(*peer));
        }
    }

    /// Stops the server socket. Every client loses its connection.
    pub fn shut_down(&self) {
        let mut state = self.state();
        state.listening = false;
        state.connected.clear();
        state.client_inboxes.clear();
        state.server_inbox.clear();
    }

    pub fn is_connected(&self, peer: &PeerId) -> bool {
        self.state().connected.contains(peer)
    }

    /// Payloads waiting for `peer`
    pub fn pending_for(&self, peer: &PeerId) -> usize {
        self.state()
            .client_inboxes
            .get(peer)
            .map_or(0, VecDeque::len)
    }

    /// Delivers raw bytes to the server as if `peer` had sent them
    pub fn inject_server_payload(&self, peer: &PeerId, payload: &[u8]) {
        self.state()
            .server_inbox
            .push_back(ServerEvent::Payload(*peer, payload.into()));
    }
}

// Server Socket Components

struct LocalServerSender {
    hub: LocalHub,
}

impl ServerPacketSender for LocalServerSender {
    fn send(&self, peer: &PeerId, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.hub.state();
        match state.client_inboxes.get_mut(peer) {
            Some(inbox) => {
                inbox.push_back(payload.into());
                Ok(())
            }
            None => Err(TransportError::UnknownPeer { peer: *peer }),
        }
    }

    fn disconnect(&self, peer: &PeerId) {
        let mut state = self.hub.state();
        state.connected.remove(peer);
        state.client_inboxes.remove(peer);
    }
}

struct LocalServerReceiver {
    hub: LocalHub,
}

impl ServerPacketReceiver for LocalServerReceiver {
    fn receive(&mut self) -> Result<Option<ServerEvent>, TransportError> {
        Ok(self.hub.state().server_inbox.pop_front())
    }

    fn is_active(&self) -> bool {
        self.hub.state().listening
    }
}

// Client Socket Components

struct LocalClientSender {
    hub: LocalHub,
    peer: PeerId,
}

impl ClientPacketSender for LocalClientSender {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.hub.state();
        if !state.connected.contains(&self.peer) {
            return Err(TransportError::NotConnected);
        }
        state
            .server_inbox
            .push_back(ServerEvent::Payload(self.peer, payload.into()));
        Ok(())
    }

    fn disconnect(&self) {
        self.hub.drop_client(&self.peer);
    }
}

struct LocalClientReceiver {
    hub: LocalHub,
    peer: PeerId,
}

impl ClientPacketReceiver for LocalClientReceiver {
    fn receive(&mut self) -> Result<Option<Box<[u8]>>, TransportError> {
        let mut state = self.hub.state();
        Ok(state
            .client_inboxes
            .get_mut(&self.peer)
            .and_then(VecDeque::pop_front))
    }

    fn is_connected(&self) -> bool {
        self.hub.state().connected.contains(&self.peer)
    }
}
