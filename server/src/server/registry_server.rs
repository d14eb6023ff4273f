use std::collections::{HashSet, VecDeque};

use log::{debug, info, warn};

use roster_shared::{
    Broadcast, EntityId, Facet, FacetKind, FacetKinds, Identity, NetworkIdentity, PeerId,
    Permissions, Persistence, Protocol, Record, Registry, RegistryError, RegistryEvent,
    RegistryOperation, RegistryPhase, SyncReason,
};

use crate::{
    io::Io,
    transport::{PacketReceiver, PacketSender, ServerEvent},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Admission {
    Admitted,
    /// The sender already owns a record under this id
    AlreadyOwned,
    /// Another owner holds the id
    Conflict,
    Refused,
}

/// The authoritative side of a replicated player registry.
///
/// Admits records submitted by peers, checks Mutability before applying
/// their writes and sends each peer a Visibility-filtered view of the
/// registry. Drive it by calling [`RegistryServer::tick`] once per frame,
/// or the three steps it is made of.
pub struct RegistryServer {
    // Protocol
    facet_kinds: FacetKinds,
    permissions: Permissions,
    // Registry
    registry: Registry,
    phase: RegistryPhase,
    local_entities: HashSet<EntityId>,
    // Peers
    io: Io,
    peers: HashSet<PeerId>,
    outgoing: VecDeque<(PeerId, Broadcast)>,
}

impl RegistryServer {
    /// Create a new RegistryServer
    pub fn new<P: Into<Protocol>>(protocol: P) -> Self {
        let mut protocol: Protocol = protocol.into();
        if !protocol.is_locked() {
            protocol.lock();
        }

        let Protocol {
            facet_kinds,
            permissions,
            ..
        } = protocol;

        Self {
            facet_kinds,
            permissions,
            registry: Registry::new(),
            phase: RegistryPhase::Disabled,
            local_entities: HashSet::new(),
            io: Io::new(),
            peers: HashSet::new(),
            outgoing: VecDeque::new(),
        }
    }

    /// Loads persisted facets when records are admitted and saves them when
    /// records leave. Must be called before any record is added.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.registry = Registry::with_persistence(persistence);
        self
    }

    pub fn io_load(&mut self, sender: Box<dyn PacketSender>, receiver: Box<dyn PacketReceiver>) {
        self.io.load(sender, receiver);
    }

    /// Returns whether or not the Server has a socket loaded that is
    /// listening for Clients
    pub fn is_listening(&self) -> bool {
        self.io.is_active()
    }

    pub fn phase(&self) -> RegistryPhase {
        self.phase
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<&Record> {
        self.registry.get(entity_id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &Record> {
        self.registry.get_all()
    }

    /// Whether `entity_id` belongs to this process rather than a peer
    pub fn is_local(&self, entity_id: &EntityId) -> bool {
        self.local_entities.contains(entity_id)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.registry.take_events()
    }

    /// Blocks until every in-flight persistence load and save has finished.
    /// Loads are applied on the next tick.
    pub fn flush_persistence(&mut self) {
        if let Some(persistence) = self.registry.persistence_mut() {
            persistence.flush();
        }
    }

    // Local writes

    /// Adds a record owned by this process
    pub fn add(&mut self, mut record: Record) -> Result<EntityId, RegistryError> {
        if self.phase.is_networked() && !record.is_networked() {
            record.set(NetworkIdentity::server_owned());
        }
        let entity_id = self.registry.add(record)?;
        self.local_entities.insert(entity_id.clone());

        if self.phase.is_networked() {
            self.queue_sync_all(SyncReason::RosterChanged);
        }
        Ok(entity_id)
    }

    /// Removes any record, local or admitted from a peer
    pub fn remove(&mut self, entity_id: &EntityId) -> Result<Record, RegistryError> {
        let record = self.registry.remove_entity(entity_id)?;
        self.local_entities.remove(entity_id);

        if record.is_networked() {
            self.queue_sync_all(SyncReason::RosterChanged);
        }
        Ok(record)
    }

    /// Replaces a stored record and replicates the facet named by `kind`.
    /// A record passed in without a NetworkIdentity keeps the stored one.
    pub fn update(&mut self, mut record: Record, kind: FacetKind) -> Result<(), RegistryError> {
        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;
        if !record.is_networked() {
            if let Some(network_identity) = self
                .registry
                .get(&entity_id)
                .and_then(Record::network_identity)
            {
                record.set(network_identity.clone());
            }
        }

        self.registry.update(record, kind)?;
        self.queue_update(&entity_id, kind);
        Ok(())
    }

    pub fn set_facet<F: Facet>(&mut self, entity_id: &EntityId, facet: F) -> Result<(), RegistryError> {
        self.registry.set_facet(entity_id, facet)?;
        self.queue_update(entity_id, FacetKind::of::<F>());
        Ok(())
    }

    pub fn clear_facet<F: Facet>(&mut self, entity_id: &EntityId) -> Result<F, RegistryError> {
        let facet = self.registry.clear_facet::<F>(entity_id)?;
        self.queue_update(entity_id, FacetKind::of::<F>());
        Ok(facet)
    }

    // Tick

    /// Reads every pending socket event, applies finished persistence
    /// loads, advances the phase machine and flushes outgoing broadcasts
    pub fn tick(&mut self) {
        self.receive_all_packets();
        self.process_loaded();
        self.update_phase();
        self.send_all_packets();
    }

    /// Handle connection changes and read all incoming payloads
    pub fn receive_all_packets(&mut self) {
        loop {
            match self.io.recv_event() {
                Ok(Some(ServerEvent::Connected(peer))) => {
                    info!("Peer {} connected", peer);
                    self.peers.insert(peer);
                }
                Ok(Some(ServerEvent::Disconnected(peer))) => {
                    self.handle_peer_departure(&peer);
                }
                Ok(Some(ServerEvent::Payload(peer, payload))) => {
                    self.read_payload(peer, &payload);
                }
                Ok(None) => {
                    // No more events, break loop
                    break;
                }
                Err(error) => {
                    warn!("Server Error: {}", error);
                    break;
                }
            }
        }
    }

    /// Applies facets that finished loading from persistence
    pub fn process_loaded(&mut self) {
        for (entity_id, kind) in self.registry.apply_loaded() {
            self.queue_update(&entity_id, kind);
        }
    }

    pub fn update_phase(&mut self) {
        let active = self.io.is_active();

        match self.phase {
            RegistryPhase::Disabled => {
                if !active {
                    // a dedicated server never leaves Disabled, so peer
                    // records are discarded here once the socket closes
                    if self.has_remote_records() {
                        self.evict_remote_records();
                    }
                } else if !self.local_entities.is_empty() {
                    self.set_phase(RegistryPhase::Joining);
                }
            }
            RegistryPhase::Joining => {
                // the server admits itself, no round trip needed
                let mut local_ids: Vec<EntityId> = self.local_entities.iter().cloned().collect();
                local_ids.sort();
                for entity_id in &local_ids {
                    let has_network_identity = self
                        .registry
                        .get(entity_id)
                        .is_some_and(Record::is_networked);
                    if has_network_identity {
                        continue;
                    }
                    let peer_entities = local_ids
                        .iter()
                        .filter(|id| *id != entity_id)
                        .cloned()
                        .collect();
                    let network_identity =
                        NetworkIdentity::server_owned().with_peer_entities(peer_entities);
                    if let Err(err) = self.registry.set_facet_silent(entity_id, network_identity) {
                        warn!("Server Error: cannot network local record: {}", err);
                    }
                }
                self.set_phase(RegistryPhase::InUse);
                self.queue_sync_all(SyncReason::RosterChanged);
            }
            RegistryPhase::InUse => {
                if !active {
                    self.set_phase(RegistryPhase::Disconnecting);
                }
            }
            RegistryPhase::Disconnecting => {
                self.evict_remote_records();
                self.set_phase(RegistryPhase::Disabled);
            }
        }
    }

    fn has_remote_records(&self) -> bool {
        self.registry
            .entity_ids()
            .any(|entity_id| !self.local_entities.contains(entity_id))
    }

    /// Removes every record this process does not own, saving each through
    /// persistence, and strips the NetworkIdentity from local records
    fn evict_remote_records(&mut self) {
        let remote: Vec<EntityId> = self
            .registry
            .entity_ids()
            .filter(|entity_id| !self.local_entities.contains(*entity_id))
            .cloned()
            .collect();
        for entity_id in &remote {
            if let Err(err) = self.registry.remove_entity(entity_id) {
                warn!("Server Error: cannot evict entity {}: {}", entity_id, err);
            }
        }
        if !remote.is_empty() {
            info!("Evicted {} peer records after the socket closed", remote.len());
        }
        self.registry.retain_local(&self.local_entities);
        self.peers.clear();
        self.outgoing.clear();
    }

    /// Encode and send every queued broadcast
    pub fn send_all_packets(&mut self) {
        if !self.io.is_active() {
            if !self.outgoing.is_empty() {
                debug!("Dropping {} broadcasts, socket is not active", self.outgoing.len());
                self.outgoing.clear();
            }
            return;
        }

        while let Some((peer, broadcast)) = self.outgoing.pop_front() {
            let payload = match broadcast.to_bytes() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(
                        "Server Error: cannot encode {} for {}: {}",
                        broadcast.name(),
                        peer,
                        err
                    );
                    continue;
                }
            };
            if let Err(err) = self.io.send_payload(&peer, &payload) {
                warn!(
                    "Server Error: cannot send {} to {}: {}",
                    broadcast.name(),
                    peer,
                    err
                );
            }
        }
    }

    fn set_phase(&mut self, current: RegistryPhase) {
        let previous = self.phase;
        if previous == current {
            return;
        }
        self.phase = current;
        info!("Registry server phase {} -> {}", previous, current);
        self.registry
            .push_event(RegistryEvent::PhaseChanged { previous, current });
    }

    // Inbound

    fn read_payload(&mut self, peer: PeerId, payload: &[u8]) {
        let broadcast = match Broadcast::from_bytes(payload, &self.facet_kinds) {
            Ok(broadcast) => broadcast,
            Err(err) => {
                warn!(
                    "Server Error: malformed payload from {}, dropping connection: {}",
                    peer, err
                );
                self.io.disconnect(&peer);
                self.handle_peer_departure(&peer);
                return;
            }
        };
        self.peers.insert(peer);

        match broadcast {
            Broadcast::Join { records } => self.handle_join(peer, records),
            Broadcast::Operation {
                record,
                operation: RegistryOperation::Add,
            } => match self.network_add(peer, record, &[]) {
                Admission::Admitted => self.queue_sync_all(SyncReason::RosterChanged),
                Admission::AlreadyOwned => self.queue_sync(peer, SyncReason::Refresh),
                Admission::Conflict => self.queue_sync(peer, SyncReason::PermissionDenied),
                Admission::Refused => {}
            },
            Broadcast::Operation {
                record,
                operation: RegistryOperation::Remove,
            } => self.handle_remote_remove(peer, record),
            Broadcast::Update {
                record,
                facet_type_name,
            } => self.handle_remote_update(peer, record, &facet_type_name),
            Broadcast::Sync { .. } => {
                warn!("Server Error: {} sent a Sync broadcast, ignoring it", peer);
            }
        }
    }

    fn handle_join(&mut self, peer: PeerId, records: Vec<Record>) {
        let batch: Vec<EntityId> = records
            .iter()
            .filter_map(|record| record.entity_id().cloned())
            .collect();
        let mut conflicted = false;
        for record in records {
            conflicted |= self.network_add(peer, record, &batch) == Admission::Conflict;
        }
        // one resync for the whole batch
        self.queue_sync_all(SyncReason::RosterChanged);
        if conflicted {
            self.queue_sync(peer, SyncReason::PermissionDenied);
        }
    }

    /// Admits a record from `peer`. An id that is already present is never
    /// replaced.
    fn network_add(&mut self, peer: PeerId, mut record: Record, batch: &[EntityId]) -> Admission {
        let Some(entity_id) = record.entity_id().cloned() else {
            warn!("Server Error: {} submitted a record without Identity", peer);
            return Admission::Refused;
        };
        if let Some(stored) = self.registry.get(&entity_id) {
            let owned = stored
                .network_identity()
                .is_some_and(|network_identity| network_identity.is_owned_by(&peer));
            if owned {
                debug!("Entity {} is already admitted, ignoring add from {}", entity_id, peer);
                return Admission::AlreadyOwned;
            }
            warn!(
                "Peer {} tried to add entity {} which it does not own",
                peer, entity_id
            );
            return Admission::Conflict;
        }

        let peer_entities = batch
            .iter()
            .filter(|id| **id != entity_id)
            .cloned()
            .collect();
        record.set(NetworkIdentity::owned_by(peer).with_peer_entities(peer_entities));

        match self.registry.add(record) {
            Ok(_) => {
                info!("Admitted entity {} from {}", entity_id, peer);
                Admission::Admitted
            }
            Err(err) => {
                warn!("Server Error: cannot admit record from {}: {}", peer, err);
                Admission::Refused
            }
        }
    }

    fn handle_remote_remove(&mut self, peer: PeerId, record: Record) {
        let Some(entity_id) = record.entity_id().cloned() else {
            warn!("Server Error: {} asked to remove a record without Identity", peer);
            return;
        };
        let Some(stored) = self.registry.get(&entity_id) else {
            debug!("Entity {} is not registered, ignoring remove from {}", entity_id, peer);
            return;
        };
        let owned = stored
            .network_identity()
            .is_some_and(|network_identity| network_identity.is_owned_by(&peer));
        if !owned {
            warn!(
                "Peer {} tried to remove entity {} without owning it",
                peer, entity_id
            );
            self.queue_sync(peer, SyncReason::PermissionDenied);
            return;
        }

        if let Err(err) = self.registry.remove_entity(&entity_id) {
            warn!("Server Error: {}", err);
            return;
        }
        info!("Removed entity {} at the request of {}", entity_id, peer);
        self.queue_sync_all(SyncReason::RosterChanged);
    }

    fn handle_remote_update(&mut self, peer: PeerId, mut record: Record, facet_type_name: &str) {
        let kind = match self.facet_kinds.kind_by_name(facet_type_name) {
            Ok(kind) => kind,
            Err(err) => {
                warn!("Dropping update from {}: {}", peer, err);
                return;
            }
        };
        let Some(entity_id) = record.entity_id().cloned() else {
            warn!("Server Error: {} sent an update without Identity", peer);
            return;
        };
        let Some(stored) = self.registry.get(&entity_id) else {
            warn!(
                "Dropping update from {}: entity {} is not registered",
                peer, entity_id
            );
            return;
        };

        // the replication lock and the key are never writable remotely
        let structural =
            kind == FacetKind::of::<Identity>() || kind == FacetKind::of::<NetworkIdentity>();
        let allowed = !structural
            && match self.permissions.try_can_modify(stored, &kind, &peer) {
                Ok(allowed) => allowed,
                Err(err) => {
                    warn!("Server Error: {}", err);
                    false
                }
            };
        if !allowed {
            warn!(
                "Peer {} tried to modify {} on entity {} without permission",
                peer, kind, entity_id
            );
            self.queue_sync(peer, SyncReason::PermissionDenied);
            return;
        }

        let mut updated = stored.clone();
        match record.clear_kind(&kind) {
            Some(facet) => updated.set_boxed(facet),
            None => {
                updated.clear_kind(&kind);
            }
        }
        if let Err(err) = self.registry.update(updated, kind) {
            warn!("Server Error: {}", err);
            return;
        }
        self.queue_update(&entity_id, kind);
    }

    fn handle_peer_departure(&mut self, peer: &PeerId) {
        self.peers.remove(peer);
        self.outgoing.retain(|(recipient, _)| recipient != peer);

        let departed: Vec<EntityId> = self
            .registry
            .get_all()
            .filter(|record| {
                record
                    .network_identity()
                    .is_some_and(|network_identity| network_identity.is_owned_by(peer))
            })
            .filter_map(|record| record.entity_id().cloned())
            .collect();
        for entity_id in &departed {
            if let Err(err) = self.registry.remove_entity(entity_id) {
                warn!("Server Error: {}", err);
            }
        }

        info!(
            "Peer {} disconnected, removed {} records",
            peer,
            departed.len()
        );
        if !departed.is_empty() {
            self.queue_sync_all(SyncReason::RosterChanged);
        }
    }

    // Outbound

    /// Every networked record, as `peer` is allowed to see it
    fn sync_view(&self, peer: &PeerId) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .registry
            .get_all()
            .filter(|record| record.is_networked())
            .filter_map(|record| self.permissions.try_filter_for(record, peer).ok())
            .collect();
        records.sort_by(|a, b| a.entity_id().cmp(&b.entity_id()));
        records
    }

    fn sorted_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.peers.iter().copied().collect();
        peers.sort();
        peers
    }

    fn queue_sync(&mut self, peer: PeerId, reason: SyncReason) {
        let records = self.sync_view(&peer);
        self.outgoing
            .push_back((peer, Broadcast::Sync { records, reason }));
    }

    fn queue_sync_all(&mut self, reason: SyncReason) {
        for peer in self.sorted_peers() {
            self.queue_sync(peer, reason);
        }
    }

    /// Sends one changed facet to every peer allowed to see it
    fn queue_update(&mut self, entity_id: &EntityId, kind: FacetKind) {
        let Some(record) = self.registry.get(entity_id) else {
            return;
        };
        if !record.is_networked() {
            return;
        }

        let mut updates = Vec::new();
        for peer in self.sorted_peers() {
            match self.permissions.try_can_show(record, &kind, &peer) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!("Server Error: {}", err);
                    return;
                }
            }
            let Ok(filtered) = self.permissions.try_filter_for(record, &peer) else {
                continue;
            };
            updates.push((
                peer,
                Broadcast::Update {
                    record: filtered,
                    facet_type_name: kind.name().to_string(),
                },
            ));
        }
        self.outgoing.extend(updates);
    }
}
