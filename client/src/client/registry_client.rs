use std::{
    any::Any,
    collections::{HashMap, HashSet, VecDeque},
    time::Instant,
};

use log::{debug, error, info, warn};

use roster_shared::{
    Broadcast, EntityId, Facet, FacetKind, FacetKinds, Identity, NetworkIdentity, PeerId,
    Persistence, Protocol, Record, Registry, RegistryError, RegistryEvent, RegistryOperation,
    RegistryPhase, SyncReason,
};

use crate::{
    client::ClientConfig,
    io::Io,
    transport::{PacketReceiver, PacketSender},
};

/// Client side of a replicated player registry.
///
/// Until the transport is up every write lands in the local map. Once the
/// server has admitted the local records, writes are forwarded to the
/// server and only take effect when the server echoes them back.
pub struct RegistryClient {
    config: ClientConfig,
    facet_kinds: FacetKinds,
    registry: Registry,
    phase: RegistryPhase,
    local_entities: HashSet<EntityId>,
    // sent with an Add, not yet synced back by the server
    pending_adds: HashMap<EntityId, Record>,
    io: Io,
    outgoing: VecDeque<Broadcast>,
    last_join_sent: Option<Instant>,
}

impl RegistryClient {
    /// Create a new RegistryClient
    pub fn new<P: Into<Protocol>>(config: ClientConfig, protocol: P) -> Self {
        let mut protocol: Protocol = protocol.into();
        if !protocol.is_locked() {
            protocol.lock();
        }

        Self {
            config,
            facet_kinds: protocol.facet_kinds,
            registry: Registry::new(),
            phase: RegistryPhase::Disabled,
            local_entities: HashSet::new(),
            pending_adds: HashMap::new(),
            io: Io::new(),
            outgoing: VecDeque::new(),
            last_join_sent: None,
        }
    }

    /// Loads persisted facets for records added while not replicating.
    /// Must be called before any record is added.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.registry = Registry::with_persistence(persistence);
        self
    }

    pub fn io_load(&mut self, sender: Box<dyn PacketSender>, receiver: Box<dyn PacketReceiver>) {
        self.io.load(sender, receiver);
    }

    pub fn is_connected(&self) -> bool {
        self.io.is_connected()
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

    /// Whether `entity_id` is owned by this process
    pub fn is_local(&self, entity_id: &EntityId) -> bool {
        self.local_entities.contains(entity_id)
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

    // Writes

    /// Adds a locally owned record. While replicating, the record is sent to
    /// the server and appears locally once the server syncs it back.
    pub fn add(&mut self, record: Record) -> Result<EntityId, RegistryError> {
        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;

        if self.phase.is_networked() {
            if self.registry.contains(&entity_id) || self.pending_adds.contains_key(&entity_id) {
                return Err(RegistryError::AlreadyRegistered { entity_id });
            }
            self.outgoing.push_back(Broadcast::Operation {
                record: record.clone(),
                operation: RegistryOperation::Add,
            });
            self.pending_adds.insert(entity_id.clone(), record);
        } else {
            self.registry.add(record)?;
        }

        self.local_entities.insert(entity_id.clone());
        Ok(entity_id)
    }

    pub fn remove(&mut self, entity_id: &EntityId) -> Result<(), RegistryError> {
        if self.phase.is_networked() {
            let record = match self.pending_adds.remove(entity_id) {
                Some(record) => record,
                None => self.stored(entity_id, "remove")?.clone(),
            };
            self.outgoing.push_back(Broadcast::Operation {
                record,
                operation: RegistryOperation::Remove,
            });
        } else {
            self.registry.remove_entity(entity_id)?;
        }

        self.local_entities.remove(entity_id);
        Ok(())
    }

    /// Replaces a stored record. While replicating, the change is sent to
    /// the server and the local map is left alone until the server echoes it.
    pub fn update(&mut self, record: Record, kind: FacetKind) -> Result<(), RegistryError> {
        if !self.phase.is_networked() {
            return self.registry.update(record, kind);
        }

        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;
        self.stored(&entity_id, "update")?;
        self.forward_update(record, kind);
        Ok(())
    }

    pub fn set_facet<F: Facet>(&mut self, entity_id: &EntityId, facet: F) -> Result<(), RegistryError> {
        if !self.phase.is_networked() {
            return self.registry.set_facet(entity_id, facet);
        }

        let any: &dyn Any = &facet;
        if let Some(identity) = any.downcast_ref::<Identity>() {
            if identity.entity_id() != entity_id {
                return Err(RegistryError::IdentityChanged {
                    entity_id: entity_id.clone(),
                });
            }
        }
        let mut record = self.stored(entity_id, "update")?.clone();
        record.set(facet);
        self.forward_update(record, FacetKind::of::<F>());
        Ok(())
    }

    pub fn clear_facet<F: Facet>(&mut self, entity_id: &EntityId) -> Result<F, RegistryError> {
        if !self.phase.is_networked() {
            return self.registry.clear_facet::<F>(entity_id);
        }

        if FacetKind::of::<F>() == FacetKind::of::<Identity>() {
            return Err(RegistryError::IdentityChanged {
                entity_id: entity_id.clone(),
            });
        }
        let mut record = self.stored(entity_id, "update")?.clone();
        let facet = record
            .try_clear::<F>()
            .map_err(|_| RegistryError::FacetNotFound {
                entity_id: entity_id.clone(),
                type_name: F::TYPE_NAME,
            })?;
        self.forward_update(record, FacetKind::of::<F>());
        Ok(facet)
    }

    fn stored(
        &self,
        entity_id: &EntityId,
        operation: &'static str,
    ) -> Result<&Record, RegistryError> {
        self.registry
            .get(entity_id)
            .ok_or_else(|| RegistryError::NotRegistered {
                entity_id: entity_id.clone(),
                operation,
            })
    }

    fn forward_update(&mut self, record: Record, kind: FacetKind) {
        self.outgoing.push_back(Broadcast::Update {
            record,
            facet_type_name: kind.name().to_string(),
        });
    }

    // Tick

    /// Reads every payload from the server, applies finished persistence
    /// loads, advances the phase machine and flushes outgoing broadcasts
    pub fn tick(&mut self, now: Instant) {
        self.receive_all_packets();
        self.registry.apply_loaded();
        self.update_phase(now);
        self.send_all_packets();
    }

    /// Read and apply all incoming payloads
    pub fn receive_all_packets(&mut self) {
        loop {
            match self.io.recv_payload() {
                Ok(Some(payload)) => {
                    if !self.read_payload(&payload) {
                        break;
                    }
                }
                Ok(None) => {
                    // No more payloads, break loop
                    break;
                }
                Err(error) => {
                    warn!("Client Error: {}", error);
                    break;
                }
            }
        }
    }

    pub fn update_phase(&mut self, now: Instant) {
        let connected = self.io.is_connected();

        match self.phase {
            RegistryPhase::Disabled => {
                if !self.local_entities.is_empty() && connected {
                    self.last_join_sent = None;
                    self.set_phase(RegistryPhase::Joining);
                }
            }
            RegistryPhase::Joining => {
                if !connected {
                    self.set_phase(RegistryPhase::Disconnecting);
                    return;
                }
                if self.is_admitted() {
                    self.set_phase(RegistryPhase::InUse);
                    return;
                }

                let timed_out = self.last_join_sent.map_or(true, |sent| {
                    now.saturating_duration_since(sent) >= self.config.join_broadcast_timeout
                });
                if timed_out {
                    let records = self.local_records();
                    debug!("Sending Join broadcast with {} records", records.len());
                    self.outgoing.push_back(Broadcast::Join { records });
                    self.last_join_sent = Some(now);
                }
            }
            RegistryPhase::InUse => {
                if !connected {
                    self.set_phase(RegistryPhase::Disconnecting);
                }
            }
            RegistryPhase::Disconnecting => {
                // adds the server never confirmed stay with this process
                let mut pending: Vec<Record> =
                    self.pending_adds.drain().map(|(_, record)| record).collect();
                pending.sort_by(|a, b| a.entity_id().cmp(&b.entity_id()));
                for record in pending {
                    if let Err(err) = self.registry.add(record) {
                        warn!("Client Error: cannot keep unconfirmed record: {}", err);
                    }
                }
                self.registry.retain_local(&self.local_entities);
                self.outgoing.clear();
                self.last_join_sent = None;
                self.set_phase(RegistryPhase::Disabled);
            }
        }
    }

    /// Encode and send every queued broadcast
    pub fn send_all_packets(&mut self) {
        if !self.io.is_connected() {
            if !self.outgoing.is_empty() {
                debug!("Dropping {} broadcasts, not connected", self.outgoing.len());
                self.outgoing.clear();
            }
            return;
        }

        while let Some(broadcast) = self.outgoing.pop_front() {
            let payload = match broadcast.to_bytes() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Client Error: cannot encode {}: {}", broadcast.name(), err);
                    continue;
                }
            };
            if let Err(err) = self.io.send_payload(&payload) {
                warn!("Client Error: cannot send {}: {}", broadcast.name(), err);
            }
        }
    }

    fn set_phase(&mut self, current: RegistryPhase) {
        let previous = self.phase;
        if previous == current {
            return;
        }
        self.phase = current;
        info!("Registry client phase {} -> {}", previous, current);
        self.registry
            .push_event(RegistryEvent::PhaseChanged { previous, current });
    }

    /// Every local id is present and carries a NetworkIdentity
    fn is_admitted(&self) -> bool {
        self.local_entities.iter().all(|entity_id| {
            self.registry
                .get(entity_id)
                .is_some_and(Record::is_networked)
        })
    }

    fn local_records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .local_entities
            .iter()
            .filter_map(|entity_id| {
                self.registry
                    .get(entity_id)
                    .or_else(|| self.pending_adds.get(entity_id))
                    .cloned()
            })
            .collect();
        records.sort_by(|a, b| a.entity_id().cmp(&b.entity_id()));
        records
    }

    // Inbound

    /// Returns false when the connection was dropped
    fn read_payload(&mut self, payload: &[u8]) -> bool {
        let broadcast = match Broadcast::from_bytes(payload, &self.facet_kinds) {
            Ok(broadcast) => broadcast,
            Err(err) => {
                warn!(
                    "Client Error: malformed payload from server, disconnecting: {}",
                    err
                );
                self.io.disconnect();
                return false;
            }
        };

        match broadcast {
            Broadcast::Sync { records, reason } => self.handle_sync(records, reason),
            Broadcast::Update {
                record,
                facet_type_name,
            } => self.handle_update(record, &facet_type_name),
            other => {
                warn!(
                    "Client Error: server sent a {} broadcast, ignoring it",
                    other.name()
                );
            }
        }
        true
    }

    fn handle_sync(&mut self, mut records: Vec<Record>, reason: SyncReason) {
        match self.phase {
            RegistryPhase::Disabled | RegistryPhase::Disconnecting => {
                debug!("Ignoring Sync while {}", self.phase);
                return;
            }
            RegistryPhase::Joining => {
                // keep local records the server has not admitted yet
                let synced: HashSet<EntityId> = records
                    .iter()
                    .filter_map(|record| record.entity_id().cloned())
                    .collect();
                let pending: Vec<Record> = self
                    .local_records()
                    .into_iter()
                    .filter(|record| {
                        record
                            .entity_id()
                            .is_some_and(|entity_id| !synced.contains(entity_id))
                    })
                    .collect();
                records.extend(pending);
            }
            RegistryPhase::InUse => self.settle_local_entities(&records),
        }

        if reason == SyncReason::PermissionDenied {
            error!("Server refused a write from this client. Registry has been re-synced");
        }
        self.registry.replace_all(records);
        self.registry.push_event(RegistryEvent::Synced { reason });
    }

    /// Resolves pending adds against a full sync and forgets local ids the
    /// server no longer holds
    fn settle_local_entities(&mut self, records: &[Record]) {
        let own_peer = self.own_peer();
        let synced: HashMap<&EntityId, &Record> = records
            .iter()
            .filter_map(|record| record.entity_id().map(|entity_id| (entity_id, record)))
            .collect();

        let mut resolved: Vec<EntityId> = self
            .pending_adds
            .keys()
            .filter(|entity_id| synced.contains_key(entity_id))
            .cloned()
            .collect();
        resolved.sort();
        for entity_id in resolved {
            self.pending_adds.remove(&entity_id);
            let owned = match (own_peer, synced[&entity_id].network_identity()) {
                (Some(peer), Some(network_identity)) => network_identity.is_owned_by(&peer),
                _ => true,
            };
            if !owned {
                warn!("Server refused entity {}, another owner holds it", entity_id);
                self.local_entities.remove(&entity_id);
            }
        }

        let pending_adds = &self.pending_adds;
        self.local_entities.retain(|entity_id| {
            let kept = synced.contains_key(entity_id) || pending_adds.contains_key(entity_id);
            if !kept {
                debug!("Entity {} was removed by the server", entity_id);
            }
            kept
        });
    }

    /// The peer id the server assigned, read off an admitted local record
    fn own_peer(&self) -> Option<PeerId> {
        self.local_entities
            .iter()
            .filter(|entity_id| !self.pending_adds.contains_key(*entity_id))
            .filter_map(|entity_id| self.registry.get(entity_id))
            .find_map(|record| record.network_identity().and_then(NetworkIdentity::owner))
    }

    fn handle_update(&mut self, record: Record, facet_type_name: &str) {
        if !matches!(self.phase, RegistryPhase::Joining | RegistryPhase::InUse) {
            debug!("Ignoring Update while {}", self.phase);
            return;
        }
        let kind = match self.facet_kinds.kind_by_name(facet_type_name) {
            Ok(kind) => kind,
            Err(err) => {
                warn!("Dropping update from server: {}", err);
                return;
            }
        };

        let entity_id = match self.registry.upsert_silent(record) {
            Ok(entity_id) => entity_id,
            Err(err) => {
                warn!("Dropping update from server: {}", err);
                return;
            }
        };
        self.registry
            .push_event(RegistryEvent::Updated { entity_id, kind });
    }
}
