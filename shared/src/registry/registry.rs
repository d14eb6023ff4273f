use std::{
    any::Any,
    collections::{HashMap, HashSet, VecDeque},
};

use log::{debug, warn};

use crate::{
    facet::{
        facet::Facet, facet_kind::FacetKind, identity::Identity,
        network_identity::NetworkIdentity,
    },
    persistence::persistence::Persistence,
    record::record::Record,
    registry::{error::RegistryError, event::RegistryEvent},
    types::EntityId,
};

/// Map of entity id to [`Record`] for one process.
///
/// On its own this is the local-mode registry: every write lands here
/// directly. The server and client roles wrap it and decide when a write
/// goes through the replication protocol instead.
#[derive(Default)]
pub struct Registry {
    records: HashMap<EntityId, Record>,
    events: VecDeque<RegistryEvent>,
    persistence: Option<Persistence>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that loads stored facets on `add` and saves them on `remove`
    pub fn with_persistence(persistence: Persistence) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::default()
        }
    }

    pub fn persistence_mut(&mut self) -> Option<&mut Persistence> {
        self.persistence.as_mut()
    }

    /// Inserts a new record and starts loading its persisted facets
    pub fn add(&mut self, record: Record) -> Result<EntityId, RegistryError> {
        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;
        if self.records.contains_key(&entity_id) {
            return Err(RegistryError::AlreadyRegistered { entity_id });
        }

        if let Some(persistence) = self.persistence.as_mut() {
            persistence.load(&entity_id);
        }
        self.records.insert(entity_id.clone(), record);
        self.events.push_back(RegistryEvent::Added {
            entity_id: entity_id.clone(),
        });
        Ok(entity_id)
    }

    pub fn remove(&mut self, record: &Record) -> Result<Record, RegistryError> {
        let entity_id = record.entity_id().ok_or(RegistryError::MissingIdentity)?;
        self.remove_entity(entity_id)
    }

    /// Saves the record's persisted facets, then evicts it
    pub fn remove_entity(&mut self, entity_id: &EntityId) -> Result<Record, RegistryError> {
        let Some(record) = self.records.get(entity_id) else {
            return Err(RegistryError::NotRegistered {
                entity_id: entity_id.clone(),
                operation: "remove",
            });
        };
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.save(record);
        }

        let record = self
            .records
            .remove(entity_id)
            .ok_or_else(|| RegistryError::NotRegistered {
                entity_id: entity_id.clone(),
                operation: "remove",
            })?;
        self.events.push_back(RegistryEvent::Removed {
            entity_id: entity_id.clone(),
        });
        Ok(record)
    }

    /// Replaces the stored record and reports `kind` as the facet that changed
    pub fn update(&mut self, record: Record, kind: FacetKind) -> Result<(), RegistryError> {
        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;
        let Some(stored) = self.records.get_mut(&entity_id) else {
            return Err(RegistryError::NotRegistered {
                entity_id,
                operation: "update",
            });
        };
        *stored = record;
        self.events
            .push_back(RegistryEvent::Updated { entity_id, kind });
        Ok(())
    }

    /// Inserts or overwrites one facet of a registered record and reports it
    pub fn set_facet<F: Facet>(&mut self, entity_id: &EntityId, facet: F) -> Result<(), RegistryError> {
        self.set_facet_silent(entity_id, facet)?;
        self.events.push_back(RegistryEvent::Updated {
            entity_id: entity_id.clone(),
            kind: FacetKind::of::<F>(),
        });
        Ok(())
    }

    /// [`Registry::set_facet`] without the notification
    pub fn set_facet_silent<F: Facet>(
        &mut self,
        entity_id: &EntityId,
        facet: F,
    ) -> Result<(), RegistryError> {
        if let Some(identity) = (&facet as &dyn Any).downcast_ref::<Identity>() {
            if identity.entity_id() != entity_id {
                return Err(RegistryError::IdentityChanged {
                    entity_id: entity_id.clone(),
                });
            }
        }
        let record = self.try_get_mut(entity_id, "update")?;
        record.set(facet);
        Ok(())
    }

    /// Removes one facet of a registered record and reports it
    pub fn clear_facet<F: Facet>(&mut self, entity_id: &EntityId) -> Result<F, RegistryError> {
        if FacetKind::of::<F>() == FacetKind::of::<Identity>() {
            return Err(RegistryError::IdentityChanged {
                entity_id: entity_id.clone(),
            });
        }
        let record = self.try_get_mut(entity_id, "update")?;
        let facet = record
            .try_clear::<F>()
            .map_err(|_| RegistryError::FacetNotFound {
                entity_id: entity_id.clone(),
                type_name: F::TYPE_NAME,
            })?;
        self.events.push_back(RegistryEvent::Updated {
            entity_id: entity_id.clone(),
            kind: FacetKind::of::<F>(),
        });
        Ok(facet)
    }

    fn try_get_mut(
        &mut self,
        entity_id: &EntityId,
        operation: &'static str,
    ) -> Result<&mut Record, RegistryError> {
        self.records
            .get_mut(entity_id)
            .ok_or_else(|| RegistryError::NotRegistered {
                entity_id: entity_id.clone(),
                operation,
            })
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<&Record> {
        self.records.get(entity_id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.records.keys()
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.records.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Swaps in a whole new map. Records without an Identity are dropped.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records.clear();
        for record in records {
            match record.entity_id().cloned() {
                Some(entity_id) => {
                    self.records.insert(entity_id, record);
                }
                None => warn!("Dropping record without Identity during replace"),
            }
        }
    }

    /// Writes `record` under its own id, inserting or overwriting, without
    /// running hooks or queuing events
    pub fn upsert_silent(&mut self, record: Record) -> Result<EntityId, RegistryError> {
        let entity_id = record
            .entity_id()
            .cloned()
            .ok_or(RegistryError::MissingIdentity)?;
        self.records.insert(entity_id.clone(), record);
        Ok(entity_id)
    }

    /// Keeps only `local_ids`, each stripped of its NetworkIdentity
    pub fn retain_local(&mut self, local_ids: &HashSet<EntityId>) {
        self.records
            .retain(|entity_id, _| local_ids.contains(entity_id));
        let network_identity = FacetKind::of::<NetworkIdentity>();
        for record in self.records.values_mut() {
            record.clear_kind(&network_identity);
        }
    }

    /// Applies every persisted facet that finished loading. Results for
    /// entities removed in the meantime are discarded.
    pub fn apply_loaded(&mut self) -> Vec<(EntityId, FacetKind)> {
        let loaded = match &self.persistence {
            Some(persistence) => persistence.drain_loaded(),
            None => return Vec::new(),
        };

        let mut applied = Vec::new();
        for loaded_facet in loaded {
            let kind = loaded_facet.facet.kind();
            let Some(record) = self.records.get_mut(&loaded_facet.entity_id) else {
                debug!(
                    "Discarding loaded {} for {}, no longer registered",
                    kind, loaded_facet.entity_id
                );
                continue;
            };
            record.set_boxed(loaded_facet.facet);
            self.events.push_back(RegistryEvent::LoadApplied {
                entity_id: loaded_facet.entity_id.clone(),
                kind,
            });
            applied.push((loaded_facet.entity_id, kind));
        }
        applied
    }

    pub fn push_event(&mut self, event: RegistryEvent) {
        self.events.push_back(event);
    }

    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain(..).collect()
    }
}
