use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use roster_shared::{DatabaseError, EntityId, PlayerDatabase, StoredFacet};

/// `PlayerDatabase` over a shared map. Clones see the same entries, so a
/// test can keep one handle while the registry owns another.
pub struct MemoryDatabase<F: StoredFacet> {
    entries: Arc<Mutex<HashMap<EntityId, F>>>,
    offline: Arc<Mutex<bool>>,
}

impl<F: StoredFacet> Clone for MemoryDatabase<F> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            offline: self.offline.clone(),
        }
    }
}

impl<F: StoredFacet> Default for MemoryDatabase<F> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            offline: Arc::new(Mutex::new(false)),
        }
    }
}

impl<F: StoredFacet> MemoryDatabase<F> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<EntityId, F>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, facet: F) {
        self.entries().insert(facet.storage_id().clone(), facet);
    }

    pub fn entry(&self, entity_id: &EntityId) -> Option<F> {
        self.entries().get(entity_id).cloned()
    }

    /// Every call fails with a backend error while set
    pub fn set_offline(&self, offline: bool) {
        *self
            .offline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = offline;
    }

    fn check_online(&self) -> Result<(), DatabaseError> {
        let offline = *self
            .offline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if offline {
            return Err(DatabaseError::Backend {
                reason: "database is offline".to_string(),
            });
        }
        Ok(())
    }
}

impl<F: StoredFacet> PlayerDatabase for MemoryDatabase<F> {
    type Facet = F;

    fn contains(&self, entity_id: &EntityId) -> Result<bool, DatabaseError> {
        self.check_online()?;
        Ok(self.entries().contains_key(entity_id))
    }

    fn get(&self, entity_id: &EntityId) -> Result<F, DatabaseError> {
        self.check_online()?;
        self.entry(entity_id).ok_or_else(|| DatabaseError::NotFound {
            entity_id: entity_id.to_string(),
        })
    }

    fn set(&self, facet: &F) -> Result<(), DatabaseError> {
        self.check_online()?;
        self.insert(facet.clone());
        Ok(())
    }
}
