use std::collections::BTreeMap;

use log::warn;
use roster_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    facet::{
        error::FacetError,
        facet::{Facet, ReplicaFacet},
        facet_kind::FacetKind,
        facet_kinds::FacetKinds,
        identity::Identity,
        network_identity::NetworkIdentity,
    },
    record::error::RecordError,
    types::EntityId,
};

type FacetCount = UnsignedVariableInteger<7>;

/// Every facet tracked for one entity, at most one per facet type.
///
/// Facets are kept ordered by type name so that iteration and the wire
/// encoding are deterministic.
#[derive(Default)]
pub struct Record {
    facets: BTreeMap<FacetKind, Box<dyn ReplicaFacet>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record holding only an Identity for `entity_id`
    pub fn with_identity(entity_id: impl Into<EntityId>) -> Self {
        Self::new().with(Identity::new(entity_id))
    }

    /// Builder form of [`Record::set`]
    pub fn with<F: Facet>(mut self, facet: F) -> Self {
        self.set(facet);
        self
    }

    pub fn has<F: Facet>(&self) -> bool {
        self.has_kind(&FacetKind::of::<F>())
    }

    pub fn has_kind(&self, kind: &FacetKind) -> bool {
        self.facets.contains_key(kind)
    }

    /// Reads the facet of type `F`
    ///
    /// # Panics
    ///
    /// Panics if the record holds no such facet.
    /// Consider using `try_get()` for a non-panicking alternative.
    pub fn get<F: Facet>(&self) -> &F {
        match self.try_get::<F>() {
            Ok(facet) => facet,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_get<F: Facet>(&self) -> Result<&F, RecordError> {
        self.facets
            .get(&FacetKind::of::<F>())
            .and_then(|facet| facet.as_ref().as_any().downcast_ref::<F>())
            .ok_or(RecordError::FacetNotFound {
                type_name: F::TYPE_NAME,
            })
    }

    /// # Panics
    ///
    /// Panics if the record holds no such facet.
    /// Consider using `try_get_mut()` for a non-panicking alternative.
    pub fn get_mut<F: Facet>(&mut self) -> &mut F {
        match self.try_get_mut::<F>() {
            Ok(facet) => facet,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_get_mut<F: Facet>(&mut self) -> Result<&mut F, RecordError> {
        self.facets
            .get_mut(&FacetKind::of::<F>())
            .and_then(|facet| facet.as_mut().as_any_mut().downcast_mut::<F>())
            .ok_or(RecordError::FacetNotFound {
                type_name: F::TYPE_NAME,
            })
    }

    /// Inserts or overwrites the facet of type `F` without notifying anyone.
    /// Use the registry's `set_facet` when observers should hear about it.
    pub fn set<F: Facet>(&mut self, facet: F) {
        self.facets.insert(FacetKind::of::<F>(), Box::new(facet));
    }

    pub fn set_boxed(&mut self, facet: Box<dyn ReplicaFacet>) {
        self.facets.insert(facet.kind(), facet);
    }

    /// Removes and returns the facet of type `F`
    ///
    /// # Panics
    ///
    /// Panics if the record holds no such facet.
    /// Consider using `try_clear()` for a non-panicking alternative.
    pub fn clear<F: Facet>(&mut self) -> F {
        match self.try_clear::<F>() {
            Ok(facet) => facet,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_clear<F: Facet>(&mut self) -> Result<F, RecordError> {
        let not_found = RecordError::FacetNotFound {
            type_name: F::TYPE_NAME,
        };
        let kind = FacetKind::of::<F>();
        if !self
            .facets
            .get(&kind)
            .is_some_and(|facet| facet.as_ref().as_any().is::<F>())
        {
            return Err(not_found);
        }
        let facet = self.facets.remove(&kind).ok_or(not_found.clone())?;
        facet
            .into_any()
            .downcast::<F>()
            .map(|facet| *facet)
            .map_err(|_| not_found)
    }

    pub fn clear_kind(&mut self, kind: &FacetKind) -> Option<Box<dyn ReplicaFacet>> {
        self.facets.remove(kind)
    }

    pub fn facet(&self, kind: &FacetKind) -> Option<&dyn ReplicaFacet> {
        self.facets.get(kind).map(|facet| facet.as_ref())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &FacetKind> {
        self.facets.keys()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Keeps only the facets whose kind satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&FacetKind) -> bool) {
        self.facets.retain(|kind, _| keep(kind));
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        self.try_get::<Identity>().ok().map(Identity::entity_id)
    }

    pub fn try_entity_id(&self) -> Result<&EntityId, RecordError> {
        self.entity_id().ok_or(RecordError::MissingIdentity)
    }

    pub fn network_identity(&self) -> Option<&NetworkIdentity> {
        self.try_get::<NetworkIdentity>().ok()
    }

    pub fn is_networked(&self) -> bool {
        self.has::<NetworkIdentity>()
    }

    /// Writes the facet count followed by a (type name, payload) pair per facet.
    ///
    /// Every payload is encoded before anything is written, so a facet that
    /// fails to encode leaves `writer` untouched.
    pub fn ser(&self, writer: &mut dyn BitWrite) -> Result<(), FacetError> {
        let mut entries = Vec::with_capacity(self.facets.len());
        for (kind, facet) in &self.facets {
            entries.push((kind.name(), facet.write_payload()?));
        }

        FacetCount::new(entries.len() as u64).ser(writer);
        for (type_name, payload) in entries {
            type_name.to_string().ser(writer);
            payload.ser(writer);
        }
        Ok(())
    }

    /// Reads a record written by [`Record::ser`].
    ///
    /// A facet whose type name is unknown here, or whose payload does not
    /// decode, is skipped with a warning. A truncated or malformed frame
    /// fails the whole read.
    pub fn de(reader: &mut BitReader, facet_kinds: &FacetKinds) -> Result<Self, SerdeErr> {
        let count = FacetCount::de(reader)?.get();
        let mut record = Self::new();
        for _ in 0..count {
            let type_name = String::de(reader)?;
            let payload = Vec::<u8>::de(reader)?;
            match facet_kinds.read_payload(&type_name, &payload) {
                Ok(facet) => record.set_boxed(facet),
                Err(err) => warn!("Skipping facet while reading record: {}", err),
            }
        }
        Ok(record)
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        Self {
            facets: self
                .facets
                .iter()
                .map(|(kind, facet)| (*kind, facet.clone_boxed()))
                .collect(),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.facets.len() == other.facets.len()
            && self.facets.iter().all(|(kind, facet)| {
                other
                    .facets
                    .get(kind)
                    .is_some_and(|other| facet.payload_eq(other.as_ref()))
            })
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("entity_id", &self.entity_id())
            .field("facets", &self.facets.keys().collect::<Vec<_>>())
            .finish()
    }
}
