use std::{any::TypeId, collections::HashMap};

use crate::{
    facet::{
        database_token::DatabaseToken,
        error::FacetError,
        facet::{read_payload, Facet, ReplicaFacet},
        facet_kind::FacetKind,
        identity::Identity,
        network_identity::NetworkIdentity,
    },
    permissions::Handler,
    protocol::ProtocolError,
};

type PayloadReader = fn(&[u8]) -> Result<Box<dyn ReplicaFacet>, FacetError>;

#[derive(Clone)]
struct FacetEntry {
    kind: FacetKind,
    type_id: TypeId,
    reader: PayloadReader,
    required_visibility: Option<Handler>,
}

/// Closed lookup table from facet type name to decoder, filled once at startup
#[derive(Clone)]
pub struct FacetKinds {
    entries: HashMap<&'static str, FacetEntry>,
}

impl Default for FacetKinds {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetKinds {
    /// A table holding only the built-in facets
    pub fn new() -> Self {
        let mut facet_kinds = Self {
            entries: HashMap::new(),
        };
        facet_kinds.insert::<Identity>();
        facet_kinds.insert::<NetworkIdentity>();
        facet_kinds.insert::<DatabaseToken>();
        facet_kinds
    }

    fn insert<F: Facet>(&mut self) {
        self.entries.insert(
            F::TYPE_NAME,
            FacetEntry {
                kind: FacetKind::of::<F>(),
                type_id: TypeId::of::<F>(),
                reader: read_payload::<F>,
                required_visibility: F::required_visibility(),
            },
        );
    }

    /// Registers `F`. Registering the same type twice is a no-op; a second
    /// type reusing an existing name is rejected.
    pub fn add_facet<F: Facet>(&mut self) -> Result<(), ProtocolError> {
        if let Some(entry) = self.entries.get(F::TYPE_NAME) {
            if entry.type_id == TypeId::of::<F>() {
                return Ok(());
            }
            return Err(ProtocolError::DuplicateFacetName {
                type_name: F::TYPE_NAME,
            });
        }
        self.insert::<F>();
        Ok(())
    }

    pub fn is_registered(&self, kind: &FacetKind) -> bool {
        self.entries.contains_key(kind.name())
    }

    pub fn kind_by_name(&self, type_name: &str) -> Result<FacetKind, FacetError> {
        self.entries
            .get(type_name)
            .map(|entry| entry.kind)
            .ok_or_else(|| FacetError::UnknownFacetType {
                type_name: type_name.to_string(),
            })
    }

    /// Decodes a payload that arrived under `type_name`
    pub fn read_payload(
        &self,
        type_name: &str,
        payload: &[u8],
    ) -> Result<Box<dyn ReplicaFacet>, FacetError> {
        let Some(entry) = self.entries.get(type_name) else {
            return Err(FacetError::UnknownFacetType {
                type_name: type_name.to_string(),
            });
        };
        (entry.reader)(payload)
    }

    pub fn required_visibility(&self, kind: &FacetKind) -> Option<Handler> {
        self.entries
            .get(kind.name())
            .and_then(|entry| entry.required_visibility)
    }

    pub fn kinds(&self) -> impl Iterator<Item = FacetKind> + '_ {
        self.entries.values().map(|entry| entry.kind)
    }
}
