use std::collections::HashMap;

use crate::{
    facet::{facet_kind::FacetKind, network_identity::NetworkIdentity},
    permissions::{error::PermissionError, handler::Handler},
    record::record::Record,
    types::PeerId,
};

/// Visibility and Mutability tables, plus the mandatory Visibility
/// declared by individual facet types
#[derive(Clone, Debug, Default)]
pub struct Permissions {
    visibility: HashMap<FacetKind, Handler>,
    mutability: HashMap<FacetKind, Handler>,
    required_visibility: HashMap<FacetKind, Handler>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_visibility(&mut self, kind: FacetKind, handler: Handler) {
        self.visibility.insert(kind, handler);
    }

    pub fn set_mutability(&mut self, kind: FacetKind, handler: Handler) {
        self.mutability.insert(kind, handler);
    }

    pub fn set_required_visibility(&mut self, kind: FacetKind, handler: Handler) {
        self.required_visibility.insert(kind, handler);
    }

    /// Mandatory override, else the configured rule, else `Everyone`
    pub fn visibility_handler(&self, kind: &FacetKind) -> Handler {
        self.required_visibility
            .get(kind)
            .or_else(|| self.visibility.get(kind))
            .copied()
            .unwrap_or(Handler::Everyone)
    }

    /// Configured rule, else `OwnerAndServer`
    pub fn mutability_handler(&self, kind: &FacetKind) -> Handler {
        self.mutability
            .get(kind)
            .copied()
            .unwrap_or(Handler::OwnerAndServer)
    }

    /// Whether `peer` may see the `kind` facet of `record`
    ///
    /// # Panics
    ///
    /// Panics if the record lacks an Identity or NetworkIdentity.
    /// Consider using `try_can_show()` for a non-panicking alternative.
    pub fn can_show(&self, record: &Record, kind: &FacetKind, peer: &PeerId) -> bool {
        match self.try_can_show(record, kind, peer) {
            Ok(allowed) => allowed,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_can_show(
        &self,
        record: &Record,
        kind: &FacetKind,
        peer: &PeerId,
    ) -> Result<bool, PermissionError> {
        let network_identity = network_identity_of(record)?;
        Ok(self.visibility_handler(kind).allows(network_identity, peer))
    }

    /// Whether `peer` may write the `kind` facet of `record`
    ///
    /// # Panics
    ///
    /// Panics if the record lacks an Identity or NetworkIdentity.
    /// Consider using `try_can_modify()` for a non-panicking alternative.
    pub fn can_modify(&self, record: &Record, kind: &FacetKind, peer: &PeerId) -> bool {
        match self.try_can_modify(record, kind, peer) {
            Ok(allowed) => allowed,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_can_modify(
        &self,
        record: &Record,
        kind: &FacetKind,
        peer: &PeerId,
    ) -> Result<bool, PermissionError> {
        let network_identity = network_identity_of(record)?;
        Ok(self.mutability_handler(kind).allows(network_identity, peer))
    }

    /// A copy of `record` holding only the facets `peer` may see
    pub fn try_filter_for(&self, record: &Record, peer: &PeerId) -> Result<Record, PermissionError> {
        let network_identity = network_identity_of(record)?.clone();
        let mut filtered = record.clone();
        filtered.retain(|kind| self.visibility_handler(kind).allows(&network_identity, peer));
        Ok(filtered)
    }
}

fn network_identity_of(record: &Record) -> Result<&NetworkIdentity, PermissionError> {
    let entity_id = record
        .entity_id()
        .ok_or(PermissionError::MissingIdentity)?;
    record
        .network_identity()
        .ok_or_else(|| PermissionError::MissingNetworkIdentity {
            entity_id: entity_id.to_string(),
        })
}
