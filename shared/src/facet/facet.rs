use std::{any::Any, fmt};

use log::warn;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    facet::{error::FacetError, facet_kind::FacetKind},
    permissions::Handler,
};

/// A named, typed payload attached to a [`Record`](crate::Record).
///
/// Implement this for every piece of player data that should live in the
/// registry, then register the type with
/// [`Protocol::add_facet`](crate::Protocol::add_facet) on every process.
pub trait Facet: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    /// Name this facet travels under. Must resolve identically on every
    /// participating process.
    const TYPE_NAME: &'static str;

    /// Visibility that takes precedence over any configured rule
    fn required_visibility() -> Option<Handler> {
        None
    }
}

/// Object-safe view of a [`Facet`], so facets of different types can share a map
pub trait ReplicaFacet: Any + Send + Sync {
    fn kind(&self) -> FacetKind;
    /// Self-describing payload bytes for the wire
    fn write_payload(&self) -> Result<Vec<u8>, FacetError>;
    fn clone_boxed(&self) -> Box<dyn ReplicaFacet>;
    fn payload_eq(&self, other: &dyn ReplicaFacet) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<F: Facet> ReplicaFacet for F {
    fn kind(&self) -> FacetKind {
        FacetKind::of::<F>()
    }

    fn write_payload(&self) -> Result<Vec<u8>, FacetError> {
        serde_json::to_vec(self).map_err(|err| FacetError::Encode {
            type_name: F::TYPE_NAME,
            reason: err.to_string(),
        })
    }

    /// Copies through the facet's own payload, so the copy holds exactly
    /// what a serialize then deserialize would produce
    fn clone_boxed(&self) -> Box<dyn ReplicaFacet> {
        match self
            .write_payload()
            .and_then(|payload| read_payload::<F>(&payload))
        {
            Ok(facet) => facet,
            Err(err) => {
                warn!("Falling back to Clone for {}: {}", F::TYPE_NAME, err);
                Box::new(self.clone())
            }
        }
    }

    fn payload_eq(&self, other: &dyn ReplicaFacet) -> bool {
        other
            .as_any()
            .downcast_ref::<F>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for dyn ReplicaFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaFacet({})", self.kind())
    }
}

pub(crate) fn read_payload<F: Facet>(payload: &[u8]) -> Result<Box<dyn ReplicaFacet>, FacetError> {
    let facet: F = serde_json::from_slice(payload).map_err(|err| FacetError::Decode {
        type_name: F::TYPE_NAME,
        reason: err.to_string(),
    })?;
    let facet: Box<dyn ReplicaFacet> = Box::new(facet);
    Ok(facet)
}
