//! # Roster Shared
//! Player records, facets, permissions & broadcasts shared between
//! roster-server & roster-client.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use roster_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

mod auth;
mod facet;
mod messages;
mod permissions;
mod persistence;
mod protocol;
mod record;
mod registry;
mod transport;
mod types;

pub use auth::{
    authenticator::{Authenticator, LoginTicket},
    error::AuthError,
};
pub use facet::{
    database_token::DatabaseToken,
    error::FacetError,
    facet::{Facet, ReplicaFacet},
    facet_kind::FacetKind,
    facet_kinds::FacetKinds,
    identity::Identity,
    network_identity::NetworkIdentity,
};
pub use messages::broadcast::{Broadcast, RegistryOperation, SyncReason};
pub use permissions::{error::PermissionError, handler::Handler, permissions::Permissions};
pub use persistence::{
    database::{PlayerDatabase, StoredFacet},
    error::DatabaseError,
    persistence::{LoadSender, LoadedFacet, Persistence},
};
pub use protocol::{Protocol, ProtocolError};
pub use record::{error::RecordError, record::Record};
pub use registry::{
    error::RegistryError, event::RegistryEvent, phase::RegistryPhase, registry::Registry,
};
pub use transport::error::TransportError;
pub use types::{EntityId, PeerId};
