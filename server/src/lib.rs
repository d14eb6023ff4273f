//! # Roster Server
//! The authoritative side of a replicated player registry. Admits records
//! from connected clients, enforces per-facet Mutability and sends every
//! client a Visibility-filtered view.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod transport;
pub mod shared {
    pub use roster_shared::{
        BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger,
    };
}

mod io;
mod server;

pub use server::RegistryServer;
