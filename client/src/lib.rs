//! # Roster Client
//! The client side of a replicated player registry. Joins the server's
//! registry with the locally owned records, forwards every local write to
//! the server and mirrors the filtered view the server sends back.

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

mod client;
mod io;

pub use client::{ClientConfig, RegistryClient};
