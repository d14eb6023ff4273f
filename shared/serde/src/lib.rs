//! # Roster Serde
//! Bit-level reading & writing of the values exchanged between
//! roster-server & roster-client.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_reader;
mod bit_writer;
mod error;
mod impls;
mod integer;
mod serde;

pub use bit_reader::BitReader;
pub use bit_writer::{BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::UnsignedVariableInteger;
pub use serde::Serde;
