pub mod error;
pub mod event;
pub mod phase;
pub mod registry;
