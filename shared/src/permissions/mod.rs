pub mod error;
pub mod handler;
pub mod permissions;

pub use handler::Handler;
