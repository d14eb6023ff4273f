mod client_config;
mod registry_client;

pub use client_config::ClientConfig;
pub use registry_client::RegistryClient;
