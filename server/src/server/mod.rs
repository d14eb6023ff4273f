mod registry_server;

pub use registry_server::RegistryServer;
