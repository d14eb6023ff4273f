use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by a RegistryClient
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How long to wait for the server's admission before sending the Join
    /// broadcast again
    pub join_broadcast_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            join_broadcast_timeout: Duration::from_secs(10),
        }
    }
}
