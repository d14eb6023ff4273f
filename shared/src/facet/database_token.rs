use serde::{Deserialize, Serialize};

use crate::{facet::facet::Facet, permissions::Handler};

/// Credential a persistence backend uses to authorize reads and writes.
/// Only ever visible to its owner and the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseToken {
    token: String,
}

impl DatabaseToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Facet for DatabaseToken {
    const TYPE_NAME: &'static str = "DatabaseToken";

    fn required_visibility() -> Option<Handler> {
        Some(Handler::OwnerAndServer)
    }
}
