use crate::{
    auth::error::AuthError,
    facet::{database_token::DatabaseToken, identity::Identity},
    record::record::Record,
    types::EntityId,
};

/// Outcome of a successful log in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginTicket {
    pub entity_id: EntityId,
    pub token: String,
    /// Single use. Exchange it with `refresh_log_in` for a new ticket.
    pub refresh_token: String,
}

impl LoginTicket {
    /// A record ready for `Registry::add`: the ticket's Identity plus a
    /// DatabaseToken carrying its token
    pub fn into_record(self) -> Record {
        Record::new()
            .with(Identity::new(self.entity_id))
            .with(DatabaseToken::new(self.token))
    }
}

/// Credential exchange with an external auth service
pub trait Authenticator {
    fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError>;

    fn log_in(&mut self, username: &str, password: &str) -> Result<LoginTicket, AuthError>;

    fn refresh_log_in(&mut self, refresh_token: &str) -> Result<LoginTicket, AuthError>;
}
