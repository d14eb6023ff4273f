use std::collections::HashMap;

use roster_shared::{AuthError, Authenticator, EntityId, LoginTicket};

struct Account {
    password: String,
    entity_id: EntityId,
}

/// `Authenticator` that keeps accounts in memory and mints sequential tokens
#[derive(Default)]
pub struct MemoryAuthenticator {
    accounts: HashMap<String, Account>,
    refresh_tokens: HashMap<String, String>,
    issued: u64,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self, username: &str, entity_id: EntityId) -> LoginTicket {
        self.issued += 1;
        let token = format!("token-{}", self.issued);
        let refresh_token = format!("refresh-{}", self.issued);
        self.refresh_tokens
            .insert(refresh_token.clone(), username.to_string());

        LoginTicket {
            entity_id,
            token,
            refresh_token,
        }
    }
}

impl Authenticator for MemoryAuthenticator {
    fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.accounts.contains_key(username) {
            return Err(AuthError::UserExists {
                username: username.to_string(),
            });
        }
        self.accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                entity_id: EntityId::generate(),
            },
        );
        Ok(())
    }

    fn log_in(&mut self, username: &str, password: &str) -> Result<LoginTicket, AuthError> {
        let entity_id = match self.accounts.get(username) {
            Some(account) if account.password == password => account.entity_id.clone(),
            _ => {
                return Err(AuthError::InvalidCredentials {
                    username: username.to_string(),
                })
            }
        };
        Ok(self.issue(username, entity_id))
    }

    fn refresh_log_in(&mut self, refresh_token: &str) -> Result<LoginTicket, AuthError> {
        let username = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AuthError::InvalidRefreshToken)?;
        let entity_id = self
            .accounts
            .get(&username)
            .map(|account| account.entity_id.clone())
            .ok_or(AuthError::InvalidRefreshToken)?;
        Ok(self.issue(&username, entity_id))
    }
}
