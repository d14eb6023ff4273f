use thiserror::Error;

/// Failures reported by an [`Authenticator`](crate::Authenticator)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Username and password did not match
    #[error("Invalid credentials for user \"{username}\"")]
    InvalidCredentials { username: String },

    /// Registration attempted for a name that is taken
    #[error("User \"{username}\" already exists")]
    UserExists { username: String },

    /// Refresh token is unknown, expired or already spent
    #[error("Refresh token was rejected")]
    InvalidRefreshToken,

    /// The auth service itself failed
    #[error("Authentication backend error: {reason}")]
    Backend { reason: String },
}
