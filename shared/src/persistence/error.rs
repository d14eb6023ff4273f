use thiserror::Error;

/// Failures reported by a [`PlayerDatabase`](crate::PlayerDatabase) backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// No entry is stored under the requested id
    #[error("No database entry for {entity_id}")]
    NotFound { entity_id: String },

    /// The stored entry could not be converted to or from its facet
    #[error("Database entry for {entity_id} could not be (de)serialized: {reason}")]
    Serialization { entity_id: String, reason: String },

    /// The backend itself failed (I/O, HTTP, rejected credentials...)
    #[error("Database backend error: {reason}")]
    Backend { reason: String },
}
