use thiserror::Error;

/// Errors raised by typed access to a [`Record`](crate::Record)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record holds no facet of the requested type
    #[error("Record has no {type_name} facet. Check with `has()` before reading or clearing it")]
    FacetNotFound { type_name: &'static str },

    /// The record has no Identity facet, so it cannot be keyed
    #[error("Record has no Identity facet")]
    MissingIdentity,
}
