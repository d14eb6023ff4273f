use thiserror::Error;

/// Errors raised when a permission check is asked about an unkeyed or
/// un-networked record. Permission checks only make sense while a registry
/// is replicating, so both cases are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The record carries no Identity facet
    #[error("Cannot evaluate permissions for a record without an Identity facet")]
    MissingIdentity,

    /// The record carries no NetworkIdentity facet
    #[error("Cannot evaluate permissions for record {entity_id}, it has no NetworkIdentity facet. Permissions are only evaluated while replicating")]
    MissingNetworkIdentity { entity_id: String },
}
