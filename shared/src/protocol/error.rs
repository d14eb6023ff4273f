use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// Two different facet types share one type name
    #[error("Facet type name \"{type_name}\" is already registered by a different type. Type names must be unique")]
    DuplicateFacetName { type_name: &'static str },

    /// A permission rule names a facet that was never added
    #[error("Facet {type_name} is not registered. Call `add_facet()` before configuring its permissions")]
    FacetNotRegistered { type_name: &'static str },
}
