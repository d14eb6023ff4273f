use thiserror::Error;

/// Errors that can occur while encoding, decoding or resolving a facet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacetError {
    /// The facet value could not be turned into its payload
    #[error("Failed to encode facet {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    /// The payload bytes did not parse as the named facet type
    #[error("Failed to decode facet {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },

    /// A type name arrived that no registered facet answers to. Usually a
    /// peer running a build with a different facet set.
    #[error("Facet type name \"{type_name}\" is not registered with the Protocol. Must call `add_facet()` during protocol initialization")]
    UnknownFacetType { type_name: String },
}
