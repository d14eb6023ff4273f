use thiserror::Error;

/// Errors that can occur while reading a value off the wire
///
/// Every variant means the buffer cannot be trusted past this point, so
/// callers treat it as fatal for the message being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran past the end of its buffer
    #[error("Attempted to read past the end of the buffer at bit {bit_index}")]
    UnexpectedEnd { bit_index: usize },

    /// A length prefix claims more data than the buffer holds
    #[error("Length prefix of {length} exceeds the {remaining} bytes remaining in the buffer")]
    LengthOverflow { length: u64, remaining: usize },

    /// A variable-length integer did not terminate within 64 bits
    #[error("Variable integer exceeds 64 bits")]
    IntegerOverflow,

    /// A string field held bytes that are not valid UTF-8
    #[error("String field is not valid UTF-8")]
    InvalidUtf8,

    /// An enum tag did not match any known variant
    #[error("Unknown tag {tag} while reading {type_name}")]
    UnknownTag { type_name: &'static str, tag: u8 },

    /// A complete value was read but whole bytes were left over
    #[error("{remaining} unread bytes follow a complete value")]
    TrailingBytes { remaining: usize },
}
