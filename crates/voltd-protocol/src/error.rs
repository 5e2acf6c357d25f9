//! Client error types

use std::io;
use thiserror::Error;

/// Errors surfaced by the daemon client
#[derive(Debug, Error)]
pub enum Error {
    /// A non-empty response did not contain the expected field tag
    #[error("expected {expected:?} in response, got {actual:?}")]
    ProtocolMismatch {
        /// Tag the response was validated against
        expected: String,
        /// The response bytes, lossily decoded
        actual: String,
    },

    /// Every read attempt for a command yielded an empty chunk
    #[error("no response from daemon after {attempts} read attempts")]
    RetryExhausted {
        /// Number of reads performed before giving up
        attempts: u32,
    },

    /// A set command was not acknowledged; carries the daemon's diagnostic verbatim
    #[error("daemon rejected command: {0}")]
    ServerRejected(String),

    /// A tag-valid response failed numeric or format conversion
    #[error("malformed value {value:?}: {reason}")]
    MalformedValue {
        /// The offending value text
        value: String,
        /// What the conversion expected
        reason: String,
    },

    /// Client misuse, e.g. handler registration without an event connection
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An argument failed the field's declared constraints before being sent
    #[error("invalid argument for {field}: {reason}")]
    InvalidArgument {
        /// Wire name of the field
        field: String,
        /// Which constraint was violated
        reason: String,
    },

    /// Underlying connection failure
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Specialized Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a malformed value error
    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is transient from the event listener's point of view
    ///
    /// The listener never terminates on an error; this exists so callers
    /// inspecting surfaced diagnostics can tell wire noise from client misuse.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RetryExhausted { .. })
    }
}
