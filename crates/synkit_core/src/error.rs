//! Error types for synkit core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in synkit core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Local store error.
    #[error("storage error: {0}")]
    Storage(#[from] synkit_storage::StorageError),

    /// Text codec error.
    #[error("codec error: {0}")]
    Codec(#[from] synkit_codec::CodecError),

    /// An entity was constructed without a kind.
    #[error("entity kind missing")]
    MissingKind,

    /// A kind contains reserved characters.
    #[error("invalid kind {kind:?}: {reason}")]
    InvalidKind {
        /// The rejected kind.
        kind: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An id or name is neither a non-negative integer nor a valid name.
    #[error("invalid id or name: {message}")]
    InvalidIdentity {
        /// Description of the problem.
        message: String,
    },

    /// Both a name and a numeric id were supplied.
    #[error("an entity can have either a name or an id, not both")]
    AmbiguousIdentity,

    /// A child key was requested under a different namespace than its parent.
    #[error("namespace mismatch: parent uses {parent:?}, requested {requested:?}")]
    NamespaceMismatch {
        /// The parent key's namespace.
        parent: String,
        /// The namespace passed by the caller.
        requested: String,
    },

    /// A child key was requested under a different application than its parent.
    #[error("application mismatch: parent uses {parent:?}, requested {requested:?}")]
    ApplicationMismatch {
        /// The parent key's application id.
        parent: String,
        /// The application id passed by the caller.
        requested: String,
    },

    /// A namespace is empty, too long, or contains reserved characters.
    #[error("invalid namespace {namespace:?}")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
    },

    /// An application id is empty or contains reserved characters.
    #[error("invalid application id {application:?}")]
    InvalidApplication {
        /// The rejected application id.
        application: String,
    },

    /// An encoded key string could not be parsed.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of the problem.
        message: String,
    },

    /// No entity is stored under the key.
    #[error("entity not found: {key}")]
    EntityNotFound {
        /// The encoded key that was looked up.
        key: String,
    },

    /// A raw value or wire type tag has no known value variant.
    #[error("unknown value type: {type_name}")]
    UnknownValueType {
        /// The offending type name.
        type_name: String,
    },

    /// A wire value does not match its declared type tag.
    #[error("invalid {type_name} value: {message}")]
    InvalidValue {
        /// The declared type tag.
        type_name: String,
        /// Description of the mismatch.
        message: String,
    },

    /// The entity has no property with this name.
    #[error("unknown property: {name}")]
    UnknownProperty {
        /// The property name.
        name: String,
    },

    /// An argument has the wrong shape.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A record could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Create an invalid identity error.
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            message: message.into(),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create an unknown value type error.
    pub fn unknown_value_type(type_name: impl Into<String>) -> Self {
        Self::UnknownValueType {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for malformed kind, identity, key or argument shapes.
    ///
    /// These are always local and never worth retrying.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::MissingKind
                | CoreError::InvalidKind { .. }
                | CoreError::InvalidIdentity { .. }
                | CoreError::AmbiguousIdentity
                | CoreError::InvalidNamespace { .. }
                | CoreError::InvalidApplication { .. }
                | CoreError::InvalidKey { .. }
                | CoreError::InvalidArgument { .. }
        )
    }
}
