//! Error types for the diff crate.

/// Errors that can occur while computing, decoding or applying a patch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// A host value could not be represented as a record, sequence or scalar.
    #[error("unsupported value kind: {0}")]
    UnsupportedValueKind(String),

    /// The value being patched does not have the shape the patch expects.
    #[error("patch does not match target at {path}: {reason}")]
    PatchTargetMismatch {
        /// JSON pointer of the offending location.
        path: String,
        reason: String,
    },

    /// The patch contains keys or control entries no diff could have produced.
    #[error("malformed patch at {path}: {reason}")]
    MalformedPatch {
        /// JSON pointer of the offending location.
        path: String,
        reason: String,
    },

    /// A sequence is replaced by a record that reads like a sequence patch.
    #[error("replacement record at {path} is indistinguishable from a sequence patch")]
    AmbiguousReplacement {
        /// JSON pointer of the replaced sequence.
        path: String,
    },

    /// The value nests deeper than the configured limit.
    #[error("nesting depth exceeds limit of {limit}")]
    DepthLimitExceeded { limit: usize },

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
