use thiserror::Error;

/// Protocol-shaped errors surfaced by a binding.
///
/// Transport and protocol failures land in `Transport`/`Protocol`; the rest
/// mirror the repository fault taxonomy so the session layer can pass them
/// through unchanged.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The addressed object, type, or repository does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A request parameter violated a server-side precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation violates a repository constraint (e.g. deleting a
    /// non-empty folder, filing a non-fileable object).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The caller lacks permission for the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The repository or binding flavor does not support the operation.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Server-side storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The transport failed before a repository answer arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The repository answered with data the binding could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl BindingError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ObjectNotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn constraint(reason: impl Into<String>) -> Self {
        Self::Constraint(reason.into())
    }

    /// `true` for the not-found case, which the session maps to its own
    /// not-found error instead of a generic runtime failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_))
    }
}

/// Result alias for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;
