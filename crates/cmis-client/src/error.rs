use cmis_binding::BindingError;
use thiserror::Error;

/// Errors surfaced by the session layer.
///
/// Binding faults pass through unchanged inside `Binding`; the remaining
/// variants are raised by the session itself before or after a service
/// call. The session never downgrades an error into a default value.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A caller-supplied argument failed validation before any binding call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The addressed object does not exist in the repository.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The session is not in a state that allows the operation, e.g. a
    /// configuration without a repository id.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The repository answered with data the client cannot make sense of.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A fault reported by the binding, passed through unchanged.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl ClientError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ObjectNotFound(what.into())
    }

    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Self::IllegalState(reason.into())
    }

    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::Runtime(reason.into())
    }
}

/// Result alias for session operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_errors_pass_through() {
        let err: ClientError = BindingError::not_found("obj-1").into();
        assert!(matches!(
            err,
            ClientError::Binding(BindingError::ObjectNotFound(_))
        ));
        assert_eq!(err.to_string(), "object not found: obj-1");
    }

    #[test]
    fn display_carries_reason() {
        let err = ClientError::illegal_state("no repository id");
        assert_eq!(err.to_string(), "illegal state: no repository id");
    }
}
