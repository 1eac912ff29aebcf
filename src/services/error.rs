use std::fmt::Display;

use thiserror::Error;

/// Failure kinds surfaced by the service layer. The GraphQL boundary maps each
/// variant onto a stable `code` extension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ServiceError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

pub(crate) type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Logs the underlying error and labels it with the failed operation.
    pub(crate) fn internal(err: impl Display, operation: &str) -> Self {
        tracing::error!(error = %err, operation, "Storage operation failed");
        Self::Internal(format!("Failed to {operation}: {err}"))
    }

    pub(crate) fn not_authenticated() -> Self {
        Self::Unauthenticated("Not authenticated".to_string())
    }

    pub(crate) fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

pub(crate) trait OrInternal<T> {
    fn or_internal(self, operation: &str) -> ServiceResult<T>;
}

impl<T, E: Display> OrInternal<T> for Result<T, E> {
    fn or_internal(self, operation: &str) -> ServiceResult<T> {
        self.map_err(|err| ServiceError::internal(err, operation))
    }
}
