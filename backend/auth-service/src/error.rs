use crate::codes::CodeError;
use crate::db::RepositoryError;
use crate::events::DispatchError;
use crate::gateway::GatewayError;
use crate::security::KeySetError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Coarse error classes exposed to callers (HTTP layer, middleware).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Conflict,
    NotFound,
    ExternalProvider,
    Compensation,
    Internal,
}

impl ErrorCategory {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::Authentication => 401,
            ErrorCategory::Conflict => 409,
            ErrorCategory::NotFound => 404,
            ErrorCategory::ExternalProvider => 502,
            ErrorCategory::Compensation | ErrorCategory::Internal => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid group")]
    InvalidGroup,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password reset required")]
    PasswordResetRequired,

    #[error("User not confirmed")]
    UserNotConfirmed,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code expired")]
    CodeExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Profile already exists")]
    ProfileAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Group not found")]
    GroupNotFound,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Key set unavailable: {0}")]
    KeySet(String),

    #[error("Timed out waiting for {operation}")]
    Timeout { operation: &'static str },

    /// Saga rollback failures are logged where they happen and never
    /// returned in place of the error that triggered the rollback. The
    /// variant exists for embedders that run their own compensations.
    #[error("Compensation failed: {0}")]
    CompensationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Code store error: {0}")]
    CodeStore(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Event dispatch failed: {0}")]
    Dispatch(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InvalidGroup
            | ServiceError::InvalidCode
            | ServiceError::CodeExpired => ErrorCategory::Validation,
            ServiceError::InvalidCredentials
            | ServiceError::PasswordResetRequired
            | ServiceError::UserNotConfirmed
            | ServiceError::InvalidRefreshToken
            | ServiceError::InvalidAccessToken
            | ServiceError::InvalidToken(_)
            | ServiceError::TokenExpired => ErrorCategory::Authentication,
            ServiceError::UserAlreadyExists | ServiceError::ProfileAlreadyExists => {
                ErrorCategory::Conflict
            }
            ServiceError::UserNotFound
            | ServiceError::ProfileNotFound
            | ServiceError::GroupNotFound => ErrorCategory::NotFound,
            ServiceError::Provider(_) | ServiceError::KeySet(_) | ServiceError::Timeout { .. } => {
                ErrorCategory::ExternalProvider
            }
            ServiceError::CompensationFailed(_) => ErrorCategory::Compensation,
            ServiceError::Database(_)
            | ServiceError::CodeStore(_)
            | ServiceError::Email(_)
            | ServiceError::Dispatch(_)
            | ServiceError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Message safe to return to an external caller.
    pub fn public_message(&self) -> String {
        match self.category() {
            // Don't leak internal details
            ErrorCategory::Internal | ErrorCategory::Compensation => {
                "Internal server error".to_string()
            }
            ErrorCategory::ExternalProvider => "Identity provider unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Run an external call bounded by `timeout`, converting its error into [`ServiceError`].
pub async fn with_timeout<T, E, F>(operation: &'static str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ServiceError>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::error!(operation, timeout_ms = timeout.as_millis() as u64, "External call timed out");
            Err(ServiceError::Timeout { operation })
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidCredentials => ServiceError::InvalidCredentials,
            GatewayError::PasswordResetRequired => ServiceError::PasswordResetRequired,
            GatewayError::UserNotConfirmed => ServiceError::UserNotConfirmed,
            GatewayError::UserAlreadyExists => ServiceError::UserAlreadyExists,
            GatewayError::UserNotFound => ServiceError::UserNotFound,
            GatewayError::InvalidRefreshToken => ServiceError::InvalidRefreshToken,
            GatewayError::InvalidOrExpiredCode => ServiceError::InvalidCode,
            GatewayError::GroupNotFound => ServiceError::GroupNotFound,
            GatewayError::InvalidAccessToken => ServiceError::InvalidAccessToken,
            GatewayError::Upstream(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                ServiceError::Provider(msg)
            }
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::ProfileNotFound,
            RepositoryError::AlreadyExists => ServiceError::ProfileAlreadyExists,
            RepositoryError::Database(msg) => ServiceError::Database(msg),
        }
    }
}

impl From<CodeError> for ServiceError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::NotFound | CodeError::Invalid => ServiceError::InvalidCode,
            CodeError::Expired => ServiceError::CodeExpired,
            CodeError::Validation(msg) => ServiceError::Validation(msg),
            CodeError::Generation(msg) => ServiceError::Internal(msg),
            CodeError::Store(msg) => ServiceError::CodeStore(msg),
        }
    }
}

impl From<KeySetError> for ServiceError {
    fn from(err: KeySetError) -> Self {
        tracing::error!(error = %err, "Key set error");
        ServiceError::KeySet(err.to_string())
    }
}

impl From<DispatchError> for ServiceError {
    fn from(err: DispatchError) -> Self {
        ServiceError::Dispatch(err.to_string())
    }
}

impl From<lettre::error::Error> for ServiceError {
    fn from(err: lettre::error::Error) -> Self {
        tracing::error!("Email build error: {}", err);
        ServiceError::Email(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for ServiceError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        tracing::error!("SMTP error: {}", err);
        ServiceError::Email(err.to_string())
    }
}
