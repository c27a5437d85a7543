/// Identity provider boundary
///
/// The provisioning core talks to the managed identity provider only through
/// [`IdentityGateway`]. Adapters translate provider-specific failures into
/// [`GatewayError`] so nothing upstream depends on the wording of an
/// external error message.
use crate::models::{AuthTokens, IdentityId, IdentityRecord, LoginOutcome, MfaSecret, UserGroup};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password reset required")]
    PasswordResetRequired,

    #[error("user not confirmed")]
    UserNotConfirmed,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("group not found")]
    GroupNotFound,

    #[error("invalid access token")]
    InvalidAccessToken,

    /// Anything the adapter could not classify
    #[error("upstream failure: {0}")]
    Upstream(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> GatewayResult<LoginOutcome>;

    /// Self-service sign-up. Returns the provider-issued identity id.
    async fn sign_up(&self, username: &str, password: &str, name: &str)
        -> GatewayResult<IdentityId>;

    /// Administrative creation with a temporary credential the user must replace.
    async fn create_admin(
        &self,
        username: &str,
        temporary_password: &str,
        name: &str,
    ) -> GatewayResult<IdentityId>;

    async fn confirm_sign_up(&self, username: &str, code: Option<&str>) -> GatewayResult<()>;

    async fn mark_email_verified(&self, username: &str) -> GatewayResult<()>;

    async fn delete_user(&self, username: &str) -> GatewayResult<()>;

    async fn add_group(&self, username: &str, group: UserGroup) -> GatewayResult<()>;

    async fn remove_group(&self, username: &str, group: UserGroup) -> GatewayResult<()>;

    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<AuthTokens>;

    async fn add_mfa(&self, access_token: &str) -> GatewayResult<MfaSecret>;

    async fn activate_mfa(&self, access_token: &str, code: &str) -> GatewayResult<()>;

    async fn verify_mfa(&self, username: &str, session: &str, code: &str)
        -> GatewayResult<AuthTokens>;

    async fn remove_mfa(&self, access_token: &str) -> GatewayResult<()>;

    async fn admin_remove_mfa(&self, username: &str) -> GatewayResult<()>;

    /// Invalidate every session issued to `username`.
    async fn global_sign_out(&self, username: &str) -> GatewayResult<()>;

    /// Invalidate the sessions behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> GatewayResult<()>;

    async fn get_user(&self, username: &str) -> GatewayResult<IdentityRecord>;

    async fn get_user_by_access_token(&self, access_token: &str) -> GatewayResult<IdentityRecord>;

    async fn set_new_password(
        &self,
        username: &str,
        new_password: &str,
        session: &str,
    ) -> GatewayResult<AuthTokens>;

    async fn admin_set_password(&self, username: &str, new_password: &str) -> GatewayResult<()>;

    async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> GatewayResult<()>;
}
