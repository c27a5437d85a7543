/// Account flows: one-time code confirmation, password reset, MFA and sessions
///
/// Code-backed flows pair a [`VerificationCodeService`] code with a gateway
/// call. Session flows validate input and delegate to the identity provider
/// under the per-call timeout.
use super::email::NotificationSender;
use crate::codes::VerificationCodeService;
use crate::error::{with_timeout, Result};
use crate::gateway::IdentityGateway;
use crate::models::{AuthTokens, CodePurpose, IdentityRecord, LoginOutcome, MfaSecret};
use crate::validators::{self, mask_email};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const CONFIRMATION_SUBJECT: &str = "Please confirm your email";
const FORGOT_PASSWORD_SUBJECT: &str = "Reset your password";

#[derive(Debug, Clone)]
pub struct CodeSettings {
    pub ttl: Duration,
    pub length: usize,
    /// Bound on each identity provider call
    pub call_timeout: Duration,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            length: 6,
            call_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    gateway: Arc<dyn IdentityGateway>,
    codes: VerificationCodeService,
    notifier: Arc<dyn NotificationSender>,
    settings: CodeSettings,
}

impl AccountService {
    pub fn new(
        gateway: Arc<dyn IdentityGateway>,
        codes: VerificationCodeService,
        notifier: Arc<dyn NotificationSender>,
        settings: CodeSettings,
    ) -> Self {
        Self {
            gateway,
            codes,
            notifier,
            settings,
        }
    }

    pub async fn send_confirmation_code(&self, username: &str) -> Result<()> {
        let email = validators::normalize_email(username)?;
        self.send_code(&email, CodePurpose::Confirmation, CONFIRMATION_SUBJECT, |code| {
            format!("Your confirmation code is: {}", code)
        })
        .await
    }

    pub async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<()> {
        let email = validators::normalize_email(username)?;
        validators::validate_required("code", code)?;

        self.codes
            .verify_code(&CodePurpose::Confirmation.identifier(&email), code)
            .await?;

        let timeout = self.settings.call_timeout;
        with_timeout("confirm_sign_up", timeout, self.gateway.confirm_sign_up(&email, None)).await?;
        with_timeout(
            "mark_email_verified",
            timeout,
            self.gateway.mark_email_verified(&email),
        )
        .await?;

        info!(email = %mask_email(&email), "Sign-up confirmed");
        Ok(())
    }

    pub async fn send_forgot_password_code(&self, username: &str) -> Result<()> {
        let email = validators::normalize_email(username)?;
        self.send_code(
            &email,
            CodePurpose::ForgotPassword,
            FORGOT_PASSWORD_SUBJECT,
            |code| format!("Your reset password code is: {}", code),
        )
        .await
    }

    pub async fn reset_password(&self, username: &str, code: &str, new_password: &str) -> Result<()> {
        let email = validators::normalize_email(username)?;
        validators::validate_required("code", code)?;
        validators::validate_password(new_password)?;

        self.codes
            .verify_code(&CodePurpose::ForgotPassword.identifier(&email), code)
            .await?;

        with_timeout(
            "admin_set_password",
            self.settings.call_timeout,
            self.gateway.admin_set_password(&email, new_password),
        )
        .await?;

        info!(email = %mask_email(&email), "Password reset");
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let email = validators::normalize_email(username)?;
        validators::validate_required("password", password)?;
        with_timeout("login", self.settings.call_timeout, self.gateway.login(&email, password)).await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens> {
        validators::validate_required("refresh token", refresh_token)?;
        with_timeout(
            "refresh_token",
            self.settings.call_timeout,
            self.gateway.refresh_token(refresh_token),
        )
        .await
    }

    pub async fn add_mfa(&self, access_token: &str) -> Result<MfaSecret> {
        validators::validate_required("access token", access_token)?;
        with_timeout("add_mfa", self.settings.call_timeout, self.gateway.add_mfa(access_token)).await
    }

    pub async fn activate_mfa(&self, access_token: &str, code: &str) -> Result<()> {
        validators::validate_required("access token", access_token)?;
        validators::validate_numeric_code(code)?;
        with_timeout(
            "activate_mfa",
            self.settings.call_timeout,
            self.gateway.activate_mfa(access_token, code),
        )
        .await
    }

    pub async fn verify_mfa(&self, username: &str, session: &str, code: &str) -> Result<AuthTokens> {
        let email = validators::normalize_email(username)?;
        validators::validate_required("session", session)?;
        validators::validate_numeric_code(code)?;
        with_timeout(
            "verify_mfa",
            self.settings.call_timeout,
            self.gateway.verify_mfa(&email, session, code),
        )
        .await
    }

    pub async fn remove_mfa(&self, access_token: &str) -> Result<()> {
        validators::validate_required("access token", access_token)?;
        with_timeout("remove_mfa", self.settings.call_timeout, self.gateway.remove_mfa(access_token))
            .await
    }

    pub async fn admin_remove_mfa(&self, username: &str) -> Result<()> {
        let email = validators::normalize_email(username)?;
        with_timeout(
            "admin_remove_mfa",
            self.settings.call_timeout,
            self.gateway.admin_remove_mfa(&email),
        )
        .await
    }

    pub async fn logout(&self, access_token: &str) -> Result<()> {
        validators::validate_required("access token", access_token)?;
        with_timeout("sign_out", self.settings.call_timeout, self.gateway.sign_out(access_token)).await
    }

    pub async fn set_new_password(
        &self,
        username: &str,
        new_password: &str,
        session: &str,
    ) -> Result<AuthTokens> {
        let email = validators::normalize_email(username)?;
        validators::validate_password(new_password)?;
        validators::validate_required("session", session)?;
        with_timeout(
            "set_new_password",
            self.settings.call_timeout,
            self.gateway.set_new_password(&email, new_password, session),
        )
        .await
    }

    pub async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        validators::validate_required("access token", access_token)?;
        validators::validate_required("old password", old_password)?;
        validators::validate_password(new_password)?;
        with_timeout(
            "change_password",
            self.settings.call_timeout,
            self.gateway
                .change_password(access_token, old_password, new_password),
        )
        .await
    }

    pub async fn get_me(&self, access_token: &str) -> Result<IdentityRecord> {
        validators::validate_required("access token", access_token)?;
        with_timeout(
            "get_user_by_access_token",
            self.settings.call_timeout,
            self.gateway.get_user_by_access_token(access_token),
        )
        .await
    }

    async fn send_code<F>(
        &self,
        email: &str,
        purpose: CodePurpose,
        subject: &str,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        let code = self
            .codes
            .generate_and_save(
                &purpose.identifier(email),
                self.settings.ttl,
                self.settings.length,
                false,
            )
            .await
            .map_err(|e| {
                error!(error = %e, purpose = purpose.as_str(), "Failed to generate code");
                e
            })?;

        self.notifier.send_email(email, subject, &body(&code)).await?;
        info!(email = %mask_email(email), purpose = purpose.as_str(), "Verification code sent");
        Ok(())
    }
}
