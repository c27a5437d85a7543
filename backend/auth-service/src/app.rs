/// Composition root
///
/// Builds every component once and wires them explicitly. The identity
/// provider adapter is injected by the embedding binary.
use crate::codes::{CodeStore, RedisCodeStore, VerificationCodeService};
use crate::config::Settings;
use crate::db::{DirectoryRepository, PgDirectory};
use crate::events::{EventDispatcher, EventType, SendConfirmationHandler};
use crate::gateway::IdentityGateway;
use crate::provisioning::{ProvisioningConfig, ProvisioningOrchestrator};
use crate::security::{HttpKeySetSource, KeySetSource, TokenValidator, TokenValidatorConfig};
use crate::services::{AccountService, CodeSettings, EmailService, NotificationSender};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Already-constructed collaborators for [`AuthApp::from_parts`]
pub struct AppParts {
    pub gateway: Arc<dyn IdentityGateway>,
    pub directory: Arc<dyn DirectoryRepository>,
    pub code_store: Arc<dyn CodeStore>,
    pub notifier: Arc<dyn NotificationSender>,
    pub key_source: Arc<dyn KeySetSource>,
    pub provisioning: ProvisioningConfig,
    pub codes: CodeSettings,
    pub tokens: TokenValidatorConfig,
}

#[derive(Clone)]
pub struct AuthApp {
    pub orchestrator: Arc<ProvisioningOrchestrator>,
    pub accounts: Arc<AccountService>,
    pub token_validator: Arc<TokenValidator>,
    pub dispatcher: Arc<EventDispatcher>,
    pub codes: VerificationCodeService,
}

impl AuthApp {
    /// Build from settings.
    ///
    /// The Postgres pool connects lazily; the shared Redis connection is
    /// opened here.
    pub async fn build(settings: &Settings, gateway: Arc<dyn IdentityGateway>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.database.max_connections)
            .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
            .connect_lazy(&settings.database.url)
            .context("Invalid DATABASE_URL")?;

        let redis = redis::Client::open(settings.redis.url.as_str()).context("Invalid REDIS_URL")?;
        let code_store = RedisCodeStore::connect(
            redis,
            settings.redis.code_prefix.clone(),
            settings.codes.retention(),
        )
        .await
        .context("Failed to connect to Redis")?;

        let email = EmailService::new(&settings.email).context("Failed to configure email")?;

        let idp = &settings.identity_provider;
        let key_source = HttpKeySetSource::new(idp.jwks_url.clone(), idp.jwks_timeout())
            .context("Failed to build key set client")?;

        info!(
            jwks_url = %idp.jwks_url,
            smtp_enabled = email.is_enabled(),
            "Auth service components configured"
        );

        Ok(Self::from_parts(AppParts {
            gateway,
            directory: Arc::new(PgDirectory::new(pool)),
            code_store: Arc::new(code_store),
            notifier: Arc::new(email),
            key_source: Arc::new(key_source),
            provisioning: ProvisioningConfig {
                call_timeout: settings.provisioning.call_timeout(),
            },
            codes: CodeSettings {
                ttl: settings.codes.ttl(),
                length: settings.codes.length,
                call_timeout: settings.provisioning.call_timeout(),
            },
            tokens: TokenValidatorConfig {
                issuer: idp.issuer.clone(),
                audience: idp.audience.clone(),
                groups_claim: idp.groups_claim.clone(),
                username_claim: idp.username_claim.clone(),
                leeway: 0,
            },
        }))
    }

    pub fn from_parts(parts: AppParts) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let codes = VerificationCodeService::new(parts.code_store);

        let accounts = Arc::new(AccountService::new(
            parts.gateway.clone(),
            codes.clone(),
            parts.notifier,
            parts.codes,
        ));

        dispatcher.register(
            EventType::UserRegistered,
            Arc::new(SendConfirmationHandler::new(accounts.clone())),
        );

        let orchestrator = Arc::new(ProvisioningOrchestrator::new(
            parts.gateway,
            parts.directory,
            dispatcher.clone(),
            parts.provisioning,
        ));

        let token_validator = Arc::new(TokenValidator::new(parts.key_source, parts.tokens));

        Self {
            orchestrator,
            accounts,
            token_validator,
            dispatcher,
            codes,
        }
    }

    /// Wait for in-flight event handlers before the process exits.
    pub async fn shutdown(&self) {
        let pending = self.dispatcher.in_flight();
        if pending > 0 {
            info!(pending, "Waiting for event handlers to finish");
        }
        self.dispatcher.wait_idle().await;
        info!("Auth service shut down");
    }
}
