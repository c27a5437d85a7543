/// Provisioning use cases
///
/// Each use case keeps the identity provider record and the local profile
/// consistent by registering an undo action after every completed external
/// step and rolling back in reverse order when a later step fails.
///
/// ## Cancellation
///
/// Dropping a use case future stops it at the current await point. Steps
/// already completed are not undone; callers that need run-to-completion
/// should spawn the use case on its own task.
use super::saga::Saga;
use crate::db::DirectoryRepository;
use crate::error::{with_timeout, Result, ServiceError};
use crate::events::{EventDispatcher, IdentityEvent};
use crate::gateway::IdentityGateway;
use crate::models::{
    NewProfile, Profile, ProfileId, ProfileKind, ProfileSeed, ProfileUpdate, UserGroup,
};
use crate::validators::{self, mask_email};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Bound on every gateway and directory call, compensations included
    pub call_timeout: Duration,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateAdminRequest {
    pub email: String,
    pub temporary_password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddGroupRequest {
    pub username: String,
    pub group: UserGroup,
    /// Used only when the profile for the group's kind does not exist yet
    pub seed: Option<ProfileSeed>,
}

pub struct ProvisioningOrchestrator {
    gateway: Arc<dyn IdentityGateway>,
    directory: Arc<dyn DirectoryRepository>,
    dispatcher: Arc<EventDispatcher>,
    config: ProvisioningConfig,
}

impl ProvisioningOrchestrator {
    pub fn new(
        gateway: Arc<dyn IdentityGateway>,
        directory: Arc<dyn DirectoryRepository>,
        dispatcher: Arc<EventDispatcher>,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            gateway,
            directory,
            dispatcher,
            config,
        }
    }

    /// Self-service registration.
    ///
    /// Returns the new profile id, which is the identity id issued by the
    /// provider. A `UserRegistered` event is published after commit.
    pub async fn register_user(&self, req: SignUpRequest) -> Result<ProfileId> {
        let email = validators::normalize_email(&req.email)?;
        validators::validate_password(&req.password)?;
        validators::validate_display_name(&req.name)?;
        if let Some(phone) = &req.phone {
            validators::validate_phone(phone)?;
        }

        self.ensure_email_free(ProfileKind::User, &email).await?;

        let mut saga = Saga::new("register_user");

        let identity_id = self
            .call("sign_up", self.gateway.sign_up(&email, &req.password, &req.name))
            .await?;
        self.push_delete_identity(&mut saga, &email);

        saga.guard(
            self.call("add_group", self.gateway.add_group(&email, UserGroup::User))
                .await,
        )
        .await?;

        let profile = saga
            .guard(
                NewProfile {
                    id: ProfileId::from(identity_id),
                    email: email.clone(),
                    name: req.name,
                    phone: req.phone,
                }
                .validated(),
            )
            .await?;

        let created = saga
            .guard(
                self.call(
                    "create_profile",
                    self.directory.create(ProfileKind::User, profile),
                )
                .await,
            )
            .await?;
        self.push_delete_profile(&mut saga, ProfileKind::User, created.id.clone());

        saga.commit();

        if let Err(e) = self.dispatcher.dispatch(IdentityEvent::UserRegistered {
            email: email.clone(),
            needs_verification: true,
        }) {
            error!(error = %e, email = %mask_email(&email), "Failed to publish registration event");
        }

        info!(profile_id = %created.id, email = %mask_email(&email), "User registered");
        Ok(created.id)
    }

    /// Administrative account creation with a temporary password.
    pub async fn create_admin(&self, req: CreateAdminRequest) -> Result<ProfileId> {
        let email = validators::normalize_email(&req.email)?;
        validators::validate_password(&req.temporary_password)?;
        validators::validate_display_name(&req.name)?;
        if let Some(phone) = &req.phone {
            validators::validate_phone(phone)?;
        }

        self.ensure_email_free(ProfileKind::Admin, &email).await?;

        let mut saga = Saga::new("create_admin");

        let identity_id = self
            .call(
                "create_admin",
                self.gateway
                    .create_admin(&email, &req.temporary_password, &req.name),
            )
            .await?;
        self.push_delete_identity(&mut saga, &email);

        saga.guard(
            self.call("add_group", self.gateway.add_group(&email, UserGroup::Admin))
                .await,
        )
        .await?;

        let profile = saga
            .guard(
                NewProfile {
                    id: ProfileId::from(identity_id),
                    email: email.clone(),
                    name: req.name,
                    phone: req.phone,
                }
                .validated(),
            )
            .await?;

        let created = saga
            .guard(
                self.call(
                    "create_profile",
                    self.directory.create(ProfileKind::Admin, profile),
                )
                .await,
            )
            .await?;
        self.push_delete_profile(&mut saga, ProfileKind::Admin, created.id.clone());

        saga.commit();

        info!(profile_id = %created.id, email = %mask_email(&email), "Admin created");
        Ok(created.id)
    }

    /// Grant `group`, creating the matching local profile if it is missing.
    ///
    /// Existing sessions are signed out afterwards so tokens carrying the old
    /// group claims stop working; a sign-out failure is only logged.
    pub async fn add_group(&self, req: AddGroupRequest) -> Result<()> {
        validators::validate_required("username", &req.username)?;

        let identity = self
            .call("get_user", self.gateway.get_user(&req.username))
            .await?;
        let kind = profile_kind(req.group);
        let profile_id = ProfileId::from_identity(&identity);

        let mut saga = Saga::new("add_group");

        let existing = self
            .call("get_profile", self.directory.get_by_id(kind, &profile_id))
            .await?;
        if existing.is_none() {
            let profile = req
                .seed
                .unwrap_or_default()
                .into_new_profile(&identity)
                .validated()?;
            self.call("create_profile", self.directory.create(kind, profile))
                .await?;
            self.push_delete_profile(&mut saga, kind, profile_id.clone());
        }

        saga.guard(
            self.call(
                "add_group",
                self.gateway.add_group(&identity.username, req.group),
            )
            .await,
        )
        .await?;

        saga.commit();

        self.sign_out_everywhere(&identity.username).await;
        info!(profile_id = %profile_id, group = %req.group, "Group granted");
        Ok(())
    }

    /// Revoke `group` and sign out existing sessions.
    pub async fn remove_group(&self, username: &str, group: UserGroup) -> Result<()> {
        validators::validate_required("username", username)?;

        self.call("remove_group", self.gateway.remove_group(username, group))
            .await?;

        self.sign_out_everywhere(username).await;
        info!(group = %group, "Group revoked");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        kind: ProfileKind,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> Result<Profile> {
        let update = update.validated()?;
        self.call("update_profile", self.directory.update(kind, id, update))
            .await
    }

    pub async fn get_profile(&self, kind: ProfileKind, id: &ProfileId) -> Result<Profile> {
        self.call("get_profile", self.directory.get_by_id(kind, id))
            .await?
            .ok_or(ServiceError::ProfileNotFound)
    }

    /// Best-effort duplicate check; the unique constraint on create is authoritative.
    async fn ensure_email_free(&self, kind: ProfileKind, email: &str) -> Result<()> {
        let existing = self
            .call("get_profile_by_email", self.directory.get_by_email(kind, email))
            .await?;
        if existing.is_some() {
            return Err(ServiceError::UserAlreadyExists);
        }
        Ok(())
    }

    async fn sign_out_everywhere(&self, username: &str) {
        if let Err(e) = self
            .call("global_sign_out", self.gateway.global_sign_out(username))
            .await
        {
            warn!(error = %e, "Global sign-out failed; existing sessions stay valid until expiry");
        }
    }

    fn push_delete_identity(&self, saga: &mut Saga, username: &str) {
        let gateway = self.gateway.clone();
        let username = username.to_string();
        let timeout = self.config.call_timeout;
        saga.push("delete identity", move || async move {
            with_timeout("delete_user", timeout, gateway.delete_user(&username)).await
        });
    }

    fn push_delete_profile(&self, saga: &mut Saga, kind: ProfileKind, id: ProfileId) {
        let directory = self.directory.clone();
        let timeout = self.config.call_timeout;
        saga.push("delete profile", move || async move {
            with_timeout("delete_profile", timeout, directory.delete(kind, &id)).await
        });
    }

    async fn call<T, E, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<ServiceError>,
    {
        with_timeout(operation, self.config.call_timeout, call).await
    }
}

fn profile_kind(group: UserGroup) -> ProfileKind {
    match group {
        UserGroup::Admin => ProfileKind::Admin,
        UserGroup::User => ProfileKind::User,
    }
}
