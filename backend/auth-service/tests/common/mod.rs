//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use auth_service::codes::{CodeStore, MemoryCodeStore};
use auth_service::db::{DirectoryRepository, RepositoryError, RepositoryResult};
use auth_service::gateway::{GatewayError, GatewayResult, IdentityGateway};
use auth_service::models::{
    AuthTokens, IdentityId, IdentityRecord, IdentityStatus, LoginOutcome, MfaSecret, NewProfile,
    Profile, ProfileId, ProfileKind, ProfileUpdate, UserGroup,
};
use auth_service::security::{Jwk, JwkSet, KeySetError, KeySetSource, TokenValidatorConfig};
use auth_service::services::{CodeSettings, NotificationSender};
use auth_service::provisioning::ProvisioningConfig;
use auth_service::{AppParts, AuthApp, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================
// Identity gateway
// ============================================

/// Gateway double that records every call and fails on demand.
#[derive(Default)]
pub struct FakeGateway {
    pub issued_id: Mutex<String>,
    pub users: Mutex<HashMap<String, IdentityRecord>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_sign_up: Mutex<Option<GatewayError>>,
    pub fail_add_group: Mutex<Option<GatewayError>>,
    pub fail_delete_user: Mutex<Option<GatewayError>>,
    pub fail_global_sign_out: Mutex<Option<GatewayError>>,
    pub sign_up_delay: Mutex<Option<Duration>>,
    pub delete_user_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn issuing(id: &str) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.issued_id.lock().unwrap() = id.to_string();
        Arc::new(gateway)
    }

    pub fn with_user(self: Arc<Self>, id: &str, email: &str, name: &str) -> Arc<Self> {
        self.users.lock().unwrap().insert(
            email.to_string(),
            IdentityRecord {
                id: IdentityId::new(id).unwrap(),
                username: email.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                status: IdentityStatus::Confirmed,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.delete_user_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn issue(&self, username: &str, name: &str) -> GatewayResult<IdentityId> {
        let id = self.issued_id.lock().unwrap().clone();
        self.users.lock().unwrap().insert(
            username.to_string(),
            IdentityRecord {
                id: IdentityId::new(id.clone()).unwrap(),
                username: username.to_string(),
                email: username.to_string(),
                name: name.to_string(),
                status: IdentityStatus::Unconfirmed,
            },
        );
        Ok(IdentityId::new(id).unwrap())
    }
}

#[async_trait]
impl IdentityGateway for FakeGateway {
    async fn login(&self, username: &str, _password: &str) -> GatewayResult<LoginOutcome> {
        self.record(format!("login:{}", username));
        Ok(LoginOutcome::Authenticated(tokens()))
    }

    async fn sign_up(&self, username: &str, _password: &str, name: &str) -> GatewayResult<IdentityId> {
        self.record(format!("sign_up:{}", username));
        if let Some(err) = self.fail_sign_up.lock().unwrap().clone() {
            return Err(err);
        }
        let id = self.issue(username, name)?;

        // The identity exists before the slow response arrives.
        let delay = *self.sign_up_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(id)
    }

    async fn create_admin(
        &self,
        username: &str,
        _temporary_password: &str,
        name: &str,
    ) -> GatewayResult<IdentityId> {
        self.record(format!("create_admin:{}", username));
        self.issue(username, name)
    }

    async fn confirm_sign_up(&self, username: &str, _code: Option<&str>) -> GatewayResult<()> {
        self.record(format!("confirm_sign_up:{}", username));
        Ok(())
    }

    async fn mark_email_verified(&self, username: &str) -> GatewayResult<()> {
        self.record(format!("mark_email_verified:{}", username));
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> GatewayResult<()> {
        self.delete_user_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("delete_user:{}", username));
        if let Some(err) = self.fail_delete_user.lock().unwrap().clone() {
            return Err(err);
        }
        self.users.lock().unwrap().remove(username);
        Ok(())
    }

    async fn add_group(&self, username: &str, group: UserGroup) -> GatewayResult<()> {
        self.record(format!("add_group:{}:{}", username, group));
        if let Some(err) = self.fail_add_group.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn remove_group(&self, username: &str, group: UserGroup) -> GatewayResult<()> {
        self.record(format!("remove_group:{}:{}", username, group));
        Ok(())
    }

    async fn refresh_token(&self, _refresh_token: &str) -> GatewayResult<AuthTokens> {
        Ok(tokens())
    }

    async fn add_mfa(&self, _access_token: &str) -> GatewayResult<MfaSecret> {
        Ok(MfaSecret {
            secret_code: "JBSWY3DPEHPK3PXP".to_string(),
            session: None,
        })
    }

    async fn activate_mfa(&self, _access_token: &str, _code: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn verify_mfa(&self, _username: &str, _session: &str, _code: &str) -> GatewayResult<AuthTokens> {
        Ok(tokens())
    }

    async fn remove_mfa(&self, _access_token: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn admin_remove_mfa(&self, _username: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn global_sign_out(&self, username: &str) -> GatewayResult<()> {
        self.record(format!("global_sign_out:{}", username));
        if let Some(err) = self.fail_global_sign_out.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn sign_out(&self, _access_token: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn get_user(&self, username: &str) -> GatewayResult<IdentityRecord> {
        self.record(format!("get_user:{}", username));
        self.users
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .ok_or(GatewayError::UserNotFound)
    }

    async fn get_user_by_access_token(&self, _access_token: &str) -> GatewayResult<IdentityRecord> {
        Err(GatewayError::InvalidAccessToken)
    }

    async fn set_new_password(
        &self,
        _username: &str,
        _new_password: &str,
        _session: &str,
    ) -> GatewayResult<AuthTokens> {
        Ok(tokens())
    }

    async fn admin_set_password(&self, _username: &str, _new_password: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn change_password(
        &self,
        _access_token: &str,
        _old_password: &str,
        _new_password: &str,
    ) -> GatewayResult<()> {
        Ok(())
    }
}

fn tokens() -> AuthTokens {
    AuthTokens {
        access_token: "access".to_string(),
        id_token: Some("id".to_string()),
        refresh_token: Some("refresh".to_string()),
        expires_in: 3600,
    }
}

// ============================================
// Directory
// ============================================

/// In-memory directory with a unique email per kind.
#[derive(Default)]
pub struct InMemoryDirectory {
    pub profiles: Mutex<HashMap<(ProfileKind, String), Profile>>,
    pub fail_create: Mutex<Option<RepositoryError>>,
    pub deleted: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, kind: ProfileKind, id: &str, email: &str) {
        let now = Utc::now();
        self.profiles.lock().unwrap().insert(
            (kind, id.to_string()),
            Profile {
                id: ProfileId::parse(id).unwrap(),
                kind,
                email: email.to_string(),
                name: "Seeded".to_string(),
                phone: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn get(&self, kind: ProfileKind, id: &str) -> Option<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectory {
    async fn get_by_id(&self, kind: ProfileKind, id: &ProfileId) -> RepositoryResult<Option<Profile>> {
        Ok(self.get(kind, id.as_str()))
    }

    async fn get_by_email(&self, kind: ProfileKind, email: &str) -> RepositoryResult<Option<Profile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| p.kind == kind && p.email == email)
            .cloned())
    }

    async fn create(&self, kind: ProfileKind, profile: NewProfile) -> RepositoryResult<Profile> {
        if let Some(err) = self.fail_create.lock().unwrap().clone() {
            return Err(err);
        }

        let mut profiles = self.profiles.lock().unwrap();
        let duplicate = profiles.values().any(|p| {
            p.kind == kind && (p.email == profile.email || p.id == profile.id)
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists);
        }

        let now = Utc::now();
        let created = Profile {
            id: profile.id.clone(),
            kind,
            email: profile.email,
            name: profile.name,
            phone: profile.phone,
            created_at: now,
            updated_at: now,
        };
        profiles.insert((kind, profile.id.as_str().to_string()), created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        kind: ProfileKind,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> RepositoryResult<Profile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&(kind, id.as_str().to_string()))
            .ok_or(RepositoryError::NotFound)?;
        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(email) = update.email {
            profile.email = email;
        }
        if let Some(phone) = update.phone {
            profile.phone = Some(phone);
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete(&self, kind: ProfileKind, id: &ProfileId) -> RepositoryResult<()> {
        self.deleted.lock().unwrap().push(id.as_str().to_string());
        self.profiles
            .lock()
            .unwrap()
            .remove(&(kind, id.as_str().to_string()))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

// ============================================
// Notifications
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

// ============================================
// Signing keys
// ============================================

pub const TEST_KID: &str = "test-key-1";
pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/test_rsa_key.pem");
pub const TEST_MODULUS: &str = "0s7m5N-rHCrNLW7-FITMos8fObXxvUKEh-NPBntgR0T6yyhgLR6y136pPgGrYgRatMmC6XqTHGXrl89SOgo1i1lZSKZdwUooOEx0bsijCIxir-sQ8G4RraMBil2LdJG19ECnjnXq7C7EvllFqjnymusxe0d5mrBYuf2szr4EpxQV2yUp-Yz5ts86XXsHZXHp6as9k7jhEDrxag7pE2StphT0kjtxJTYBi9PcPnOEAvsSRxBSOafqM00C3BaYeHy8k65KIax84LvFGHzgY9ky3pbZRoLkeJe4YpHowD9_ULcdmhCPUzMG5ogYpPwmI-dpFavoH0vOEE93UjCrHYnz1Q";
pub const TEST_EXPONENT: &str = "AQAB";

pub fn test_jwk(kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        kid: Some(kid.to_string()),
        use_: Some("sig".to_string()),
        alg: Some("RS256".to_string()),
        n: Some(TEST_MODULUS.to_string()),
        e: Some(TEST_EXPONENT.to_string()),
    }
}

pub fn sign_token(kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Key set source serving a fixed set and counting fetches.
pub struct StaticKeySource {
    pub set: Mutex<JwkSet>,
    pub fetches: AtomicUsize,
    pub delay: Option<Duration>,
    /// When set, every fetch fails with this error
    pub outage: Mutex<Option<KeySetError>>,
}

impl StaticKeySource {
    pub fn new(keys: Vec<Jwk>) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(JwkSet { keys }),
            fetches: AtomicUsize::new(0),
            delay: None,
            outage: Mutex::new(None),
        })
    }

    pub fn slow(keys: Vec<Jwk>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(JwkSet { keys }),
            fetches: AtomicUsize::new(0),
            delay: Some(delay),
            outage: Mutex::new(None),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySource {
    async fn fetch(&self) -> std::result::Result<JwkSet, KeySetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.outage.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.set.lock().unwrap().clone())
    }
}

// ============================================
// Wiring
// ============================================

pub struct TestApp {
    pub app: AuthApp,
    pub gateway: Arc<FakeGateway>,
    pub directory: Arc<InMemoryDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub code_store: Arc<MemoryCodeStore>,
}

pub fn test_app(gateway: Arc<FakeGateway>) -> TestApp {
    let directory = InMemoryDirectory::new();
    let notifier = RecordingNotifier::new();
    let code_store = Arc::new(MemoryCodeStore::new());

    let app = AuthApp::from_parts(AppParts {
        gateway: gateway.clone(),
        directory: directory.clone(),
        code_store: code_store.clone() as Arc<dyn CodeStore>,
        notifier: notifier.clone(),
        key_source: StaticKeySource::new(vec![test_jwk(TEST_KID)]),
        provisioning: ProvisioningConfig {
            call_timeout: Duration::from_secs(2),
        },
        codes: CodeSettings::default(),
        tokens: TokenValidatorConfig::default(),
    });

    TestApp {
        app,
        gateway,
        directory,
        notifier,
        code_store,
    }
}
