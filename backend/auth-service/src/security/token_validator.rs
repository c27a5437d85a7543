/// Bearer token validation
///
/// Signing keys are cached per key id. A cache miss triggers one refresh of
/// the whole key set; concurrent misses wait on the same refresh attempt and
/// share its outcome, failed attempts included. Cached keys are never evicted on a timer, so provider key
/// rotation needs [`TokenValidator::refresh_keys`] or a miss on the new kid.
use super::jwks::{KeySetError, KeySetSource, RsaPublicKeyParts};
use crate::error::{Result, ServiceError};
use crate::models::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub const DEFAULT_GROUPS_CLAIM: &str = "cognito:groups";
pub const DEFAULT_USERNAME_CLAIM: &str = "cognito:username";

#[derive(Debug, Clone)]
pub struct TokenValidatorConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub groups_claim: String,
    pub username_claim: String,
    /// Clock skew tolerance in seconds
    pub leeway: u64,
}

impl Default for TokenValidatorConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            groups_claim: DEFAULT_GROUPS_CLAIM.to_string(),
            username_claim: DEFAULT_USERNAME_CLAIM.to_string(),
            leeway: 0,
        }
    }
}

pub struct TokenValidator {
    source: Arc<dyn KeySetSource>,
    config: TokenValidatorConfig,
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// Bumped after every refresh attempt, successful or not
    attempts: AtomicU64,
    /// Error of the most recent attempt; the lock serialises refreshes
    last_refresh: Mutex<Option<KeySetError>>,
}

impl TokenValidator {
    pub fn new(source: Arc<dyn KeySetSource>, config: TokenValidatorConfig) -> Self {
        Self {
            source,
            config,
            keys: RwLock::new(HashMap::new()),
            attempts: AtomicU64::new(0),
            last_refresh: Mutex::new(None),
        }
    }

    pub async fn parse_and_validate(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token)
            .map_err(|e| ServiceError::InvalidToken(format!("malformed header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(ServiceError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| ServiceError::InvalidToken("missing key id".to_string()))?;

        let key = self.resolve_key(&kid).await?;

        let data = decode::<Value>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                _ => ServiceError::InvalidToken(e.to_string()),
            }
        })?;

        self.map_claims(data.claims)
    }

    /// Replace the cached key set with a fresh copy from the source.
    pub async fn refresh_keys(&self) -> Result<usize> {
        let mut last = self.last_refresh.lock().await;
        Ok(self.attempt_refresh(&mut last).await?)
    }

    /// Warm the cache at startup. Failures are logged; the next miss retries.
    pub async fn prefetch(&self) {
        match self.refresh_keys().await {
            Ok(count) => info!(keys = count, "Key set prefetched"),
            Err(e) => warn!(error = %e, "Key set prefetch failed"),
        }
    }

    pub async fn cached_key_count(&self) -> usize {
        self.keys.read().await.len()
    }

    async fn resolve_key(&self, kid: &str) -> Result<DecodingKey> {
        let observed = self.attempts.load(Ordering::Acquire);
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        debug!(kid = %kid, "Signing key not cached, refreshing key set");
        self.refresh_since(observed).await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| ServiceError::InvalidToken(format!("unknown key id {}", kid)))
    }

    /// Refresh unless another task attempted one after `observed`, in which
    /// case that attempt's outcome is returned.
    async fn refresh_since(&self, observed: u64) -> Result<()> {
        let mut last = self.last_refresh.lock().await;
        if self.attempts.load(Ordering::Acquire) != observed {
            return match last.as_ref() {
                Some(e) => Err(e.clone().into()),
                None => Ok(()),
            };
        }
        self.attempt_refresh(&mut last).await?;
        Ok(())
    }

    /// Caller passes the guard of `last_refresh`.
    async fn attempt_refresh(
        &self,
        last: &mut Option<KeySetError>,
    ) -> std::result::Result<usize, KeySetError> {
        let outcome = self.reload().await;
        *last = outcome.as_ref().err().cloned();
        self.attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn reload(&self) -> std::result::Result<usize, KeySetError> {
        let set = self.source.fetch().await?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in set.keys.iter().filter(|k| k.is_rsa_signing_key()) {
            let Some(kid) = jwk.kid.clone() else {
                warn!("Skipping key without kid");
                continue;
            };
            match RsaPublicKeyParts::from_jwk(jwk) {
                Ok(parts) => {
                    keys.insert(kid, parts.decoding_key());
                }
                Err(e) => warn!(error = %e, "Skipping unusable key"),
            }
        }

        let count = keys.len();
        *self.keys.write().await = keys;
        debug!(keys = count, "Key set refreshed");
        Ok(count)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.config.leeway;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    fn map_claims(&self, raw: Value) -> Result<Claims> {
        let subject = raw
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::InvalidToken("missing sub".to_string()))?
            .to_string();

        let email = raw
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let username = raw
            .get(&self.config.username_claim)
            .and_then(Value::as_str)
            .map(str::to_string);

        let groups = match raw.get(&self.config.groups_claim) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            Some(_) => {
                return Err(ServiceError::InvalidToken(format!(
                    "{} claim has unexpected type",
                    self.config.groups_claim
                )))
            }
        };

        Ok(Claims {
            subject,
            email,
            username,
            groups,
        })
    }
}
