/// JSON Web Key Set model and RSA key reconstruction
///
/// Keys are published as base64url modulus/exponent pairs (RFC 7517/7518).
/// Only RSA signing keys are turned into decoding keys.
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    #[error("key set fetch failed: {0}")]
    Fetch(String),

    #[error("malformed key set: {0}")]
    Malformed(String),

    #[error("invalid key {kid}: {reason}")]
    InvalidKey { kid: String, reason: String },
}

/// Single published key (subset of RFC 7517)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// RSA key usable for RS256 signature verification.
    pub fn is_rsa_signing_key(&self) -> bool {
        self.kty == "RSA"
            && self.alg.as_deref().map_or(true, |alg| alg == "RS256")
            && self.use_.as_deref().map_or(true, |u| u == "sig")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Big-endian RSA public key components without leading zero bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKeyParts {
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
}

impl RsaPublicKeyParts {
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeySetError> {
        let kid = jwk.kid.clone().unwrap_or_default();
        let invalid = |reason: &str| KeySetError::InvalidKey {
            kid: kid.clone(),
            reason: reason.to_string(),
        };

        let n = jwk.n.as_deref().ok_or_else(|| invalid("missing modulus"))?;
        let e = jwk.e.as_deref().ok_or_else(|| invalid("missing exponent"))?;

        let modulus = URL_SAFE_NO_PAD
            .decode(n.trim_end_matches('='))
            .map_err(|err| invalid(&format!("modulus: {}", err)))?;
        let exponent = URL_SAFE_NO_PAD
            .decode(e.trim_end_matches('='))
            .map_err(|err| invalid(&format!("exponent: {}", err)))?;

        let modulus = strip_leading_zeros(&modulus);
        if modulus.is_empty() {
            return Err(invalid("empty modulus"));
        }

        let exponent = exponent_value(&exponent).map_err(|reason| invalid(reason))?;

        Ok(Self {
            modulus: modulus.to_vec(),
            exponent: strip_leading_zeros(&exponent.to_be_bytes()).to_vec(),
        })
    }

    pub fn exponent_value(&self) -> u32 {
        let mut padded = [0u8; 4];
        padded[4 - self.exponent.len()..].copy_from_slice(&self.exponent);
        u32::from_be_bytes(padded)
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_rsa_raw_components(&self.modulus, &self.exponent)
    }
}

/// Interpret the exponent bytes as a big-endian integer.
///
/// Short encodings (`AQAB` is three bytes) are left-padded to four bytes
/// before conversion.
fn exponent_value(bytes: &[u8]) -> Result<u32, &'static str> {
    let bytes = strip_leading_zeros(bytes);
    if bytes.len() > 4 {
        return Err("exponent wider than 32 bits");
    }

    let mut padded = [0u8; 4];
    padded[4 - bytes.len()..].copy_from_slice(bytes);
    let value = u32::from_be_bytes(padded);
    if value < 3 || value % 2 == 0 {
        return Err("exponent must be an odd integer >= 3");
    }
    Ok(value)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Where the key set comes from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeySetError>;
}

/// Fetches the key set from the provider's `.well-known/jwks.json` endpoint
#[derive(Clone)]
pub struct HttpKeySetSource {
    http: Client,
    url: String,
}

impl HttpKeySetSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, KeySetError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::Fetch(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        debug!(url = %self.url, "Fetching key set");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySetError::Fetch(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %self.url, "Key set endpoint returned an error");
            return Err(KeySetError::Fetch(format!("unexpected status {}", status)));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySetError::Malformed(e.to_string()))
    }
}
