use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider-issued identity identifier (e.g. the `sub` attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ServiceError::Provider(
                "identity provider returned an empty id".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityStatus {
    Unconfirmed,
    Confirmed,
    ResetRequired,
    ForceChangePassword,
    Unknown,
}

impl IdentityStatus {
    /// Parse the status string reported by the provider. Unrecognised values are `Unknown`.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "UNCONFIRMED" => IdentityStatus::Unconfirmed,
            "CONFIRMED" => IdentityStatus::Confirmed,
            "RESET_REQUIRED" => IdentityStatus::ResetRequired,
            "FORCE_CHANGE_PASSWORD" => IdentityStatus::ForceChangePassword,
            _ => IdentityStatus::Unknown,
        }
    }
}

/// Identity as known by the external provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub status: IdentityStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserGroup {
    Admin,
    User,
}

impl UserGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserGroup::Admin => "Admin",
            UserGroup::User => "User",
        }
    }
}

impl fmt::Display for UserGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserGroup {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Admin" => Ok(UserGroup::Admin),
            "User" => Ok(UserGroup::User),
            _ => Err(ServiceError::InvalidGroup),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeKind {
    MfaRequired,
    NewPasswordRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    pub kind: ChallengeKind,
    pub session: String,
}

/// Result of a login attempt: tokens, or a challenge the client must answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginOutcome {
    Authenticated(AuthTokens),
    Challenge(AuthChallenge),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaSecret {
    pub secret_code: String,
    pub session: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_provider() {
        assert_eq!(
            IdentityStatus::from_provider("CONFIRMED"),
            IdentityStatus::Confirmed
        );
        assert_eq!(
            IdentityStatus::from_provider("FORCE_CHANGE_PASSWORD"),
            IdentityStatus::ForceChangePassword
        );
        assert_eq!(
            IdentityStatus::from_provider("ARCHIVED"),
            IdentityStatus::Unknown
        );
    }

    #[test]
    fn test_group_parsing() {
        assert_eq!("Admin".parse::<UserGroup>().unwrap(), UserGroup::Admin);
        assert_eq!("User".parse::<UserGroup>().unwrap(), UserGroup::User);
        assert!(matches!(
            "Root".parse::<UserGroup>(),
            Err(ServiceError::InvalidGroup)
        ));
    }

    #[test]
    fn test_empty_identity_id_rejected() {
        assert!(IdentityId::new("").is_err());
        assert_eq!(IdentityId::new("u1").unwrap().as_str(), "u1");
    }
}
