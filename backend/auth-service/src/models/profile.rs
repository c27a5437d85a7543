use super::identity::{IdentityId, IdentityRecord};
use crate::error::{Result, ServiceError};
use crate::validators;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local profile key. Always equal to the identity id issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn from_identity(identity: &IdentityRecord) -> Self {
        Self::from(identity.id.clone())
    }

    /// Rehydrate a stored key (repository rows, request paths).
    pub fn parse(raw: &str) -> Result<Self> {
        validators::validate_required("id", raw)?;
        Ok(Self(raw.to_string()))
    }

    /// Stored keys were validated on insert.
    pub(crate) fn from_row(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IdentityId> for ProfileId {
    fn from(id: IdentityId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    User,
    Admin,
}

impl ProfileKind {
    pub fn table(&self) -> &'static str {
        match self {
            ProfileKind::User => "users",
            ProfileKind::Admin => "admins",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub kind: ProfileKind,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: ProfileId,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

impl NewProfile {
    /// Validate and normalise before insert.
    pub fn validated(self) -> Result<Self> {
        let email = validators::normalize_email(&self.email)?;
        validators::validate_profile_name(&self.name)?;
        if let Some(phone) = &self.phone {
            validators::validate_phone(phone)?;
        }
        Ok(Self { email, ..self })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }

    pub fn validated(self) -> Result<Self> {
        if self.is_empty() {
            return Err(ServiceError::Validation(
                "At least one field must be updated".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            validators::validate_profile_name(name)?;
        }
        if let Some(phone) = &self.phone {
            validators::validate_phone(phone)?;
        }
        let email = self
            .email
            .as_deref()
            .map(validators::normalize_email)
            .transpose()?;
        Ok(Self { email, ..self })
    }
}

/// Profile data supplied when a group grant has to create the local profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSeed {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileSeed {
    /// Build the profile for `identity`, falling back to the identity's attributes.
    pub fn into_new_profile(self, identity: &IdentityRecord) -> NewProfile {
        NewProfile {
            id: ProfileId::from_identity(identity),
            email: self.email.unwrap_or_else(|| identity.email.clone()),
            name: self.name.unwrap_or_else(|| identity.name.clone()),
            phone: self.phone,
        }
    }
}
