use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purpose prefix of a verification code identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePurpose {
    Confirmation,
    ForgotPassword,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::Confirmation => "CONFIRMATION_CODE",
            CodePurpose::ForgotPassword => "FORGOT_PASSWORD_CODE",
        }
    }

    /// Composite key `<PURPOSE>#<subject>`; the subject is lower-cased.
    pub fn identifier(&self, subject: &str) -> String {
        format!("{}#{}", self.as_str(), subject.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCode {
    pub identifier: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
