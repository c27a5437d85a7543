use super::{CodeError, CodeGenerator, CodeResult, CodeStore};
use crate::models::VerificationCode;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Generates, persists and consumes one-time codes.
///
/// `verify_code` reads and then deletes; two concurrent calls with the same
/// valid code can both observe the match before either delete lands.
#[derive(Clone)]
pub struct VerificationCodeService {
    store: Arc<dyn CodeStore>,
    generator: CodeGenerator,
}

impl VerificationCodeService {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self {
            store,
            generator: CodeGenerator,
        }
    }

    pub async fn generate_and_save(
        &self,
        identifier: &str,
        ttl: Duration,
        length: usize,
        allow_letters: bool,
    ) -> CodeResult<String> {
        if identifier.trim().is_empty() {
            return Err(CodeError::Validation("identifier is required".to_string()));
        }
        if ttl.is_zero() {
            return Err(CodeError::Validation("ttl must be positive".to_string()));
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| CodeError::Validation("ttl out of range".to_string()))?;

        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CodeError::Validation("ttl out of range".to_string()))?;

        let value = self.generator.generate(length, allow_letters)?;
        let code = VerificationCode {
            identifier: identifier.to_string(),
            value: value.clone(),
            expires_at,
        };
        self.store.save(&code).await?;

        debug!(identifier = %identifier, "Verification code saved");
        Ok(value)
    }

    pub async fn verify_code(&self, identifier: &str, candidate: &str) -> CodeResult<()> {
        if identifier.trim().is_empty() {
            return Err(CodeError::Validation("identifier is required".to_string()));
        }
        if candidate.is_empty() {
            return Err(CodeError::Validation("code is required".to_string()));
        }

        let records = self.store.find_by_identifier(identifier).await?;
        if records.is_empty() {
            return Err(CodeError::NotFound);
        }

        let now = Utc::now();
        for record in records {
            if !constant_time_compare(record.value.as_bytes(), candidate.as_bytes()) {
                continue;
            }

            // Expired records stay until the store evicts them.
            if record.is_expired_at(now) {
                return Err(CodeError::Expired);
            }

            if let Err(e) = self.store.delete(&record).await {
                warn!(error = %e, identifier = %identifier, "Failed to delete consumed code");
            }
            return Ok(());
        }

        Err(CodeError::Invalid)
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
