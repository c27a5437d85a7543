use super::{CodeResult, CodeStore};
use crate::models::VerificationCode;
use async_trait::async_trait;
use dashmap::DashMap;

/// In-process code store for development and tests
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    codes: DashMap<String, VerificationCode>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn save(&self, code: &VerificationCode) -> CodeResult<()> {
        self.codes.insert(code.identifier.clone(), code.clone());
        Ok(())
    }

    async fn find_by_identifier(&self, identifier: &str) -> CodeResult<Vec<VerificationCode>> {
        Ok(self
            .codes
            .get(identifier)
            .map(|entry| vec![entry.value().clone()])
            .unwrap_or_default())
    }

    async fn delete(&self, code: &VerificationCode) -> CodeResult<()> {
        self.codes
            .remove_if(&code.identifier, |_, stored| stored.value == code.value);
        Ok(())
    }
}
