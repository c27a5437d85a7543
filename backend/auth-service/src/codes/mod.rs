/// One-time verification codes
///
/// Codes are generated from a CSPRNG, stored under a `<PURPOSE>#<subject>`
/// identifier and consumed at most once by [`VerificationCodeService::verify_code`].
pub mod generator;
pub mod memory_store;
pub mod redis_store;
pub mod service;

use crate::models::VerificationCode;
use async_trait::async_trait;
use thiserror::Error;

pub use generator::CodeGenerator;
pub use memory_store::MemoryCodeStore;
pub use redis_store::RedisCodeStore;
pub use service::VerificationCodeService;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("code not found")]
    NotFound,

    #[error("invalid code")]
    Invalid,

    #[error("code expired")]
    Expired,

    #[error("invalid code request: {0}")]
    Validation(String),

    #[error("code generation failed: {0}")]
    Generation(String),

    #[error("code store error: {0}")]
    Store(String),
}

pub type CodeResult<T> = std::result::Result<T, CodeError>;

/// Key-value storage for verification codes with per-record expiry.
///
/// Saving a code for an identifier supersedes any earlier code for the same
/// identifier. Expired records may still be returned by `find_by_identifier`
/// until the store evicts them.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn save(&self, code: &VerificationCode) -> CodeResult<()>;

    async fn find_by_identifier(&self, identifier: &str) -> CodeResult<Vec<VerificationCode>>;

    /// Remove `code` if the stored record still holds the same value.
    async fn delete(&self, code: &VerificationCode) -> CodeResult<()>;
}
