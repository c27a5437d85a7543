/// Local directory of user and admin profiles
///
/// Profiles live in a relational store keyed by the identity id. The
/// provisioning core only depends on [`DirectoryRepository`].
pub mod profiles;

use crate::models::{NewProfile, Profile, ProfileId, ProfileKind, ProfileUpdate};
use async_trait::async_trait;
use thiserror::Error;

pub use profiles::PgDirectory;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("profile not found")]
    NotFound,

    #[error("profile already exists")]
    AlreadyExists,

    #[error("database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn get_by_id(&self, kind: ProfileKind, id: &ProfileId)
        -> RepositoryResult<Option<Profile>>;

    async fn get_by_email(&self, kind: ProfileKind, email: &str)
        -> RepositoryResult<Option<Profile>>;

    async fn create(&self, kind: ProfileKind, profile: NewProfile) -> RepositoryResult<Profile>;

    async fn update(
        &self,
        kind: ProfileKind,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> RepositoryResult<Profile>;

    async fn delete(&self, kind: ProfileKind, id: &ProfileId) -> RepositoryResult<()>;
}
