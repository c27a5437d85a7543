/// Postgres-backed profile directory (`users` and `admins` tables)
use super::{DirectoryRepository, RepositoryError, RepositoryResult};
use crate::models::{NewProfile, Profile, ProfileId, ProfileKind, ProfileUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self, kind: ProfileKind) -> Profile {
        Profile {
            id: ProfileId::from_row(self.id),
            kind,
            email: self.email,
            name: self.name,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::AlreadyExists
            }
            _ => {
                error!("Database error: {}", err);
                RepositoryError::Database(err.to_string())
            }
        }
    }
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, email, name, phone, created_at, updated_at";

#[async_trait]
impl DirectoryRepository for PgDirectory {
    async fn get_by_id(
        &self,
        kind: ProfileKind,
        id: &ProfileId,
    ) -> RepositoryResult<Option<Profile>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, kind.table());
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_profile(kind)))
    }

    async fn get_by_email(
        &self,
        kind: ProfileKind,
        email: &str,
    ) -> RepositoryResult<Option<Profile>> {
        let sql = format!("SELECT {} FROM {} WHERE email = $1", COLUMNS, kind.table());
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_profile(kind)))
    }

    async fn create(&self, kind: ProfileKind, profile: NewProfile) -> RepositoryResult<Profile> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, email, name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {}
            "#,
            kind.table(),
            COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(profile.id.as_str())
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(&profile.phone)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_profile(kind))
    }

    async fn update(
        &self,
        kind: ProfileKind,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> RepositoryResult<Profile> {
        let sql = format!(
            r#"
            UPDATE {}
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            kind.table(),
            COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id.as_str())
            .bind(&update.name)
            .bind(&update.email)
            .bind(&update.phone)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_profile(kind))
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, kind: ProfileKind, id: &ProfileId) -> RepositoryResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
