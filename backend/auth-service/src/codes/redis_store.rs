/// Redis-backed code store
///
/// One key per identifier holding `{value, expires_at}` as JSON. The key TTL
/// is the code lifetime plus a retention window so an expired code can still
/// be reported as expired instead of missing.
use super::{CodeError, CodeResult, CodeStore};
use crate::models::VerificationCode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

pub const DEFAULT_CODE_PREFIX: &str = "verification_code:";

const DELETE_IF_VALUE_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return 0
end
local stored = cjson.decode(raw)
if stored['value'] == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCode {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Key naming and eviction for stored codes
#[derive(Debug, Clone)]
struct CodeKeys {
    prefix: String,
    retention: Duration,
}

impl CodeKeys {
    fn key(&self, identifier: &str) -> String {
        format!("{}{}", self.prefix, identifier)
    }

    /// Seconds until the key should be evicted.
    fn ttl_secs(&self, expires_at: DateTime<Utc>) -> u64 {
        let remaining = (expires_at - Utc::now()).num_seconds().max(0) as u64;
        remaining.saturating_add(self.retention.as_secs()).max(1)
    }
}

/// Shares one reconnecting connection across all operations.
#[derive(Clone)]
pub struct RedisCodeStore {
    conn: ConnectionManager,
    keys: CodeKeys,
}

impl RedisCodeStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, retention: Duration) -> Self {
        Self {
            conn,
            keys: CodeKeys {
                prefix: prefix.into(),
                retention,
            },
        }
    }

    /// Open the shared connection for `client`.
    pub async fn connect(
        client: Client,
        prefix: impl Into<String>,
        retention: Duration,
    ) -> CodeResult<Self> {
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            error!(error = %e, "Failed to connect to Redis");
            CodeError::Store(e.to_string())
        })?;
        Ok(Self::new(conn, prefix, retention))
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn save(&self, code: &VerificationCode) -> CodeResult<()> {
        let payload = serde_json::to_string(&StoredCode {
            value: code.value.clone(),
            expires_at: code.expires_at,
        })
        .map_err(|e| CodeError::Store(e.to_string()))?;

        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.keys.key(&code.identifier))
            .arg(payload)
            .arg("EX")
            .arg(self.keys.ttl_secs(code.expires_at))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store verification code in Redis");
                CodeError::Store(e.to_string())
            })?;

        Ok(())
    }

    async fn find_by_identifier(&self, identifier: &str) -> CodeResult<Vec<VerificationCode>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.keys.key(identifier))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read verification code from Redis");
                CodeError::Store(e.to_string())
            })?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        let stored: StoredCode = serde_json::from_str(&raw).map_err(|e| {
            error!(error = %e, "Corrupt verification code record");
            CodeError::Store(e.to_string())
        })?;

        Ok(vec![VerificationCode {
            identifier: identifier.to_string(),
            value: stored.value,
            expires_at: stored.expires_at,
        }])
    }

    async fn delete(&self, code: &VerificationCode) -> CodeResult<()> {
        let mut conn = self.conn.clone();
        Script::new(DELETE_IF_VALUE_SCRIPT)
            .key(self.keys.key(&code.identifier))
            .arg(&code.value)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete verification code from Redis");
                CodeError::Store(e.to_string())
            })?;

        Ok(())
    }
}
