//! SQLite-backed [`Store`].
//!
//! Schema (created idempotently on open):
//!
//! - `validator_requests(id PK, num_validators, fee_recipient, status,
//!   created_at, updated_at, error_message)`
//! - `validator_keys(id PK, request_id NOT NULL -> validator_requests.id,
//!   key, fee_recipient, created_at)`
//!
//! Foreign keys are enforced, so a key can never be written for an unknown
//! request. Writes from concurrent processing tasks are serialised by SQLite
//! itself (WAL journal plus a busy timeout).

use super::{Store, StoreError};
use crate::{FeeRecipient, RequestId, Status, ValidatorKey, ValidatorRequest};
use chrono::{DateTime, Utc};
use core::time::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 8;

/// Durable [`Store`] on a single SQLite database file.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: String,
    num_validators: i64,
    fee_recipient: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    error_message: Option<String>,
}

impl TryFrom<RequestRow> for ValidatorRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| StoreError::Corrupt {
            reason: format!("request {}: invalid {what}", row.id),
        };
        Ok(Self {
            id: RequestId::from_str(&row.id).map_err(|_| corrupt("id"))?,
            requested_count: u64::try_from(row.num_validators)
                .map_err(|_| corrupt("num_validators"))?,
            fee_recipient: FeeRecipient::parse(&row.fee_recipient)
                .map_err(|_| corrupt("fee_recipient"))?,
            status: Status::from_str(&row.status).map_err(|_| corrupt("status"))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            error_message: row.error_message,
        })
    }
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `path` and ensures the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(opts)
            .await?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database. Contents vanish when the store is
    /// dropped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to `:memory:` is a separate database, so pin the
        // pool to one connection that is never recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates both tables if they do not exist yet, atomically.
    async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        create_requests_table(&mut tx).await?;
        create_keys_table(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Closes every pooled connection. Later calls fail with
    /// [`StoreError::Unavailable`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn create_requests_table(tx: &mut Transaction<'_, Sqlite>) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS validator_requests (
            id TEXT PRIMARY KEY NOT NULL,
            num_validators INTEGER NOT NULL,
            fee_recipient TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn create_keys_table(tx: &mut Transaction<'_, Sqlite>) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS validator_keys (
            id TEXT PRIMARY KEY NOT NULL,
            request_id TEXT NOT NULL REFERENCES validator_requests (id),
            key TEXT NOT NULL,
            fee_recipient TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_validator_keys_request_id ON validator_keys (request_id)",
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Maps constraint violations onto the store's error taxonomy; everything
/// else stays a backend error.
fn classify(err: sqlx::Error, id: impl ToString, request_id: impl ToString) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateId {
            id: id.to_string(),
        },
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::ForeignKeyViolation {
                request_id: request_id.to_string(),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable {
                reason: err.to_string(),
            }
        }
        _ => StoreError::Backend(err),
    }
}

impl Store for SqliteStore {
    async fn create_request(&self, request: &ValidatorRequest) -> Result<(), StoreError> {
        let count = i64::try_from(request.requested_count).map_err(|_| StoreError::Corrupt {
            reason: format!("num_validators {} out of range", request.requested_count),
        })?;

        sqlx::query(
            "INSERT INTO validator_requests \
             (id, num_validators, fee_recipient, status, created_at, updated_at, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(request.id.to_string())
        .bind(count)
        .bind(request.fee_recipient.as_str())
        .bind(Status::Started.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, request.id, request.id))?;
        Ok(())
    }

    async fn get_request(&self, id: &RequestId) -> Result<ValidatorRequest, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(
            "SELECT id, num_validators, fee_recipient, status, created_at, updated_at, error_message \
             FROM validator_requests WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, id, id))?;

        row.ok_or_else(|| StoreError::NotFound { id: id.to_string() })?
            .try_into()
    }

    async fn update_status(
        &self,
        id: &RequestId,
        status: Status,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE validator_requests SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, id, id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn save_key(&self, key: &ValidatorKey) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO validator_keys (id, request_id, key, fee_recipient, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key.id.to_string())
        .bind(key.request_id.to_string())
        .bind(&key.value)
        .bind(key.fee_recipient.as_str())
        .bind(key.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, key.id, key.request_id))?;
        Ok(())
    }

    async fn list_keys(&self, request_id: &RequestId) -> Result<Vec<String>, StoreError> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM validator_keys WHERE request_id = ? ORDER BY rowid",
        )
        .bind(request_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, request_id, request_id))?;
        Ok(keys)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
