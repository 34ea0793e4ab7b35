//! Session repository.
//!
//! Sessions are append-only: one row per connection attempt, never updated
//! or deleted here. Expiry is evaluated when a row is read.

use crate::errors::VsError;
use crate::models::{SessionRecord, SessionStatus};
use crate::observability::metrics::{record_session_lookup, record_session_write};
use chrono::{DateTime, Utc};
use common::types::SessionId;
use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Row shape of the `sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    room_name: String,
    uid: String,
    metadata: String,
    created_at: DateTime<Utc>,
    expire_at: DateTime<Utc>,
    status: String,
    version: i32,
}

impl SessionRow {
    /// Convert into a record. Unparseable metadata reads as empty; an
    /// unknown status yields `None`.
    fn into_record(self) -> Option<SessionRecord> {
        let status = SessionStatus::parse(&self.status)?;
        let metadata = serde_json::from_str::<Map<String, Value>>(&self.metadata)
            .unwrap_or_default();

        Some(SessionRecord {
            session_id: SessionId(self.session_id),
            room_name: self.room_name,
            uid: self.uid,
            metadata,
            created_at: self.created_at,
            expire_at: self.expire_at,
            status,
            version: self.version,
        })
    }
}

/// Insert one session row on an open connection or transaction.
pub async fn insert_session(conn: &mut PgConnection, record: &SessionRecord) -> Result<(), VsError> {
    let metadata = serde_json::to_string(&record.metadata)
        .map_err(|e| VsError::SessionCreateFailed(format!("Failed to encode metadata: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO sessions
            (session_id, room_name, uid, metadata, created_at, expire_at, status, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(record.session_id.0)
    .bind(&record.room_name)
    .bind(&record.uid)
    .bind(metadata)
    .bind(record.created_at)
    .bind(record.expire_at)
    .bind(record.status.as_str())
    .bind(record.version)
    .execute(conn)
    .await
    .map_err(|e| VsError::SessionCreateFailed(format!("Failed to insert session: {}", e)))?;

    Ok(())
}

/// Create a session record atomically.
///
/// Begins a transaction, inserts, commits. Any failure drops the
/// transaction, which rolls it back, so no partial row is ever visible.
/// Several sessions may exist for the same room.
pub async fn create_session(
    pool: &PgPool,
    session_id: SessionId,
    room_name: &str,
    uid: &str,
    metadata: Map<String, Value>,
    ttl_seconds: u64,
) -> Result<SessionRecord, VsError> {
    let ttl = i64::try_from(ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| VsError::ValidationError("Session TTL out of range".to_string()))?;

    let created_at = Utc::now();
    let expire_at = created_at
        .checked_add_signed(ttl)
        .ok_or_else(|| VsError::ValidationError("Session TTL out of range".to_string()))?;
    let record = SessionRecord {
        session_id,
        room_name: room_name.to_string(),
        uid: uid.to_string(),
        metadata,
        created_at,
        expire_at,
        status: SessionStatus::Active,
        version: 1,
    };

    let result = write_in_transaction(pool, &record).await;
    record_session_write(if result.is_ok() { "success" } else { "error" });
    result.map(|()| record)
}

async fn write_in_transaction(pool: &PgPool, record: &SessionRecord) -> Result<(), VsError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| VsError::SessionCreateFailed(format!("Failed to start transaction: {}", e)))?;

    insert_session(&mut *tx, record).await?;

    tx.commit()
        .await
        .map_err(|e| VsError::SessionCreateFailed(format!("Failed to commit session: {}", e)))?;

    Ok(())
}

/// Latest session for `room_name` that is still valid at `now`.
///
/// An expired row reads as `None` even though it still exists.
pub async fn get_session_by_room_at(
    pool: &PgPool,
    room_name: &str,
    now: DateTime<Utc>,
) -> Result<Option<SessionRecord>, VsError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT
            session_id, room_name, uid, metadata, created_at, expire_at, status, version
        FROM sessions
        WHERE room_name = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(room_name)
    .fetch_optional(pool)
    .await
    .map_err(|e| VsError::SessionLookupFailed(format!("Failed to fetch session by room: {}", e)));

    let row = match row {
        Ok(row) => row,
        Err(e) => {
            record_session_lookup("error");
            return Err(e);
        }
    };

    let record = row
        .and_then(SessionRow::into_record)
        .filter(|record| record.is_valid_at(now));

    record_session_lookup(if record.is_some() { "found" } else { "not_found" });
    Ok(record)
}

/// Latest session for `room_name` that is still valid now.
pub async fn get_session_by_room(
    pool: &PgPool,
    room_name: &str,
) -> Result<Option<SessionRecord>, VsError> {
    get_session_by_room_at(pool, room_name, Utc::now()).await
}
