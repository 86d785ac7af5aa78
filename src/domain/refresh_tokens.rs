//! Usage: Persistence of "the current refresh token" (one row for the whole deployment).

use crate::infra::db::Db;
use crate::shared::error::{db_err, AppResult};
use crate::shared::time::now_unix_seconds;
use rusqlite::{params, Connection, OptionalExtension};

/// The only row id the table accepts.
const SINGLETON_ID: i64 = 1;

/// Single-row refresh token storage.
///
/// Writers race last-write-wins; there is no per-user identity.
pub trait RefreshTokenStore: Send + Sync {
    /// Returns the stored refresh token, if any.
    fn load(&self) -> AppResult<Option<String>>;

    /// Replaces the stored refresh token.
    fn upsert(&self, refresh_token: &str) -> AppResult<()>;
}

pub(crate) fn load_refresh_token(conn: &Connection) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT refresh_token FROM refresh_tokens WHERE id = ?1",
        params![SINGLETON_ID],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|e| db_err!("failed to read refresh token: {e}"))
}

pub(crate) fn upsert_refresh_token(conn: &Connection, refresh_token: &str) -> AppResult<()> {
    let refresh_token = refresh_token.trim();
    if refresh_token.is_empty() {
        return Err("SEC_INVALID_INPUT: refresh_token is empty".into());
    }

    conn.execute(
        r#"
INSERT INTO refresh_tokens(id, refresh_token, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET
  refresh_token = excluded.refresh_token,
  updated_at = excluded.updated_at
"#,
        params![SINGLETON_ID, refresh_token, now_unix_seconds()],
    )
    .map_err(|e| db_err!("failed to upsert refresh token: {e}"))?;
    Ok(())
}

/// SQLite-backed store; one pooled connection per call.
#[derive(Clone)]
pub(crate) struct SqliteRefreshTokenStore {
    db: Db,
}

impl SqliteRefreshTokenStore {
    pub(crate) fn new(db: Db) -> Self {
        Self { db }
    }
}

impl RefreshTokenStore for SqliteRefreshTokenStore {
    fn load(&self) -> AppResult<Option<String>> {
        let conn = self.db.open_connection()?;
        load_refresh_token(&conn)
    }

    fn upsert(&self, refresh_token: &str) -> AppResult<()> {
        let conn = self.db.open_connection()?;
        upsert_refresh_token(&conn, refresh_token)
    }
}
