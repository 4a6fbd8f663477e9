use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{SessionStore, StorageError, StoredSession, TOKEN_KEY, USER_KEY};
use tutorial_core::model::Session;

use super::SqliteRepository;

#[async_trait]
impl SessionStore for SqliteRepository {
    async fn read_entries(&self) -> Result<StoredSession, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT key, value
            FROM client_state
            WHERE key IN (?1, ?2)
            ",
        )
        .bind(TOKEN_KEY)
        .bind(USER_KEY)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let mut stored = StoredSession::default();
        for row in rows {
            let key: String = row
                .try_get("key")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let value: String = row
                .try_get("value")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            match key.as_str() {
                TOKEN_KEY => stored.token = Some(value),
                USER_KEY => stored.user_json = Some(value),
                _ => {}
            }
        }
        Ok(stored)
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let stored = StoredSession::encode(session)?;
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        for (key, value) in [(TOKEN_KEY, stored.token), (USER_KEY, stored.user_json)] {
            let Some(value) = value else { continue };
            sqlx::query(
                r"
                INSERT INTO client_state (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM client_state WHERE key IN (?1, ?2)")
            .bind(TOKEN_KEY)
            .bind(USER_KEY)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
