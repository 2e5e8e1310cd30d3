use crate::SqliteLockState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sesame_core::{
    Error, UserId, error::StorageError, lockout::LockState,
    repositories::AccountLockRepository,
};
use sqlx::SqlitePool;

/// Lock state and lockout counters, one row per user. Rows are created
/// lazily; a missing row reads back as the default unlocked state.
pub struct SqliteAccountLockRepository {
    pool: SqlitePool,
}

impl SqliteAccountLockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_row(&self, user_id: &UserId) -> Result<(), Error> {
        sqlx::query("INSERT INTO account_locks (user_id) VALUES (?1) ON CONFLICT(user_id) DO NOTHING")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}

#[async_trait]
impl AccountLockRepository for SqliteAccountLockRepository {
    async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error> {
        let state = sqlx::query_as::<_, SqliteLockState>(
            r#"
            SELECT locked, locked_reason, locked_at, disabled, disabled_reason,
                   bad_attempts, request_count
            FROM account_locks WHERE user_id = ?1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(state.map(|s| s.into()).unwrap_or_default())
    }

    async fn set_locked(
        &self,
        user_id: &UserId,
        reason: Option<&str>,
        locked_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO account_locks (user_id, locked, locked_reason, locked_at)
            VALUES (?1, 1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET locked = 1, locked_reason = ?2, locked_at = ?3
            "#,
        )
        .bind(user_id.as_str())
        .bind(reason)
        .bind(locked_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }

    async fn clear_lock(&self, user_id: &UserId) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE account_locks SET locked = 0, locked_reason = NULL, locked_at = NULL
            WHERE user_id = ?1 AND locked = 1
            "#,
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_disabled(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO account_locks (user_id, disabled, disabled_reason)
            VALUES (?1, 1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET disabled = 1, disabled_reason = ?2
            "#,
        )
        .bind(user_id.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }

    async fn clear_disabled(&self, user_id: &UserId) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE account_locks SET disabled = 0, disabled_reason = NULL
            WHERE user_id = ?1 AND disabled = 1
            "#,
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_bad_attempt(
        &self,
        user_id: &UserId,
        attempt_token: &str,
    ) -> Result<Option<u32>, Error> {
        self.ensure_row(user_id).await?;

        // The token guard makes a duplicate report a no-op
        let attempts: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE account_locks
            SET bad_attempts = bad_attempts + 1, last_attempt_token = ?2
            WHERE user_id = ?1
              AND (last_attempt_token IS NULL OR last_attempt_token <> ?2)
            RETURNING bad_attempts
            "#,
        )
        .bind(user_id.as_str())
        .bind(attempt_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(attempts.map(|(a,)| a as u32))
    }

    async fn reset_bad_attempts(&self, user_id: &UserId) -> Result<(), Error> {
        sqlx::query(
            "UPDATE account_locks SET bad_attempts = 0, last_attempt_token = NULL WHERE user_id = ?1",
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }

    async fn increment_request_count_if_below(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Option<u32>, Error> {
        self.ensure_row(user_id).await?;

        // Check and increment in one statement so concurrent issuers
        // cannot push the counter past the limit
        let count: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE account_locks SET request_count = request_count + 1
            WHERE user_id = ?1 AND request_count < ?2
            RETURNING request_count
            "#,
        )
        .bind(user_id.as_str())
        .bind(limit as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(count.map(|(c,)| c as u32))
    }

    async fn reset_request_count(&self, user_id: &UserId) -> Result<(), Error> {
        sqlx::query("UPDATE account_locks SET request_count = 0 WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::migrate;

    async fn setup_repo() -> SqliteAccountLockRepository {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        migrate(&pool).await.expect("Failed to run migrations");
        SqliteAccountLockRepository::new(pool)
    }

    #[tokio::test]
    async fn test_missing_row_reads_as_default() {
        let repo = setup_repo().await;
        let state = repo.lock_state(&UserId::new_random()).await.unwrap();
        assert!(!state.locked);
        assert!(!state.disabled);
        assert_eq!(state.bad_attempts, 0);
        assert_eq!(state.request_count, 0);
    }

    #[tokio::test]
    async fn test_lock_and_clear_round_trip() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();
        let locked_at = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap();

        repo.set_locked(&user_id, Some("too many attempts"), locked_at)
            .await
            .unwrap();

        let state = repo.lock_state(&user_id).await.unwrap();
        assert!(state.locked);
        assert_eq!(state.locked_reason.as_deref(), Some("too many attempts"));
        assert_eq!(state.locked_at, Some(locked_at));

        // Only the first clear wins
        assert!(repo.clear_lock(&user_id).await.unwrap());
        assert!(!repo.clear_lock(&user_id).await.unwrap());

        let state = repo.lock_state(&user_id).await.unwrap();
        assert!(!state.locked);
        assert!(state.locked_reason.is_none());
        assert!(state.locked_at.is_none());
    }

    #[tokio::test]
    async fn test_disabled_is_independent_of_locked() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();

        repo.set_disabled(&user_id, Some("abuse")).await.unwrap();
        repo.set_locked(&user_id, None, Utc::now()).await.unwrap();

        repo.clear_lock(&user_id).await.unwrap();
        let state = repo.lock_state(&user_id).await.unwrap();
        assert!(state.disabled);
        assert_eq!(state.disabled_reason.as_deref(), Some("abuse"));

        assert!(repo.clear_disabled(&user_id).await.unwrap());
        assert!(!repo.clear_disabled(&user_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_attempts_deduplicate_by_token() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();

        assert_eq!(
            repo.record_bad_attempt(&user_id, "token-a").await.unwrap(),
            Some(1)
        );
        assert_eq!(
            repo.record_bad_attempt(&user_id, "token-a").await.unwrap(),
            None
        );
        assert_eq!(
            repo.record_bad_attempt(&user_id, "token-b").await.unwrap(),
            Some(2)
        );

        repo.reset_bad_attempts(&user_id).await.unwrap();
        assert_eq!(repo.lock_state(&user_id).await.unwrap().bad_attempts, 0);

        // The token guard resets along with the counter
        assert_eq!(
            repo.record_bad_attempt(&user_id, "token-b").await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_request_count_stops_at_limit_and_resets() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();

        assert_eq!(
            repo.increment_request_count_if_below(&user_id, 2)
                .await
                .unwrap(),
            Some(1)
        );
        assert_eq!(
            repo.increment_request_count_if_below(&user_id, 2)
                .await
                .unwrap(),
            Some(2)
        );

        // At the limit the counter stays where it is
        assert_eq!(
            repo.increment_request_count_if_below(&user_id, 2)
                .await
                .unwrap(),
            None
        );
        assert_eq!(repo.lock_state(&user_id).await.unwrap().request_count, 2);

        repo.reset_request_count(&user_id).await.unwrap();
        assert_eq!(repo.lock_state(&user_id).await.unwrap().request_count, 0);
        assert_eq!(
            repo.increment_request_count_if_below(&user_id, 2)
                .await
                .unwrap(),
            Some(1)
        );
    }
}
