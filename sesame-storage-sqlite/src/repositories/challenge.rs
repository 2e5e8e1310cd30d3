use crate::SqliteOtpChallenge;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sesame_core::{
    Error, OtpChallenge, UserId, error::StorageError, repositories::ChallengeRepository,
};
use sqlx::SqlitePool;

/// One challenge row per user. The conditional updates carry their guards
/// in the `WHERE` clause, so each is atomic on the database side.
pub struct SqliteChallengeRepository {
    pool: SqlitePool,
}

impl SqliteChallengeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeRepository for SqliteChallengeRepository {
    async fn upsert(
        &self,
        user_id: &UserId,
        code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, Error> {
        let challenge = sqlx::query_as::<_, SqliteOtpChallenge>(
            r#"
            INSERT INTO otp_challenges (user_id, code, tries, created_at, status)
            VALUES (?1, ?2, 0, ?3, 1)
            ON CONFLICT(user_id) DO UPDATE SET code = ?2, tries = 0, created_at = ?3, status = 1
            RETURNING *
            "#,
        )
        .bind(user_id.as_str())
        .bind(code)
        .bind(created_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(challenge.into())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<OtpChallenge>, Error> {
        let challenge = sqlx::query_as::<_, SqliteOtpChallenge>(
            "SELECT * FROM otp_challenges WHERE user_id = ?1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(challenge.map(|c| c.into()))
    }

    async fn record_failed_try(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
        let tries: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE otp_challenges SET tries = tries + 1
            WHERE user_id = ?1 AND status = 1
            RETURNING tries
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(tries.map(|(t,)| t as u32))
    }

    async fn reset_tries(&self, user_id: &UserId) -> Result<(), Error> {
        sqlx::query("UPDATE otp_challenges SET tries = 0 WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }

    async fn consume_active(&self, user_id: &UserId, code: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE otp_challenges SET status = 0 WHERE user_id = ?1 AND status = 1 AND code = ?2",
        )
        .bind(user_id.as_str())
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_if_created_at(
        &self,
        user_id: &UserId,
        observed_created_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE otp_challenges SET status = 0
            WHERE user_id = ?1 AND status = 1 AND created_at = ?2
            "#,
        )
        .bind(user_id.as_str())
        .bind(observed_created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() == 1)
    }

    async fn deactivate(&self, user_id: &UserId) -> Result<bool, Error> {
        let result =
            sqlx::query("UPDATE otp_challenges SET status = 0 WHERE user_id = ?1 AND status = 1")
                .bind(user_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_active(&self) -> Result<Vec<OtpChallenge>, Error> {
        let challenges =
            sqlx::query_as::<_, SqliteOtpChallenge>("SELECT * FROM otp_challenges WHERE status = 1")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(challenges.into_iter().map(|c| c.into()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::migrate;
    use chrono::Duration;

    async fn setup_repo() -> SqliteChallengeRepository {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        migrate(&pool).await.expect("Failed to run migrations");
        SqliteChallengeRepository::new(pool)
    }

    fn now() -> DateTime<Utc> {
        // Stored at second precision
        DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();
        let t0 = now();

        repo.upsert(&user_id, "111111", t0).await.unwrap();
        repo.record_failed_try(&user_id).await.unwrap();

        let replaced = repo.upsert(&user_id, "222222", t0).await.unwrap();
        assert_eq!(replaced.code, "222222");
        assert_eq!(replaced.tries, 0);
        assert!(replaced.active);

        // Still a single row
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_consume_active_is_single_use() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();

        repo.upsert(&user_id, "123456", now()).await.unwrap();

        assert!(!repo.consume_active(&user_id, "654321").await.unwrap());
        assert!(repo.consume_active(&user_id, "123456").await.unwrap());
        assert!(!repo.consume_active(&user_id, "123456").await.unwrap());

        let challenge = repo.get(&user_id).await.unwrap().unwrap();
        assert!(!challenge.active);
    }

    #[tokio::test]
    async fn test_record_failed_try_only_counts_active() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();

        assert_eq!(repo.record_failed_try(&user_id).await.unwrap(), None);

        repo.upsert(&user_id, "123456", now()).await.unwrap();
        assert_eq!(repo.record_failed_try(&user_id).await.unwrap(), Some(1));
        assert_eq!(repo.record_failed_try(&user_id).await.unwrap(), Some(2));

        repo.deactivate(&user_id).await.unwrap();
        assert_eq!(repo.record_failed_try(&user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_if_created_at_respects_reissue() {
        let repo = setup_repo().await;
        let user_id = UserId::new_random();
        let t0 = now();

        repo.upsert(&user_id, "111111", t0).await.unwrap();

        // Re-issue before the sweep gets to the row
        let t1 = t0 + Duration::seconds(30);
        repo.upsert(&user_id, "222222", t1).await.unwrap();

        // The sweep still holds the old timestamp and loses
        assert!(!repo.expire_if_created_at(&user_id, t0).await.unwrap());
        assert!(repo.get(&user_id).await.unwrap().unwrap().active);

        // With the current timestamp it wins exactly once
        assert!(repo.expire_if_created_at(&user_id, t1).await.unwrap());
        assert!(!repo.expire_if_created_at(&user_id, t1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_active_excludes_consumed() {
        let repo = setup_repo().await;
        let active = UserId::new_random();
        let consumed = UserId::new_random();

        repo.upsert(&active, "111111", now()).await.unwrap();
        repo.upsert(&consumed, "222222", now()).await.unwrap();
        repo.consume_active(&consumed, "222222").await.unwrap();

        let listed = repo.list_active().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, active);
    }
}
