//! Login session operations

use chrono::Utc;

use crate::error::DbError;
use crate::models::{NewSession, Session};

use super::Database;

impl Database {
    /// Create a new login session
    pub async fn create_session(&self, session: NewSession) -> Result<Session, DbError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, role, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.role.as_str())
        .bind(now.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Session {
            id: session.id,
            user_id: session.user_id,
            role: session.role,
            created_at: now,
            expires_at: session.expires_at,
        })
    }

    /// Get a session by ID
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, role, created_at, expires_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Session::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Delete a session
    pub async fn delete_session(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session belonging to a user
    pub async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions whose expiry has passed
    pub async fn delete_expired_sessions(&self) -> Result<u64, DbError> {
        // RFC3339 strings in UTC sort chronologically
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{NewUser, UserRole};
    use crate::repository::test_support::test_db;

    async fn insert_user(db: &Database, username: &str) -> i64 {
        db.insert_user(NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Client,
            site_link: None,
        })
        .await
        .unwrap()
        .id
    }

    fn new_session(id: &str, user_id: i64, ttl: Duration) -> NewSession {
        NewSession {
            id: id.to_string(),
            user_id,
            role: UserRole::Client,
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (db, _dir) = test_db().await;
        let user_id = insert_user(&db, "bob").await;

        db.create_session(new_session("s1", user_id, Duration::hours(1)))
            .await
            .unwrap();

        let session = db.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.user_id, user_id);
        assert!(!session.is_expired());

        assert!(db.delete_session("s1").await.unwrap());
        assert!(!db.delete_session("s1").await.unwrap());
        assert!(db.get_session("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_deletion_removes_sessions() {
        let (db, _dir) = test_db().await;
        let user_id = insert_user(&db, "bob").await;

        db.create_session(new_session("s1", user_id, Duration::hours(1)))
            .await
            .unwrap();
        db.create_session(new_session("s2", user_id, Duration::hours(1)))
            .await
            .unwrap();

        assert!(db.delete_user(user_id).await.unwrap());
        assert!(db.get_session("s1").await.unwrap().is_none());
        assert!(db.get_session("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_purge() {
        let (db, _dir) = test_db().await;
        let user_id = insert_user(&db, "bob").await;

        db.create_session(new_session("old", user_id, Duration::seconds(-5)))
            .await
            .unwrap();
        db.create_session(new_session("fresh", user_id, Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(db.delete_expired_sessions().await.unwrap(), 1);
        assert!(db.get_session("old").await.unwrap().is_none());
        assert!(db.get_session("fresh").await.unwrap().is_some());

        assert_eq!(db.delete_sessions_for_user(user_id).await.unwrap(), 1);
    }
}
