//! User operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, UpdateUser, User, UserRole};
use crate::repository::Database;

const USER_COLUMNS: &str = "id, username, password_hash, role, site_link, created_at, updated_at";

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    ///
    /// A concurrent insert of the same username loses on the UNIQUE
    /// constraint and is reported as `Duplicate`, same as the pre-check.
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();

        let existing = self.get_user_by_username(&user.username).await?;
        if existing.is_some() {
            return Err(DbError::Duplicate(format!("User '{}' already exists", user.username)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, site_link, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.site_link)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_insert(e, || format!("User '{}' already exists", user.username))
        })?;

        let id: i64 = result.get("id");

        Ok(User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            site_link: user.site_link,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user by username (exact, case-sensitive match)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List users holding the given role
    pub async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY username"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Apply a partial update, returning the updated user
    ///
    /// Runs as one statement, so concurrent edits serialize on SQLite's
    /// write lock. Returns `None` when the user is absent or when the edit
    /// would demote the last remaining admin.
    pub async fn update_user(&self, id: i64, update: UpdateUser) -> Result<Option<User>, DbError> {
        if update.is_empty() {
            return self.get_user_by_id(id).await;
        }

        let new_role = update.role.map(|r| r.as_str());
        let clear_or_set_link = update.site_link.is_some();

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role),
                site_link = CASE WHEN ? THEN ? ELSE site_link END,
                updated_at = ?
            WHERE id = ?
              AND (? IS NULL OR ? = ? OR role != ?
                   OR (SELECT COUNT(*) FROM users WHERE role = ?) > 1)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(update.password_hash)
        .bind(new_role)
        .bind(clear_or_set_link)
        .bind(update.site_link.flatten())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(new_role)
        .bind(new_role)
        .bind(UserRole::Admin.as_str())
        .bind(UserRole::Admin.as_str())
        .bind(UserRole::Admin.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Delete a user together with their sessions
    ///
    /// The last remaining admin is never deleted; that case, like an absent
    /// user, returns `false`.
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = ?
              AND (role != ? OR (SELECT COUNT(*) FROM users WHERE role = ?) > 1)
            "#,
        )
        .bind(id)
        .bind(UserRole::Admin.as_str())
        .bind(UserRole::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Check if any admin account exists
    pub async fn has_admin(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users WHERE role = ?")
            .bind(UserRole::Admin.as_str())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
