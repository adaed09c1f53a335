//! Credential store service

use nervelle_auth::{SessionAuthenticator, hash_password};
use nervelle_db::{Database, NewUser, UpdateUser, User, UserRole};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::validation::{normalize_site_link, validate_password, validate_username};

/// Read-only projection of a user for the machine-readable lookup endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoView {
    pub username: String,
    pub site_link: Option<String>,
    pub is_admin: bool,
}

impl From<&User> for UserInfoView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            site_link: user.site_link.clone(),
            is_admin: user.is_admin(),
        }
    }
}

/// Admin edit of another account
///
/// An empty `site_link` clears the link. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub site_link: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// Self-service edit of the caller's own account
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub site_link: Option<String>,
    pub password: Option<String>,
}

/// User management backed by the `users` table
#[derive(Clone)]
pub struct UserService {
    db: Database,
    auth: SessionAuthenticator,
}

impl UserService {
    pub fn new(db: Database, auth: SessionAuthenticator) -> Self {
        Self { db, auth }
    }

    /// Create a standard (client) account
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        site_link: Option<&str>,
    ) -> Result<User, CoreError> {
        self.insert(username, password, site_link, UserRole::Client).await
    }

    /// Create an admin account
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<User, CoreError> {
        self.insert(username, password, None, UserRole::Admin).await
    }

    async fn insert(
        &self,
        username: &str,
        password: &str,
        site_link: Option<&str>,
        role: UserRole,
    ) -> Result<User, CoreError> {
        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;
        let site_link = site_link.map(normalize_site_link).transpose()?.flatten();

        debug!("Creating {} user: {}", role, username);

        let password_hash = hash_password(password)?;
        let user = self
            .db
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
                site_link,
            })
            .await?;

        info!("Created {} user: {}", user.role, user.username);
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64) -> Result<User, CoreError> {
        self.db
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User: {}", id)))
    }

    /// Apply an admin edit to any account
    ///
    /// Changing the role or the password revokes the user's sessions.
    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, CoreError> {
        debug!("Updating user: {}", id);

        let current = self.get_user(id).await?;

        let mut changes = UpdateUser {
            site_link: update
                .site_link
                .as_deref()
                .map(normalize_site_link)
                .transpose()?,
            ..Default::default()
        };

        if let Some(password) = &update.password {
            validate_password(password)?;
            changes.password_hash = Some(hash_password(password)?);
        }

        if let Some(role) = update.role
            && role != current.role
        {
            changes.role = Some(role);
        }

        let rotate = changes.role.is_some() || changes.password_hash.is_some();

        let Some(user) = self.db.update_user(id, changes).await? else {
            return Err(self
                .missing_or_last_admin(id, "Cannot remove the last admin account")
                .await);
        };

        if rotate {
            self.auth.revoke_user_sessions(id).await?;
        }

        info!("Updated user: {}", user.username);
        Ok(user)
    }

    /// Apply a self-service edit; the actor must be the target
    pub async fn update_profile(
        &self,
        actor: &User,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, CoreError> {
        if actor.id != id {
            warn!("User {} attempted to edit profile of user {}", actor.username, id);
            return Err(CoreError::Forbidden);
        }

        self.update_user(
            id,
            UserUpdate {
                site_link: update.site_link,
                password: update.password,
                role: None,
            },
        )
        .await
    }

    /// Permanently delete a user and their sessions
    pub async fn delete_user(&self, id: i64) -> Result<(), CoreError> {
        debug!("Deleting user: {}", id);

        let user = self.get_user(id).await?;

        if self.db.delete_user(id).await? {
            info!("Deleted user: {}", user.username);
            Ok(())
        } else {
            Err(self
                .missing_or_last_admin(id, "Cannot delete the last admin account")
                .await)
        }
    }

    /// List every standard (non-admin) user, ordered by username
    pub async fn list_non_admin_users(&self) -> Result<Vec<User>, CoreError> {
        Ok(self.db.list_users_by_role(UserRole::Client).await?)
    }

    /// Project the authenticated caller into a [`UserInfoView`]
    pub fn get_user_info(&self, principal: Option<&User>) -> Result<UserInfoView, CoreError> {
        principal
            .map(UserInfoView::from)
            .ok_or(CoreError::Unauthenticated)
    }

    /// Seed the first admin account if none exists
    ///
    /// Without a configured password nothing is created; there is no
    /// built-in default credential.
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: Option<&str>,
    ) -> Result<Option<User>, CoreError> {
        if self.db.has_admin().await? {
            debug!("Admin account present, skipping bootstrap");
            return Ok(None);
        }

        let Some(password) = password.filter(|p| !p.is_empty()) else {
            warn!(
                "No admin account exists and no bootstrap admin password is configured; \
                 set NERVELLE_ADMIN_PASSWORD to create one"
            );
            return Ok(None);
        };

        info!("Creating bootstrap admin user: {}", username);
        self.create_admin(username, password).await.map(Some)
    }

    /// Explain a write the store refused: the row is gone, or it is the
    /// last admin
    async fn missing_or_last_admin(&self, id: i64, reason: &str) -> CoreError {
        match self.db.get_user_by_id(id).await {
            Ok(Some(_)) => CoreError::InvalidInput(reason.to_string()),
            Ok(None) => CoreError::NotFound(format!("User: {}", id)),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nervelle_auth::{AuthError, JwtManager};
    use tempfile::TempDir;

    struct Harness {
        users: UserService,
        auth: SessionAuthenticator,
        _dir: TempDir,
    }

    async fn setup() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("core.db").display());
        let db = Database::new(&url).await.unwrap();
        let auth = SessionAuthenticator::new(
            db.clone(),
            JwtManager::new("test-secret-key-that-is-long-enough"),
            Duration::hours(1),
        )
        .unwrap();
        let users = UserService::new(db, auth.clone());
        users
            .ensure_bootstrap_admin("admin", Some("admin123"))
            .await
            .unwrap();
        Harness {
            users,
            auth,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_created_user_can_log_in() {
        let h = setup().await;
        let bob = h.users.create_user("bob", "pw1", None).await.unwrap();
        assert_eq!(bob.role, UserRole::Client);
        assert_ne!(bob.password_hash, "pw1");

        assert!(h.auth.login("bob", "pw1").await.is_ok());
        assert!(matches!(
            h.auth.login("bob", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let h = setup().await;
        h.users.create_user("bob", "pw1", None).await.unwrap();

        let err = h.users.create_user("bob", "other", None).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUsername(_)));

        let err = h.users.create_user("admin", "whatever", None).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let h = setup().await;
        assert!(matches!(
            h.users.create_user("", "pw1", None).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            h.users.create_user("   ", "pw1", None).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            h.users.create_user("bob", "", None).await,
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_and_rehash() {
        let h = setup().await;
        let bob = h
            .users
            .create_user("bob", "pw1", Some("https://bob.example"))
            .await
            .unwrap();
        let old_hash = bob.password_hash.clone();

        let updated = h
            .users
            .update_user(
                bob.id,
                UserUpdate {
                    password: Some("pw2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(updated.password_hash, old_hash);
        assert_eq!(updated.site_link.as_deref(), Some("https://bob.example"));
        assert!(h.auth.login("bob", "pw2").await.is_ok());
        assert!(h.auth.login("bob", "pw1").await.is_err());

        let updated = h
            .users
            .update_user(
                bob.id,
                UserUpdate {
                    site_link: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.site_link, None);

        assert!(matches!(
            h.users.update_user(9999, UserUpdate::default()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_password_change_revokes_sessions() {
        let h = setup().await;
        let bob = h.users.create_user("bob", "pw1", None).await.unwrap();
        let session = h.auth.login("bob", "pw1").await.unwrap();

        h.users
            .update_profile(
                &bob,
                bob.id,
                ProfileUpdate {
                    password: Some("pw2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(h.auth.current_principal(Some(&session.token)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_edit_requires_self() {
        let h = setup().await;
        let bob = h.users.create_user("bob", "pw1", None).await.unwrap();
        let carol = h.users.create_user("carol", "pw2", None).await.unwrap();

        let err = h
            .users
            .update_profile(
                &bob,
                carol.id,
                ProfileUpdate {
                    site_link: Some("https://evil.example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));

        let updated = h
            .users
            .update_profile(
                &bob,
                bob.id,
                ProfileUpdate {
                    site_link: Some("https://bob.example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.site_link.as_deref(), Some("https://bob.example"));
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let h = setup().await;
        let bob = h.users.create_user("bob", "pw1", None).await.unwrap();
        h.users.create_user("alice", "pw2", None).await.unwrap();

        let names: Vec<_> = h
            .users
            .list_non_admin_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);

        h.users.delete_user(bob.id).await.unwrap();
        assert!(matches!(
            h.users.delete_user(bob.id).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            h.auth.login("bob", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_last_admin_is_protected() {
        let h = setup().await;
        let admin = h.auth.login("admin", "admin123").await.unwrap().user;

        assert!(matches!(
            h.users.delete_user(admin.id).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            h.users
                .update_user(
                    admin.id,
                    UserUpdate {
                        role: Some(UserRole::Client),
                        ..Default::default()
                    },
                )
                .await,
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admin_edits_all_succeed() {
        let h = setup().await;
        let bob = h.users.create_user("bob", "pw1", None).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let users = h.users.clone();
                tokio::spawn(async move {
                    users
                        .update_user(
                            bob.id,
                            UserUpdate {
                                site_link: Some(format!("https://bob.example/{}", i)),
                                ..Default::default()
                            },
                        )
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let stored = h.users.get_user(bob.id).await.unwrap();
        assert!(stored.site_link.unwrap().starts_with("https://bob.example/"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_admins_removing_each_other_keep_one_admin() {
        let h = setup().await;
        let admin = h.auth.login("admin", "admin123").await.unwrap().user;
        let root = h.users.create_admin("root", "root-pw").await.unwrap();

        let (a, b) = (h.users.clone(), h.users.clone());
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.delete_user(root.id).await }),
            tokio::spawn(async move {
                b.update_user(
                    admin.id,
                    UserUpdate {
                        role: Some(UserRole::Client),
                        ..Default::default()
                    },
                )
                .await
            }),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(first.is_ok() != second.is_ok());
        let refused = if first.is_err() {
            first.err()
        } else {
            second.err()
        };
        assert!(matches!(refused, Some(CoreError::InvalidInput(_))));

        let admins = h.users.db.list_users_by_role(UserRole::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
    }

    #[tokio::test]
    async fn test_non_ascii_usernames_rejected() {
        let h = setup().await;
        for name in ["\u{0430}dmin", "\u{ff42}\u{ff4f}\u{ff42}", "b\u{f3}b"] {
            assert!(matches!(
                h.users.create_user(name, "pw1", None).await,
                Err(CoreError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_user_info_view() {
        let h = setup().await;
        let bob = h
            .users
            .create_user("bob", "pw1", Some("https://bob.example"))
            .await
            .unwrap();

        let view = h.users.get_user_info(Some(&bob)).unwrap();
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            serde_json::json!({
                "username": "bob",
                "siteLink": "https://bob.example",
                "isAdmin": false
            })
        );

        assert!(matches!(
            h.users.get_user_info(None),
            Err(CoreError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent_and_requires_password() {
        let h = setup().await;
        assert!(
            h.users
                .ensure_bootstrap_admin("admin", Some("admin123"))
                .await
                .unwrap()
                .is_none()
        );

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("empty.db").display());
        let db = Database::new(&url).await.unwrap();
        let auth = SessionAuthenticator::new(
            db.clone(),
            JwtManager::new("test-secret-key-that-is-long-enough"),
            Duration::hours(1),
        )
        .unwrap();
        let users = UserService::new(db, auth);
        assert!(users.ensure_bootstrap_admin("admin", None).await.unwrap().is_none());
        assert!(users.ensure_bootstrap_admin("admin", Some("")).await.unwrap().is_none());
    }
}
