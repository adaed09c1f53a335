//! Session authenticator
//!
//! Binds a signed token to a server-side session row. A token only
//! resolves to a principal while its signature and expiry are valid, the
//! session row still exists and has not expired, the user still exists,
//! and the user's role is the one the session was issued for.

use chrono::{DateTime, Duration, Utc};
use nervelle_db::{Database, NewSession, User, UserRole};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::jwt::JwtManager;
use crate::password::{hash_password, verify_password};

/// Maximum accepted password length, on login and when setting one
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Token handed to the client after a successful login
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    /// The authenticated user
    pub user: User,
}

#[derive(Clone)]
pub struct SessionAuthenticator {
    db: Database,
    jwt: Arc<JwtManager>,
    session_ttl: Duration,
    /// Verified against when the username is unknown, so both failure
    /// paths cost one argon2 verification
    dummy_hash: Arc<str>,
}

impl SessionAuthenticator {
    pub fn new(db: Database, jwt: JwtManager, session_ttl: Duration) -> Result<Self, AuthError> {
        let dummy_hash = hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            db,
            jwt: Arc::new(jwt),
            session_ttl,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Authenticate a username/password pair and open a session
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionToken, AuthError> {
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Login attempt for user: {}", username);

        let user = self.db.get_user_by_username(username).await?;
        let hash_to_verify = match &user {
            Some(u) => u.password_hash.as_str(),
            None => &*self.dummy_hash,
        };

        let password_valid = verify_password(password, hash_to_verify)?;

        let user = match (user, password_valid) {
            (Some(u), true) => u,
            _ => {
                info!("Failed login for user {}", username);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.issue_session(user).await?;
        info!("User {} logged in successfully", token.user.username);
        Ok(token)
    }

    /// Open a new session for an already-verified user
    pub async fn issue_session(&self, user: User) -> Result<SessionToken, AuthError> {
        let session_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;

        self.db
            .create_session(NewSession {
                id: session_id.clone(),
                user_id: user.id,
                role: user.role,
                expires_at,
            })
            .await?;

        let token = self.jwt.generate_token(
            user.id,
            &session_id,
            &user.username,
            user.role.as_str(),
            expires_at,
        )?;

        Ok(SessionToken {
            token,
            session_id,
            expires_at,
            user,
        })
    }

    /// End the session behind a token
    ///
    /// Absent, malformed or already-ended sessions are a no-op.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = token else {
            return Ok(());
        };

        let claims = match self.jwt.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Logout with unusable token: {}", e);
                return Ok(());
            }
        };

        if self.db.delete_session(&claims.sid).await? {
            info!("User {} logged out", claims.username);
        }
        Ok(())
    }

    /// Resolve a token to the user it is bound to
    pub async fn current_principal(&self, token: Option<&str>) -> Result<Option<User>, AuthError> {
        let Some(token) = token else {
            return Ok(None);
        };

        let claims = match self.jwt.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return Ok(None);
            }
        };
        let Ok(user_id) = claims.user_id() else {
            return Ok(None);
        };

        let Some(session) = self.db.get_session(&claims.sid).await? else {
            return Ok(None);
        };
        if session.user_id != user_id || session.is_expired() {
            return Ok(None);
        }

        let Some(user) = self.db.get_user_by_id(user_id).await? else {
            return Ok(None);
        };
        if user.role != session.role {
            warn!(
                "Session {} for {} issued as {} but user is now {}",
                session.id, user.username, session.role, user.role
            );
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Resolve a token and require the principal to hold `role`
    pub async fn require_role(&self, token: Option<&str>, role: UserRole) -> Result<User, AuthError> {
        let user = self
            .current_principal(token)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if user.role != role {
            debug!(
                "User {} ({}) denied access requiring {}",
                user.username, user.role, role
            );
            return Err(AuthError::Forbidden);
        }

        Ok(user)
    }

    /// Revoke every session held by a user
    pub async fn revoke_user_sessions(&self, user_id: i64) -> Result<u64, AuthError> {
        let revoked = self.db.delete_sessions_for_user(user_id).await?;
        if revoked > 0 {
            info!("Revoked {} session(s) for user {}", revoked, user_id);
        }
        Ok(revoked)
    }

    /// Remove expired session rows
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        Ok(self.db.delete_expired_sessions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nervelle_db::{NewUser, UpdateUser};
    use tempfile::TempDir;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    async fn setup() -> (SessionAuthenticator, Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("auth.db").display());
        let db = Database::new(&url).await.unwrap();
        let auth =
            SessionAuthenticator::new(db.clone(), JwtManager::new(SECRET), Duration::hours(1))
                .unwrap();
        (auth, db, dir)
    }

    async fn add_user(db: &Database, username: &str, password: &str, role: UserRole) -> User {
        db.insert_user(NewUser {
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            role,
            site_link: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let (auth, db, _dir) = setup().await;
        add_user(&db, "bob", "pw1", UserRole::Client).await;

        let session = auth.login("bob", "pw1").await.unwrap();
        assert_eq!(session.user.username, "bob");

        let principal = auth.current_principal(Some(&session.token)).await.unwrap();
        assert_eq!(principal.unwrap().username, "bob");

        assert!(matches!(
            auth.login("bob", "pw2").await,
            Err(AuthError::InvalidCredentials)
        ));
        // Unknown users fail the same way
        assert!(matches!(
            auth.login("nobody", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
        // Usernames are case-sensitive
        assert!(matches!(
            auth.login("Bob", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (auth, db, _dir) = setup().await;
        add_user(&db, "bob", "pw1", UserRole::Client).await;
        let session = auth.login("bob", "pw1").await.unwrap();

        auth.logout(Some(&session.token)).await.unwrap();
        assert!(auth.current_principal(Some(&session.token)).await.unwrap().is_none());

        auth.logout(Some(&session.token)).await.unwrap();
        assert!(auth.current_principal(Some(&session.token)).await.unwrap().is_none());

        auth.logout(None).await.unwrap();
        auth.logout(Some("garbage")).await.unwrap();
    }

    #[tokio::test]
    async fn test_require_role() {
        let (auth, db, _dir) = setup().await;
        add_user(&db, "admin", "admin123", UserRole::Admin).await;
        add_user(&db, "bob", "pw1", UserRole::Client).await;

        let admin = auth.login("admin", "admin123").await.unwrap();
        let bob = auth.login("bob", "pw1").await.unwrap();

        assert!(auth.require_role(Some(&admin.token), UserRole::Admin).await.is_ok());
        assert!(matches!(
            auth.require_role(Some(&bob.token), UserRole::Admin).await,
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            auth.require_role(None, UserRole::Admin).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_deleted_user_loses_session() {
        let (auth, db, _dir) = setup().await;
        let bob = add_user(&db, "bob", "pw1", UserRole::Client).await;
        let session = auth.login("bob", "pw1").await.unwrap();

        db.delete_user(bob.id).await.unwrap();

        assert!(auth.current_principal(Some(&session.token)).await.unwrap().is_none());
        assert!(matches!(
            auth.login("bob", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_role_change_invalidates_session() {
        let (auth, db, _dir) = setup().await;
        let bob = add_user(&db, "bob", "pw1", UserRole::Client).await;
        let session = auth.login("bob", "pw1").await.unwrap();

        db.update_user(
            bob.id,
            UpdateUser {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(auth.current_principal(Some(&session.token)).await.unwrap().is_none());
        let fresh = auth.login("bob", "pw1").await.unwrap();
        assert!(auth.require_role(Some(&fresh.token), UserRole::Admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("auth.db").display());
        let db = Database::new(&url).await.unwrap();
        let auth =
            SessionAuthenticator::new(db.clone(), JwtManager::new(SECRET), Duration::hours(-2))
                .unwrap();
        add_user(&db, "bob", "pw1", UserRole::Client).await;

        let session = auth.login("bob", "pw1").await.unwrap();
        assert!(auth.current_principal(Some(&session.token)).await.unwrap().is_none());
        assert_eq!(auth.purge_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_revoke_user_sessions() {
        let (auth, db, _dir) = setup().await;
        let bob = add_user(&db, "bob", "pw1", UserRole::Client).await;
        let first = auth.login("bob", "pw1").await.unwrap();
        let second = auth.login("bob", "pw1").await.unwrap();

        assert_eq!(auth.revoke_user_sessions(bob.id).await.unwrap(), 2);
        assert!(auth.current_principal(Some(&first.token)).await.unwrap().is_none());
        assert!(auth.current_principal(Some(&second.token)).await.unwrap().is_none());
    }
}
