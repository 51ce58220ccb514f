use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration as ChronoDuration, Utc};
use domain::User;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const SESSION_TOKEN_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username is not a valid email address")]
    InvalidUsername,
    #[error("username already taken")]
    UsernameTaken,
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(stored_hash: &str, password: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| AuthError::Internal(format!("invalid stored password hash: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Minimal email shape check for usernames: one `@` with a non-empty local
/// part and a dotted domain.
pub fn validate_username(username: &str) -> bool {
    let Some((local, domain)) = username.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub async fn create_user(pool: &PgPool, username: &str, password: &str) -> AuthResult<User> {
    if !validate_username(username) {
        return Err(AuthError::InvalidUsername);
    }
    let password_hash = hash_password(password)?;
    let id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO crypto_user (id, username, password_hash) VALUES ($1, $2, $3)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(id)
    .bind(username)
    .bind(&password_hash)
    .execute(pool)
    .await
    .map_err(|err| AuthError::Internal(format!("failed to insert user: {err}")))?;

    if result.rows_affected() == 0 {
        return Err(AuthError::UsernameTaken);
    }

    Ok(User {
        id,
        username: username.to_string(),
    })
}

/// Issues and resolves opaque session tokens.
///
/// Tokens live in an HttpOnly cookie on the client; only the sha256 of a
/// token is persisted, so a leaked sessions table cannot be replayed.
/// Constructed once at startup and shared through application state.
#[derive(Clone)]
pub struct SessionManager {
    pool: PgPool,
    ttl: ChronoDuration,
}

impl SessionManager {
    pub fn new(pool: PgPool, ttl: ChronoDuration) -> Self {
        Self { pool, ttl }
    }

    /// Verifies credentials and opens a session, returning the cookie token.
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<(User, String)> {
        let row = sqlx::query("SELECT id, password_hash FROM crypto_user WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to load user: {err}")))?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        let user_id: Uuid = row
            .try_get("id")
            .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|err| AuthError::Internal(format!("invalid user row: {err}")))?;

        if !verify_password(&password_hash, password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_token();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(now)
        .bind(now + self.ttl)
        .execute(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to persist session: {err}")))?;

        debug!(%user_id, "session opened");

        Ok((
            User {
                id: user_id,
                username: username.to_string(),
            },
            token,
        ))
    }

    /// Resolves a cookie token to its user; `None` for unknown, expired, or
    /// revoked sessions.
    pub async fn resolve(&self, token: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT u.id, u.username
             FROM sessions s
             JOIN crypto_user u ON u.id = s.user_id
             WHERE s.token_hash = $1 AND s.expires_at > NOW()",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AuthError::Internal(format!("failed to load session: {err}")))?;

        row.map(|row| {
            Ok(User {
                id: row
                    .try_get("id")
                    .map_err(|err| AuthError::Internal(format!("invalid session row: {err}")))?,
                username: row
                    .try_get("username")
                    .map_err(|err| AuthError::Internal(format!("invalid session row: {err}")))?,
            })
        })
        .transpose()
    }

    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to delete session: {err}")))?;
        Ok(())
    }

    /// Drops expired session rows. Safe to call from a periodic task.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|err| AuthError::Internal(format!("failed to purge sessions: {err}")))?;
        Ok(result.rows_affected())
    }
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password(&hash, "hunter2").unwrap());
        assert!(!verify_password(&hash, "hunter3").unwrap());
    }

    #[test]
    fn username_must_look_like_email() {
        assert!(validate_username("user@example.com"));
        assert!(!validate_username("user"));
        assert!(!validate_username("@example.com"));
        assert!(!validate_username("user@"));
        assert!(!validate_username("user@nodot"));
        assert!(!validate_username("user@.com"));
    }

    #[test]
    fn tokens_are_unique_and_hash_deterministically() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), SESSION_TOKEN_LEN);
        assert_ne!(a, b);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), hash_token(&b));
    }
}
