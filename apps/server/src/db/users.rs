//! Credential store: user identity, password digests, role and flags.

use sqlx::PgPool;

use crate::error::{is_unique_violation, Error};
use crate::models::{Role, User, UserCredentials};
use crate::Result;

const PUBLIC_COLUMNS: &str =
    "id, email, role, first_name, last_name, is_verified, is_active, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. The digest is produced by the caller; plaintext
    /// never reaches this layer.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        first_name: &str,
        last_name: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PUBLIC_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("User with this email already exists".to_string())
            } else {
                Error::store("create user", e)
            }
        })
    }

    /// Full credential row for the login path. Email matching is exact and
    /// case-sensitive.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash, role, first_name, last_name, \
             is_verified, is_active, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find user by email", e))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("find user by id", e))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store("check email existence", e))
    }
}
