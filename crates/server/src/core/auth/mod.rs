//! Authentication Module
//!
//! Credential store (users table), password hashing and token issuance.
//! Passwords are bcrypt-hashed on the blocking pool.

pub mod handlers;
pub mod middleware;
pub mod token;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::db::Database;
use crate::core::validate::is_plausible_email;
use token::{Claims, TokenError, TokenService};

pub const MIN_PASSWORD_LEN: usize = 6;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    fn from_db(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// User record stored in database
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public user info (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::from_db(&row.role),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Same variant for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Invalid(String),
    #[error("User already exists with this email")]
    EmailTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Normalized registration input.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(name: &str, email: &str, password: &str, role: Role) -> Result<Self, AuthError> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() {
            return Err(AuthError::Invalid("Please add a name".to_string()));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::Invalid("Please add a valid email".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Invalid(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(Self {
            name: name.to_string(),
            email,
            password: password.to_string(),
            role,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Auth manager handles all authentication
pub struct AuthManager {
    db: Arc<Database>,
    tokens: TokenService,
    bcrypt_cost: u32,
    /// Verified against when the email is unknown so both login failures
    /// cost the same.
    dummy_hash: String,
}

impl AuthManager {
    pub async fn new(db: Arc<Database>, tokens: TokenService, bcrypt_cost: u32) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("not-a-real-password".to_string(), bcrypt_cost).await?;
        Ok(Self {
            db,
            tokens,
            bcrypt_cost,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user
    pub async fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        let pool = self.db.pool().await?;
        let password_hash = hash_password(new_user.password, self.bcrypt_cost).await?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new_user.name,
            email: new_user.email,
            password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };

        // The UNIQUE index on email settles concurrent registrations.
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AuthError::EmailTaken,
            _ => AuthError::Database(e),
        })?;

        info!("[Auth] User registered: {} ({})", user.name, user.email);

        Ok(user)
    }

    /// Check credentials and issue a token
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let pool = self.db.pool().await?;
        let email = normalize_email(email);

        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

        let Some(user) = row.map(User::from) else {
            verify_password(password.to_string(), self.dummy_hash.clone()).await?;
            warn!("[Auth] Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!("[Auth] Failed login attempt for {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id, user.role)?;
        info!("[Auth] User logged in: {}", user.id);

        Ok((user, token))
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.tokens.issue(&user.id, user.role)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.tokens.verify(token)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<User, AuthError> {
        let pool = self.db.pool().await?;

        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;

        row.map(User::from).ok_or(AuthError::UserNotFound)
    }

    /// Create the configured admin account unless the email is already
    /// registered. Returns whether a user was created.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<bool, AuthError> {
        let admin = NewUser::validate(name, email, password, Role::Admin)?;
        match self.register(admin).await {
            Ok(user) => {
                info!("[Auth] Admin account bootstrapped: {}", user.email);
                Ok(true)
            }
            Err(AuthError::EmailTaken) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}
