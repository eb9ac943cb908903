//! User model and password handling.

use anyhow::{Context, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Site role. Administrators manage everything; authors manage their own posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Author,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Author => "author",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "administrator" | "admin" => Ok(Role::Administrator),
            "author" => Ok(Role::Author),
            other => anyhow::bail!("unknown role: {other}"),
        }
    }
}

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub pass: String,

    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Public author card shown on posts.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub username: String,
    pub display_name: String,
}

const COLUMNS: &str =
    "id, username, email, pass, first_name, last_name, role, is_active, created_at, last_login";

impl User {
    pub fn role(&self) -> Role {
        if self.role == "administrator" {
            Role::Administrator
        } else {
            Role::Author
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Administrator
    }

    /// Whether this user may edit a post written by `author_id`.
    pub fn can_edit(&self, author_id: Option<Uuid>) -> bool {
        self.is_admin() || author_id == Some(self.id)
    }

    /// Full name, or the username when no name is set.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            username: self.username.clone(),
            display_name: self.display_name(),
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by username")?;

        Ok(user)
    }

    /// Users by id, for attaching authors to listings.
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1)");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await
            .context("failed to fetch users")?;

        Ok(users)
    }

    pub async fn create(pool: &PgPool, input: CreateUser) -> Result<Self> {
        let id = Uuid::now_v7();
        let hash = hash_password(&input.password)?;
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, pass, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.role.as_str())
            .fetch_one(pool)
            .await
            .context("failed to create user")?;

        Ok(user)
    }

    pub async fn touch_login(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update last login")?;

        Ok(())
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.pass.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.pass) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user(role: Role, first: &str, last: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            pass: hash_password("correct horse").unwrap(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: role.as_str().to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn password_round_trip() {
        let u = user(Role::Author, "", "");
        assert!(u.pass.starts_with("$argon2"));
        assert!(u.verify_password("correct horse"));
        assert!(!u.verify_password("wrong"));
    }

    #[test]
    fn empty_hash_never_verifies() {
        let mut u = user(Role::Author, "", "");
        u.pass.clear();
        assert!(!u.verify_password(""));
    }

    #[test]
    fn authors_edit_only_their_own() {
        let author = user(Role::Author, "", "");
        assert!(author.can_edit(Some(author.id)));
        assert!(!author.can_edit(Some(Uuid::now_v7())));
        assert!(!author.can_edit(None));

        let admin = user(Role::Administrator, "", "");
        assert!(admin.can_edit(Some(author.id)));
        assert!(admin.can_edit(None));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(user(Role::Author, "Jane", "Doe").display_name(), "Jane Doe");
        assert_eq!(user(Role::Author, "Jane", "").display_name(), "Jane");
        assert_eq!(user(Role::Author, " ", "").display_name(), "jdoe");
    }

    #[test]
    fn role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("author".parse::<Role>().unwrap(), Role::Author);
        assert!("editor".parse::<Role>().is_err());
    }
}
