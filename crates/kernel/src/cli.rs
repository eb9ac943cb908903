//! Command-line interface and operator commands.
//!
//! None of these run on the request path; each opens its own database pool.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::file::{LocalFileStorage, MediaService};
use crate::mail::gmail::consent_url;
use crate::mail::{GmailCredentials, GoogleTokenEndpoint, PgTokenStore};
use crate::models::User;
use crate::models::user::{CreateUser, Role};

/// Atelier site kernel.
#[derive(Parser, Debug)]
#[command(name = "atelier", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Authorize Gmail sending and store the token.
    GmailToken {
        /// Store the token for this user instead of the site sender.
        #[arg(long)]
        user: Option<String>,
    },

    /// Create a user account.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Falls back to the ATELIER_PASSWORD environment variable.
        #[arg(long, env = "ATELIER_PASSWORD", hide_env_values = true)]
        password: String,
        /// administrator or author.
        #[arg(long, default_value = "author")]
        role: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Remove media records whose stored file is gone.
    ReconcileMedia,

    /// Create media records for stored files that have none.
    ImportMedia,
}

async fn connect(config: &Config) -> Result<PgPool> {
    let pool = db::create_pool(config)
        .await
        .context("failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    Ok(pool)
}

fn media_service(pool: PgPool, config: &Config) -> MediaService {
    MediaService::new(
        pool,
        Arc::new(LocalFileStorage::new(
            config.uploads_dir.clone(),
            config.files_url.clone(),
        )),
    )
}

/// Interactive Gmail authorization.
///
/// Prints the consent URL, reads the code from stdin and stores the token.
pub async fn gmail_token(config: &Config, username: Option<&str>) -> Result<()> {
    let Some(gmail) = config.gmail.clone() else {
        bail!("GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET must be set");
    };

    let pool = connect(config).await?;
    let user_id = match username {
        Some(name) => Some(
            User::find_by_username(&pool, name)
                .await?
                .with_context(|| format!("no user named {name}"))?
                .id,
        ),
        None => None,
    };

    println!("Open this URL in a browser and approve access:\n\n{}\n", consent_url(&gmail)?);
    println!("Paste the authorization code:");

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("failed to read authorization code")?;
    if code.trim().is_empty() {
        bail!("no authorization code entered");
    }

    let credentials = GmailCredentials::new(
        Arc::new(PgTokenStore::new(pool, user_id)),
        Arc::new(GoogleTokenEndpoint::new(gmail)),
    );
    let token = credentials
        .authorize(&code)
        .await
        .context("authorization failed")?;

    println!("Token stored; expires {}.", token.expiry);
    if token.refresh_token.is_none() {
        println!("Warning: no refresh token was issued. Revoke access and run this again.");
    }
    Ok(())
}

pub async fn create_user(config: &Config, input: CreateUser) -> Result<()> {
    let pool = connect(config).await?;
    if User::find_by_username(&pool, &input.username).await?.is_some() {
        bail!("user {} already exists", input.username);
    }

    let user = User::create(&pool, input).await?;
    info!(user_id = %user.id, username = %user.username, role = %user.role, "user created");
    println!("Created {} ({}).", user.username, user.role);
    Ok(())
}

pub async fn reconcile_media(config: &Config) -> Result<()> {
    let pool = connect(config).await?;
    let report = media_service(pool, config).reconcile().await?;
    println!(
        "Checked {} media record(s); removed {} orphan(s).",
        report.checked, report.removed
    );
    Ok(())
}

pub async fn import_media(config: &Config) -> Result<()> {
    let pool = connect(config).await?;
    let imported = media_service(pool, config).import_untracked().await?;
    println!("Imported {imported} untracked file(s).");
    Ok(())
}

/// Build a [`CreateUser`] from command arguments.
pub fn new_user(
    username: String,
    email: String,
    password: String,
    role: &str,
    first_name: String,
    last_name: String,
) -> Result<CreateUser> {
    if username.trim().is_empty() {
        bail!("username must not be empty");
    }
    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }
    email
        .parse::<lettre::Address>()
        .with_context(|| format!("invalid email address: {email}"))?;

    Ok(CreateUser {
        username: username.trim().to_string(),
        email,
        password,
        first_name,
        last_name,
        role: role.parse::<Role>()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_default() {
        let cli = Cli::parse_from(["atelier"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn command_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_create_user() {
        let cli = Cli::parse_from([
            "atelier",
            "create-user",
            "--username",
            "ann",
            "--email",
            "ann@example.com",
            "--password",
            "correct horse",
            "--role",
            "administrator",
        ]);
        let Some(Command::CreateUser { password, role, first_name, .. }) = cli.command else {
            panic!("expected create-user");
        };
        assert_eq!(password, "correct horse");
        assert_eq!(role, "administrator");
        assert_eq!(first_name, "");
    }

    #[test]
    fn parses_gmail_token_user() {
        let cli = Cli::parse_from(["atelier", "gmail-token", "--user", "ann"]);
        assert!(matches!(
            cli.command,
            Some(Command::GmailToken { user: Some(ref u) }) if u == "ann"
        ));
    }

    #[test]
    fn new_user_validates() {
        let ok = new_user(
            "ann".to_string(),
            "ann@example.com".to_string(),
            "correct horse".to_string(),
            "admin",
            String::new(),
            String::new(),
        )
        .unwrap();
        assert_eq!(ok.role, Role::Administrator);

        assert!(new_user(
            "ann".to_string(),
            "ann@example.com".to_string(),
            "short".to_string(),
            "author",
            String::new(),
            String::new(),
        )
        .is_err());

        assert!(new_user(
            "ann".to_string(),
            "not-an-email".to_string(),
            "correct horse".to_string(),
            "author",
            String::new(),
            String::new(),
        )
        .is_err());

        assert!(new_user(
            "ann".to_string(),
            "ann@example.com".to_string(),
            "correct horse".to_string(),
            "editor",
            String::new(),
            String::new(),
        )
        .is_err());
    }
}
