//! Atelier kernel
//!
//! HTTP server and operator commands.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use atelier_kernel::cli::{self, Cli, Command};
use atelier_kernel::session::{self, parse_same_site};
use atelier_kernel::{AppState, Config, routes};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Request body ceiling; large enough for a multi-file upload.
const MAX_REQUEST_BODY: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::GmailToken { user } => cli::gmail_token(&config, user.as_deref()).await,
        Command::CreateUser {
            username,
            email,
            password,
            role,
            first_name,
            last_name,
        } => {
            let input = cli::new_user(username, email, password, &role, first_name, last_name)?;
            cli::create_user(&config, input).await
        }
        Command::ReconcileMedia => cli::reconcile_media(&config).await,
        Command::ImportMedia => cli::import_media(&config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(port = config.port, "Starting Atelier kernel");

    // Initialize application state (database connections, etc.)
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!("Database and Redis connections established");

    let session_layer = session::create_session_layer(
        &config.redis_url,
        parse_same_site(&config.cookie_same_site),
    )
    .await
    .context("failed to create session layer")?;

    let cors = build_cors_layer(&config);

    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → CORS → session → body limit → compression → routes
    let app = Router::new()
        .merge(routes::router())
        .nest_service(&config.files_url, ServeDir::new(&config.uploads_dir))
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY))
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        // Credentialed requests cannot use a wildcard header list.
        let headers: [HeaderName; 3] = [header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION];

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
