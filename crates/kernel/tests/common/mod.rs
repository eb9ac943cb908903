#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Builds the real router and state against the database and Redis named by
//! `DATABASE_URL` and `REDIS_URL`. Database-backed tests are `#[ignore]`d so
//! a plain `cargo test` runs only the pure tests; run them with
//! `cargo test -- --ignored` once both services are up. They fail when
//! `DATABASE_URL` is unset.
//!
//! ## Runtime Safety
//!
//! The shared `TestApp` is initialized on a long-lived, multi-threaded Tokio
//! runtime that outlives any individual test. PgPool and Redis connections
//! opened on a `#[tokio::test]` runtime go stale when that runtime shuts
//! down, so every database test runs on [`SHARED_RT`] via [`run_test`].

#![allow(dead_code)]

use std::sync::{LazyLock, OnceLock};

use atelier_kernel::models::User;
use atelier_kernel::models::user::{CreateUser, Role};
use atelier_kernel::session::{self, parse_same_site};
use atelier_kernel::{AppState, Config, routes};
use atelier_test_utils::{TempDir, unique};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Password given to every test user.
pub const PASSWORD: &str = "correct horse battery";

/// Shared Tokio runtime that outlives all individual test runtimes.
pub static SHARED_RT: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build shared test runtime")
});

static SHARED_APP: OnceLock<TestApp> = OnceLock::new();

/// Get the shared [`TestApp`].
///
/// Panics when `DATABASE_URL` is unset.
pub fn shared_app() -> &'static TestApp {
    SHARED_APP.get_or_init(|| {
        dotenvy::dotenv().ok();
        assert!(
            std::env::var("DATABASE_URL").is_ok(),
            "DATABASE_URL must be set to run database-backed tests"
        );
        let handle = SHARED_RT.handle().clone();
        std::thread::spawn(move || handle.block_on(TestApp::new()))
            .join()
            .expect("TestApp init thread panicked")
    })
}

/// Run an async test body on [`SHARED_RT`] with the shared app.
pub fn run_test<F, Fut>(f: F)
where
    F: FnOnce(&'static TestApp) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    SHARED_RT.block_on(f(shared_app()));
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub db: PgPool,
    pub state: AppState,
    /// Uploads directory for this test binary.
    pub uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = TempDir::new("uploads");

        // SAFETY: set before any other thread reads the environment.
        unsafe { std::env::set_var("UPLOADS_DIR", uploads.path()) };
        if std::env::var("DATABASE_MAX_CONNECTIONS").is_err() {
            unsafe { std::env::set_var("DATABASE_MAX_CONNECTIONS", "20") };
        }

        let config = Config::from_env().expect("Failed to load config");
        let state = AppState::new(&config)
            .await
            .expect("Failed to initialize AppState");
        let db = state.db().clone();

        let session_layer = session::create_session_layer(
            &config.redis_url,
            parse_same_site(&config.cookie_same_site),
        )
        .await
        .expect("Failed to create session layer");

        // Must match main.rs, minus static file serving.
        let router = Router::new()
            .merge(routes::router())
            .layer(session_layer)
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(state.clone());

        Self {
            router,
            db,
            state,
            uploads,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a JSON request, optionally with session cookies, and return the
    /// status with the parsed body (Null when empty).
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookies: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.request(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, cookies: &str) -> (StatusCode, Value) {
        self.json("GET", uri, None, cookies).await
    }

    pub async fn post(&self, uri: &str, body: Value, cookies: &str) -> (StatusCode, Value) {
        self.json("POST", uri, Some(body), cookies).await
    }

    /// Create a user directly in the database.
    pub async fn create_user(&self, role: Role) -> User {
        let username = unique("user");
        User::create(
            &self.db,
            CreateUser {
                email: format!("{username}@example.com"),
                username,
                password: PASSWORD.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
            },
        )
        .await
        .expect("Failed to create test user")
    }

    /// Log in through the JSON API and return session cookies.
    ///
    /// # Panics
    ///
    /// Panics if the login response is not 200 OK.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .request(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "username": username,
                            "password": PASSWORD,
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await;

        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Login failed for user '{username}'"
        );
        extract_cookies(&response)
    }

    /// Create a user with `role` and log in.
    pub async fn login_as(&self, role: Role) -> (User, String) {
        let user = self.create_user(role).await;
        let cookies = self.login(&user.username).await;
        (user, cookies)
    }
}

/// Parse a response body as JSON; Null when empty.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response body is not JSON")
    }
}

/// Extract Set-Cookie headers from a response for use in subsequent requests.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}
