#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP integration tests against the real router, database and Redis.
//!
//! Every test here is ignored by default; run with `cargo test -- --ignored`
//! against a live database and Redis. Tests use unique titles and users so
//! they can share one database in parallel.

mod common;

use atelier_kernel::file::FileStorage;
use atelier_kernel::models::media::NewMediaFile;
use atelier_kernel::models::{MediaCategory, MediaFile, Role};
use atelier_test_utils::{assert, fixtures, unique};
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use common::{TestApp, run_test};

/// Create a post through the API and return its JSON.
async fn create_post(app: &TestApp, cookies: &str, title: &str, action: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/admin/posts",
            fixtures::content_with_action(title, action),
            cookies,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// The single comment left on `post`, read straight from the database.
async fn only_comment(app: &TestApp, post: &Value) -> Uuid {
    let post_id: Uuid = id(post).parse().unwrap();
    sqlx::query_scalar("SELECT id FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&app.db)
        .await
        .unwrap()
}

// -------------------------------------------------------------------------
// Access control
// -------------------------------------------------------------------------

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn admin_routes_require_login() {
    run_test(|app| async move {
        let (status, _) = app.get("/api/admin/posts", "").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.get("/api/admin/comments", "").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn authors_cannot_manage_pages_or_moderate() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;

        let (status, _) = app.get("/api/admin/pages", &cookies).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.get("/api/admin/comments", &cookies).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.post("/api/admin/media/reconcile", json!({}), &cookies).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn me_reports_logged_in_user() {
    run_test(|app| async move {
        let (user, cookies) = app.login_as(Role::Administrator).await;
        let (status, body) = app.get("/api/auth/me", &cookies).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], user.username.as_str());
        assert_eq!(body["role"], "administrator");
    });
}

// -------------------------------------------------------------------------
// Content lifecycle
// -------------------------------------------------------------------------

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn duplicate_titles_get_unique_slugs() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let title = unique("Same Title");

        let first = create_post(app, &cookies, &title, "draft").await;
        let second = create_post(app, &cookies, &title, "draft").await;

        let base = first["slug"].as_str().unwrap();
        assert_eq!(second["slug"], format!("{base}-1"));

        let (_, preview) = app
            .get(
                &format!("/api/admin/posts/slug?title={}&exclude={}", base, id(&first)),
                &cookies,
            )
            .await;
        assert_eq!(preview["slug"], base);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn blog_route_slugs_are_never_allocated() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let post = create_post(app, &admin, "Search", "draft").await;
        let slug = post["slug"].as_str().unwrap();
        assert_ne!(slug, "search");
        assert!(slug.starts_with("search-"));

        let (status, body) = app
            .post("/api/admin/categories", json!({"name": "Categories"}), &admin)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert::field_error(&body, "slug");
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn trash_restore_and_transition_eligibility() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let title = unique("Lifecycle");
        let post = create_post(app, &cookies, &title, "publish").await;
        assert_eq!(post["state"], "published");
        let base = format!("/api/admin/posts/{}", id(&post));

        // Publishing a published post changes nothing.
        let (_, body) = app.post(&format!("{base}/publish"), json!({}), &cookies).await;
        assert_eq!(body["affected"], 0);

        let (_, body) = app.post(&format!("{base}/trash"), json!({}), &cookies).await;
        assert_eq!(body["affected"], 1);

        let (_, trash) = app.get(&format!("/api/admin/posts?status=trash&search={title}"), &cookies).await;
        let row = trash["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["id"] == post["id"])
            .expect("trashed post listed");
        assert_eq!(row["days_in_trash"], 0);
        assert_eq!(row["can_auto_delete"], false);

        let (_, body) = app.post(&format!("{base}/restore"), json!({}), &cookies).await;
        assert_eq!(body["affected"], 1);

        let (_, view) = app.get(&base, &cookies).await;
        assert_eq!(view["state"], "draft");
        assert!(view["trashed_at"].is_null());
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn bulk_actions_only_touch_own_posts() {
    run_test(|app| async move {
        let (_, owner) = app.login_as(Role::Author).await;
        let (_, other) = app.login_as(Role::Author).await;

        let mine = create_post(app, &owner, &unique("Mine"), "draft").await;
        let theirs = create_post(app, &other, &unique("Theirs"), "draft").await;

        let (status, body) = app
            .post(
                "/api/admin/posts/bulk",
                json!({"action": "trash", "ids": [id(&mine), id(&theirs)]}),
                &owner,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["affected"], 1);
        assert_eq!(body["message"], "1 post(s) moved to trash.");

        let (status, _) = app.get(&format!("/api/admin/posts/{}", id(&theirs)), &owner).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn bulk_delete_is_permanent() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Administrator).await;
        let post = create_post(app, &cookies, &unique("Doomed"), "draft").await;

        let (_, body) = app
            .post(
                "/api/admin/posts/bulk",
                json!({"action": "delete", "ids": [id(&post)]}),
                &cookies,
            )
            .await;
        assert_eq!(body["affected"], 1);

        let (status, _) = app.get(&format!("/api/admin/posts/{}", id(&post)), &cookies).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn validation_errors_name_fields() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let (status, body) = app
            .post("/api/admin/posts", json!({"title": "  ", "body": "x"}), &cookies)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert::field_error(&body, "title");
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn autosave_creates_draft_without_title_check() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let (status, body) = app
            .post("/api/admin/posts/autosave", json!({"body": "<p>wip</p>"}), &cookies)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, view) = app
            .get(&format!("/api/admin/posts/{}", id(&body)), &cookies)
            .await;
        assert_eq!(view["state"], "draft");
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn autosave_moves_existing_post_to_draft() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let post = create_post(app, &admin, &unique("Live"), "publish").await;
        assert_eq!(post["state"], "published");

        let (status, category) = app
            .post("/api/admin/categories", json!({"name": unique("Notes")}), &admin)
            .await;
        assert_eq!(status, StatusCode::CREATED, "category failed: {category}");

        let custom = unique("custom");
        let (status, saved) = app
            .post(
                "/api/admin/posts/autosave",
                json!({
                    "id": id(&post),
                    "title": "Renamed while live",
                    "slug": custom,
                    "categories": [id(&category)],
                }),
                &admin,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "autosave failed: {saved}");
        assert_eq!(saved["id"], post["id"]);
        assert_eq!(saved["slug"], custom);

        let (_, view) = app
            .get(&format!("/api/admin/posts/{}", id(&post)), &admin)
            .await;
        assert_eq!(view["state"], "draft");
        assert_eq!(view["title"], "Renamed while live");
        assert_eq!(view["categories"][0]["id"], category["id"]);

        // A new title without a slug regenerates the slug.
        let title = unique("Second Title");
        let (_, saved) = app
            .post(
                "/api/admin/posts/autosave",
                json!({"id": id(&post), "title": title}),
                &admin,
            )
            .await;
        assert_eq!(saved["slug"], title.to_lowercase().replace(' ', "-"));

        // The unpublished post no longer resolves publicly.
        let (status, _) = app
            .get(&format!("/api/blog/{}", saved["slug"].as_str().unwrap()), "")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    });
}

// -------------------------------------------------------------------------
// Public blog and comments
// -------------------------------------------------------------------------

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn drafts_are_not_public() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let draft = create_post(app, &cookies, &unique("Hidden"), "draft").await;

        let slug = draft["slug"].as_str().unwrap();
        let (status, _) = app.get(&format!("/api/blog/{slug}"), "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn published_post_resolves_with_read_time() {
    run_test(|app| async move {
        let (_, cookies) = app.login_as(Role::Author).await;
        let post = create_post(app, &cookies, &unique("Visible"), "publish").await;

        let slug = post["slug"].as_str().unwrap();
        let (status, body) = app.get(&format!("/api/blog/{slug}"), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "post");
        assert_eq!(body["post"]["read_time"], 1);
        assert_eq!(body["total_comments"], 0);
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn comments_wait_for_approval() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let post = create_post(app, &admin, &unique("Discuss"), "publish").await;
        let comments_uri = format!("/api/posts/{}/comments", post["slug"].as_str().unwrap());

        let (status, body) = app
            .post(&comments_uri, fixtures::comment("Reader", "Great post"), "")
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (_, public) = app.get(&comments_uri, "").await;
        assert_eq!(public["total"], 0);

        let (status, queue) = app.get("/api/admin/comments?filter=pending", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert!(queue["counts"]["pending"].as_i64().unwrap() >= 1);

        let comment_id = only_comment(app, &post).await;
        let (_, body) = app
            .post(&format!("/api/admin/comments/{comment_id}/approve"), json!({}), &admin)
            .await;
        assert_eq!(body["affected"], 1);

        let (status, reply) = app
            .post(
                &format!("/api/admin/comments/{comment_id}/reply"),
                json!({"body": "Thanks!"}),
                &admin,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply["approved"], true);

        let (_, public) = app.get(&comments_uri, "").await;
        assert_eq!(public["total"], 1);
        let thread = &public["comments"][0];
        assert_eq!(thread["body"], "Great post");
        assert_eq!(thread["replies"][0]["body"], "Thanks!");
        // Commenter addresses are never published.
        assert!(thread.get("email").is_none());
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn reply_parent_must_share_post() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let first = create_post(app, &admin, &unique("First"), "publish").await;
        let second = create_post(app, &admin, &unique("Second"), "publish").await;

        let first_uri = format!("/api/posts/{}/comments", first["slug"].as_str().unwrap());
        app.post(&first_uri, fixtures::comment("A", "On first"), "").await;

        let parent = only_comment(app, &first).await;

        let mut reply = fixtures::comment("B", "Wrong thread");
        reply["parent_id"] = json!(parent);
        let second_uri = format!("/api/posts/{}/comments", second["slug"].as_str().unwrap());
        let (status, body) = app.post(&second_uri, reply, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert::field_error(&body, "parent_id");
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn comment_form_requires_fields() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let post = create_post(app, &admin, &unique("Strict"), "publish").await;
        let uri = format!("/api/posts/{}/comments", post["slug"].as_str().unwrap());

        let (status, body) = app
            .post(&uri, json!({"name": "", "email": "nope", "body": ""}), "")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert::field_error(&body, "name");
        assert::field_error(&body, "email");
        assert::field_error(&body, "body");
    });
}

// -------------------------------------------------------------------------
// Media
// -------------------------------------------------------------------------

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn reconcile_removes_records_without_files() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let storage = app.state.media().storage().clone();

        let kept_uri = storage.generate_uri("kept.txt");
        storage.write(&kept_uri, b"still here").await.unwrap();

        let mut ids = Vec::new();
        for (uri, name) in [
            (kept_uri.clone(), "kept.txt"),
            (storage.generate_uri("gone.txt"), "gone.txt"),
        ] {
            let file = MediaFile::insert(
                &app.db,
                NewMediaFile {
                    uri,
                    filename: name.to_string(),
                    alt_text: String::new(),
                    category: MediaCategory::Document,
                    mime_type: "text/plain".to_string(),
                    size: 10,
                },
            )
            .await
            .unwrap();
            ids.push(file.id);
        }

        let (status, report) = app
            .post("/api/admin/media/reconcile", json!({}), &admin)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(report["removed"].as_u64().unwrap() >= 1);

        assert!(MediaFile::find_by_id(&app.db, ids[0]).await.unwrap().is_some());
        assert!(MediaFile::find_by_id(&app.db, ids[1]).await.unwrap().is_none());
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn import_records_real_file_size() {
    run_test(|app| async move {
        let (_, admin) = app.login_as(Role::Administrator).await;
        let storage = app.state.media().storage().clone();

        let uri = storage.generate_uri("brochure.pdf");
        storage.write(&uri, &[1u8; 2048]).await.unwrap();

        let (status, body) = app.post("/api/admin/media/import", json!({}), &admin).await;
        assert_eq!(status, StatusCode::OK, "import failed: {body}");
        assert!(body["imported"].as_u64().unwrap() >= 1);

        let size: i64 = sqlx::query_scalar("SELECT size FROM media_files WHERE uri = $1")
            .bind(&uri)
            .fetch_one(&app.db)
            .await
            .unwrap();
        assert_eq!(size, 2048);
    });
}

// -------------------------------------------------------------------------
// Marketing site
// -------------------------------------------------------------------------

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn contact_form_validates_before_sending() {
    run_test(|app| async move {
        let mut form = fixtures::contact("small");
        form["name"] = json!("");
        let (status, body) = app.post("/api/contact", form, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert::field_error(&body, "name");
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn unknown_service_is_not_found() {
    run_test(|app| async move {
        let (status, _) = app.get("/api/services/time-travel", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, services) = app.get("/api/services", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!services.as_array().unwrap().is_empty());
    });
}

#[test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
fn health_reports_services() {
    run_test(|app| async move {
        let (status, body) = app.get("/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["postgres"], true);
        assert_eq!(body["redis"], true);
    });
}
