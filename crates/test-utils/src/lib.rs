//! Atelier test utilities.
//!
//! Fixtures for content, comments and the contact form, a scratch
//! directory for storage tests, and JSON assertion helpers.

use std::path::{Path, PathBuf};

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// A string unique to this call, for slugs and usernames that must not
/// collide across parallel tests.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

/// `n` words of filler, space separated.
pub fn words(n: usize) -> String {
    const LOREM: &[&str] = &[
        "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit",
    ];
    (0..n)
        .map(|i| LOREM[i % LOREM.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scratch directory removed on drop.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// Create a fresh directory under the system temp dir.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(unique(&format!("atelier-{label}")));
        std::fs::create_dir_all(&path)
            .unwrap_or_else(|e| panic!("failed to create {}: {e}", path.display()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file relative to the directory, creating parents.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write(&self, relative: &str, data: &[u8]) -> PathBuf {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("failed to create {}: {e}", parent.display()));
        }
        std::fs::write(&path, data)
            .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Request bodies for the JSON API.
pub mod fixtures {
    use super::*;

    /// Editor payload for a post or page.
    pub fn content(title: &str, body_words: usize) -> JsonValue {
        json!({
            "title": title,
            "body": format!("<p>{}</p>", words(body_words)),
            "excerpt": "",
            "seo_description": "",
            "seo_keywords": "",
        })
    }

    /// Editor payload with an explicit action such as `publish`.
    pub fn content_with_action(title: &str, action: &str) -> JsonValue {
        let mut body = content(title, 20);
        body["action"] = json!(action);
        body
    }

    /// Public comment submission.
    pub fn comment(name: &str, body: &str) -> JsonValue {
        json!({
            "name": name,
            "email": "reader@example.com",
            "website": "",
            "body": body,
        })
    }

    /// Contact form submission.
    pub fn contact(budget: &str) -> JsonValue {
        json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "project_type": "Web application",
            "budget": budget,
            "message": "We would like a new site.",
        })
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a validation error names `field`.
    pub fn field_error(value: &Value, field: &str) {
        assert!(
            value["fields"].get(field).is_some(),
            "Expected a validation error for '{field}', got: {value}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}
