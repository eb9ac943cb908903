#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Content lifecycle, slug and read-time tests that need no database.

use std::collections::HashSet;

use atelier_kernel::content::lifecycle::{BulkAction, Transition};
use atelier_kernel::content::slug::{MAX_SLUG_LEN, base_slug, pick_unique, slugify};
use atelier_kernel::content::text::{excerpt, read_time};
use atelier_kernel::models::{ContentItem, ContentKind, ContentState};
use atelier_test_utils::words;
use chrono::{Duration, Utc};
use uuid::Uuid;

fn item(state: ContentState) -> ContentItem {
    let created = Utc::now() - Duration::days(3);
    ContentItem {
        id: Uuid::now_v7(),
        kind: ContentKind::Post,
        title: "Hello".to_string(),
        slug: "hello".to_string(),
        body: "<p>Hello</p>".to_string(),
        excerpt: None,
        state,
        published_at: None,
        trashed_at: None,
        trashed_by: None,
        read_time: 1,
        view_count: 0,
        seo_description: None,
        seo_keywords: None,
        author_id: None,
        is_featured: false,
        featured_image_id: None,
        created_at: created,
        updated_at: created,
    }
}

// -------------------------------------------------------------------------
// Lifecycle
// -------------------------------------------------------------------------

#[test]
fn trash_then_restore_lands_in_draft() {
    let actor = Uuid::now_v7();
    let now = Utc::now();
    let mut post = item(ContentState::Published);

    assert!(post.apply(Transition::Trash, Some(actor), now));
    assert_eq!(post.state, ContentState::Trashed);
    assert_eq!(post.trashed_at, Some(now));
    assert_eq!(post.trashed_by, Some(actor));

    assert!(post.apply(Transition::Restore, Some(actor), now));
    assert_eq!(post.state, ContentState::Draft);
    assert!(post.trashed_at.is_none());
    assert!(post.trashed_by.is_none());
}

#[test]
fn ineligible_transitions_leave_item_untouched() {
    let now = Utc::now();

    let mut draft = item(ContentState::Draft);
    let before = draft.clone();
    assert!(!draft.apply(Transition::Restore, None, now));
    assert!(!draft.apply(Transition::Draft, None, now));
    assert_eq!(draft.state, before.state);
    assert_eq!(draft.updated_at, before.updated_at);

    let mut trashed = item(ContentState::Trashed);
    assert!(!trashed.apply(Transition::Trash, None, now));
    assert!(!trashed.apply(Transition::Publish, None, now));
    assert_eq!(trashed.state, ContentState::Trashed);
}

#[test]
fn publish_keeps_first_publication_date() {
    let earlier = Utc::now() - Duration::days(10);
    let mut post = item(ContentState::Draft);
    post.published_at = Some(earlier);

    assert!(post.apply(Transition::Publish, None, Utc::now()));
    assert_eq!(post.published_at, Some(earlier));

    let mut fresh = item(ContentState::Draft);
    let now = Utc::now();
    assert!(fresh.apply(Transition::Publish, None, now));
    assert_eq!(fresh.published_at, Some(now));
}

#[test]
fn bulk_actions_map_to_transitions() {
    assert_eq!(BulkAction::Trash.transition(), Some(Transition::Trash));
    assert_eq!(BulkAction::Restore.transition(), Some(Transition::Restore));
    assert_eq!(BulkAction::Delete.transition(), None);
    assert_eq!(BulkAction::Delete.past_tense(), "permanently deleted");
}

#[test]
fn every_state_has_an_exit() {
    for state in [
        ContentState::Draft,
        ContentState::Published,
        ContentState::Trashed,
    ] {
        assert!(
            [
                Transition::Trash,
                Transition::Restore,
                Transition::Publish,
                Transition::Draft
            ]
            .iter()
            .any(|t| t.applies_to(state)),
            "{state:?} has no transition"
        );
    }
}

// -------------------------------------------------------------------------
// Slugs
// -------------------------------------------------------------------------

#[test]
fn slugify_titles() {
    assert_eq!(slugify("Hello, World!"), "hello-world");
    assert_eq!(slugify("  Rust & Axum -- 2024  "), "rust-axum-2024");
    assert_eq!(slugify("snake_case_title"), "snake-case-title");
    assert_eq!(slugify("!!!"), "");
}

#[test]
fn long_titles_cut_at_word_boundary() {
    let title = words(100);
    let slug = slugify(&title);
    assert!(slug.len() <= MAX_SLUG_LEN);
    assert!(!slug.ends_with('-'));
    assert!(title.replace(' ', "-").starts_with(&slug));
}

#[test]
fn empty_titles_use_fallback() {
    assert_eq!(base_slug("???", ContentKind::Page.fallback_slug()), "page");
    assert_eq!(base_slug("About us", "page"), "about-us");
}

#[test]
fn collisions_get_numeric_suffix() {
    let taken: HashSet<String> = ["about", "about-1", "about-2"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(pick_unique("about", &taken), "about-3");
    assert_eq!(pick_unique("contact", &taken), "contact");
}

// -------------------------------------------------------------------------
// Read time
// -------------------------------------------------------------------------

#[test]
fn read_time_rounds_up() {
    assert_eq!(read_time(""), 0);
    assert_eq!(read_time(&format!("<p>{}</p>", words(1))), 1);
    assert_eq!(read_time(&format!("<p>{}</p>", words(200))), 1);
    assert_eq!(read_time(&format!("<p>{}</p><p>{}</p>", words(150), words(51))), 2);
}

#[test]
fn excerpt_strips_markup() {
    assert_eq!(excerpt("<h1>Big</h1>\n<p>news <em>today</em></p>", 10), "Big news today");
    assert_eq!(excerpt(&words(5), 3), "lorem ipsum dolor...");
}
