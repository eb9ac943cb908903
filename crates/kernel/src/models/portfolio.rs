//! Portfolio showcase: projects, testimonials, team members, and the fixed
//! service catalogue.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::FieldErrors;

/// A portfolio project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub client: String,
    pub category: String,
    pub completion_date: NaiveDate,
    pub image_url: String,
    pub url: Option<String>,
    pub is_featured: bool,
    pub top_rated: bool,
    pub case_study_description: Option<String>,
    pub sales_increase: Option<String>,
    pub daily_users: Option<String>,
    pub uptime: Option<String>,
    pub user_rating: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Project fields submitted by the admin.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub client: String,
    pub category: String,
    pub completion_date: NaiveDate,
    #[serde(default)]
    pub image_url: String,
    pub url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub top_rated: bool,
    pub case_study_description: Option<String>,
    pub sales_increase: Option<String>,
    pub daily_users: Option<String>,
    pub uptime: Option<String>,
    pub user_rating: Option<String>,
}

impl ProjectInput {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("client", &self.client),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), vec!["This field is required.".to_string()]);
            }
        }
        errors
    }
}

/// A client testimonial.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub company: String,
    pub image_url: String,
    pub message: String,
    pub rating: i16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialInput {
    pub name: String,
    pub position: String,
    pub company: String,
    #[serde(default)]
    pub image_url: String,
    pub message: String,
    #[serde(default = "default_rating")]
    pub rating: i16,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_rating() -> i16 {
    5
}

fn default_true() -> bool {
    true
}

impl TestimonialInput {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("name", &self.name),
            ("position", &self.position),
            ("company", &self.company),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), vec!["This field is required.".to_string()]);
            }
        }
        if !(1..=5).contains(&self.rating) {
            errors.insert(
                "rating".to_string(),
                vec!["Rating must be between 1 and 5.".to_string()],
            );
        }
        errors
    }
}

/// A team member shown on the about page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub bio: String,
    pub image_url: String,
    pub display_order: i32,
    pub is_active: bool,
}

/// An entry in the fixed service catalogue.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Service {
    pub slug: &'static str,
    pub title: &'static str,
}

/// Services offered; detail pages exist only for these slugs.
pub const SERVICES: &[Service] = &[
    Service { slug: "web-development", title: "Web Development" },
    Service { slug: "web-design", title: "Web Design" },
    Service { slug: "app-development", title: "App Development" },
    Service { slug: "seo", title: "SEO" },
    Service { slug: "ui-ux-design", title: "UI/UX Design" },
    Service { slug: "blockchain-development", title: "Blockchain Development" },
    Service { slug: "business-registration", title: "Business Registration" },
    Service { slug: "content-writing", title: "Content Writing" },
];

pub fn find_service(slug: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.slug == slug)
}

const PROJECT_COLUMNS: &str = "id, title, description, client, category, completion_date, image_url, url, \
     is_featured, top_rated, case_study_description, sales_increase, daily_users, uptime, \
     user_rating, created_at";

const TESTIMONIAL_COLUMNS: &str =
    "id, name, position, company, image_url, message, rating, is_active, created_at";

impl Project {
    /// All projects, most recently completed first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY completion_date DESC");
        let projects = sqlx::query_as::<_, Project>(&sql)
            .fetch_all(pool)
            .await
            .context("failed to list projects")?;

        Ok(projects)
    }

    /// Featured projects completed on or before `today`.
    pub async fn featured(pool: &PgPool, today: NaiveDate, limit: i64) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE is_featured AND completion_date <= $1 \
             ORDER BY completion_date DESC LIMIT $2"
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(today)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list featured projects")?;

        Ok(projects)
    }

    /// The most recent top-rated project.
    pub async fn top_rated(pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE top_rated \
             ORDER BY completion_date DESC LIMIT 1"
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .fetch_optional(pool)
            .await
            .context("failed to fetch top-rated project")?;

        Ok(project)
    }

    /// Distinct project categories, alphabetically.
    pub async fn categories(pool: &PgPool) -> Result<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM projects ORDER BY category")
                .fetch_all(pool)
                .await
                .context("failed to list project categories")?;

        Ok(categories)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(pool)
            .await
            .context("failed to count projects")?;

        Ok(count)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch project")?;

        Ok(project)
    }

    pub async fn create(pool: &PgPool, input: &ProjectInput) -> Result<Self> {
        let sql = format!(
            r#"
            INSERT INTO projects (id, title, description, client, category, completion_date,
                                  image_url, url, is_featured, top_rated, case_study_description,
                                  sales_increase, daily_users, uptime, user_rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = bind_project(sqlx::query_as::<_, Project>(&sql).bind(Uuid::now_v7()), input)
            .fetch_one(pool)
            .await
            .context("failed to create project")?;

        Ok(project)
    }

    pub async fn update(pool: &PgPool, id: Uuid, input: &ProjectInput) -> Result<Option<Self>> {
        let sql = format!(
            r#"
            UPDATE projects
            SET title = $2, description = $3, client = $4, category = $5, completion_date = $6,
                image_url = $7, url = $8, is_featured = $9, top_rated = $10,
                case_study_description = $11, sales_increase = $12, daily_users = $13,
                uptime = $14, user_rating = $15
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = bind_project(sqlx::query_as::<_, Project>(&sql).bind(id), input)
            .fetch_optional(pool)
            .await
            .context("failed to update project")?;

        Ok(project)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete project")?;

        Ok(result.rows_affected() > 0)
    }
}

type ProjectQuery<'q> =
    sqlx::query::QueryAs<'q, sqlx::Postgres, Project, sqlx::postgres::PgArguments>;

/// Bind `$2..=$15` in column order.
fn bind_project<'q>(query: ProjectQuery<'q>, input: &'q ProjectInput) -> ProjectQuery<'q> {
    query
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.client)
        .bind(&input.category)
        .bind(input.completion_date)
        .bind(&input.image_url)
        .bind(&input.url)
        .bind(input.is_featured)
        .bind(input.top_rated)
        .bind(&input.case_study_description)
        .bind(&input.sales_increase)
        .bind(&input.daily_users)
        .bind(&input.uptime)
        .bind(&input.user_rating)
}

impl Testimonial {
    /// Active testimonials, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE is_active ORDER BY created_at DESC"
        );
        let testimonials = sqlx::query_as::<_, Testimonial>(&sql)
            .fetch_all(pool)
            .await
            .context("failed to list testimonials")?;

        Ok(testimonials)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!("SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY created_at DESC");
        let testimonials = sqlx::query_as::<_, Testimonial>(&sql)
            .fetch_all(pool)
            .await
            .context("failed to list testimonials")?;

        Ok(testimonials)
    }

    pub async fn create(pool: &PgPool, input: &TestimonialInput) -> Result<Self> {
        let sql = format!(
            "INSERT INTO testimonials (id, name, position, company, image_url, message, rating, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {TESTIMONIAL_COLUMNS}"
        );
        let testimonial = sqlx::query_as::<_, Testimonial>(&sql)
            .bind(Uuid::now_v7())
            .bind(&input.name)
            .bind(&input.position)
            .bind(&input.company)
            .bind(&input.image_url)
            .bind(&input.message)
            .bind(input.rating)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
            .context("failed to create testimonial")?;

        Ok(testimonial)
    }

    pub async fn update(pool: &PgPool, id: Uuid, input: &TestimonialInput) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE testimonials SET name = $2, position = $3, company = $4, image_url = $5, \
             message = $6, rating = $7, is_active = $8 WHERE id = $1 RETURNING {TESTIMONIAL_COLUMNS}"
        );
        let testimonial = sqlx::query_as::<_, Testimonial>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.position)
            .bind(&input.company)
            .bind(&input.image_url)
            .bind(&input.message)
            .bind(input.rating)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
            .context("failed to update testimonial")?;

        Ok(testimonial)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete testimonial")?;

        Ok(result.rows_affected() > 0)
    }
}

impl TeamMember {
    /// Active members in display order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>> {
        let members = sqlx::query_as::<_, TeamMember>(
            "SELECT id, name, position, bio, image_url, display_order, is_active \
             FROM team_members WHERE is_active ORDER BY display_order, name",
        )
        .fetch_all(pool)
        .await
        .context("failed to list team members")?;

        Ok(members)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn testimonial(rating: i16) -> TestimonialInput {
        TestimonialInput {
            name: "Ada".to_string(),
            position: "CTO".to_string(),
            company: "Acme".to_string(),
            image_url: String::new(),
            message: "Great work".to_string(),
            rating,
            is_active: true,
        }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(testimonial(5).validate().is_empty());
        assert!(testimonial(1).validate().is_empty());
        assert!(testimonial(0).validate().contains_key("rating"));
        assert!(testimonial(6).validate().contains_key("rating"));
    }

    #[test]
    fn testimonial_defaults() {
        let input: TestimonialInput = serde_json::from_str(
            r#"{"name":"A","position":"B","company":"C","message":"D"}"#,
        )
        .unwrap();
        assert_eq!(input.rating, 5);
        assert!(input.is_active);
    }

    #[test]
    fn project_requires_text_fields() {
        let input: ProjectInput = serde_json::from_str(
            r#"{"title":"","description":"d","client":"c","category":"web","completion_date":"2025-01-31"}"#,
        )
        .unwrap();
        let errors = input.validate();
        assert!(errors.contains_key("title"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn service_catalogue_lookup() {
        assert_eq!(find_service("seo").unwrap().title, "SEO");
        assert!(find_service("plumbing").is_none());
    }
}
