//! Marketing site routes: home, projects, about, services, contact, and
//! portfolio administration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::mail::MailError;
use crate::mail::contact::{ContactForm, send_contact};
use crate::models::portfolio::{ProjectInput, SERVICES, Service, TestimonialInput, find_service};
use crate::models::{Project, TeamMember, Testimonial};
use crate::routes::helpers::{Affected, require_admin};
use crate::state::AppState;

/// Featured projects on the home page.
const HOME_FEATURED_PROJECTS: i64 = 3;

/// Create the portfolio router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/projects", get(projects))
        .route("/api/about", get(about))
        .route("/api/services", get(services))
        .route("/api/services/{slug}", get(service_detail))
        .route("/api/contact", post(contact))
        .route(
            "/api/admin/projects",
            get(admin_projects).post(create_project),
        )
        .route(
            "/api/admin/projects/{id}",
            put(update_project).delete(delete_project),
        )
        .route(
            "/api/admin/testimonials",
            get(admin_testimonials).post(create_testimonial),
        )
        .route(
            "/api/admin/testimonials/{id}",
            put(update_testimonial).delete(delete_testimonial),
        )
}

#[derive(Debug, Serialize)]
struct HomePage {
    featured_projects: Vec<Project>,
    testimonials: Vec<Testimonial>,
}

/// GET /api/home
///
/// Featured projects only count once their completion date has passed.
async fn home(State(state): State<AppState>) -> AppResult<Json<HomePage>> {
    let today = Utc::now().date_naive();
    let (featured_projects, testimonials) = tokio::try_join!(
        Project::featured(state.db(), today, HOME_FEATURED_PROJECTS),
        Testimonial::list_active(state.db()),
    )?;

    Ok(Json(HomePage {
        featured_projects,
        testimonials,
    }))
}

#[derive(Debug, Serialize)]
struct ProjectsPage {
    top_rated: Option<Project>,
    projects: Vec<Project>,
    categories: Vec<String>,
}

/// GET /api/projects
async fn projects(State(state): State<AppState>) -> AppResult<Json<ProjectsPage>> {
    let (top_rated, projects, categories) = tokio::try_join!(
        Project::top_rated(state.db()),
        Project::list(state.db()),
        Project::categories(state.db()),
    )?;

    Ok(Json(ProjectsPage {
        top_rated,
        projects,
        categories,
    }))
}

#[derive(Debug, Serialize)]
struct AboutPage {
    team_members: Vec<TeamMember>,
}

/// GET /api/about
async fn about(State(state): State<AppState>) -> AppResult<Json<AboutPage>> {
    Ok(Json(AboutPage {
        team_members: TeamMember::list_active(state.db()).await?,
    }))
}

/// GET /api/services
async fn services() -> Json<&'static [Service]> {
    Json(SERVICES)
}

/// GET /api/services/{slug}
async fn service_detail(Path(slug): Path<String>) -> AppResult<Json<&'static Service>> {
    find_service(&slug).map(Json).ok_or(AppError::NotFound)
}

#[derive(Debug, Serialize)]
struct ContactResponse {
    success: bool,
    message: &'static str,
}

/// POST /api/contact
///
/// Sends the owner notification and the sender's confirmation. Delivery
/// failures surface as a generic 502.
async fn contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> AppResult<Json<ContactResponse>> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mailer = state.mailer().ok_or(MailError::NotConfigured)?;
    send_contact(mailer, &state.config().default_from_email, &form).await?;

    info!(project_type = %form.project_type, budget = form.budget_display(), "contact form sent");
    Ok(Json(ContactResponse {
        success: true,
        message: "Thank you! Your message has been sent successfully. We'll get back to you soon.",
    }))
}

/// GET /api/admin/projects
async fn admin_projects(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Vec<Project>>> {
    require_admin(&state, &session).await?;
    Ok(Json(Project::list(state.db()).await?))
}

/// POST /api/admin/projects
async fn create_project(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<ProjectInput>,
) -> AppResult<(StatusCode, Json<Project>)> {
    require_admin(&state, &session).await?;
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let project = Project::create(state.db(), &input).await?;
    info!(project_id = %project.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/admin/projects/{id}
async fn update_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(input): Json<ProjectInput>,
) -> AppResult<Json<Project>> {
    require_admin(&state, &session).await?;
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let project = Project::update(state.db(), id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}

/// DELETE /api/admin/projects/{id}
async fn delete_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;
    if !Project::delete(state.db(), id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(Affected { affected: 1 }))
}

/// GET /api/admin/testimonials
async fn admin_testimonials(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Vec<Testimonial>>> {
    require_admin(&state, &session).await?;
    Ok(Json(Testimonial::list(state.db()).await?))
}

/// POST /api/admin/testimonials
async fn create_testimonial(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<TestimonialInput>,
) -> AppResult<(StatusCode, Json<Testimonial>)> {
    require_admin(&state, &session).await?;
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let testimonial = Testimonial::create(state.db(), &input).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

/// PUT /api/admin/testimonials/{id}
async fn update_testimonial(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(input): Json<TestimonialInput>,
) -> AppResult<Json<Testimonial>> {
    require_admin(&state, &session).await?;
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let testimonial = Testimonial::update(state.db(), id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(testimonial))
}

/// DELETE /api/admin/testimonials/{id}
async fn delete_testimonial(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;
    if !Testimonial::delete(state.db(), id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(Affected { affected: 1 }))
}
