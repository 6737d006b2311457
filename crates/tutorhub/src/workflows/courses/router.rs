use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::workflows::{Actor, WorkflowError};

use super::domain::{
    ArticleId, ArticleUpdate, CourseId, CourseStatus, CourseUpdate, NewArticle, NewCourse,
    NewSection, SectionId, SectionUpdate,
};
use super::repository::CourseRepository;
use super::service::CourseService;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: CourseStatus,
    #[serde(default)]
    pub feedback: String,
}

type Shared<R> = State<Arc<CourseService<R>>>;

/// Router exposing tutor authoring endpoints and the staff review queue.
pub fn course_router<R>(service: Arc<CourseService<R>>) -> Router
where
    R: CourseRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/courses",
            get(published_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/api/v1/courses/:course_id",
            get(detail_handler::<R>)
                .patch(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/courses/:course_id/submit",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/courses/:course_id/sections",
            post(add_section_handler::<R>),
        )
        .route(
            "/api/v1/sections/:section_id",
            patch(update_section_handler::<R>).delete(delete_section_handler::<R>),
        )
        .route(
            "/api/v1/sections/:section_id/articles",
            post(add_article_handler::<R>),
        )
        .route(
            "/api/v1/articles/:article_id",
            patch(update_article_handler::<R>).delete(delete_article_handler::<R>),
        )
        .route("/api/v1/tutors/me/courses", get(mine_handler::<R>))
        .route(
            "/api/v1/staff/courses/pending",
            get(pending_handler::<R>),
        )
        .route(
            "/api/v1/staff/courses/:course_id/review",
            post(review_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Json(request): Json<NewCourse>,
) -> Result<Response, WorkflowError> {
    let course = service.create(request, &tutor)?;
    Ok((StatusCode::CREATED, Json(course)).into_response())
}

pub(crate) async fn published_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
) -> Result<Response, WorkflowError> {
    Ok(Json(service.list_published()?).into_response())
}

pub(crate) async fn detail_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Path(course_id): Path<String>,
) -> Result<Response, WorkflowError> {
    Ok(Json(service.get(&CourseId(course_id))?).into_response())
}

pub(crate) async fn update_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(course_id): Path<String>,
    Json(request): Json<CourseUpdate>,
) -> Result<Response, WorkflowError> {
    let course = service.update(&CourseId(course_id), request, &tutor)?;
    Ok(Json(course).into_response())
}

pub(crate) async fn delete_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(course_id): Path<String>,
) -> Result<StatusCode, WorkflowError> {
    service.delete(&CourseId(course_id), &tutor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn submit_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(course_id): Path<String>,
) -> Result<Response, WorkflowError> {
    let course = service.submit_for_review(&CourseId(course_id), &tutor)?;
    Ok(Json(course).into_response())
}

pub(crate) async fn add_section_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(course_id): Path<String>,
    Json(request): Json<NewSection>,
) -> Result<Response, WorkflowError> {
    let section = service.add_section(&CourseId(course_id), request, &tutor)?;
    Ok((StatusCode::CREATED, Json(section)).into_response())
}

pub(crate) async fn update_section_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(section_id): Path<String>,
    Json(request): Json<SectionUpdate>,
) -> Result<Response, WorkflowError> {
    let section = service.update_section(&SectionId(section_id), request, &tutor)?;
    Ok(Json(section).into_response())
}

pub(crate) async fn delete_section_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(section_id): Path<String>,
) -> Result<StatusCode, WorkflowError> {
    service.delete_section(&SectionId(section_id), &tutor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn add_article_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(section_id): Path<String>,
    Json(request): Json<NewArticle>,
) -> Result<Response, WorkflowError> {
    let article = service.add_article(&SectionId(section_id), request, &tutor)?;
    Ok((StatusCode::CREATED, Json(article)).into_response())
}

pub(crate) async fn update_article_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(article_id): Path<String>,
    Json(request): Json<ArticleUpdate>,
) -> Result<Response, WorkflowError> {
    let article = service.update_article(&ArticleId(article_id), request, &tutor)?;
    Ok(Json(article).into_response())
}

pub(crate) async fn delete_article_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
    Path(article_id): Path<String>,
) -> Result<StatusCode, WorkflowError> {
    service.delete_article(&ArticleId(article_id), &tutor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn mine_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(tutor): Actor,
) -> Result<Response, WorkflowError> {
    Ok(Json(service.list_by_tutor(&tutor)?).into_response())
}

pub(crate) async fn pending_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(_staff): Actor,
) -> Result<Response, WorkflowError> {
    Ok(Json(service.list_pending_review()?).into_response())
}

pub(crate) async fn review_handler<R: CourseRepository + 'static>(
    State(service): Shared<R>,
    Actor(staff): Actor,
    Path(course_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Response, WorkflowError> {
    let course =
        service.review_by_staff(&CourseId(course_id), request.status, request.feedback, &staff)?;
    Ok(Json(course).into_response())
}
