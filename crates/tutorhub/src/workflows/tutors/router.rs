use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::workflows::{Actor, WorkflowError};

use super::domain::{TutorApplicationId, TutorApplicationSubmission, TutorDecision};
use super::repository::TutorApplicationRepository;
use super::service::TutorVettingService;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: TutorDecision,
    #[serde(default)]
    pub feedback: String,
}

/// Router exposing applicant and staff endpoints. Staff role checks happen upstream.
pub fn tutor_router<R>(service: Arc<TutorVettingService<R>>) -> Router
where
    R: TutorApplicationRepository + 'static,
{
    Router::new()
        .route("/api/v1/tutor-applications", post(apply_handler::<R>))
        .route(
            "/api/v1/tutor-applications/me",
            get(status_handler::<R>).delete(cancel_handler::<R>),
        )
        .route(
            "/api/v1/staff/tutor-applications",
            get(pending_handler::<R>),
        )
        .route(
            "/api/v1/staff/tutor-applications/:application_id/decision",
            post(decision_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn apply_handler<R>(
    State(service): State<Arc<TutorVettingService<R>>>,
    Actor(applicant): Actor,
    Json(submission): Json<TutorApplicationSubmission>,
) -> Result<Response, WorkflowError>
where
    R: TutorApplicationRepository + 'static,
{
    let application = service.apply(&applicant, submission)?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<TutorVettingService<R>>>,
    Actor(applicant): Actor,
) -> Result<Response, WorkflowError>
where
    R: TutorApplicationRepository + 'static,
{
    let application = service.check_status(&applicant)?;
    Ok(Json(application).into_response())
}

pub(crate) async fn cancel_handler<R>(
    State(service): State<Arc<TutorVettingService<R>>>,
    Actor(applicant): Actor,
) -> Result<StatusCode, WorkflowError>
where
    R: TutorApplicationRepository + 'static,
{
    service.cancel(&applicant)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn pending_handler<R>(
    State(service): State<Arc<TutorVettingService<R>>>,
    Actor(_staff): Actor,
) -> Result<Response, WorkflowError>
where
    R: TutorApplicationRepository + 'static,
{
    let pending = service.list_pending()?;
    Ok(Json(pending).into_response())
}

pub(crate) async fn decision_handler<R>(
    State(service): State<Arc<TutorVettingService<R>>>,
    Actor(staff): Actor,
    Path(application_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Response, WorkflowError>
where
    R: TutorApplicationRepository + 'static,
{
    let id = TutorApplicationId(application_id);
    let application = service.decide(&id, request.decision, request.feedback, &staff)?;
    Ok(Json(application).into_response())
}
