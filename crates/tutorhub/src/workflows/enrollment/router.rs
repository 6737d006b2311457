use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::warn;

use crate::workflows::{Actor, WorkflowError};

use super::domain::{EnrollmentId, EnrollmentRequest, PaymentCallback};
use super::repository::EnrollmentRepository;
use super::service::EnrollmentService;

/// Shared secret the payment provider sends with each callback.
pub const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

pub(crate) struct EnrollmentState<R> {
    service: Arc<EnrollmentService<R>>,
    callback_secret: Option<Arc<str>>,
}

impl<R> Clone for EnrollmentState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            callback_secret: self.callback_secret.clone(),
        }
    }
}

/// Router for student enrollment endpoints and the inbound payment callback.
///
/// Without a `callback_secret` the callback route accepts any caller.
pub fn enrollment_router<R>(
    service: Arc<EnrollmentService<R>>,
    callback_secret: Option<String>,
) -> Router
where
    R: EnrollmentRepository + 'static,
{
    let state = EnrollmentState {
        service,
        callback_secret: callback_secret.map(Arc::from),
    };

    Router::new()
        .route("/api/v1/enrollments", post(enroll_handler::<R>))
        .route("/api/v1/enrollments/me", get(mine_handler::<R>))
        .route(
            "/api/v1/enrollments/:enrollment_id",
            get(detail_handler::<R>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/drop",
            post(drop_handler::<R>),
        )
        .route("/api/v1/payments/callback", post(callback_handler::<R>))
        .with_state(state)
}

pub(crate) async fn enroll_handler<R: EnrollmentRepository + 'static>(
    State(state): State<EnrollmentState<R>>,
    Actor(student): Actor,
    Json(request): Json<EnrollmentRequest>,
) -> Result<Response, WorkflowError> {
    let enrollment =
        state
            .service
            .enroll(&student, &request.course_id, &request.payment_method)?;
    Ok((StatusCode::CREATED, Json(enrollment)).into_response())
}

pub(crate) async fn mine_handler<R: EnrollmentRepository + 'static>(
    State(state): State<EnrollmentState<R>>,
    Actor(student): Actor,
) -> Result<Response, WorkflowError> {
    let views = state.service.get_student_enrollments(&student)?;
    Ok(Json(views).into_response())
}

pub(crate) async fn detail_handler<R: EnrollmentRepository + 'static>(
    State(state): State<EnrollmentState<R>>,
    Actor(student): Actor,
    Path(enrollment_id): Path<String>,
) -> Result<Response, WorkflowError> {
    let enrollment = state
        .service
        .get(&EnrollmentId(enrollment_id), &student)?;
    Ok(Json(enrollment).into_response())
}

pub(crate) async fn drop_handler<R: EnrollmentRepository + 'static>(
    State(state): State<EnrollmentState<R>>,
    Actor(student): Actor,
    Path(enrollment_id): Path<String>,
) -> Result<Response, WorkflowError> {
    let enrollment = state
        .service
        .drop_enrollment(&EnrollmentId(enrollment_id), &student)?;
    Ok(Json(enrollment).into_response())
}

/// A not-yet-visible enrollment answers 404 so the provider retries later.
pub(crate) async fn callback_handler<R: EnrollmentRepository + 'static>(
    State(state): State<EnrollmentState<R>>,
    headers: HeaderMap,
    Json(callback): Json<PaymentCallback>,
) -> Result<Response, WorkflowError> {
    if let Some(expected) = state.callback_secret.as_deref() {
        let presented = headers
            .get(CALLBACK_SECRET_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected) {
            warn!(
                enrollment_id = %callback.enrollment_id.0,
                "rejected payment callback with bad secret"
            );
            let payload = json!({ "error": "invalid callback credentials" });
            return Ok((StatusCode::UNAUTHORIZED, Json(payload)).into_response());
        }
    }

    let outcome = state.service.process_payment_callback(callback)?;
    Ok(Json(outcome).into_response())
}
