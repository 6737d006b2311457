use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::notifications::testing::RecordingSink;
use crate::notifications::{NotificationDispatcher, NotificationWorker};
use crate::store::MemoryStore;
use crate::workflows::tutors::{
    TutorApplication, TutorApplicationId, TutorApplicationRepository, TutorApplicationStatus,
    TutorApplicationSubmission, TutorVettingService,
};
use crate::workflows::{RepositoryError, UserId, ACTOR_HEADER};

pub(super) struct Harness {
    pub(super) service: Arc<TutorVettingService<MemoryStore>>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) worker: NotificationWorker,
    pub(super) sink: Arc<RecordingSink>,
}

pub(super) fn build_service() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::default());
    let (dispatcher, worker) = NotificationDispatcher::channel(sink.clone());
    let service = Arc::new(TutorVettingService::new(store.clone(), dispatcher));
    Harness {
        service,
        store,
        worker,
        sink,
    }
}

pub(super) fn user(name: &str) -> UserId {
    UserId::new(name)
}

pub(super) fn submission() -> TutorApplicationSubmission {
    TutorApplicationSubmission {
        experience: "Six years teaching secondary physics".to_string(),
        qualifications: "PGCE, BSc Physics".to_string(),
        bio: "I like explaining things with diagrams.".to_string(),
    }
}

pub(super) struct UnavailableRepository;

impl TutorApplicationRepository for UnavailableRepository {
    fn insert(
        &self,
        _application: TutorApplication,
    ) -> Result<TutorApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _id: &TutorApplicationId,
    ) -> Result<Option<TutorApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_applicant(
        &self,
        _applicant: &UserId,
    ) -> Result<Option<TutorApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_if(
        &self,
        _application: TutorApplication,
        _expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_if(
        &self,
        _id: &TutorApplicationId,
        _expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self) -> Result<Vec<TutorApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("valid request")
}

pub(super) fn empty_request(method: &str, uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
