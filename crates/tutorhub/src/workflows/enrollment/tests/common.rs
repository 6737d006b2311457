use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::store::MemoryStore;
use crate::workflows::courses::{Course, CourseId, CourseRepository, CourseStatus};
use crate::workflows::enrollment::{
    EnrollmentService, IdentityError, IdentityResolver, PaymentCallback, PaymentError,
    PaymentInitiation, PaymentInitiator, PaymentRequest,
};
use crate::workflows::{UserId, ACTOR_HEADER};

pub(super) const STUDENT: &str = "sam";
pub(super) const TUTOR: &str = "tina";

/// How the stub provider answers initiation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Provider {
    Accepting,
    Declining,
    Offline,
}

pub(super) struct StubGateway {
    mode: Provider,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl StubGateway {
    pub(super) fn new(mode: Provider) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().expect("gateway mutex poisoned").clone()
    }
}

impl PaymentInitiator for StubGateway {
    fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError> {
        self.requests
            .lock()
            .expect("gateway mutex poisoned")
            .push(request.clone());
        match self.mode {
            Provider::Accepting => Ok(PaymentInitiation {
                accepted: true,
                reference: Some(format!("pay-{}", request.enrollment_id.0)),
            }),
            Provider::Declining => Ok(PaymentInitiation {
                accepted: false,
                reference: None,
            }),
            Provider::Offline => Err(PaymentError::Unavailable("connection refused".to_string())),
        }
    }
}

#[derive(Default)]
pub(super) struct Directory(HashMap<UserId, String>);

impl Directory {
    pub(super) fn with(name: &str, display: &str) -> Self {
        let mut names = HashMap::new();
        names.insert(UserId::new(name), display.to_string());
        Self(names)
    }
}

impl IdentityResolver for Directory {
    fn display_name(&self, user: &UserId) -> Result<String, IdentityError> {
        self.0
            .get(user)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(user.clone()))
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<EnrollmentService<MemoryStore>>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) gateway: Arc<StubGateway>,
}

pub(super) fn build_service(mode: Provider) -> Harness {
    build_service_with(mode, Directory::with(TUTOR, "Tina Turing"))
}

pub(super) fn build_service_with(mode: Provider, directory: Directory) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(StubGateway::new(mode));
    let service = Arc::new(EnrollmentService::new(
        store.clone(),
        store.clone(),
        gateway.clone(),
        Arc::new(directory),
        &MarketplaceConfig::default(),
    ));
    Harness {
        service,
        store,
        gateway,
    }
}

pub(super) fn user(name: &str) -> UserId {
    UserId::new(name)
}

/// Seed a published course straight into storage.
pub(super) fn published_course(harness: &Harness, id: &str, price: Decimal) -> Course {
    let now = Utc::now();
    let course = Course {
        id: CourseId(id.to_string()),
        title: "Distributed systems".to_string(),
        description: "Consensus, clocks, and failure".to_string(),
        category: "computer science".to_string(),
        tutor_id: user(TUTOR),
        price,
        status: CourseStatus::Published,
        review_feedback: None,
        created_at: now,
        updated_at: now,
    };
    harness
        .store
        .insert_course(course)
        .expect("course stored")
}

pub(super) fn callback(
    enrollment_id: &crate::workflows::enrollment::EnrollmentId,
    course: &CourseId,
    approved: bool,
) -> PaymentCallback {
    PaymentCallback {
        enrollment_id: enrollment_id.clone(),
        student_id: user(STUDENT),
        course_id: course.clone(),
        approved,
        message: if approved {
            String::new()
        } else {
            "card declined".to_string()
        },
    }
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("valid request")
}

pub(super) fn actor(name: &str) -> (&'static str, &str) {
    (ACTOR_HEADER, name)
}

pub(super) fn empty_request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
