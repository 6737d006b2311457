use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::notifications::testing::RecordingSink;
use crate::notifications::{NotificationDispatcher, NotificationWorker};
use crate::store::MemoryStore;
use crate::workflows::courses::{
    Article, ArticleId, CompletenessChecker, Course, CourseId, CourseRepository, CourseService,
    CourseStatus, CourseTree, GuardedWrite, NewArticle, NewCourse, NewSection, Section, SectionId,
};
use crate::workflows::tutors::TutorGate;
use crate::workflows::{RepositoryError, UserId, WorkflowError, ACTOR_HEADER};

pub(super) const TUTOR: &str = "tina";
pub(super) const OTHER_TUTOR: &str = "otto";
pub(super) const STAFF: &str = "staff-1";

/// Gate with a fixed roster of accepted tutors.
pub(super) struct Roster(HashSet<UserId>);

impl TutorGate for Roster {
    fn is_accepted_tutor(&self, applicant: &UserId) -> Result<bool, WorkflowError> {
        Ok(self.0.contains(applicant))
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<CourseService<MemoryStore>>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) worker: NotificationWorker,
    pub(super) sink: Arc<RecordingSink>,
}

pub(super) fn build_service() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let roster = Roster([user(TUTOR), user(OTHER_TUTOR)].into_iter().collect());
    let sink = Arc::new(RecordingSink::default());
    let (dispatcher, worker) = NotificationDispatcher::channel(sink.clone());
    let service = Arc::new(CourseService::new(store.clone(), Arc::new(roster), dispatcher));
    Harness {
        service,
        store,
        worker,
        sink,
    }
}

type Interleaving = Box<dyn FnOnce(&MemoryStore) + Send>;

/// Delegates to a [`MemoryStore`] but runs a one-shot callback right before the
/// next status transition, article insert, or section delete reaches the store.
/// Lets tests land a competing write between a service's read and its write.
pub(super) struct InterleavingStore {
    pub(super) inner: MemoryStore,
    pending: Mutex<Option<Interleaving>>,
}

impl InterleavingStore {
    pub(super) fn before_next_write(
        &self,
        interleaving: impl FnOnce(&MemoryStore) + Send + 'static,
    ) {
        *self.pending.lock().expect("interleaving mutex") = Some(Box::new(interleaving));
    }

    fn interleave(&self) {
        let pending = self.pending.lock().expect("interleaving mutex").take();
        if let Some(interleaving) = pending {
            interleaving(&self.inner);
        }
    }
}

impl CourseRepository for InterleavingStore {
    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        self.inner.insert_course(course)
    }

    fn replace_course_if(
        &self,
        course: Course,
        expected: CourseStatus,
    ) -> Result<bool, RepositoryError> {
        self.inner.replace_course_if(course, expected)
    }

    fn replace_course_if_complete(
        &self,
        course: Course,
        expected: CourseStatus,
        checker: &CompletenessChecker,
    ) -> Result<GuardedWrite, RepositoryError> {
        self.interleave();
        self.inner.replace_course_if_complete(course, expected, checker)
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        self.inner.fetch_course(id)
    }

    fn delete_course(&self, id: &CourseId) -> Result<(), RepositoryError> {
        self.inner.delete_course(id)
    }

    fn courses_with_status(&self, status: CourseStatus) -> Result<Vec<Course>, RepositoryError> {
        self.inner.courses_with_status(status)
    }

    fn courses_by_tutor(&self, tutor: &UserId) -> Result<Vec<Course>, RepositoryError> {
        self.inner.courses_by_tutor(tutor)
    }

    fn insert_section(&self, section: Section) -> Result<Section, RepositoryError> {
        self.inner.insert_section(section)
    }

    fn update_section(&self, section: Section) -> Result<(), RepositoryError> {
        self.inner.update_section(section)
    }

    fn fetch_section(&self, id: &SectionId) -> Result<Option<Section>, RepositoryError> {
        self.inner.fetch_section(id)
    }

    fn delete_section(&self, id: &SectionId) -> Result<(), RepositoryError> {
        self.interleave();
        self.inner.delete_section(id)
    }

    fn sections_for(&self, course: &CourseId) -> Result<Vec<Section>, RepositoryError> {
        self.inner.sections_for(course)
    }

    fn insert_article(&self, article: Article) -> Result<Article, RepositoryError> {
        self.interleave();
        self.inner.insert_article(article)
    }

    fn update_article(&self, article: Article) -> Result<(), RepositoryError> {
        self.inner.update_article(article)
    }

    fn fetch_article(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError> {
        self.inner.fetch_article(id)
    }

    fn delete_article(&self, id: &ArticleId) -> Result<(), RepositoryError> {
        self.inner.delete_article(id)
    }

    fn articles_for(&self, section: &SectionId) -> Result<Vec<Article>, RepositoryError> {
        self.inner.articles_for(section)
    }

    fn load_tree(&self, id: &CourseId) -> Result<Option<CourseTree>, RepositoryError> {
        self.inner.load_tree(id)
    }
}

pub(super) fn build_interleaved_service() -> (
    Arc<CourseService<InterleavingStore>>,
    Arc<InterleavingStore>,
) {
    let store = Arc::new(InterleavingStore {
        inner: MemoryStore::new(),
        pending: Mutex::new(None),
    });
    let roster = Roster([user(TUTOR)].into_iter().collect());
    let sink = Arc::new(RecordingSink::default());
    let (dispatcher, _worker) = NotificationDispatcher::channel(sink);
    let service = Arc::new(CourseService::new(store.clone(), Arc::new(roster), dispatcher));
    (service, store)
}

/// Move a stored course into review directly, bypassing the service.
pub(super) fn force_pending_review(store: &MemoryStore, course_id: &CourseId) {
    let mut course = store
        .fetch_course(course_id)
        .expect("fetch course")
        .expect("course present");
    let previous = course.status;
    course.status = CourseStatus::PendingReview;
    assert!(store.replace_course_if(course, previous).expect("store available"));
}

pub(super) fn user(name: &str) -> UserId {
    UserId::new(name)
}

pub(super) fn new_course(price: Option<Decimal>) -> NewCourse {
    NewCourse {
        title: "Intro to Rust".to_string(),
        description: "Ownership without tears".to_string(),
        category: "programming".to_string(),
        price,
    }
}

pub(super) fn new_section(title: &str) -> NewSection {
    NewSection {
        title: title.to_string(),
    }
}

pub(super) fn new_article(title: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        content: "Lesson body".to_string(),
        content_type: Default::default(),
    }
}

/// Draft course owned by [`TUTOR`] with one section holding one article.
pub(super) fn complete_draft(harness: &Harness) -> (Course, Section, Article) {
    let tutor = user(TUTOR);
    let course = harness
        .service
        .create(new_course(None), &tutor)
        .expect("course created");
    let section = harness
        .service
        .add_section(&course.id, new_section("Getting started"), &tutor)
        .expect("section added");
    let article = harness
        .service
        .add_article(&section.id, new_article("Installing the toolchain"), &tutor)
        .expect("article added");
    (course, section, article)
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
