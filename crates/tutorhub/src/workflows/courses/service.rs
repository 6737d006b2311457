use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::notifications::{Notification, NotificationDispatcher, NotificationKind};
use crate::workflows::tutors::TutorGate;
use crate::workflows::{UserId, WorkflowError};

use super::completeness::{Completeness, CompletenessChecker};
use super::domain::{
    Article, ArticleId, ArticleUpdate, Course, CourseId, CourseStatus, CourseTree, CourseUpdate,
    NewArticle, NewCourse, NewSection, Section, SectionId, SectionUpdate,
};
use super::ownership::OwnershipGuard;
use super::repository::{CourseRepository, GuardedWrite};

/// Service composing the ownership guard, completeness checker, and course storage.
pub struct CourseService<R> {
    repository: Arc<R>,
    tutors: Arc<dyn TutorGate>,
    notifications: NotificationDispatcher,
    guard: OwnershipGuard,
    completeness: CompletenessChecker,
}

static COURSE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SECTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ARTICLE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_course_id() -> CourseId {
    let id = COURSE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CourseId(format!("course-{id:06}"))
}

fn next_section_id() -> SectionId {
    let id = SECTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SectionId(format!("section-{id:06}"))
}

fn next_article_id() -> ArticleId {
    let id = ARTICLE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ArticleId(format!("article-{id:06}"))
}

impl<R> CourseService<R>
where
    R: CourseRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        tutors: Arc<dyn TutorGate>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            repository,
            tutors,
            notifications,
            guard: OwnershipGuard,
            completeness: CompletenessChecker,
        }
    }

    /// Create a draft course. Only accepted tutors may author courses.
    pub fn create(&self, request: NewCourse, tutor: &UserId) -> Result<Course, WorkflowError> {
        if !self.tutors.is_accepted_tutor(tutor)? {
            return Err(WorkflowError::Forbidden(format!(
                "{tutor} is not an accepted tutor"
            )));
        }

        let price = request.price.unwrap_or(Decimal::ZERO);
        require_non_negative(price)?;

        let now = Utc::now();
        let course = Course {
            id: next_course_id(),
            title: require_title(&request.title, "course")?,
            description: request.description,
            category: request.category,
            tutor_id: tutor.clone(),
            price,
            status: CourseStatus::Draft,
            review_feedback: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_course(course)?;
        info!(course_id = %stored.id.0, %tutor, "course created");
        Ok(stored)
    }

    /// Apply the fields present in `request`; absent fields stay as they are.
    pub fn update(
        &self,
        course_id: &CourseId,
        request: CourseUpdate,
        tutor: &UserId,
    ) -> Result<Course, WorkflowError> {
        let mut course = self.owned_course(course_id, tutor)?;
        ensure_unlocked(&course)?;

        let CourseUpdate {
            title,
            description,
            category,
            price,
        } = request;

        if let Some(title) = title {
            course.title = require_title(&title, "course")?;
        }
        if let Some(description) = description {
            course.description = description;
        }
        if let Some(category) = category {
            course.category = category;
        }
        if let Some(price) = price {
            require_non_negative(price)?;
            course.price = price;
        }
        course.updated_at = Utc::now();

        let status = course.status;
        self.write_course(course.clone(), status)?;
        debug!(course_id = %course.id.0, "course updated");
        Ok(course)
    }

    /// Delete a course in any status, cascading to its sections and articles.
    pub fn delete(&self, course_id: &CourseId, tutor: &UserId) -> Result<(), WorkflowError> {
        let course = self.owned_course(course_id, tutor)?;
        self.repository.delete_course(&course.id)?;
        info!(course_id = %course.id.0, %tutor, status = course.status.label(), "course deleted");
        Ok(())
    }

    /// Move a draft or rejected course into staff review once its content is complete.
    /// The completeness check and the status write happen in one store operation.
    pub fn submit_for_review(
        &self,
        course_id: &CourseId,
        tutor: &UserId,
    ) -> Result<Course, WorkflowError> {
        let mut course = self.owned_course(course_id, tutor)?;

        let previous = course.status;
        if !previous.can_submit() {
            return Err(WorkflowError::BadRequest(format!(
                "course {} cannot be submitted while {}",
                course_id.0,
                previous.label()
            )));
        }

        course.status = CourseStatus::PendingReview;
        course.updated_at = Utc::now();
        match self.repository.replace_course_if_complete(
            course.clone(),
            previous,
            &self.completeness,
        )? {
            GuardedWrite::Written => {}
            GuardedWrite::StatusChanged => return Err(status_changed()),
            GuardedWrite::Incomplete(verdict) => return Err(incomplete(verdict)),
        }

        info!(course_id = %course.id.0, %tutor, "course submitted for review");
        Ok(course)
    }

    /// Staff verdict on a course under review. `new_status` must be published or rejected.
    pub fn review_by_staff(
        &self,
        course_id: &CourseId,
        new_status: CourseStatus,
        feedback: impl Into<String>,
        staff: &UserId,
    ) -> Result<Course, WorkflowError> {
        let kind = match new_status {
            CourseStatus::Published => NotificationKind::CoursePublished,
            CourseStatus::Rejected => NotificationKind::CourseRejected,
            other => {
                return Err(WorkflowError::IllegalArgument(format!(
                    "review decision must be published or rejected, got {}",
                    other.label()
                )))
            }
        };

        let mut course = self
            .repository
            .fetch_course(course_id)?
            .ok_or_else(|| course_not_found(course_id))?;
        if course.status != CourseStatus::PendingReview {
            return Err(WorkflowError::BadRequest(format!(
                "course {} is not pending review (currently {})",
                course_id.0,
                course.status.label()
            )));
        }

        let feedback = feedback.into();
        course.status = new_status;
        course.review_feedback = Some(feedback.clone()).filter(|text| !text.is_empty());
        course.updated_at = Utc::now();

        let outcome = if new_status == CourseStatus::Published {
            self.repository.replace_course_if_complete(
                course.clone(),
                CourseStatus::PendingReview,
                &self.completeness,
            )?
        } else if self
            .repository
            .replace_course_if(course.clone(), CourseStatus::PendingReview)?
        {
            GuardedWrite::Written
        } else {
            GuardedWrite::StatusChanged
        };
        match outcome {
            GuardedWrite::Written => {}
            GuardedWrite::StatusChanged => {
                return Err(WorkflowError::BadRequest(format!(
                    "course {} was reviewed concurrently",
                    course_id.0
                )))
            }
            GuardedWrite::Incomplete(verdict) => return Err(incomplete(verdict)),
        }

        info!(
            course_id = %course.id.0,
            %staff,
            status = course.status.label(),
            "course reviewed"
        );

        self.notifications.dispatch(Notification {
            kind,
            recipient: course.tutor_id.clone(),
            subject_id: course.id.0.clone(),
            feedback,
        });

        Ok(course)
    }

    pub fn list_pending_review(&self) -> Result<Vec<Course>, WorkflowError> {
        Ok(self
            .repository
            .courses_with_status(CourseStatus::PendingReview)?)
    }

    pub fn list_published(&self) -> Result<Vec<Course>, WorkflowError> {
        Ok(self
            .repository
            .courses_with_status(CourseStatus::Published)?)
    }

    pub fn list_by_tutor(&self, tutor: &UserId) -> Result<Vec<Course>, WorkflowError> {
        Ok(self.repository.courses_by_tutor(tutor)?)
    }

    pub fn get(&self, course_id: &CourseId) -> Result<CourseTree, WorkflowError> {
        self.tree(course_id)
    }

    pub fn add_section(
        &self,
        course_id: &CourseId,
        request: NewSection,
        tutor: &UserId,
    ) -> Result<Section, WorkflowError> {
        let course = self.owned_course(course_id, tutor)?;
        ensure_unlocked(&course)?;

        let section = Section {
            id: next_section_id(),
            course_id: course.id.clone(),
            title: require_title(&request.title, "section")?,
            position: 0,
        };

        let stored = self.repository.insert_section(section)?;
        debug!(course_id = %course.id.0, section_id = %stored.id.0, "section added");
        Ok(stored)
    }

    pub fn update_section(
        &self,
        section_id: &SectionId,
        request: SectionUpdate,
        tutor: &UserId,
    ) -> Result<Section, WorkflowError> {
        let mut section = self.section(section_id)?;
        let course = self.course_of_section(&section, tutor)?;
        ensure_unlocked(&course)?;

        if let Some(title) = request.title {
            section.title = require_title(&title, "section")?;
        }

        self.repository.update_section(section.clone())?;
        Ok(section)
    }

    /// Remove a section together with its articles.
    pub fn delete_section(
        &self,
        section_id: &SectionId,
        tutor: &UserId,
    ) -> Result<(), WorkflowError> {
        let section = self.section(section_id)?;
        let course = self.course_of_section(&section, tutor)?;
        ensure_unlocked(&course)?;

        self.repository.delete_section(&section.id)?;
        debug!(course_id = %course.id.0, section_id = %section.id.0, "section deleted");
        Ok(())
    }

    pub fn add_article(
        &self,
        section_id: &SectionId,
        request: NewArticle,
        tutor: &UserId,
    ) -> Result<Article, WorkflowError> {
        let section = self.section(section_id)?;
        let course = self.course_of_section(&section, tutor)?;
        ensure_unlocked(&course)?;

        let article = Article {
            id: next_article_id(),
            section_id: section.id.clone(),
            title: require_title(&request.title, "article")?,
            content: request.content,
            content_type: request.content_type,
            position: 0,
        };

        let stored = self.repository.insert_article(article)?;
        debug!(
            course_id = %course.id.0,
            section_id = %section.id.0,
            article_id = %stored.id.0,
            "article added"
        );
        Ok(stored)
    }

    pub fn update_article(
        &self,
        article_id: &ArticleId,
        request: ArticleUpdate,
        tutor: &UserId,
    ) -> Result<Article, WorkflowError> {
        let mut article = self.article(article_id)?;
        let course = self.course_of_article(&article, tutor)?;
        ensure_unlocked(&course)?;

        let ArticleUpdate {
            title,
            content,
            content_type,
        } = request;
        if let Some(title) = title {
            article.title = require_title(&title, "article")?;
        }
        if let Some(content) = content {
            article.content = content;
        }
        if let Some(content_type) = content_type {
            article.content_type = content_type;
        }

        self.repository.update_article(article.clone())?;
        Ok(article)
    }

    pub fn delete_article(
        &self,
        article_id: &ArticleId,
        tutor: &UserId,
    ) -> Result<(), WorkflowError> {
        let article = self.article(article_id)?;
        let course = self.course_of_article(&article, tutor)?;
        ensure_unlocked(&course)?;

        self.repository.delete_article(&article.id)?;
        debug!(course_id = %course.id.0, article_id = %article.id.0, "article deleted");
        Ok(())
    }

    fn tree(&self, course_id: &CourseId) -> Result<CourseTree, WorkflowError> {
        self.repository
            .load_tree(course_id)?
            .ok_or_else(|| course_not_found(course_id))
    }

    fn owned_course(&self, course_id: &CourseId, tutor: &UserId) -> Result<Course, WorkflowError> {
        let course = self
            .repository
            .fetch_course(course_id)?
            .ok_or_else(|| course_not_found(course_id))?;
        self.guard.verify(Some(&course), tutor)?;
        Ok(course)
    }

    fn section(&self, section_id: &SectionId) -> Result<Section, WorkflowError> {
        self.repository
            .fetch_section(section_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("section {} not found", section_id.0)))
    }

    fn article(&self, article_id: &ArticleId) -> Result<Article, WorkflowError> {
        self.repository
            .fetch_article(article_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("article {} not found", article_id.0)))
    }

    /// Resolve the owning course through the back-reference, then check ownership.
    fn course_of_section(&self, section: &Section, tutor: &UserId) -> Result<Course, WorkflowError> {
        let course = self.repository.fetch_course(&section.course_id)?;
        self.guard.verify(course.as_ref(), tutor).cloned()
    }

    fn course_of_article(&self, article: &Article, tutor: &UserId) -> Result<Course, WorkflowError> {
        let section = self.repository.fetch_section(&article.section_id)?.ok_or_else(|| {
            WorkflowError::Internal(format!(
                "article {} points at missing section {}",
                article.id.0, article.section_id.0
            ))
        })?;
        self.course_of_section(&section, tutor)
    }

    fn write_course(&self, course: Course, expected: CourseStatus) -> Result<(), WorkflowError> {
        if self.repository.replace_course_if(course, expected)? {
            Ok(())
        } else {
            Err(status_changed())
        }
    }
}

fn status_changed() -> WorkflowError {
    WorkflowError::Conflict("course status changed concurrently; reload and retry".to_string())
}

fn incomplete(verdict: Completeness) -> WorkflowError {
    match verdict.into_result() {
        Err(error) => error,
        Ok(()) => {
            WorkflowError::Internal("complete course was refused by the store".to_string())
        }
    }
}

fn course_not_found(course_id: &CourseId) -> WorkflowError {
    WorkflowError::NotFound(format!("course {} not found", course_id.0))
}

fn ensure_unlocked(course: &Course) -> Result<(), WorkflowError> {
    if course.status.is_locked() {
        return Err(WorkflowError::Forbidden(format!(
            "course {} is locked while pending review",
            course.id.0
        )));
    }
    Ok(())
}

fn require_title(raw: &str, what: &str) -> Result<String, WorkflowError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(WorkflowError::BadRequest(format!("{what} title must not be blank")));
    }
    Ok(title.to_string())
}

fn require_non_negative(price: Decimal) -> Result<(), WorkflowError> {
    if price < Decimal::ZERO {
        return Err(WorkflowError::BadRequest(format!(
            "price must not be negative, got {price}"
        )));
    }
    Ok(())
}
