//! Course authoring and the draft → review → publication lifecycle.

pub mod completeness;
pub mod domain;
pub mod ownership;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use completeness::{Completeness, CompletenessChecker};
pub use domain::{
    Article, ArticleId, ArticleUpdate, ContentType, Course, CourseId, CourseStatus, CourseTree,
    CourseUpdate, NewArticle, NewCourse, NewSection, Section, SectionId, SectionTree,
    SectionUpdate,
};
pub use ownership::OwnershipGuard;
pub use repository::{CourseRepository, GuardedWrite};
pub use router::course_router;
pub use service::CourseService;
