use crate::workflows::{RepositoryError, UserId};

use super::completeness::{Completeness, CompletenessChecker};
use super::domain::{
    Article, ArticleId, Course, CourseId, CourseStatus, CourseTree, Section, SectionId,
    SectionTree,
};

/// Result of a status write that also requires the stored content to be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite {
    Written,
    /// The stored status no longer matched the expected one.
    StatusChanged,
    /// The stored tree failed the completeness check; nothing was written.
    Incomplete(Completeness),
}

/// Arena-style storage: courses, sections, and articles live in separate
/// tables and point at their parent by id.
///
/// Section and article writes fail with [`RepositoryError::Locked`] while the
/// owning course is pending review. The check happens atomically with the write.
pub trait CourseRepository: Send + Sync {
    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError>;

    /// Overwrite the course only while its stored status is still `expected`.
    /// Returns whether it wrote; [`RepositoryError::NotFound`] if the course is gone.
    fn replace_course_if(
        &self,
        course: Course,
        expected: CourseStatus,
    ) -> Result<bool, RepositoryError>;

    /// Like [`CourseRepository::replace_course_if`], but also assesses the stored
    /// content tree with `checker` and writes only when it is complete.
    fn replace_course_if_complete(
        &self,
        course: Course,
        expected: CourseStatus,
        checker: &CompletenessChecker,
    ) -> Result<GuardedWrite, RepositoryError>;

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;

    /// Removes the course along with its sections and their articles.
    fn delete_course(&self, id: &CourseId) -> Result<(), RepositoryError>;

    fn courses_with_status(&self, status: CourseStatus) -> Result<Vec<Course>, RepositoryError>;

    fn courses_by_tutor(&self, tutor: &UserId) -> Result<Vec<Course>, RepositoryError>;

    /// Appends the section after the course's last one; the stored position is returned.
    fn insert_section(&self, section: Section) -> Result<Section, RepositoryError>;

    fn update_section(&self, section: Section) -> Result<(), RepositoryError>;

    fn fetch_section(&self, id: &SectionId) -> Result<Option<Section>, RepositoryError>;

    /// Removes the section and its articles.
    fn delete_section(&self, id: &SectionId) -> Result<(), RepositoryError>;

    /// Sections of a course in position order.
    fn sections_for(&self, course: &CourseId) -> Result<Vec<Section>, RepositoryError>;

    /// Appends the article after the section's last one; the stored position is returned.
    fn insert_article(&self, article: Article) -> Result<Article, RepositoryError>;

    fn update_article(&self, article: Article) -> Result<(), RepositoryError>;

    fn fetch_article(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError>;

    fn delete_article(&self, id: &ArticleId) -> Result<(), RepositoryError>;

    /// Articles of a section in position order.
    fn articles_for(&self, section: &SectionId) -> Result<Vec<Article>, RepositoryError>;

    fn load_tree(&self, id: &CourseId) -> Result<Option<CourseTree>, RepositoryError> {
        let Some(course) = self.fetch_course(id)? else {
            return Ok(None);
        };

        let sections = self
            .sections_for(id)?
            .into_iter()
            .map(|section| {
                let articles = self.articles_for(&section.id)?;
                Ok(SectionTree { section, articles })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(CourseTree { course, sections }))
    }
}
