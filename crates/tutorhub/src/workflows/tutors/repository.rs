use crate::workflows::{RepositoryError, UserId};

use super::domain::{TutorApplication, TutorApplicationId, TutorApplicationStatus};

/// Storage abstraction for tutor applications.
///
/// Implementations must enforce, atomically with the write, that an applicant
/// never holds more than one application in a pending or accepted state.
pub trait TutorApplicationRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the applicant already has an active application.
    fn insert(&self, application: TutorApplication)
        -> Result<TutorApplication, RepositoryError>;

    fn fetch(&self, id: &TutorApplicationId)
        -> Result<Option<TutorApplication>, RepositoryError>;

    /// The applicant's active application if one exists, otherwise their latest one.
    fn find_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Option<TutorApplication>, RepositoryError>;

    /// Overwrite the stored record only while it is still in `expected`. Returns whether it wrote.
    fn replace_if(
        &self,
        application: TutorApplication,
        expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError>;

    /// Remove the record only while it is still in `expected`. Returns whether it removed.
    fn delete_if(
        &self,
        id: &TutorApplicationId,
        expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError>;

    /// Pending applications, oldest submission first.
    fn pending(&self) -> Result<Vec<TutorApplication>, RepositoryError>;
}
