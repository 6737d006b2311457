use crate::workflows::{RepositoryError, UserId};

use super::domain::{Enrollment, EnrollmentId, EnrollmentStatus};

/// Storage abstraction for enrollments.
pub trait EnrollmentRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the student already holds a
    /// pending or enrolled record for the same course. The check and the write are atomic.
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;

    fn fetch(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;

    /// Overwrite the record only while its stored status is still `expected`.
    /// Returns whether it wrote; [`RepositoryError::NotFound`] if the record is gone.
    fn replace_if(
        &self,
        enrollment: Enrollment,
        expected: EnrollmentStatus,
    ) -> Result<bool, RepositoryError>;

    /// Every enrollment of the student regardless of status, oldest first.
    fn for_student(&self, student: &UserId) -> Result<Vec<Enrollment>, RepositoryError>;
}
