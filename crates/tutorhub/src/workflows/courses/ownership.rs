use tracing::warn;

use crate::workflows::{UserId, WorkflowError};

use super::domain::Course;

/// Decides whether a caller may mutate a course or anything inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard;

impl OwnershipGuard {
    /// Callers resolve the course before asking; an absent course is a caller bug.
    /// Hands the verified course back so callers can keep working with it.
    pub fn verify<'a>(
        &self,
        course: Option<&'a Course>,
        claimed_owner: &UserId,
    ) -> Result<&'a Course, WorkflowError> {
        let course = course.ok_or_else(|| {
            WorkflowError::Internal("ownership check reached without a resolved course".into())
        })?;

        if &course.tutor_id != claimed_owner {
            warn!(
                course_id = %course.id.0,
                owner = %course.tutor_id,
                caller = %claimed_owner,
                "rejected mutation by non-owner"
            );
            return Err(WorkflowError::Forbidden(format!(
                "course {} is not owned by {claimed_owner}",
                course.id.0
            )));
        }

        Ok(course)
    }
}
