use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::courses::CourseId;
use crate::workflows::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Enrolled,
    Dropped,
    PaymentFailed,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Dropped => "dropped",
            EnrollmentStatus::PaymentFailed => "payment_failed",
        }
    }

    /// At most one active enrollment may exist per student and course.
    pub const fn is_active(self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Enrolled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    /// Price charged, captured when the enrollment was requested.
    pub amount: Decimal,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    /// Set once, when payment is confirmed.
    pub enrolled_at: Option<DateTime<Utc>>,
    pub payment_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub course_id: CourseId,
    pub payment_method: String,
}

/// Already-authenticated confirmation delivered by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub enrollment_id: EnrollmentId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub approved: bool,
    #[serde(default)]
    pub message: String,
}

/// Both variants are successes; a repeated callback is acknowledged, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum CallbackOutcome {
    Applied(EnrollmentStatus),
    AlreadyResolved(EnrollmentStatus),
}

impl CallbackOutcome {
    pub fn status(self) -> EnrollmentStatus {
        match self {
            CallbackOutcome::Applied(status) | CallbackOutcome::AlreadyResolved(status) => status,
        }
    }
}

/// Enrollment resolved against its course for the student's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrolledCourseView {
    pub enrollment_id: EnrollmentId,
    pub course_id: CourseId,
    pub course_title: String,
    pub tutor_name: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_at: Option<DateTime<Utc>>,
}
