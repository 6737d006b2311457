use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::UserId;

/// Identifier issued when an application is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TutorApplicationId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TutorApplicationStatus {
    Pending,
    Accepted,
    Denied,
}

impl TutorApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TutorApplicationStatus::Pending => "pending",
            TutorApplicationStatus::Accepted => "accepted",
            TutorApplicationStatus::Denied => "denied",
        }
    }

    /// Pending and accepted applications block a new application by the same applicant.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            TutorApplicationStatus::Pending | TutorApplicationStatus::Accepted
        )
    }
}

/// Staff verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TutorDecision {
    Accepted,
    Denied,
}

impl From<TutorDecision> for TutorApplicationStatus {
    fn from(value: TutorDecision) -> Self {
        match value {
            TutorDecision::Accepted => TutorApplicationStatus::Accepted,
            TutorDecision::Denied => TutorApplicationStatus::Denied,
        }
    }
}

/// Free-text answers supplied by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorApplicationSubmission {
    pub experience: String,
    pub qualifications: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorApplication {
    pub id: TutorApplicationId,
    pub applicant: UserId,
    pub experience: String,
    pub qualifications: String,
    pub bio: String,
    pub status: TutorApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    /// Set only when staff decide.
    pub processed_at: Option<DateTime<Utc>>,
    pub decided_by: Option<UserId>,
    pub feedback: Option<String>,
}
