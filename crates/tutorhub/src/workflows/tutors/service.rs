use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::notifications::{Notification, NotificationDispatcher, NotificationKind};
use crate::workflows::{UserId, WorkflowError};

use super::domain::{
    TutorApplication, TutorApplicationId, TutorApplicationStatus, TutorApplicationSubmission,
    TutorDecision,
};
use super::repository::TutorApplicationRepository;

/// Precondition consulted before anyone may author a course.
pub trait TutorGate: Send + Sync {
    fn is_accepted_tutor(&self, applicant: &UserId) -> Result<bool, WorkflowError>;
}

/// Service owning the tutor application lifecycle.
pub struct TutorVettingService<R> {
    repository: Arc<R>,
    notifications: NotificationDispatcher,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> TutorApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TutorApplicationId(format!("tapp-{id:06}"))
}

impl<R> TutorVettingService<R>
where
    R: TutorApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, notifications: NotificationDispatcher) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Submit an application. A previously denied application is discarded first.
    pub fn apply(
        &self,
        applicant: &UserId,
        submission: TutorApplicationSubmission,
    ) -> Result<TutorApplication, WorkflowError> {
        if let Some(existing) = self.repository.find_by_applicant(applicant)? {
            if existing.status.is_active() {
                return Err(WorkflowError::Conflict(format!(
                    "applicant {applicant} already has a {} tutor application",
                    existing.status.label()
                )));
            }

            // A concurrent re-application may already have removed it; the
            // insert below still enforces the single-active invariant.
            self.repository
                .delete_if(&existing.id, TutorApplicationStatus::Denied)?;
        }

        let TutorApplicationSubmission {
            experience,
            qualifications,
            bio,
        } = submission;

        let application = TutorApplication {
            id: next_application_id(),
            applicant: applicant.clone(),
            experience,
            qualifications,
            bio,
            status: TutorApplicationStatus::Pending,
            submitted_at: Utc::now(),
            processed_at: None,
            decided_by: None,
            feedback: None,
        };

        let stored = self.repository.insert(application).map_err(|err| {
            match WorkflowError::from(err) {
                WorkflowError::Conflict(_) => WorkflowError::Conflict(format!(
                    "applicant {applicant} already has an active tutor application"
                )),
                other => other,
            }
        })?;

        info!(application_id = %stored.id.0, %applicant, "tutor application submitted");
        Ok(stored)
    }

    pub fn check_status(&self, applicant: &UserId) -> Result<TutorApplication, WorkflowError> {
        self.repository
            .find_by_applicant(applicant)?
            .ok_or_else(|| no_application_for(applicant))
    }

    /// Withdraw a pending application.
    pub fn cancel(&self, applicant: &UserId) -> Result<(), WorkflowError> {
        let existing = self
            .repository
            .find_by_applicant(applicant)?
            .ok_or_else(|| no_application_for(applicant))?;

        if existing.status != TutorApplicationStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "only pending applications can be cancelled; application {} is {}",
                existing.id.0,
                existing.status.label()
            )));
        }

        if !self
            .repository
            .delete_if(&existing.id, TutorApplicationStatus::Pending)?
        {
            return Err(WorkflowError::InvalidState(format!(
                "application {} was decided before it could be cancelled",
                existing.id.0
            )));
        }

        info!(application_id = %existing.id.0, %applicant, "tutor application cancelled");
        Ok(())
    }

    /// Record a staff decision and notify the applicant without waiting on delivery.
    pub fn decide(
        &self,
        application_id: &TutorApplicationId,
        decision: TutorDecision,
        feedback: impl Into<String>,
        staff: &UserId,
    ) -> Result<TutorApplication, WorkflowError> {
        let mut application = self.repository.fetch(application_id)?.ok_or_else(|| {
            WorkflowError::NotFound(format!("tutor application {} not found", application_id.0))
        })?;

        if application.status != TutorApplicationStatus::Pending {
            return Err(already_decided(&application));
        }

        let feedback = feedback.into();
        application.status = decision.into();
        application.processed_at = Some(Utc::now());
        application.decided_by = Some(staff.clone());
        application.feedback = Some(feedback.clone()).filter(|text| !text.is_empty());

        if !self
            .repository
            .replace_if(application.clone(), TutorApplicationStatus::Pending)?
        {
            return Err(already_decided(&application));
        }

        info!(
            application_id = %application.id.0,
            applicant = %application.applicant,
            %staff,
            status = application.status.label(),
            "tutor application decided"
        );

        let kind = match decision {
            TutorDecision::Accepted => NotificationKind::TutorApplicationAccepted,
            TutorDecision::Denied => NotificationKind::TutorApplicationDenied,
        };
        self.notifications.dispatch(Notification {
            kind,
            recipient: application.applicant.clone(),
            subject_id: application.id.0.clone(),
            feedback,
        });

        Ok(application)
    }

    pub fn is_accepted_tutor(&self, applicant: &UserId) -> Result<bool, WorkflowError> {
        Ok(self
            .repository
            .find_by_applicant(applicant)?
            .is_some_and(|application| application.status == TutorApplicationStatus::Accepted))
    }

    /// Applications awaiting a staff decision, oldest first.
    pub fn list_pending(&self) -> Result<Vec<TutorApplication>, WorkflowError> {
        Ok(self.repository.pending()?)
    }
}

impl<R> TutorGate for TutorVettingService<R>
where
    R: TutorApplicationRepository + 'static,
{
    fn is_accepted_tutor(&self, applicant: &UserId) -> Result<bool, WorkflowError> {
        TutorVettingService::is_accepted_tutor(self, applicant)
    }
}

fn no_application_for(applicant: &UserId) -> WorkflowError {
    WorkflowError::NotFound(format!("no tutor application found for {applicant}"))
}

fn already_decided(application: &TutorApplication) -> WorkflowError {
    WorkflowError::InvalidState(format!(
        "tutor application {} has already been processed",
        application.id.0
    ))
}
