use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::MarketplaceConfig;
use crate::workflows::courses::{CourseId, CourseRepository, CourseStatus};
use crate::workflows::{UserId, WorkflowError};

use super::domain::{
    CallbackOutcome, EnrolledCourseView, Enrollment, EnrollmentId, EnrollmentStatus,
    PaymentCallback,
};
use super::identity::IdentityResolver;
use super::payment::{PaymentInitiator, PaymentRequest};
use super::repository::EnrollmentRepository;

const REMOVED_COURSE_TITLE: &str = "Course no longer available";

/// Service creating enrollments and reconciling payment confirmations against them.
pub struct EnrollmentService<R> {
    repository: Arc<R>,
    courses: Arc<dyn CourseRepository>,
    payments: Arc<dyn PaymentInitiator>,
    identities: Arc<dyn IdentityResolver>,
    currency: String,
    identity_placeholder: String,
}

static ENROLLMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_enrollment_id() -> EnrollmentId {
    let id = ENROLLMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EnrollmentId(format!("enr-{id:06}"))
}

impl<R> EnrollmentService<R>
where
    R: EnrollmentRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        courses: Arc<dyn CourseRepository>,
        payments: Arc<dyn PaymentInitiator>,
        identities: Arc<dyn IdentityResolver>,
        config: &MarketplaceConfig,
    ) -> Self {
        Self {
            repository,
            courses,
            payments,
            identities,
            currency: config.currency.clone(),
            identity_placeholder: config.identity_placeholder.clone(),
        }
    }

    /// Record a pending enrollment in a published course and start the payment for it.
    ///
    /// When initiation fails the enrollment stays pending: the provider may
    /// still have charged the student, so its callback (or an operator) decides.
    pub fn enroll(
        &self,
        student: &UserId,
        course_id: &CourseId,
        payment_method: &str,
    ) -> Result<Enrollment, WorkflowError> {
        let course = self
            .courses
            .fetch_course(course_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("course {} not found", course_id.0)))?;
        if course.status != CourseStatus::Published {
            return Err(WorkflowError::BadRequest(format!(
                "course {} is not open for enrollment while {}",
                course_id.0,
                course.status.label()
            )));
        }

        let payment_method = payment_method.trim();
        if payment_method.is_empty() {
            return Err(WorkflowError::BadRequest(
                "payment method must not be blank".to_string(),
            ));
        }

        let enrollment = Enrollment {
            id: next_enrollment_id(),
            student_id: student.clone(),
            course_id: course.id.clone(),
            status: EnrollmentStatus::Pending,
            amount: course.price,
            payment_method: payment_method.to_string(),
            created_at: Utc::now(),
            enrolled_at: None,
            payment_message: None,
        };

        let stored = self.repository.insert(enrollment).map_err(|err| {
            match WorkflowError::from(err) {
                WorkflowError::Conflict(_) => WorkflowError::Conflict(format!(
                    "{student} already has an active enrollment for course {}",
                    course_id.0
                )),
                other => other,
            }
        })?;

        info!(
            enrollment_id = %stored.id.0,
            %student,
            course_id = %course_id.0,
            amount = %stored.amount,
            "enrollment created; initiating payment"
        );

        let request = PaymentRequest {
            enrollment_id: stored.id.clone(),
            student_id: student.clone(),
            course_id: course_id.clone(),
            amount: stored.amount,
            currency: self.currency.clone(),
            method: stored.payment_method.clone(),
        };

        match self.payments.initiate(&request) {
            Ok(initiation) if initiation.accepted => {
                info!(
                    enrollment_id = %stored.id.0,
                    reference = initiation.reference.as_deref().unwrap_or("-"),
                    "payment initiated"
                );
                Ok(stored)
            }
            Ok(_) => {
                warn!(enrollment_id = %stored.id.0, "payment provider declined initiation");
                Err(WorkflowError::PaymentInitiationFailed(format!(
                    "payment provider declined enrollment {}",
                    stored.id.0
                )))
            }
            Err(err) => {
                warn!(%err, enrollment_id = %stored.id.0, "payment initiation errored");
                Err(WorkflowError::PaymentInitiationFailed(err.to_string()))
            }
        }
    }

    /// Resolve a pending enrollment from the provider's confirmation.
    ///
    /// Callbacks for enrollments that already left pending are acknowledged
    /// without touching state, so duplicates and late deliveries are harmless.
    pub fn process_payment_callback(
        &self,
        callback: PaymentCallback,
    ) -> Result<CallbackOutcome, WorkflowError> {
        let enrollment = self.enrollment(&callback.enrollment_id)?;

        if enrollment.student_id != callback.student_id
            || enrollment.course_id != callback.course_id
        {
            warn!(
                enrollment_id = %enrollment.id.0,
                "payment callback does not match the stored enrollment"
            );
            return Err(WorkflowError::BadRequest(format!(
                "callback for enrollment {} names a different student or course",
                enrollment.id.0
            )));
        }

        if enrollment.status != EnrollmentStatus::Pending {
            info!(
                enrollment_id = %enrollment.id.0,
                status = enrollment.status.label(),
                "ignoring callback for resolved enrollment"
            );
            return Ok(CallbackOutcome::AlreadyResolved(enrollment.status));
        }

        let mut resolved = enrollment;
        if callback.approved {
            resolved.status = EnrollmentStatus::Enrolled;
            resolved.enrolled_at = Some(Utc::now());
        } else {
            resolved.status = EnrollmentStatus::PaymentFailed;
        }
        resolved.payment_message = Some(callback.message).filter(|text| !text.is_empty());

        if !self
            .repository
            .replace_if(resolved.clone(), EnrollmentStatus::Pending)?
        {
            // Lost the race to a concurrent duplicate callback.
            let current = self.enrollment(&resolved.id)?;
            return Ok(CallbackOutcome::AlreadyResolved(current.status));
        }

        info!(
            enrollment_id = %resolved.id.0,
            status = resolved.status.label(),
            "enrollment reconciled"
        );
        Ok(CallbackOutcome::Applied(resolved.status))
    }

    /// Student leaves a course they are enrolled in.
    pub fn drop_enrollment(
        &self,
        enrollment_id: &EnrollmentId,
        student: &UserId,
    ) -> Result<Enrollment, WorkflowError> {
        let mut enrollment = self.get(enrollment_id, student)?;
        if enrollment.status != EnrollmentStatus::Enrolled {
            return Err(WorkflowError::InvalidState(format!(
                "only enrolled courses can be dropped; enrollment {} is {}",
                enrollment.id.0,
                enrollment.status.label()
            )));
        }

        enrollment.status = EnrollmentStatus::Dropped;
        if !self
            .repository
            .replace_if(enrollment.clone(), EnrollmentStatus::Enrolled)?
        {
            return Err(WorkflowError::InvalidState(format!(
                "enrollment {} changed concurrently",
                enrollment.id.0
            )));
        }

        info!(enrollment_id = %enrollment.id.0, %student, "enrollment dropped");
        Ok(enrollment)
    }

    /// Fetch one of the student's own enrollments.
    pub fn get(
        &self,
        enrollment_id: &EnrollmentId,
        student: &UserId,
    ) -> Result<Enrollment, WorkflowError> {
        let enrollment = self.enrollment(enrollment_id)?;
        if &enrollment.student_id != student {
            return Err(WorkflowError::Forbidden(format!(
                "enrollment {} belongs to another student",
                enrollment_id.0
            )));
        }
        Ok(enrollment)
    }

    /// Every enrollment of the student, resolved against its course for display.
    pub fn get_student_enrollments(
        &self,
        student: &UserId,
    ) -> Result<Vec<EnrolledCourseView>, WorkflowError> {
        self.repository
            .for_student(student)?
            .into_iter()
            .map(|enrollment| -> Result<EnrolledCourseView, WorkflowError> {
                let (course_title, tutor_name) =
                    match self.courses.fetch_course(&enrollment.course_id)? {
                        Some(course) => (course.title, self.display_name(&course.tutor_id)),
                        None => (
                            REMOVED_COURSE_TITLE.to_string(),
                            self.identity_placeholder.clone(),
                        ),
                    };

                Ok(EnrolledCourseView {
                    enrollment_id: enrollment.id,
                    course_id: enrollment.course_id,
                    course_title,
                    tutor_name,
                    status: enrollment.status,
                    created_at: enrollment.created_at,
                    enrolled_at: enrollment.enrolled_at,
                })
            })
            .collect()
    }

    fn enrollment(&self, enrollment_id: &EnrollmentId) -> Result<Enrollment, WorkflowError> {
        self.repository.fetch(enrollment_id)?.ok_or_else(|| {
            WorkflowError::NotFound(format!("enrollment {} not found", enrollment_id.0))
        })
    }

    fn display_name(&self, user: &UserId) -> String {
        match self.identities.display_name(user) {
            Ok(name) => name,
            Err(err) => {
                warn!(%err, %user, "identity lookup failed; using placeholder");
                self.identity_placeholder.clone()
            }
        }
    }
}
