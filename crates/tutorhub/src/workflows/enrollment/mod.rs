//! Enrollment requests held pending until an asynchronous payment
//! confirmation resolves them exactly once.

pub mod domain;
pub mod identity;
pub mod payment;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CallbackOutcome, EnrolledCourseView, Enrollment, EnrollmentId, EnrollmentRequest,
    EnrollmentStatus, PaymentCallback,
};
pub use identity::{IdentityError, IdentityResolver};
pub use payment::{PaymentError, PaymentInitiation, PaymentInitiator, PaymentRequest};
pub use repository::EnrollmentRepository;
pub use router::{enrollment_router, CALLBACK_SECRET_HEADER};
pub use service::EnrollmentService;
