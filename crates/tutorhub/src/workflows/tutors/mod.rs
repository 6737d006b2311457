//! Tutor vetting: a student applies, staff accept or deny, and only accepted
//! tutors may author courses.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    TutorApplication, TutorApplicationId, TutorApplicationStatus, TutorApplicationSubmission,
    TutorDecision,
};
pub use repository::TutorApplicationRepository;
pub use router::tutor_router;
pub use service::{TutorGate, TutorVettingService};
