//! Course lifecycle and enrollment reconciliation engine.
//!
//! Tutors are vetted before they may author courses, courses move through
//! staff review before publication, and student enrollments are held pending
//! until an external payment confirmation resolves them.

pub mod config;
pub mod error;
pub mod notifications;
pub mod store;
pub mod telemetry;
pub mod workflows;
