//! The three coupled marketplace workflows: tutor vetting, course lifecycle,
//! and enrollment with payment reconciliation.

pub mod actor;
pub mod courses;
pub mod enrollment;
mod error;
pub mod tutors;

pub use actor::{Actor, UserId, ACTOR_HEADER};
pub use error::{RepositoryError, WorkflowError};
