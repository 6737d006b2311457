use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::courses::CourseId;
use crate::workflows::UserId;

use super::domain::EnrollmentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub enrollment_id: EnrollmentId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
}

/// Synchronous answer from the provider. Acceptance only means the charge was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub accepted: bool,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Outbound call to the payment provider, made while the enrollment is created.
pub trait PaymentInitiator: Send + Sync {
    fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
    #[error("payment provider returned an invalid response: {0}")]
    InvalidResponse(String),
}
