use crate::workflows::UserId;

/// Lookup of human-readable names for dashboard views.
pub trait IdentityResolver: Send + Sync {
    fn display_name(&self, user: &UserId) -> Result<String, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}
