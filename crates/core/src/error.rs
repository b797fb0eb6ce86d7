use crate::types::UserId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} for user {uid}")]
    NotFound { entity: &'static str, uid: UserId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No authenticated user")]
    NotLoggedIn,

    #[error("Internal error: {0}")]
    Internal(String),
}
