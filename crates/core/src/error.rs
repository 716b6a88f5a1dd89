use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Draft storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
