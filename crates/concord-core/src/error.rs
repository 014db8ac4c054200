use concord_resilience::ErrorClass;

#[derive(thiserror::Error, Debug, Clone)]
pub enum MatchError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("matcher unavailable: {0}")]
    Unavailable(String),
    #[error("matcher construction refused: {0}")]
    ConstructionRefused(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl MatchError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            MatchError::Validation(_) => ErrorClass::Validation,
            MatchError::NotFound(_) => ErrorClass::NotFound,
            MatchError::Unavailable(_) => ErrorClass::Transient,
            MatchError::ConstructionRefused(_) => ErrorClass::Validation,
            MatchError::Internal(_) => ErrorClass::Internal,
        }
    }
}
