use concord_resilience::ErrorClass;

#[derive(thiserror::Error, Debug, Clone)]
pub enum GeoError {
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("upstream rate limited")]
    RateLimited,
    #[error("daily quota exhausted")]
    QuotaExhausted,
    #[error("invalid address or coordinates: {0}")]
    Validation(String),
}

impl GeoError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            GeoError::Upstream(_) => ErrorClass::Transient,
            GeoError::RateLimited | GeoError::QuotaExhausted => ErrorClass::RateLimited,
            GeoError::Validation(_) => ErrorClass::Validation,
        }
    }
}
