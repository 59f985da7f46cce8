use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Ads platform rejected the credential: {0}")]
    Unauthorized(String),

    #[error("Ads platform rate limit reached: {0}")]
    RateLimited(String),

    #[error("Ads platform request failed: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ReportError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Unauthorized(_) => "upstream_unauthorized",
            ReportError::RateLimited(_) => "upstream_rate_limited",
            ReportError::Upstream(_) => "upstream_fetch_failed",
            ReportError::NotFound(_) => "not_found",
            ReportError::Validation(_) => "invalid_request",
            ReportError::Config(_) => "configuration_error",
            ReportError::Serialization(_) | ReportError::Internal(_) => "internal_error",
        }
    }

    /// True for failures caused by the upstream ads platform.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ReportError::Unauthorized(_) | ReportError::RateLimited(_) | ReportError::Upstream(_)
        )
    }
}
