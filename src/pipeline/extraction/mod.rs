pub mod image;
pub mod prompt;
pub mod vision;

pub use image::{ImageIntake, ImagePayload, ImageSource, IntakeError, MAX_IMAGE_BYTES};
pub use vision::{ChatVisionClient, MockVisionClient, VisionClient};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Extraction service rate limited the request")]
    RateLimited { retry_after: Option<u64> },

    #[error("Extraction service returned error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Extraction timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction service is not reachable at {0}")]
    NotReachable(String),

    #[error("HTTP client error: {0}")]
    Network(String),

    #[error("Extraction service returned no text")]
    EmptyResponse,

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),
}

impl ExtractionError {
    /// Worth retrying later without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::NotReachable(_)
        )
    }
}
