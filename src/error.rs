use thiserror::Error;

/// Failures talking to the course backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An authenticated call was attempted without a token. Raised before
    /// any request is sent.
    #[error("Authentication token is missing")]
    MissingToken,

    /// The backend rejected the bearer token.
    #[error("Your session has expired. Please sign in again. ({0})")]
    Unauthorized(String),

    /// Any other non-2xx response.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Rejected locally; nothing was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
