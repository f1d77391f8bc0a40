use reqwest::StatusCode;

/// Failures surfaced by the REST client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Caught locally before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// No response body to read; the detail is kept for the debug log only.
    #[error("Network error")]
    Network(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn not_signed_in() -> Self {
        Self::Unauthorized("Please log in to continue.".to_string())
    }

    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the session should be dropped because the token is no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Text for the debug log, including transport detail hidden from the user.
    pub fn log_detail(&self) -> String {
        match self {
            Self::Network(detail) => format!("network error: {}", detail),
            Self::Api { status, message } => format!("api error {}: {}", status, message),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
