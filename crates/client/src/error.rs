/// Errors from the production backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// No response arrived within the configured request timeout.
    #[error("HTTP request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Best-effort message extracted from the response body.
        message: String,
    },

    /// A 2xx response carried a body that does not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the backend answered 404 on an endpoint whose policy is to
    /// report absence as an error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// HTTP status for [`ApiError::Status`], `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }
}
