use thiserror::Error;

/// Failure of a single gateway call.
///
/// `Status` is the remote error proper: the numeric HTTP status and the raw
/// body text, kept verbatim so the console can show the server's diagnostic.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Invalid {kind} identifier: {value:?}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Invalid API base URL {0:?}")]
    InvalidUrl(String),

    #[error("Expected a response body from {path} but got 204 No Content")]
    UnexpectedNoContent { path: String },
}

impl ApiError {
    /// HTTP status of a non-2xx response, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// Typed application error hierarchy for the console.
///
/// Gateway failures keep their own type so callers can still inspect the
/// status code; everything else collapses to a message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Json(String),

    #[error("{0}")]
    Yaml(String),

    #[error("{0}")]
    Other(String),
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Yaml(e.to_string())
    }
}

/// Allows `.ok_or_else(|| format!(…))?` to coerce into AppError.
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}

/// Allows `.ok_or("literal string")?` to coerce into AppError.
impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Other(s.to_string())
    }
}
