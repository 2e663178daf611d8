use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for fetching, decoding and serving dashboard data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("malformed document: {0}")]
    Decode(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("unknown resource kind: {0}")]
    UnknownResource(String),

    #[error("unknown lifecycle event: {0}")]
    UnknownEvent(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl DashError {
    /// Short machine-readable tag, used in API bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch_error",
            Self::Decode(_) => "decode_error",
            Self::AuthRequired => "auth_required",
            Self::UnknownResource(_) => "unknown_resource",
            Self::UnknownEvent(_) => "unknown_event",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
        }
    }
}

impl IntoResponse for DashError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Decode(_) => StatusCode::BAD_GATEWAY,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::UnknownResource(_) | Self::UnknownEvent(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<reqwest::Error> for DashError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(s) if s == reqwest::StatusCode::UNAUTHORIZED || s == reqwest::StatusCode::FORBIDDEN => {
                Self::AuthRequired
            }
            _ if e.is_decode() => Self::Decode(e.to_string()),
            _ => Self::Fetch(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<std::io::Error> for DashError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
