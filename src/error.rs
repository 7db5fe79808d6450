use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Busy: {0}")]
    Busy(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::RequestError(e.to_string())
    }
}

impl From<base64::DecodeError> for StudioError {
    fn from(e: base64::DecodeError) -> Self {
        StudioError::ResponseError(format!("invalid base64 payload: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(feature = "server")]
impl actix_web::ResponseError for StudioError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            StudioError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StudioError::InvalidState(_) | StudioError::Busy(_) => StatusCode::CONFLICT,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::RequestError(_)
            | StudioError::ResponseError(_)
            | StudioError::SerializationError(_)
            | StudioError::ApiError { .. } => StatusCode::BAD_GATEWAY,
            StudioError::ConfigError(_) | StudioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
