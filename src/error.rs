use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Body sent to the browser whenever the relay fails internally.
pub const GENERATION_FAILED_BODY: &str = "An error occurred while generating the response";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; refusing to start without a provider credential")]
    MissingApiKey,
    #[error("upload directory {path} is unusable: {source}")]
    UploadDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures raised while calling the content-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("prompt was blocked by the provider ({reason})")]
    Blocked { reason: String },
    #[error("provider returned no candidates")]
    NoCandidates,
    #[error("candidate generation stopped early ({reason})")]
    Stopped { reason: String },
    #[error("could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Everything that can end a `/get` request without a generated reply.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("more than one file field in a single request")]
    TooManyFiles,
    #[error("upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: u64 },
    #[error("uploads of type {0} are not accepted")]
    UnsupportedMediaType(String),
    #[error("upload artifact I/O failed: {0}")]
    Artifact(#[from] std::io::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Body-limit violations surface here as 413.
            RelayError::Multipart(e) => e.status(),
            RelayError::TooManyFiles => StatusCode::BAD_REQUEST,
            RelayError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RelayError::Artifact(_) | RelayError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Detail stays in the server log; the client only sees the fixed body.
            error!("Error generating response: {}", self);
            (status, GENERATION_FAILED_BODY).into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}
