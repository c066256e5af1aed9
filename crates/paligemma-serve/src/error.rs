use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paligemma_vlm::VlmError;
use serde::Serialize;

/// Message returned for every internal failure.
pub const INTERNAL_ERROR_DETAIL: &str = "An error occurred while processing the request";

/// An error type for the request handlers.
#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("The request has no `image` file field")]
    MissingImage,

    #[error(transparent)]
    Model(#[from] VlmError),

    #[error("Failed to store the upload. {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read the multipart body. {0}")]
    Multipart(#[from] MultipartError),

    #[error("Inference task failed. {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Body of every error response.
#[derive(Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServeError::MissingImage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{self}");
            INTERNAL_ERROR_DETAIL.to_string()
        } else {
            log::warn!("{self}");
            self.to_string()
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
