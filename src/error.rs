use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::classifier::ClassifyError;
use crate::storage::StoreError;

/// Errors surfaced by HTTP handlers. Every variant maps to a non-2xx status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// The JSON body could not be read or did not match the expected shape.
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A newer submission started while this one was being classified.
    #[error("superseded by a newer submission")]
    Superseded,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidBody { status, .. } => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Classify(e) => match e {
                ClassifyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ClassifyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ClassifyError::Backend(_) | ClassifyError::Malformed(_) => StatusCode::BAD_GATEWAY,
                ClassifyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Superseded => StatusCode::CONFLICT,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidBody { message: msg, .. } => ErrorBody {
                error: msg.clone(),
                details: None,
            },
            AppError::Classify(ClassifyError::InvalidInput(msg)) => ErrorBody {
                error: msg.clone(),
                details: None,
            },
            AppError::Classify(e) => ErrorBody {
                error: "Failed to analyze image".into(),
                details: Some(e.to_string()),
            },
            AppError::Store(e) => ErrorBody {
                error: "Failed to save food entry".into(),
                details: Some(e.to_string()),
            },
            AppError::Superseded => ErrorBody {
                error: self.to_string(),
                details: None,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        // oversized and non-JSON bodies keep their own status, the rest is a 400
        let status = match rejection.status() {
            s @ (StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE) => s,
            _ => StatusCode::BAD_REQUEST,
        };
        AppError::InvalidBody {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::BadRequest("x".into()), 400),
            (ClassifyError::InvalidInput("x".into()).into(), 400),
            (ClassifyError::Backend("x".into()).into(), 502),
            (ClassifyError::Malformed("x".into()).into(), 502),
            (ClassifyError::Timeout(Duration::from_secs(1)).into(), 504),
            (AppError::Superseded, 409),
            (AppError::NotFound("x".into()), 404),
        ];
        for (err, code) in cases {
            assert_eq!(err.status().as_u16(), code, "{err:?}");
        }
    }

    #[test]
    fn backend_failure_body_has_details() {
        let body = AppError::from(ClassifyError::Backend("API error (503): loading".into())).body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Failed to analyze image");
        assert!(json["details"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn input_error_body_omits_details() {
        let body = AppError::from(ClassifyError::InvalidInput("No image provided".into())).body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "No image provided");
        assert!(json.get("details").is_none());
    }
}
