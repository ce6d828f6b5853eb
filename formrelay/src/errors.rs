use crate::api::models::RelayResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data, e.g. a missing required field
    #[error("{message}")]
    BadRequest { message: String },

    /// Uploaded file exceeds the configured size limit
    #[error("File exceeds the maximum upload size of {max_bytes} bytes")]
    FileTooLarge { max_bytes: u64 },

    /// Multipart parsing failure reported by the upload layer
    #[error("Upload error: {message}")]
    Upload { message: String },

    /// Uploaded file has a MIME type outside the allow-list
    #[error("File type {mime_type} is not supported")]
    UnsupportedFileType { mime_type: String },

    /// A required server-side secret is not configured
    #[error("Missing configuration: {missing}")]
    Configuration { missing: &'static str },

    /// The bot API answered but did not accept the notification
    #[error("Bot API rejected {method}: {response}")]
    Upstream { method: &'static str, response: serde_json::Value },

    /// Attempt to touch a file outside the upload directory
    #[error("Refusing to access {path}: outside the upload directory")]
    PathViolation { path: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } | Error::FileTooLarge { .. } | Error::Upload { .. } | Error::UnsupportedFileType { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::Configuration { .. }
            | Error::Upstream { .. }
            | Error::PathViolation { .. }
            | Error::Internal { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::FileTooLarge { max_bytes } => {
                format!("File too large. Maximum size is {}MB", max_bytes / (1024 * 1024))
            }
            Error::Upload { message } => format!("Upload error: {message}"),
            Error::UnsupportedFileType { .. } => "File type not supported".to_string(),
            Error::Configuration { .. } => "Server configuration error".to_string(),
            Error::Upstream { .. } => "Failed to send message. Please try again later.".to_string(),
            Error::PathViolation { .. } | Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Configuration { .. } | Error::Upstream { .. } | Error::PathViolation { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::BadRequest { .. } | Error::FileTooLarge { .. } | Error::Upload { .. } | Error::UnsupportedFileType { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(RelayResponse::failure(self.user_message()))).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let errors = [
            Error::BadRequest {
                message: "Name and email are required".to_string(),
            },
            Error::FileTooLarge { max_bytes: 20 * 1024 * 1024 },
            Error::Upload {
                message: "Unexpected field".to_string(),
            },
            Error::UnsupportedFileType {
                mime_type: "application/x-msdownload".to_string(),
            },
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST, "{error}");
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let config = Error::Configuration {
            missing: "telegram.bot_token",
        };
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(config.user_message(), "Server configuration error");
        assert!(!config.user_message().contains("bot_token"));

        let upstream = Error::Upstream {
            method: "sendMessage",
            response: json!({"ok": false, "description": "Bad Request: chat not found"}),
        };
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!upstream.user_message().contains("chat not found"));

        let other = Error::Other(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(other.user_message(), "Internal server error");
    }

    #[test]
    fn test_upload_messages() {
        assert_eq!(
            Error::FileTooLarge { max_bytes: 20 * 1024 * 1024 }.user_message(),
            "File too large. Maximum size is 20MB"
        );
        assert_eq!(
            Error::Upload {
                message: "Unexpected field".to_string()
            }
            .user_message(),
            "Upload error: Unexpected field"
        );
        assert_eq!(
            Error::UnsupportedFileType {
                mime_type: "text/html".to_string()
            }
            .user_message(),
            "File type not supported"
        );
    }

    #[tokio::test]
    async fn test_into_response_is_json_failure() {
        let response = Error::BadRequest {
            message: "Name, email and message are required".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"success": false, "message": "Name, email and message are required"}));
    }
}
