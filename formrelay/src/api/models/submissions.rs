use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::uploads::UploadedFile;

/// JSON body of `POST /send-message`.
///
/// Fields are optional at the serde level so that a missing field is reported with the
/// same message as an empty one.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    #[schema(example = "I'd like to know more about your services.")]
    pub message: Option<String>,
}

/// A contact submission with every required field present.
#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl SendMessageRequest {
    pub fn validate(self) -> Result<ContactSubmission> {
        match (required(self.name), required(self.email), required(self.message)) {
            (Some(name), Some(email), Some(message)) => Ok(ContactSubmission { name, email, message }),
            _ => Err(Error::BadRequest {
                message: "Name, email and message are required".to_string(),
            }),
        }
    }
}

/// Multipart body of `POST /send-file`, as collected from the form parts.
#[derive(Debug, Default)]
pub struct FileSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub explanation: Option<String>,
    pub file: Option<UploadedFile>,
}

impl FileSubmission {
    /// Returns `(name, email)` or the 400 for a submission missing either.
    pub fn required_fields(&self) -> Result<(&str, &str)> {
        let name = self.name.as_deref().filter(|v| !v.trim().is_empty());
        let email = self.email.as_deref().filter(|v| !v.trim().is_empty());

        name.zip(email).ok_or_else(|| Error::BadRequest {
            message: "Name and email are required".to_string(),
        })
    }
}

/// OpenAPI description of the `/send-file` form. Never constructed.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct SendFileForm {
    #[schema(example = "Ada Lovelace")]
    name: String,
    #[schema(example = "ada@example.com")]
    email: String,
    /// Sent as the file caption, or as the message body when no file is attached
    explanation: Option<String>,
    /// At most one file, see `uploads.allowed_mime_types`
    #[schema(value_type = Option<String>, format = Binary)]
    file: Option<Vec<u8>>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, email: Option<&str>, message: Option<&str>) -> SendMessageRequest {
        SendMessageRequest {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_complete_request() {
        let submission = request(Some("Ada"), Some("ada@example.com"), Some("Hi")).validate().unwrap();
        assert_eq!(submission.name, "Ada");
        assert_eq!(submission.email, "ada@example.com");
        assert_eq!(submission.message, "Hi");
    }

    #[test]
    fn test_validate_rejects_missing_or_blank_fields() {
        let incomplete = [
            request(None, Some("ada@example.com"), Some("Hi")),
            request(Some("Ada"), None, Some("Hi")),
            request(Some("Ada"), Some("ada@example.com"), None),
            request(Some(""), Some("ada@example.com"), Some("Hi")),
            request(Some("Ada"), Some("ada@example.com"), Some("   ")),
        ];

        for req in incomplete {
            let err = req.validate().unwrap_err();
            assert_eq!(err.user_message(), "Name, email and message are required");
        }
    }

    #[test]
    fn test_file_submission_required_fields() {
        let mut submission = FileSubmission {
            name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert_eq!(
            submission.required_fields().unwrap_err().user_message(),
            "Name and email are required"
        );

        submission.email = Some("ada@example.com".to_string());
        assert_eq!(submission.required_fields().unwrap(), ("Ada", "ada@example.com"));
    }
}
