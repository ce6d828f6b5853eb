use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every response from the submission endpoints, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayResponse {
    pub success: bool,
    /// Human-readable outcome, safe to show to the submitter
    #[schema(example = "Message sent successfully")]
    pub message: String,
}

impl RelayResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
