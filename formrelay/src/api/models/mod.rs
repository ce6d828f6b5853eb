//! API request and response data models.
//!
//! - [`submissions`]: Bodies accepted by `/send-message` and `/send-file`
//! - [`responses`]: The `{success, message}` envelope every endpoint answers with
//!
//! All models are annotated with `utoipa` for the generated API docs.

pub mod responses;
pub mod submissions;

pub use responses::RelayResponse;
