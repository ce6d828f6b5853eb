//! OpenAPI documentation for the relay endpoints.
//!
//! Served as JSON at `/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "formrelay",
        description = "Relays contact form submissions and file uploads to a Telegram chat."
    ),
    paths(
        api::handlers::submissions::send_message,
        api::handlers::submissions::send_file,
    ),
    components(
        schemas(
            api::models::RelayResponse,
            api::models::submissions::SendMessageRequest,
            api::models::submissions::SendFileForm,
        )
    ),
    tags(
        (name = "submissions", description = "Contact form submissions"),
    )
)]
pub struct ApiDoc;
