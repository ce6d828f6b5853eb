//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # Endpoints
//!
//! - `POST /send-message`: JSON contact form submission
//! - `POST /send-file`: multipart submission with an optional attached file
//! - `GET /healthz`: liveness check
//!
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
