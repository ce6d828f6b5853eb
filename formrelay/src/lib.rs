//! # formrelay: contact form relay for static websites
//!
//! `formrelay` is a small HTTP service that sits behind a website's contact form. It accepts
//! text submissions and file uploads from the browser and forwards them to a Telegram chat
//! through the Bot API, so the site owner gets every enquiry as a chat message without
//! running a mail server or a database.
//!
//! ## Endpoints
//!
//! - `POST /send-message`: JSON body `{name, email, message}`, delivered with `sendMessage`
//! - `POST /send-file`: multipart form with `name`, `email`, optional `explanation` and at most
//!   one `file`. Images go out with `sendPhoto`, everything else with `sendDocument`.
//! - `GET /healthz`: liveness check
//! - `GET /openapi.json`, `GET /docs`: API documentation
//!
//! Every response from the submission endpoints is a JSON body `{success, message}`.
//!
//! ## Request Flow
//!
//! A submission is validated, its free-text fields are escaped (see [`sanitize`]), and the
//! result is formatted as an HTML message and sent through a [`notifier::Notifier`]. An
//! attached file is streamed to a private temporary directory (see [`uploads`]), checked
//! against the size limit and MIME allow-list on the way in, sent to the Bot API, and deleted
//! before the response goes out, whether delivery succeeded or not. Failures are mapped to
//! status codes and user-safe messages by [`errors::Error`].
//!
//! ## Configuration
//!
//! See [`config`]. The bot token and chat id are normally supplied as `TELEGRAM_BOT_TOKEN`
//! and `TELEGRAM_CHAT_ID`. Without them the relay still starts, and submissions fail with a
//! generic configuration error.
//!
//! ## Getting Started
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN=123456:ABC TELEGRAM_CHAT_ID=-100123 cargo run -p formrelay
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod notifier;
mod openapi;
pub mod sanitize;
pub mod telemetry;
pub mod uploads;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::{
    config::CorsOrigin,
    notifier::{Notifier, TelegramNotifier},
    openapi::ApiDoc,
    uploads::UploadStore,
};

/// Allowance for the non-file parts and multipart framing of a `/send-file` request
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
///
/// Everything in here is either immutable or internally synchronized, so handlers for
/// concurrent requests share it without locking.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(Arc::new(config))
///     .uploads(uploads)
///     .notifier(Arc::new(TelegramNotifier::new(&config.telegram)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: UploadStore,
    pub notifier: Arc<dyn Notifier>,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::with_capacity(origins.len());
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without path or trailing slash
                values.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = usize::try_from(state.uploads.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/send-message", post(api::handlers::submissions::send_message))
        .route(
            "/send-file",
            post(api::handlers::submissions::send_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// A fully wired relay, ready to serve.
pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    /// Prepare the upload directory, clear files left by a previous run and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        if let Err(missing) = config.telegram.credentials() {
            warn!(
                missing,
                "Bot credentials are not configured, submissions will fail until they are set"
            );
        }

        let uploads = UploadStore::new(&config.uploads).await?;
        let purged = uploads.purge().await?;
        if purged > 0 {
            info!(purged, directory = %uploads.root().display(), "Removed leftover uploads");
        }

        let notifier = TelegramNotifier::new(&config.telegram)?;
        let config = Arc::new(config);
        let state = AppState::builder()
            .config(config.clone())
            .uploads(uploads)
            .notifier(Arc::new(notifier))
            .build();

        let router = build_router(&state)?;
        Ok(Self { router, config })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Form relay listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
