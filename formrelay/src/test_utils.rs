//! Shared fixtures for handler and router tests.

use std::path::{Path, PathBuf};

use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::config::{Config, TelegramConfig, UploadConfig};

pub const TEST_BOT_TOKEN: &str = "test-token";
pub const TEST_CHAT_ID: &str = "4242";

/// reqwest is built without a default rustls provider.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

pub fn create_test_config(api_url: &str, upload_dir: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        telegram: TelegramConfig {
            bot_token: Some(TEST_BOT_TOKEN.to_string()),
            chat_id: Some(TEST_CHAT_ID.to_string()),
            api_url: Url::parse(api_url).expect("valid mock server URL"),
            request_timeout: std::time::Duration::from_secs(5),
        },
        uploads: UploadConfig {
            temp_dir: upload_dir.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A relay wired to a mock bot API, with its own upload directory.
pub struct TestRelay {
    pub server: TestServer,
    pub telegram: MockServer,
    pub upload_dir: TempDir,
}

pub async fn create_test_relay() -> TestRelay {
    create_test_relay_with(|_| {}).await
}

pub async fn create_test_relay_with(configure: impl FnOnce(&mut Config)) -> TestRelay {
    install_crypto_provider();
    let telegram = MockServer::start().await;
    let upload_dir = TempDir::new().expect("Failed to create upload dir");

    let mut config = create_test_config(&telegram.uri(), upload_dir.path());
    configure(&mut config);

    let server = crate::Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server();

    TestRelay {
        server,
        telegram,
        upload_dir,
    }
}

impl TestRelay {
    /// Answer `method` with a JSON body and verify on drop that it was called
    /// `expected_calls` times.
    pub async fn mock_bot_method(&self, bot_method: &str, response: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/bot{TEST_BOT_TOKEN}/{bot_method}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .expect(expected_calls)
            .mount(&self.telegram)
            .await;
    }

    /// Answer `method` with a body that is not JSON.
    pub async fn mock_bot_method_raw(&self, bot_method: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/bot{TEST_BOT_TOKEN}/{bot_method}")))
            .respond_with(ResponseTemplate::new(502).set_body_string(body))
            .mount(&self.telegram)
            .await;
    }

    /// Files currently in the upload directory
    pub fn stored_uploads(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .expect("Failed to read upload dir")
            .map(|entry| entry.expect("Failed to read dir entry").path())
            .collect()
    }
}
