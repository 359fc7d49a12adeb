use crate::types::GenerationRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_GENERATE_PATH: &str = "/api/generate";

/// Anything that can turn a generation request into a raw JSON body.
///
/// An `Err` means the transport failed (connection error, non-success status, or a body
/// that is not JSON). Shape checks happen later, in [`crate::payload::check_response`].
#[async_trait]
pub trait StoryBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    generate_url: Url,
}

impl Client {
    pub fn new(base_url: Option<&str>, generate_path: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.unwrap_or(DEFAULT_BASE_URL))
            .context("invalid backend base URL")?;
        let generate_url =
            base_url.join(generate_path).context("failed to build generate URL")?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url, generate_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl StoryBackend for Client {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        debug!(
            url = %self.generate_url,
            desired_scenes = request.desired_scenes,
            tts_mode = %request.tts_mode,
            "posting generation request"
        );
        let response = self
            .http
            .post(self.generate_url.clone())
            .json(request)
            .send()
            .await
            .context("story generation request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("backend responded with status {}", response.status());
        }
        response.json::<Value>().await.context("backend returned a non-JSON body")
    }
}
