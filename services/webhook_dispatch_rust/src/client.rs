use anyhow::{Context, Result};
use async_trait::async_trait;
use matchday_rust_core::dispatch::NotificationDispatcher;
use matchday_rust_core::models::{DispatchResult, NotificationPayload};
use reqwest::Client;
use std::time::Duration;

/// HTTP delivery to the configured webhook endpoint. One attempt per
/// payload; retries are the caller's policy, not this client's.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    url: String,
    auth_token: Option<String>,
}

impl WebhookClient {
    pub fn new(url: String, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            url,
            auth_token,
        })
    }

    pub async fn send(&self, payload: &NotificationPayload) -> Result<()> {
        let mut request = self.http.post(&self.url).json(payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("webhook request failed: {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("webhook non-2xx: {status} body={body}");
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookClient {
    async fn dispatch(&self, payload: &NotificationPayload) -> DispatchResult {
        match self.send(payload).await {
            Ok(()) => DispatchResult::ok(),
            Err(e) => DispatchResult::failed(format!("{e:#}")),
        }
    }
}
