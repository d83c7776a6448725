//! Chat notifications.
//!
//! `LineNotifier` posts a text message to the LINE Notify API using the
//! receiver's personal access token.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// LINE Notify endpoint
pub const LINE_NOTIFY_URL: &str = "https://notify-api.line.me/api/notify";

/// Notification request timeout in seconds
const NOTIFY_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("No channel token")]
    MissingToken,
}

#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send(&self, channel_token: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct LineNotifier {
    client: Client,
    endpoint: String,
}

impl LineNotifier {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, LINE_NOTIFY_URL)
    }

    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl Notifier for LineNotifier {
    async fn send(&self, channel_token: &str, message: &str) -> Result<(), NotifyError> {
        if channel_token.is_empty() {
            return Err(NotifyError::MissingToken);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(channel_token)
            .form(&[("message", message)])
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = %status, "Notification delivered");
        Ok(())
    }
}
