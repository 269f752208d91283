//! Discord webhook delivery.
//!
//! Each remote message is posted once as `{"content": "..."}`. Failures are
//! returned to the caller; there is no retry, buffering or timeout.

use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::router::RemoteSink;

/// Errors that can occur while delivering a webhook message.
#[derive(Error, Debug)]
pub enum SenderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook URL is not a valid absolute URL.
    #[error("invalid webhook URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The webhook endpoint answered with a non-success status.
    #[error("webhook rejected message: {status} - {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts messages to a Discord-compatible webhook.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: Client,
    url: Url,
}

impl WebhookSender {
    /// Creates a sender for the given webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::InvalidUrl`] if the URL cannot be parsed or is
    /// not HTTP(S).
    pub fn new(url: &str) -> Result<Self, SenderError> {
        let parsed = Url::parse(url).map_err(|e| SenderError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SenderError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            client: Client::new(),
            url: parsed,
        })
    }

    /// The webhook URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Posts one message.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::Http`] on transport failure and
    /// [`SenderError::Rejected`] on a non-2xx response.
    pub async fn send(&self, content: &str) -> Result<(), SenderError> {
        debug!(chars = content.chars().count(), "Posting webhook message");

        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { content })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(SenderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl RemoteSink for WebhookSender {
    async fn deliver(&self, content: &str) -> Result<(), SenderError> {
        self.send(content).await
    }
}
