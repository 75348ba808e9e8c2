//! REST provider client

use super::traits::{ChannelClient, SendReceipt};
use crate::config::{ChannelConfig, RetryConfig};
use crate::error::{Error, TransportError};
use crate::retry::with_retry;
use crate::types::RecipientId;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Longest provider error text kept in a [`TransportError`]
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

/// Sends messages by POSTing JSON to `<base_url>/messages`
///
/// Request body: `{"to": "...", "body": "...", "from": "..."}` (`from` only
/// when a sender is configured). A configured token is sent as a bearer
/// `Authorization` header. The provider's message id is read from the first
/// of `id`, `message_id` or `sid` present in the JSON response.
///
/// Responses are classified as:
///
/// | Response                  | Error                                 |
/// |---------------------------|---------------------------------------|
/// | 401, 403                  | [`TransportError::Unauthorized`]      |
/// | 429, 5xx                  | [`TransportError::Unavailable`]       |
/// | other 4xx                 | [`TransportError::Rejected`]          |
/// | connect failure, timeout  | [`TransportError::Network`]           |
/// | 2xx with a non-JSON body  | [`TransportError::MalformedResponse`] |
///
/// `Unavailable` and `Network` are retried according to [`RetryConfig`].
pub struct HttpChannelClient {
    client: reqwest::Client,
    endpoint: Url,
    auth_token: Option<String>,
    sender: Option<String>,
    retry: RetryConfig,
}

impl HttpChannelClient {
    /// Build a client from channel and retry settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `base_url` is missing or unparseable, or
    /// the underlying HTTP client cannot be built.
    pub fn new(channel: &ChannelConfig, retry: RetryConfig) -> crate::Result<Self> {
        let base_url = channel.base_url.as_deref().ok_or_else(|| Error::Config {
            message: "an HTTP channel needs a base_url".to_string(),
            key: Some("channel.base_url".to_string()),
        })?;
        let endpoint = messages_endpoint(base_url)?;

        let client = reqwest::Client::builder()
            .timeout(channel.timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {e}"),
                key: Some("channel".to_string()),
            })?;

        Ok(Self {
            client,
            endpoint,
            auth_token: channel.auth_token.clone(),
            sender: channel.sender.clone(),
            retry,
        })
    }

    /// Full URL messages are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post_once(
        &self,
        message: &OutboundMessage<'_>,
    ) -> Result<SendReceipt, TransportError> {
        let mut request = self.client.post(self.endpoint.clone()).json(message);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }
        parse_receipt(&body)
    }
}

#[async_trait]
impl ChannelClient for HttpChannelClient {
    async fn send(
        &self,
        recipient: &RecipientId,
        text: &str,
    ) -> Result<SendReceipt, TransportError> {
        let message = &OutboundMessage {
            to: recipient.as_str(),
            body: text,
            from: self.sender.as_deref(),
        };

        let result = with_retry(&self.retry, move || self.post_once(message)).await;
        match &result {
            Ok(receipt) => tracing::debug!(
                recipient = %recipient,
                message_id = ?receipt.message_id,
                "provider accepted message"
            ),
            Err(e) => tracing::warn!(recipient = %recipient, error = %e, "provider send failed"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn messages_endpoint(base_url: &str) -> crate::Result<Url> {
    let invalid = |message: String| Error::Config {
        message,
        key: Some("channel.base_url".to_string()),
    };

    let mut base = Url::parse(base_url).map_err(|e| invalid(format!("invalid base_url: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("messages")
        .map_err(|e| invalid(format!("invalid base_url: {e}")))
}

fn classify_status(status: u16, body: &str) -> TransportError {
    let message: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status {
        401 | 403 => TransportError::Unauthorized { status },
        429 | 500..=599 => TransportError::Unavailable { status, message },
        400..=499 => TransportError::Rejected { status, message },
        _ => TransportError::MalformedResponse(format!("unexpected status {status}")),
    }
}

fn parse_receipt(body: &str) -> Result<SendReceipt, TransportError> {
    if body.trim().is_empty() {
        return Ok(SendReceipt::default());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
    let message_id = ["id", "message_id", "sid"]
        .iter()
        .find_map(|key| match value.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

    Ok(SendReceipt { message_id })
}
