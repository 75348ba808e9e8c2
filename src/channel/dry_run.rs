//! Channel client that only logs

use super::traits::{ChannelClient, SendReceipt};
use crate::error::TransportError;
use crate::types::RecipientId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Client used when no provider endpoint is configured
///
/// Every message is logged at `info` level and accepted with a synthetic
/// `dry-run-N` message id. Useful for local development and for exercising
/// pacing without a provider account.
///
/// # Examples
///
/// ```
/// use reply_pacer::channel::{ChannelClient, DryRunChannelClient};
/// use reply_pacer::types::RecipientId;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DryRunChannelClient::new();
/// let to = RecipientId::new("+15550001111")?;
///
/// client.send(&to, "first").await?;
/// let receipt = client.send(&to, "second").await?;
/// assert_eq!(receipt.message_id.as_deref(), Some("dry-run-2"));
/// assert_eq!(client.sent_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DryRunChannelClient {
    sent: AtomicU64,
}

impl DryRunChannelClient {
    /// Create a client with a zeroed message counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages accepted so far
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelClient for DryRunChannelClient {
    async fn send(
        &self,
        recipient: &RecipientId,
        text: &str,
    ) -> Result<SendReceipt, TransportError> {
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            recipient = %recipient,
            chars = text.chars().count(),
            message = text,
            "dry run: message not sent"
        );
        Ok(SendReceipt::with_id(format!("dry-run-{n}")))
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
