//! The channel client trait

use crate::error::TransportError;
use crate::types::RecipientId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider acknowledgement of one accepted message
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider-assigned message identifier, when the provider returns one
    pub message_id: Option<String>,
}

impl SendReceipt {
    /// Receipt carrying a provider message id
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            message_id: Some(id.into()),
        }
    }
}

/// Sends one text message to one recipient
///
/// Implementations must be safe to call from the delivery gate's worker
/// runtime. The dispatcher never calls `send` concurrently, but the same
/// client may be used from many dispatches over its lifetime.
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
/// let receipt = client.send(&to, "Thanks for reaching out!").await?;
/// assert!(receipt.message_id.is_some());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Deliver `text` to `recipient`
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] classifying the failure. Only
    /// [`TransportError::Rejected`] is specific to the message; every other
    /// variant is treated as a problem with the channel as a whole.
    async fn send(
        &self,
        recipient: &RecipientId,
        text: &str,
    ) -> Result<SendReceipt, TransportError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
