//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`messages`] — Buffering, direct delivery, flushing and split previews
//! - [`buffers`] — Recipient buffer status
//! - [`system`] — Gate stats, config, health, events, OpenAPI

use crate::types::{EnqueueOptions, RecipientId};
use serde::{Deserialize, Serialize};

mod buffers;
mod messages;
mod system;

pub use buffers::*;
pub use messages::*;
pub use system::*;

// ============================================================================
// Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /messages
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EnqueueMessageRequest {
    /// Recipient identifier (e.g. an E.164 phone number)
    pub recipient: String,
    /// Reply text to buffer
    pub text: String,
    /// Per-call overrides of the buffer triggers
    #[serde(flatten)]
    pub options: EnqueueOptions,
}

/// Request body for POST /messages/direct
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DeliverMessageRequest {
    /// Recipient identifier
    pub recipient: String,
    /// Reply text to chunk and send
    pub text: String,
}

/// Request body for POST /split
///
/// Omitted options fall back to the configured chunking settings.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SplitRequest {
    /// Text to split
    pub text: String,
    /// Maximum characters per chunk
    pub max_chars: Option<usize>,
    /// Prefer cutting at sentence terminators
    pub prefer_boundaries: Option<bool>,
    /// Delay after a short chunk, in milliseconds
    pub min_delay_ms: Option<u64>,
    /// Delay after a long chunk, in milliseconds
    pub max_delay_ms: Option<u64>,
}

impl SplitRequest {
    fn has_overrides(&self) -> bool {
        self.max_chars.is_some()
            || self.prefer_boundaries.is_some()
            || self.min_delay_ms.is_some()
            || self.max_delay_ms.is_some()
    }
}

fn parse_recipient(raw: &str) -> crate::Result<RecipientId> {
    Ok(RecipientId::new(raw)?)
}
