//! Core types for reply-pacer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Addressable end-user identity a message batch targets (e.g. an E.164 number)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Create a RecipientId, trimming surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRecipient`] for an empty identifier.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyRecipient);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RecipientId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One bounded text segment with the pause to observe after sending it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Chunk {
    /// Visible text
    pub text: String,
    /// Pause before the next chunk is sent
    #[serde(with = "crate::config::duration_ms_serde", rename = "delay_ms")]
    #[schema(value_type = u64)]
    pub delay: Duration,
    /// Whitespace-separated word count
    pub word_count: usize,
    /// Character (not byte) count
    pub char_count: usize,
    /// Zero-based position in the chunk list
    pub index: usize,
}

impl Chunk {
    /// Build a chunk, deriving word and character counts from `text`
    pub fn new(text: impl Into<String>, delay: Duration, index: usize) -> Self {
        let text = text.into();
        Self {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
            text,
            delay,
            index,
        }
    }
}

/// Aggregate statistics for one split
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChunkStats {
    /// Number of chunks produced
    pub total_chunks: usize,
    /// Sum of chunk character counts
    pub total_chars: usize,
    /// Mean characters per chunk
    pub average_chunk_size: f64,
    /// Sum of per-chunk delays
    #[serde(with = "crate::config::duration_ms_serde", rename = "total_delay_ms")]
    #[schema(value_type = u64)]
    pub total_delay: Duration,
}

impl ChunkStats {
    /// Compute statistics over a chunk list
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let total_chars: usize = chunks.iter().map(|c| c.char_count).sum();
        let average_chunk_size = if chunks.is_empty() {
            0.0
        } else {
            total_chars as f64 / chunks.len() as f64
        };
        Self {
            total_chunks: chunks.len(),
            total_chars,
            average_chunk_size,
            total_delay: chunks
                .iter()
                .fold(Duration::ZERO, |total, c| total.saturating_add(c.delay)),
        }
    }
}

/// Chunks plus their statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SplitResult {
    /// Chunks in send order
    pub chunks: Vec<Chunk>,
    /// Aggregate statistics
    pub stats: ChunkStats,
}

/// Parameters for a single split
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOptions {
    /// Maximum characters per chunk (clamped to at least 50)
    pub max_chars: usize,
    /// Prefer cutting at sentence terminators
    pub prefer_boundaries: bool,
    /// Delay after a short chunk
    pub min_delay: Duration,
    /// Delay after a chunk of 50 words or more
    pub max_delay: Duration,
}

impl From<&crate::config::ChunkingConfig> for SplitOptions {
    fn from(config: &crate::config::ChunkingConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            prefer_boundaries: config.prefer_boundaries,
            min_delay: config.min_delay,
            max_delay: config.max_delay,
        }
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::from(&crate::config::ChunkingConfig::default())
    }
}

/// Per-call buffering overrides
///
/// Unset fields fall back to [`BufferConfig`](crate::config::BufferConfig).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnqueueOptions {
    /// Debounce window override in milliseconds
    #[serde(default)]
    pub debounce_ms: Option<u64>,
    /// Size trigger override
    #[serde(default)]
    pub max_buffer_size: Option<usize>,
    /// Flush immediately after appending
    #[serde(default)]
    pub force_send: bool,
}

impl EnqueueOptions {
    /// Options that flush right away
    pub fn force() -> Self {
        Self {
            force_send: true,
            ..Default::default()
        }
    }
}

/// Result of a single [`enqueue`](crate::DeliveryCoordinator::enqueue)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EnqueueOutcome {
    /// Items still buffered for the recipient after this call
    pub buffered: usize,
    /// Whether this call triggered a flush that delivered successfully
    pub flushed: bool,
    /// Text sent by the flush, when one ran
    pub consolidated_text: Option<String>,
    /// Milliseconds until the pending debounce flush (0 when nothing is pending)
    pub time_until_flush_ms: u64,
    /// Delivery details, when a flush ran
    pub report: Option<DeliveryReport>,
    /// Failure description when a flush ran and did not succeed
    pub error: Option<String>,
}

/// Result of a forced flush
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct FlushOutcome {
    /// Number of items removed from the buffer
    pub cleared_count: usize,
    /// Number of items that remain buffered (non-zero only after a failed send)
    pub retained_count: usize,
    /// Text handed to the dispatcher, when a flush ran
    pub consolidated_text: Option<String>,
    /// Delivery details, when a flush ran
    pub report: Option<DeliveryReport>,
    /// Failure description when the flush did not succeed
    pub error: Option<String>,
}

/// Read-only view of one recipient buffer
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BufferStatus {
    /// Recipient the buffer belongs to
    #[schema(value_type = String)]
    pub recipient: RecipientId,
    /// Number of buffered items
    pub size: usize,
    /// Age of the oldest item in milliseconds
    pub oldest_age_ms: Option<u64>,
    /// When the oldest item was buffered
    #[schema(value_type = Option<String>, format = DateTime)]
    pub oldest_enqueued_at: Option<DateTime<Utc>>,
    /// Item texts truncated for display
    pub previews: Vec<String>,
    /// Whether a debounce flush is armed
    pub flush_pending: bool,
    /// Milliseconds until the armed flush fires
    pub time_until_flush_ms: Option<u64>,
}

/// Outcome of sending one chunk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChunkResult {
    /// Chunk index (the fallback send reports index 0)
    pub index: usize,
    /// Whether the provider accepted the message
    pub success: bool,
    /// Provider message identifier
    pub message_id: Option<String>,
    /// Failure description
    pub error: Option<String>,
}

/// Aggregate outcome of a dispatch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryReport {
    /// Number of sends attempted (including a fallback send)
    pub attempted: usize,
    /// Number of accepted sends
    pub successful: usize,
    /// Number of failed sends
    pub failed: usize,
    /// Per-send detail in attempt order
    pub results: Vec<ChunkResult>,
    /// Whether the original unchunked text was sent instead of the chunks
    pub used_fallback: bool,
}

impl DeliveryReport {
    /// Whether every attempted send succeeded and at least one was made
    pub fn is_success(&self) -> bool {
        self.successful > 0 && self.failed == 0
    }

    pub(crate) fn record(&mut self, result: ChunkResult) {
        self.attempted += 1;
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// First error message in the report, if any
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}

/// Occupancy of the delivery gate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GateStats {
    /// Whether a dispatch currently holds the gate
    pub in_flight: bool,
    /// Dispatches queued behind the current one
    pub waiting: usize,
    /// Dispatches that ran to completion
    pub completed: u64,
    /// Dispatches that panicked
    pub failed: u64,
}

/// Lifecycle events broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An item was appended to a recipient buffer
    Buffered {
        /// Recipient identifier
        recipient: String,
        /// Buffer length after the append
        size: usize,
    },

    /// A buffer was delivered and cleared
    Flushed {
        /// Recipient identifier
        recipient: String,
        /// Number of items consolidated
        item_count: usize,
        /// Number of sends made
        chunk_count: usize,
    },

    /// A flush failed; items stay buffered
    FlushFailed {
        /// Recipient identifier
        recipient: String,
        /// Number of items retained
        item_count: usize,
        /// Failure description
        error: String,
    },

    /// A single chunk was accepted by the provider
    ChunkSent {
        /// Recipient identifier
        recipient: String,
        /// Chunk index
        index: usize,
        /// Provider message identifier
        message_id: Option<String>,
    },

    /// A single chunk was refused or lost
    ChunkFailed {
        /// Recipient identifier
        recipient: String,
        /// Chunk index
        index: usize,
        /// Failure description
        error: String,
    },

    /// Coordinator is shutting down
    Shutdown,
}

impl Event {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Buffered { .. } => "buffered",
            Event::Flushed { .. } => "flushed",
            Event::FlushFailed { .. } => "flush_failed",
            Event::ChunkSent { .. } => "chunk_sent",
            Event::ChunkFailed { .. } => "chunk_failed",
            Event::Shutdown => "shutdown",
        }
    }
}
