//! Configuration types for reply-pacer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use utoipa::ToSchema;

/// Lower bound applied to any requested chunk size
pub const MIN_CHUNK_CHARS: usize = 50;

/// Upper bound accepted for `max_buffer_size`
pub const MAX_BUFFER_SIZE_LIMIT: usize = 100;

/// Upper bound accepted for the debounce window
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(600);

/// Upper bound accepted for a per-chunk pacing delay
pub const MAX_CHUNK_DELAY: Duration = Duration::from_secs(300);

/// Top-level configuration
///
/// Every section has sensible defaults, so `Config::default()` works out of the
/// box with a dry-run channel.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Chunk sizing and pacing
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Per-recipient buffering (debounce and size triggers)
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Messaging provider connection
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Retry policy for transient provider failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// REST API server
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Check the configuration for values the runtime cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.min_delay > self.chunking.max_delay {
            return Err(config_error(
                "min_delay must not exceed max_delay",
                "chunking.min_delay",
            ));
        }

        if self.chunking.max_delay > MAX_CHUNK_DELAY {
            return Err(config_error(
                format!(
                    "max_delay must not exceed {}ms",
                    MAX_CHUNK_DELAY.as_millis()
                ),
                "chunking.max_delay",
            ));
        }

        if self.buffer.max_buffer_size == 0 || self.buffer.max_buffer_size > MAX_BUFFER_SIZE_LIMIT
        {
            return Err(config_error(
                format!("max_buffer_size must be between 1 and {MAX_BUFFER_SIZE_LIMIT}"),
                "buffer.max_buffer_size",
            ));
        }

        if self.buffer.consolidate_after > MAX_DEBOUNCE {
            return Err(config_error(
                format!(
                    "consolidate_after must not exceed {}ms",
                    MAX_DEBOUNCE.as_millis()
                ),
                "buffer.consolidate_after",
            ));
        }

        if let Some(base_url) = &self.channel.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                config_error(format!("invalid channel URL: {e}"), "channel.base_url")
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(config_error(
                    format!("unsupported channel URL scheme '{}'", parsed.scheme()),
                    "channel.base_url",
                ));
            }
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "backoff_multiplier must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// Chunk sizing and inter-chunk pacing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk (default: 300, floor: 50)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Prefer cutting at sentence terminators (default: true)
    #[serde(default = "default_true")]
    pub prefer_boundaries: bool,

    /// Delay after a short chunk (default: 1500ms)
    #[serde(default = "default_min_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub min_delay: Duration,

    /// Delay after a chunk of 50 words or more (default: 4000ms)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Segment already-paced text on its own paragraph breaks (default: true)
    #[serde(default = "default_true")]
    pub detect_pre_paced: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            prefer_boundaries: true,
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            detect_pre_paced: true,
        }
    }
}

/// Per-recipient buffering defaults
///
/// Both values can be overridden per call through
/// [`EnqueueOptions`](crate::types::EnqueueOptions).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BufferConfig {
    /// Quiet period after the first buffered item before an automatic flush (default: 3000ms)
    #[serde(default = "default_consolidate_after", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub consolidate_after: Duration,

    /// Number of buffered items that triggers an immediate flush (default: 5)
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            consolidate_after: default_consolidate_after(),
            max_buffer_size: default_max_buffer_size(),
        }
    }
}

/// Messaging provider connection
///
/// When `base_url` is `None` the coordinator falls back to the dry-run channel.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChannelConfig {
    /// Provider endpoint; messages are POSTed to `<base_url>/messages`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent in the `Authorization` header
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender identity (number or alphanumeric id) included as `from`
    #[serde(default)]
    pub sender: Option<String>,

    /// Per-request timeout (default: 10000ms)
    #[serde(default = "default_channel_timeout", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            sender: None,
            timeout: default_channel_timeout(),
        }
    }
}

/// Retry behavior for transient provider failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 5000ms)
    #[serde(default = "default_retry_max_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_retry_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_chars() -> usize {
    300
}

fn default_min_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(4000)
}

fn default_consolidate_after() -> Duration {
    Duration::from_millis(3000)
}

fn default_max_buffer_size() -> usize {
    5
}

fn default_channel_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Durations travel as integer milliseconds
pub(crate) mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
