//! The delivery coordinator service
//!
//! [`DeliveryCoordinator`] is constructed once and shared (it is cheap to
//! clone). Its methods are organized by concern:
//! - [`buffering`] - enqueue, forced flush, debounce timers and buffer status
//! - [`delivery`] - direct delivery, splitting, diagnostics and thread bridges
//! - [`lifecycle`] - shutdown and draining

mod buffering;
mod delivery;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use lifecycle::DrainSummary;

use crate::buffer::RecipientBuffer;
use crate::channel::{ChannelClient, DryRunChannelClient, HttpChannelClient};
use crate::chunking::ChunkPlanner;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::gate::DeliveryGate;
use crate::types::{Event, RecipientId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Lazily created per-recipient buffers, each behind its own lock
pub(crate) type BufferMap = HashMap<RecipientId, Arc<Mutex<RecipientBuffer>>>;

/// Buffers, chunks, serializes and dispatches replies
///
/// All fields are shared, so clones observe and mutate the same state.
#[derive(Clone)]
pub struct DeliveryCoordinator {
    /// Configuration supplied at construction
    pub(crate) config: Arc<Config>,
    /// Chooses between paragraph extraction and greedy splitting
    pub(crate) planner: Arc<ChunkPlanner>,
    /// Sends chunks through the channel client
    pub(crate) dispatcher: Arc<Dispatcher>,
    /// Process-wide dispatch serialization
    pub(crate) gate: Arc<DeliveryGate>,
    /// Recipient buffers; the map lock is never held while a recipient lock is awaited
    pub(crate) buffers: Arc<Mutex<BufferMap>>,
    /// Event broadcast channel sender
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancels every pending debounce timer on shutdown
    pub(crate) timers: CancellationToken,
    /// Cleared once shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl DeliveryCoordinator {
    /// Create a coordinator using the channel described by `config.channel`
    ///
    /// Uses [`HttpChannelClient`] when `channel.base_url` is set and
    /// [`DryRunChannelClient`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for invalid configuration
    /// and a concurrency error if the delivery gate cannot start.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client: Arc<dyn ChannelClient> = if config.channel.base_url.is_some() {
            Arc::new(HttpChannelClient::new(&config.channel, config.retry.clone())?)
        } else {
            tracing::warn!("no channel base_url configured, messages will only be logged");
            Arc::new(DryRunChannelClient::new())
        };

        Self::with_client(config, client)
    }

    /// Create a coordinator that sends through `client`
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn with_client(config: Config, client: Arc<dyn ChannelClient>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let gate = DeliveryGate::start()?;

        tracing::info!(
            client = client.name(),
            max_chars = config.chunking.max_chars,
            consolidate_after_ms = config.buffer.consolidate_after.as_millis() as u64,
            max_buffer_size = config.buffer.max_buffer_size,
            "delivery coordinator initialized"
        );

        Ok(Self {
            planner: Arc::new(ChunkPlanner::new(&config.chunking)),
            dispatcher: Arc::new(Dispatcher::with_events(client, event_tx.clone())),
            gate: Arc::new(gate),
            buffers: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            timers: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            config: Arc::new(config),
        })
    }

    /// Subscribe to lifecycle events
    ///
    /// Each subscriber receives every event independently. A subscriber more
    /// than 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration the coordinator was built with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the channel client in use
    pub fn channel_name(&self) -> &'static str {
        self.dispatcher.client().name()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Serve the REST API on `config.api.bind_address` in a background task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let coordinator = Arc::new(self.clone());
        let config = self.config();

        tokio::spawn(async move { crate::api::start_api_server(coordinator, config).await })
    }
}
