//! Shared helpers for coordinator tests.

use crate::channel::{ChannelClient, SendReceipt};
use crate::config::Config;
use crate::coordinator::DeliveryCoordinator;
use crate::error::TransportError;
use crate::types::RecipientId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Channel client that records every send and can be switched into failure
#[derive(Default)]
pub(crate) struct RecordingClient {
    sent: Mutex<Vec<(RecipientId, String)>>,
    failing: AtomicBool,
    fail_next: AtomicUsize,
    latency: Mutex<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every send fail with a systemic error until switched back
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only the next `count` sends with a systemic error
    pub(crate) fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Hold each send for `latency` so overlapping sends would be observable
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn sent(&self) -> Vec<(RecipientId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    pub(crate) fn sent_to(&self, recipient: &RecipientId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, text)| text)
            .collect()
    }

    /// Most sends ever observed in progress at once
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelClient for RecordingClient {
    async fn send(
        &self,
        recipient: &RecipientId,
        text: &str,
    ) -> Result<SendReceipt, TransportError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let fail_once = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let result = if fail_once || self.failing.load(Ordering::SeqCst) {
            Err(TransportError::Unavailable {
                status: 503,
                message: "provider down".into(),
            })
        } else {
            let mut sent = self.sent.lock().unwrap();
            sent.push((recipient.clone(), text.to_string()));
            Ok(SendReceipt::with_id(format!("rec-{}", sent.len())))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Configuration with zero pacing delays and a short debounce window
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.chunking.min_delay = Duration::ZERO;
    config.chunking.max_delay = Duration::ZERO;
    config.buffer.consolidate_after = Duration::from_millis(50);
    config.buffer.max_buffer_size = 5;
    config
}

pub(crate) fn create_test_coordinator() -> (DeliveryCoordinator, Arc<RecordingClient>) {
    create_coordinator_with(test_config())
}

pub(crate) fn create_coordinator_with(
    config: Config,
) -> (DeliveryCoordinator, Arc<RecordingClient>) {
    let client = RecordingClient::new();
    let coordinator = DeliveryCoordinator::with_client(config, client.clone()).unwrap();
    (coordinator, client)
}

pub(crate) fn recipient(id: &str) -> RecipientId {
    RecipientId::new(id).unwrap()
}

/// Poll `condition` every 10ms until it holds or `timeout` passes
pub(crate) async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
