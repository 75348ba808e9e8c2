//! Common test utilities for reply-pacer integration tests

use async_trait::async_trait;
use reply_pacer::{ChannelClient, Config, Event, RecipientId, SendReceipt, TransportError};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Client that holds every send for `latency` and tracks overlap
pub struct SlowClient {
    latency: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl SlowClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelClient for SlowClient {
    async fn send(&self, recipient: &RecipientId, text: &str) -> Result<SendReceipt, TransportError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        // blocks the gate worker thread for the whole send
        std::thread::sleep(self.latency);
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(SendReceipt::default())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Configuration with no pacing delays, a short debounce and `base_url` as provider
pub fn provider_config(base_url: Option<String>) -> Config {
    let mut config = Config::default();
    config.chunking.min_delay = Duration::ZERO;
    config.chunking.max_delay = Duration::ZERO;
    config.buffer.consolidate_after = Duration::from_millis(80);
    config.channel.base_url = base_url;
    config.channel.auth_token = Some("test-token".into());
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.jitter = false;
    config
}

pub fn recipient(id: &str) -> RecipientId {
    RecipientId::new(id).unwrap()
}

/// Collect events until `done` matches one or `timeout` passes
pub async fn collect_events_until(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut done: impl FnMut(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let finished = done(&event);
            seen.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    seen
}
