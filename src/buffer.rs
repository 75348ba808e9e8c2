//! Per-recipient accumulation state
//!
//! A [`RecipientBuffer`] is plain data. The coordinator owns one per recipient
//! behind its own async mutex and performs every transition while holding it.
//!
//! Debounce timers are tracked with a flush epoch. Arming a timer records the
//! current epoch; every successful flush advances it. A timer whose epoch no
//! longer matches when it fires belongs to a batch that was already delivered
//! and does nothing.

use crate::types::{BufferStatus, RecipientId};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Characters of each item shown in a status preview
pub const PREVIEW_CHARS: usize = 50;

/// Separator placed between items when a batch is consolidated
pub const CONSOLIDATION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
struct BufferedItem {
    text: String,
    enqueued_at: DateTime<Utc>,
    enqueued: Instant,
    delivered: bool,
}

/// A timer armed by [`RecipientBuffer::arm_timer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    /// Epoch the timer belongs to
    pub epoch: u64,
    /// How long the timer waits before firing
    pub wait: Duration,
}

/// Ordered, not-yet-delivered items for one recipient
#[derive(Debug)]
pub struct RecipientBuffer {
    recipient: RecipientId,
    items: Vec<BufferedItem>,
    epoch: u64,
    flush_deadline: Option<Instant>,
}

impl RecipientBuffer {
    /// Create an empty buffer
    pub fn new(recipient: RecipientId) -> Self {
        Self {
            recipient,
            items: Vec::new(),
            epoch: 0,
            flush_deadline: None,
        }
    }

    /// Recipient this buffer belongs to
    pub fn recipient(&self) -> &RecipientId {
        &self.recipient
    }

    /// Append `text`, returning the number of undelivered items
    pub fn push(&mut self, text: impl Into<String>) -> usize {
        self.items.push(BufferedItem {
            text: text.into(),
            enqueued_at: Utc::now(),
            enqueued: Instant::now(),
            delivered: false,
        });
        self.len()
    }

    /// Number of undelivered items
    pub fn len(&self) -> usize {
        self.items.iter().filter(|item| !item.delivered).count()
    }

    /// Whether no undelivered items remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current flush epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Arm a debounce timer unless one is already pending
    ///
    /// Returns the timer to schedule, or `None` when a pending timer already
    /// covers this buffer.
    pub fn arm_timer(&mut self, debounce: Duration) -> Option<ArmedTimer> {
        if self.flush_deadline.is_some() {
            return None;
        }
        self.flush_deadline = Some(Instant::now() + debounce);
        Some(ArmedTimer {
            epoch: self.epoch,
            wait: debounce,
        })
    }

    /// Whether a debounce timer is armed
    pub fn timer_pending(&self) -> bool {
        self.flush_deadline.is_some()
    }

    /// Time left before the armed timer fires
    pub fn time_until_flush(&self) -> Option<Duration> {
        self.flush_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Handle a timer from `epoch` firing
    ///
    /// Returns whether the caller should flush. A stale timer (epoch changed)
    /// leaves any newer timer untouched.
    pub fn timer_fired(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.flush_deadline = None;
        !self.is_empty()
    }

    /// Undelivered item texts joined in enqueue order
    pub fn consolidated_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .items
            .iter()
            .filter(|item| !item.delivered)
            .map(|item| item.text.as_str())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(CONSOLIDATION_SEPARATOR))
        }
    }

    /// Mark the current batch delivered and start a new epoch
    ///
    /// Clears delivered items and any armed timer. Returns how many items were
    /// cleared.
    pub fn complete_flush(&mut self) -> usize {
        let mut cleared = 0;
        for item in self.items.iter_mut().filter(|item| !item.delivered) {
            item.delivered = true;
            cleared += 1;
        }
        self.items.retain(|item| !item.delivered);
        self.epoch += 1;
        self.flush_deadline = None;
        cleared
    }

    /// Read-only view for diagnostics
    pub fn status(&self) -> BufferStatus {
        let oldest = self.items.iter().find(|item| !item.delivered);
        BufferStatus {
            recipient: self.recipient.clone(),
            size: self.len(),
            oldest_age_ms: oldest.map(|item| item.enqueued.elapsed().as_millis() as u64),
            oldest_enqueued_at: oldest.map(|item| item.enqueued_at),
            previews: self
                .items
                .iter()
                .filter(|item| !item.delivered)
                .map(|item| preview(&item.text))
                .collect(),
            flush_pending: self.timer_pending(),
            time_until_flush_ms: self.time_until_flush().map(|d| d.as_millis() as u64),
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> RecipientBuffer {
        RecipientBuffer::new(RecipientId::new("+15550001111").unwrap())
    }

    #[test]
    fn test_consolidation_keeps_enqueue_order() {
        let mut buf = buffer();
        assert_eq!(buf.consolidated_text(), None);

        buf.push("first");
        buf.push("second");
        assert_eq!(buf.push("third"), 3);
        assert_eq!(
            buf.consolidated_text().as_deref(),
            Some("first\n\nsecond\n\nthird")
        );
    }

    #[test]
    fn test_only_one_timer_armed_at_a_time() {
        let mut buf = buffer();
        buf.push("a");
        let timer = buf.arm_timer(Duration::from_secs(3)).unwrap();
        assert_eq!(timer.epoch, 0);
        assert_eq!(timer.wait, Duration::from_secs(3));

        buf.push("b");
        assert!(buf.arm_timer(Duration::from_secs(3)).is_none());
        assert!(buf.timer_pending());
        assert!(buf.time_until_flush().unwrap() <= Duration::from_secs(3));
    }

    #[test]
    fn test_timer_from_current_epoch_triggers_flush() {
        let mut buf = buffer();
        buf.push("a");
        let timer = buf.arm_timer(Duration::from_millis(10)).unwrap();

        assert!(buf.timer_fired(timer.epoch));
        assert!(!buf.timer_pending());
    }

    #[test]
    fn test_stale_timer_is_ignored_after_flush() {
        let mut buf = buffer();
        buf.push("a");
        let stale = buf.arm_timer(Duration::from_secs(1)).unwrap();

        assert_eq!(buf.complete_flush(), 1);
        assert!(buf.is_empty());
        assert!(!buf.timer_pending());

        buf.push("b");
        let fresh = buf.arm_timer(Duration::from_secs(1)).unwrap();
        assert_ne!(stale.epoch, fresh.epoch);

        assert!(!buf.timer_fired(stale.epoch), "stale timer must not flush");
        assert!(buf.timer_pending(), "stale timer must not disarm the fresh one");
        assert!(buf.timer_fired(fresh.epoch));
    }

    #[test]
    fn test_timer_on_empty_buffer_does_not_flush() {
        let mut buf = buffer();
        let timer = buf.arm_timer(Duration::from_secs(1)).unwrap();
        assert!(!buf.timer_fired(timer.epoch));
        assert!(!buf.timer_pending());
    }

    #[test]
    fn test_complete_flush_advances_epoch_and_clears() {
        let mut buf = buffer();
        buf.push("a");
        buf.push("b");
        let before = buf.epoch();

        assert_eq!(buf.complete_flush(), 2);
        assert_eq!(buf.epoch(), before + 1);
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.consolidated_text(), None);
    }

    #[test]
    fn test_status_snapshot() {
        let mut buf = buffer();
        let long = "x".repeat(120);
        buf.push("short");
        buf.push(long.as_str());
        buf.arm_timer(Duration::from_secs(5));

        let status = buf.status();
        assert_eq!(status.recipient.as_str(), "+15550001111");
        assert_eq!(status.size, 2);
        assert_eq!(status.previews[0], "short");
        assert_eq!(status.previews[1].chars().count(), PREVIEW_CHARS);
        assert!(status.flush_pending);
        assert!(status.time_until_flush_ms.unwrap() <= 5000);
        assert!(status.oldest_age_ms.is_some());
        assert!(status.oldest_enqueued_at.is_some());
    }

    #[test]
    fn test_status_of_empty_buffer() {
        let status = buffer().status();
        assert_eq!(status.size, 0);
        assert!(status.previews.is_empty());
        assert_eq!(status.oldest_age_ms, None);
        assert!(!status.flush_pending);
        assert_eq!(status.time_until_flush_ms, None);
    }
}
