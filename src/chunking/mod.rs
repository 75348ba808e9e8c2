//! Text segmentation and pacing
//!
//! Turns a reply into the sequence of chunks the dispatcher sends. Two
//! strategies are available:
//! - [`ChunkSplitter`] greedily windows normalized text and prefers sentence ends
//! - [`HumanizationDetector`] recognizes text that was already paced upstream and
//!   keeps its own paragraph breaks
//!
//! [`ChunkPlanner`] picks between them for the coordinator.

mod humanize;
mod splitter;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use humanize::{HumanizationDetector, Probe};
pub use splitter::{ChunkSplitter, normalize};

use crate::config::{ChunkingConfig, MIN_CHUNK_CHARS};
use crate::types::Chunk;
use std::time::Duration;

/// Chooses a segmentation strategy for consolidated text
pub struct ChunkPlanner {
    splitter: ChunkSplitter,
    detector: HumanizationDetector,
    detect_pre_paced: bool,
    min_delay: Duration,
}

impl ChunkPlanner {
    /// Create a planner from chunking configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            splitter: ChunkSplitter::new(config.into()),
            detector: HumanizationDetector::new(),
            detect_pre_paced: config.detect_pre_paced,
            min_delay: config.min_delay,
        }
    }

    /// The splitter used for text that is not pre-paced
    pub fn splitter(&self) -> &ChunkSplitter {
        &self.splitter
    }

    /// The pre-paced text detector
    pub fn detector(&self) -> &HumanizationDetector {
        &self.detector
    }

    /// Segment `text` into chunks
    ///
    /// Pre-paced paragraphs longer than `max_chars` are split again; the
    /// paragraph's pause goes on its last piece. No chunk exceeds the clamped
    /// `max_chars`.
    ///
    /// Returns an empty list when the splitter refuses the text; the dispatcher
    /// then falls back to a single unchunked send.
    pub fn plan(&self, text: &str) -> Vec<Chunk> {
        if self.detect_pre_paced && self.detector.looks_pre_paced(text) {
            tracing::debug!("text looks pre-paced, segmenting on paragraph breaks");
            let paragraphs = self
                .detector
                .extract_preformatted_chunks(text, self.min_delay);
            return self.bound(paragraphs);
        }

        match self.splitter.split(text) {
            Ok(result) => result.chunks,
            Err(e) => {
                tracing::warn!(error = %e, "chunking failed, dispatcher will send unchunked");
                Vec::new()
            }
        }
    }

    /// Text to send when chunked delivery is abandoned
    ///
    /// `[pause Ns]` markers are removed when pre-paced detection is on.
    pub fn unchunked_text(&self, text: &str) -> String {
        if self.detect_pre_paced {
            self.detector.strip_pause_markers(text)
        } else {
            text.to_string()
        }
    }

    fn bound(&self, paragraphs: Vec<Chunk>) -> Vec<Chunk> {
        let max_chars = self.splitter.defaults().max_chars.max(MIN_CHUNK_CHARS);
        let mut chunks = Vec::with_capacity(paragraphs.len());

        for paragraph in paragraphs {
            if paragraph.char_count <= max_chars {
                chunks.push(paragraph);
                continue;
            }

            match self.splitter.split(&paragraph.text) {
                Ok(result) => {
                    tracing::debug!(
                        chars = paragraph.char_count,
                        pieces = result.chunks.len(),
                        max_chars,
                        "re-splitting oversized paragraph"
                    );
                    let last = result.chunks.len().saturating_sub(1);
                    for (i, mut piece) in result.chunks.into_iter().enumerate() {
                        if i == last {
                            piece.delay = paragraph.delay;
                        }
                        chunks.push(piece);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not re-split paragraph, keeping it whole");
                    chunks.push(paragraph);
                }
            }
        }

        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = index;
        }
        chunks
    }
}
