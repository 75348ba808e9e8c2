//! Greedy, boundary-aware text splitting

use crate::config::{MAX_CHUNK_DELAY, MIN_CHUNK_CHARS};
use crate::error::{Result, ValidationError};
use crate::types::{Chunk, ChunkStats, SplitOptions, SplitResult};
use rand::Rng;
use std::time::Duration;

/// Word count at which a chunk earns the full `max_delay`
const WORDS_FOR_MAX_DELAY: f64 = 50.0;

/// Terminators must sit in the last 70% of a window to be used as a cut
const BOUNDARY_SEARCH_START: f64 = 0.3;

/// Splits text into bounded chunks with humanlike pauses
///
/// # Examples
///
/// ```
/// use reply_pacer::chunking::ChunkSplitter;
/// use reply_pacer::types::SplitOptions;
/// use std::time::Duration;
///
/// let splitter = ChunkSplitter::new(SplitOptions {
///     max_chars: 50,
///     prefer_boundaries: true,
///     min_delay: Duration::from_millis(100),
///     max_delay: Duration::from_millis(200),
/// });
///
/// let result = splitter.split(&"Hello. ".repeat(20)).unwrap();
/// assert!(result.chunks.len() > 1);
/// assert!(result.chunks.iter().all(|c| c.text.ends_with('.')));
/// ```
#[derive(Clone, Debug)]
pub struct ChunkSplitter {
    defaults: SplitOptions,
}

impl ChunkSplitter {
    /// Create a splitter with default options
    pub fn new(defaults: SplitOptions) -> Self {
        Self { defaults }
    }

    /// Options applied by [`split`](Self::split)
    pub fn defaults(&self) -> &SplitOptions {
        &self.defaults
    }

    /// Split `text` using the splitter's default options
    ///
    /// # Errors
    ///
    /// See [`split_with`](Self::split_with).
    pub fn split(&self, text: &str) -> Result<SplitResult> {
        Self::split_with(text, &self.defaults)
    }

    /// Split `text` with explicit options
    ///
    /// `max_chars` below 50 is raised to 50. Text of at most `max_chars`
    /// characters always comes back as a single chunk.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyInput`] for empty or whitespace-only text
    /// - [`ValidationError::InvalidDelayRange`] when `min_delay > max_delay`
    /// - [`ValidationError::OutOfRange`] when `max_delay` exceeds 300s
    pub fn split_with(text: &str, options: &SplitOptions) -> Result<SplitResult> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        if options.min_delay > options.max_delay {
            return Err(ValidationError::InvalidDelayRange {
                min_ms: millis(options.min_delay),
                max_ms: millis(options.max_delay),
            }
            .into());
        }
        if options.max_delay > MAX_CHUNK_DELAY {
            return Err(ValidationError::OutOfRange {
                field: "max_delay_ms",
                value: millis(options.max_delay),
                min: 0,
                max: millis(MAX_CHUNK_DELAY),
            }
            .into());
        }

        let max_chars = options.max_chars.max(MIN_CHUNK_CHARS);
        let normalized = normalize(text);
        let pieces = window(&normalized, max_chars, options.prefer_boundaries);

        let mut rng = rand::thread_rng();
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| {
                let words = piece.split_whitespace().count();
                let delay = pacing_delay(words, options.min_delay, options.max_delay, &mut rng);
                Chunk::new(piece, delay, index)
            })
            .collect();

        let stats = ChunkStats::from_chunks(&chunks);
        tracing::debug!(
            chunks = stats.total_chunks,
            chars = stats.total_chars,
            max_chars,
            "split text"
        );

        Ok(SplitResult { chunks, stats })
    }
}

/// Collapse whitespace runs inside lines and cap blank-line runs at one
///
/// Lines are trimmed; the result has no leading or trailing whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            pending_blank = !out.is_empty();
            continue;
        };

        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;

        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }

    out
}

fn window(text: &str, max_chars: usize, prefer_boundaries: bool) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut cursor = 0;

    while cursor < len {
        while cursor < len && chars[cursor].is_whitespace() {
            cursor += 1;
        }
        if cursor >= len {
            break;
        }

        if len - cursor <= max_chars {
            pieces.push(chars[cursor..].iter().collect::<String>());
            break;
        }

        let cut = find_cut(&chars, cursor, cursor + max_chars, prefer_boundaries);
        let piece: String = chars[cursor..cut].iter().collect();
        pieces.push(piece.trim_end().to_string());
        cursor = cut;
    }

    pieces
}

/// Pick the exclusive end of the chunk starting at `start`
///
/// `end` is the exclusive window end and is always a valid index into `chars`.
fn find_cut(chars: &[char], start: usize, end: usize, prefer_boundaries: bool) -> usize {
    if prefer_boundaries {
        let span = end - start;
        let earliest = start + (span as f64 * BOUNDARY_SEARCH_START) as usize;
        for i in (earliest..end).rev() {
            let followed_by_space = chars.get(i + 1).is_none_or(|c| c.is_whitespace());
            if is_terminator(chars[i]) && followed_by_space {
                return i + 1;
            }
        }
    }

    for i in (start + 1..=end).rev() {
        if chars[i].is_whitespace() {
            return i;
        }
    }

    // No break anywhere in the window: cut mid-word
    end
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

/// Longer chunks earn a longer pause, jittered by ±10%
pub(crate) fn pacing_delay(
    word_count: usize,
    min: Duration,
    max: Duration,
    rng: &mut impl Rng,
) -> Duration {
    let min_s = min.as_secs_f64();
    let max_s = max.as_secs_f64();
    let ratio = (word_count as f64 / WORDS_FOR_MAX_DELAY).min(1.0);
    let base = min_s + (max_s - min_s) * ratio;
    let jittered = base * rng.gen_range(0.9..=1.1);
    Duration::from_secs_f64(jittered.clamp(min_s * 0.9, max_s * 1.1))
}
