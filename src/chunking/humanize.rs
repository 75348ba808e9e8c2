//! Detection of replies that were already paced upstream
//!
//! The classifier is a heuristic: it has false positives and false negatives.
//! What is guaranteed is the failure mode. Extraction never returns an error;
//! anything unexpected degrades to a single chunk holding the whole text.

use crate::types::Chunk;
use regex::Regex;
use std::time::Duration;

/// Minimum number of distinct probes that must match before text counts as pre-paced
const REQUIRED_PROBE_MATCHES: usize = 2;

/// Longest pause a marker may request
const MAX_PAUSE: Duration = Duration::from_secs(300);

/// Signals that a reply was laid out for pacing by an earlier generation stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Opens with a greeting or introduces the sender ("Hi!", "this is Sam from Acme")
    GreetingOrIdentity,
    /// Contains an explicit `[pause Ns]` marker
    PauseMarker,
    /// Already broken into paragraphs by blank lines
    ParagraphBreak,
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error("pause marker pattern unavailable")]
    PatternUnavailable,
    #[error("pause duration '{0}' is not a valid number of seconds")]
    InvalidPause(String),
    #[error("no visible text in any segment")]
    NoSegments,
}

/// Recognizes pre-paced text and segments it on its own paragraph breaks
pub struct HumanizationDetector {
    probes: Vec<(Probe, Regex)>,
    pause_marker: Option<Regex>,
    paragraph_break: Option<Regex>,
}

impl Default for HumanizationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanizationDetector {
    /// Create a detector with the built-in probe set
    ///
    /// A probe whose pattern fails to compile is disabled and logged; the
    /// detector stays usable with the remaining probes.
    pub fn new() -> Self {
        let pause_marker = compile(r"(?i)\[\s*pause\s+(\d+(?:\.\d+)?)\s*s(?:ec(?:ond)?s?)?\s*\]");
        let paragraph_break = compile(r"\n[ \t]*\n");
        let greeting = compile(
            r"(?i)^\s*(?:hi|hey|hello|good\s+(?:morning|afternoon|evening))\b|\b(?:this\s+is|my\s+name\s+is)\s+\w+\s+(?:from|with|at)\b",
        );

        let probes = [
            (Probe::GreetingOrIdentity, greeting),
            (Probe::PauseMarker, pause_marker.clone()),
            (Probe::ParagraphBreak, paragraph_break.clone()),
        ]
        .into_iter()
        .filter_map(|(probe, regex)| regex.map(|r| (probe, r)))
        .collect();

        Self {
            probes,
            pause_marker,
            paragraph_break,
        }
    }

    /// Probes that match `text`, each listed once
    pub fn matched_probes(&self, text: &str) -> Vec<Probe> {
        self.probes
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(probe, _)| *probe)
            .collect()
    }

    /// Whether at least two distinct probes match
    pub fn looks_pre_paced(&self, text: &str) -> bool {
        self.matched_probes(text).len() >= REQUIRED_PROBE_MATCHES
    }

    /// Segment pre-paced text on blank lines
    ///
    /// Each non-empty paragraph becomes one chunk. A `[pause Ns]` marker sets
    /// that chunk's delay and is removed from the visible text; a paragraph
    /// holding only a marker extends the previous chunk's delay. Chunks without
    /// a marker get `default_delay`.
    ///
    /// Never fails: on any extraction problem the whole text is returned as a
    /// single chunk.
    pub fn extract_preformatted_chunks(&self, text: &str, default_delay: Duration) -> Vec<Chunk> {
        match self.try_extract(text, default_delay) {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(error = %e, "pre-paced extraction failed, sending as one chunk");
                vec![Chunk::new(text.trim(), default_delay, 0)]
            }
        }
    }

    /// Remove every `[pause Ns]` marker and tidy the whitespace it leaves
    ///
    /// Paragraph breaks survive. Without a usable marker pattern the text is
    /// returned unchanged.
    pub fn strip_pause_markers(&self, text: &str) -> String {
        let (Some(pause_marker), Some(paragraph_break)) =
            (&self.pause_marker, &self.paragraph_break)
        else {
            return text.to_string();
        };

        paragraph_break
            .split(text)
            .map(|segment| tidy_lines(&pause_marker.replace_all(segment, " ")))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn try_extract(
        &self,
        text: &str,
        default_delay: Duration,
    ) -> Result<Vec<Chunk>, ExtractError> {
        let pause_marker = self
            .pause_marker
            .as_ref()
            .ok_or(ExtractError::PatternUnavailable)?;
        let paragraph_break = self
            .paragraph_break
            .as_ref()
            .ok_or(ExtractError::PatternUnavailable)?;

        let mut chunks: Vec<Chunk> = Vec::new();

        for segment in paragraph_break.split(text) {
            let mut explicit_delay = None;
            for caps in pause_marker.captures_iter(segment) {
                let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                explicit_delay = Some(parse_pause(raw)?);
            }

            let stripped = pause_marker.replace_all(segment, " ");
            let visible = tidy_lines(&stripped);

            if visible.is_empty() {
                if let (Some(delay), Some(previous)) = (explicit_delay, chunks.last_mut()) {
                    previous.delay = delay;
                }
                continue;
            }

            let index = chunks.len();
            chunks.push(Chunk::new(
                visible,
                explicit_delay.unwrap_or(default_delay),
                index,
            ));
        }

        if chunks.is_empty() {
            return Err(ExtractError::NoSegments);
        }
        Ok(chunks)
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::error!(pattern, error = %e, "disabling pre-paced probe");
            None
        }
    }
}

fn parse_pause(raw: &str) -> Result<Duration, ExtractError> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| ExtractError::InvalidPause(raw.to_string()))?;
    let delay = Duration::try_from_secs_f64(secs)
        .map_err(|_| ExtractError::InvalidPause(raw.to_string()))?;
    Ok(delay.min(MAX_PAUSE))
}

fn tidy_lines(segment: &str) -> String {
    segment
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
