use crate::chunking::*;
use crate::config::ChunkingConfig;
use crate::error::{Error, ValidationError};
use crate::types::SplitOptions;
use std::time::Duration;


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn options(max_chars: usize) -> SplitOptions {
    SplitOptions {
        max_chars,
        prefer_boundaries: true,
        min_delay: Duration::from_millis(1000),
        max_delay: Duration::from_millis(3000),
    }
}

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn joined_non_whitespace(chunks: &[crate::types::Chunk]) -> String {
    chunks.iter().map(|c| non_whitespace(&c.text)).collect()
}

const LOREM: &str = "Thanks for reaching out about the kitchen remodel! We can definitely \
help with cabinets, counters and the backsplash. Our designer is free Tuesday or Thursday \
afternoon, so let me know which works better. In the meantime, feel free to send photos of \
the current space. That helps us put together a rough estimate before the visit. Talk soon!";

// ---------------------------------------------------------------------------
// normalize()
// ---------------------------------------------------------------------------

#[test]
fn test_normalize_collapses_inline_whitespace() {
    assert_eq!(normalize("  hello    there \t friend  "), "hello there friend");
}

#[test]
fn test_normalize_caps_blank_lines_at_one() {
    let input = "first line\n\n\n\n   \nsecond line\nthird line\n\n";
    assert_eq!(normalize(input), "first line\n\nsecond line\nthird line");
}

#[test]
fn test_normalize_handles_crlf() {
    assert_eq!(normalize("a\r\n\r\nb"), "a\n\nb");
}

// ---------------------------------------------------------------------------
// split()
// ---------------------------------------------------------------------------

#[test]
fn test_split_rejects_empty_and_whitespace_input() {
    for input in ["", "   ", "\n\n\t"] {
        match ChunkSplitter::split_with(input, &options(100)) {
            Err(Error::Validation(ValidationError::EmptyInput)) => {}
            other => panic!("expected EmptyInput for {input:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_split_rejects_inverted_delay_range() {
    let mut opts = options(100);
    opts.min_delay = Duration::from_secs(4);
    opts.max_delay = Duration::from_secs(1);
    assert!(matches!(
        ChunkSplitter::split_with("hello", &opts),
        Err(Error::Validation(ValidationError::InvalidDelayRange { .. }))
    ));
}

#[test]
fn test_split_rejects_delays_above_cap() {
    let mut opts = options(50);
    opts.min_delay = Duration::from_millis(u64::MAX);
    opts.max_delay = Duration::from_millis(u64::MAX);

    match ChunkSplitter::split_with(&"word ".repeat(60_000), &opts) {
        Err(Error::Validation(ValidationError::OutOfRange {
            field, value, max, ..
        })) => {
            assert_eq!(field, "max_delay_ms");
            assert_eq!(value, u64::MAX);
            assert_eq!(max, 300_000);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }

    opts.min_delay = Duration::from_secs(300);
    opts.max_delay = Duration::from_secs(300);
    assert!(ChunkSplitter::split_with("hello", &opts).is_ok());
}

#[test]
fn test_stats_total_delay_saturates() {
    let chunks = vec![
        crate::types::Chunk::new("one", Duration::MAX, 0),
        crate::types::Chunk::new("two", Duration::from_secs(1), 1),
    ];
    let stats = crate::types::ChunkStats::from_chunks(&chunks);
    assert_eq!(stats.total_delay, Duration::MAX);
    assert_eq!(stats.total_chunks, 2);
}

#[test]
fn test_split_short_text_is_single_normalized_chunk() {
    let text = "Sounds   good,\n\n\n see you   then!";
    let result = ChunkSplitter::split_with(text, &options(100)).unwrap();

    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].text, normalize(text));
    assert_eq!(result.chunks[0].index, 0);
    assert_eq!(result.stats.total_chunks, 1);
}

#[test]
fn test_split_text_exactly_at_limit_is_single_chunk() {
    let text = "a".repeat(120);
    let result = ChunkSplitter::split_with(&text, &options(120)).unwrap();
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].char_count, 120);
}

#[test]
fn test_split_clamps_max_chars_to_floor() {
    // 48 chars would be split under max_chars=10 if the floor were ignored
    let text = "one two three four five six seven eight nine ten";
    assert!(text.chars().count() <= 50);

    let result = ChunkSplitter::split_with(text, &options(10)).unwrap();
    assert_eq!(result.chunks.len(), 1, "max_chars below 50 is raised to 50");

    let long = "word ".repeat(40);
    let result = ChunkSplitter::split_with(&long, &options(1)).unwrap();
    assert!(result.chunks.iter().all(|c| c.char_count <= 50));
    assert!(
        result.chunks.iter().any(|c| c.char_count > 40),
        "chunks are sized against the floor, not the requested 1"
    );
}

#[test]
fn test_split_repeated_sentences_end_on_terminators() {
    let text = "Hello. ".repeat(20);
    let result = ChunkSplitter::split_with(&text, &options(50)).unwrap();

    assert!(result.chunks.len() > 1);
    for chunk in &result.chunks {
        assert!(
            chunk.text.ends_with('.'),
            "chunk {:?} should end with a period",
            chunk.text
        );
        assert!(chunk.char_count <= 50);
    }
}

#[test]
fn test_split_preserves_content_and_order() {
    let result = ChunkSplitter::split_with(LOREM, &options(80)).unwrap();

    assert!(result.chunks.len() > 1);
    assert_eq!(
        joined_non_whitespace(&result.chunks),
        non_whitespace(&normalize(LOREM))
    );
    for (i, chunk) in result.chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert!(chunk.char_count <= 80);
        assert_eq!(chunk.text, chunk.text.trim());
    }
}

#[test]
fn test_split_preserves_content_for_many_limits() {
    let text = format!("{LOREM}\n\n{LOREM}\n  {}", "x".repeat(130));
    for max_chars in [50, 57, 64, 99, 150, 333, 1000] {
        let result = ChunkSplitter::split_with(&text, &options(max_chars)).unwrap();
        assert_eq!(
            joined_non_whitespace(&result.chunks),
            non_whitespace(&text),
            "content mismatch at max_chars={max_chars}"
        );
        assert!(
            result.chunks.iter().all(|c| c.char_count <= max_chars),
            "oversized chunk at max_chars={max_chars}"
        );
    }
}

#[test]
fn test_split_never_breaks_words_when_spaces_exist() {
    let result = ChunkSplitter::split_with(LOREM, &options(60)).unwrap();
    let words: Vec<&str> = LOREM.split_whitespace().collect();
    let rebuilt: Vec<&str> = result
        .chunks
        .iter()
        .flat_map(|c| c.text.split_whitespace())
        .collect();
    assert_eq!(rebuilt, words);
}

#[test]
fn test_split_without_boundary_preference_fills_windows() {
    let mut opts = options(60);
    opts.prefer_boundaries = false;
    let result = ChunkSplitter::split_with(LOREM, &opts).unwrap();

    // Whitespace-only cutting packs chunks more tightly than sentence cutting
    let with_boundaries = ChunkSplitter::split_with(LOREM, &options(60)).unwrap();
    assert!(result.chunks.len() <= with_boundaries.chunks.len());
    assert!(result.chunks.iter().all(|c| c.char_count <= 60));
}

#[test]
fn test_split_hard_cuts_unbroken_text() {
    let text = "z".repeat(125);
    let result = ChunkSplitter::split_with(&text, &options(50)).unwrap();

    let sizes: Vec<usize> = result.chunks.iter().map(|c| c.char_count).collect();
    assert_eq!(sizes, vec![50, 50, 25]);
}

#[test]
fn test_split_ignores_decimal_points() {
    let text = format!("The quote comes to 3.14 thousand dollars {}", "a ".repeat(40));
    let result = ChunkSplitter::split_with(&text, &options(50)).unwrap();
    assert!(
        !result.chunks[0].text.ends_with("3."),
        "a period inside a number is not a sentence end"
    );
}

#[test]
fn test_split_multibyte_text_counts_chars() {
    let text = "¡Hola! ¿Cómo estás? ".repeat(10);
    let result = ChunkSplitter::split_with(&text, &options(50)).unwrap();
    assert!(result.chunks.iter().all(|c| c.char_count <= 50));
    assert_eq!(joined_non_whitespace(&result.chunks), non_whitespace(&text));
}

// ---------------------------------------------------------------------------
// Pacing delays
// ---------------------------------------------------------------------------

#[test]
fn test_delays_stay_within_jittered_bounds() {
    let opts = options(60);
    let result = ChunkSplitter::split_with(&LOREM.repeat(3), &opts).unwrap();

    let lo = opts.min_delay.mul_f64(0.9);
    let hi = opts.max_delay.mul_f64(1.1);
    for chunk in &result.chunks {
        assert!(
            chunk.delay >= lo && chunk.delay <= hi,
            "delay {:?} outside [{lo:?}, {hi:?}]",
            chunk.delay
        );
    }
}

#[test]
fn test_short_chunks_get_near_minimum_delay() {
    let result = ChunkSplitter::split_with("Ok!", &options(100)).unwrap();
    let delay = result.chunks[0].delay;
    // 1 word: base = 1000 + 2000 * 0.02 = 1040ms, jittered ±10%
    assert!(delay >= Duration::from_millis(936) && delay <= Duration::from_millis(1144));
}

#[test]
fn test_long_chunks_get_near_maximum_delay() {
    let text = "word ".repeat(60);
    let result = ChunkSplitter::split_with(&text, &options(1000)).unwrap();
    let delay = result.chunks[0].delay;
    assert!(delay >= Duration::from_millis(2700) && delay <= Duration::from_millis(3300));
}

#[test]
fn test_zero_delays_are_allowed() {
    let opts = SplitOptions {
        max_chars: 50,
        prefer_boundaries: true,
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };
    let result = ChunkSplitter::split_with(LOREM, &opts).unwrap();
    assert!(result.chunks.iter().all(|c| c.delay.is_zero()));
    assert_eq!(result.stats.total_delay, Duration::ZERO);
}

#[test]
fn test_stats_match_chunks() {
    let result = ChunkSplitter::split_with(LOREM, &options(70)).unwrap();
    let stats = &result.stats;

    assert_eq!(stats.total_chunks, result.chunks.len());
    assert_eq!(
        stats.total_chars,
        result.chunks.iter().map(|c| c.char_count).sum::<usize>()
    );
    assert_eq!(
        stats.total_delay,
        result.chunks.iter().map(|c| c.delay).sum::<Duration>()
    );
    let expected_avg = stats.total_chars as f64 / stats.total_chunks as f64;
    assert!((stats.average_chunk_size - expected_avg).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// ChunkPlanner
// ---------------------------------------------------------------------------

#[test]
fn test_planner_uses_splitter_for_plain_text() {
    let config = ChunkingConfig {
        max_chars: 60,
        ..Default::default()
    };
    let planner = ChunkPlanner::new(&config);
    let chunks = planner.plan(LOREM);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.char_count <= 60));
}

#[test]
fn test_planner_keeps_pre_paced_paragraphs() {
    let planner = ChunkPlanner::new(&ChunkingConfig::default());
    let text = "Hey Jordan!\n\nThis is Riley from Bright Smiles. [pause 2s]\n\nDoes Friday work?";
    let chunks = planner.plan(text);

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Hey Jordan!",
            "This is Riley from Bright Smiles.",
            "Does Friday work?"
        ]
    );
    assert_eq!(chunks[1].delay, Duration::from_secs(2));
}

#[test]
fn test_planner_skips_detection_when_disabled() {
    let config = ChunkingConfig {
        detect_pre_paced: false,
        ..Default::default()
    };
    let planner = ChunkPlanner::new(&config);
    let chunks = planner.plan("Hey!\n\nShort follow-up.");
    assert_eq!(chunks.len(), 1, "short text goes through the splitter whole");
}

#[test]
fn test_planner_returns_empty_for_blank_text() {
    let planner = ChunkPlanner::new(&ChunkingConfig::default());
    assert!(planner.plan("   ").is_empty());
}

#[test]
fn test_planner_bounds_long_pre_paced_paragraphs() {
    let planner = ChunkPlanner::new(&ChunkingConfig::default());
    let long = "This is a long sentence about solar panels and savings. ".repeat(20);
    let text = format!("Hi there!\n\n{long}[pause 3s]\n\nTalk soon?");

    let chunks = planner.plan(&text);

    assert!(chunks.len() > 3);
    assert!(
        chunks.iter().all(|c| c.char_count <= 300),
        "biggest chunk: {}",
        chunks.iter().map(|c| c.char_count).max().unwrap()
    );
    assert_eq!(chunks.first().unwrap().text, "Hi there!");
    assert_eq!(chunks.last().unwrap().text, "Talk soon?");
    let indexes: Vec<usize> = chunks.iter().map(|c| c.index).collect();
    assert_eq!(indexes, (0..chunks.len()).collect::<Vec<_>>());

    // The paragraph's pause lands on its last piece
    let before_last = &chunks[chunks.len() - 2];
    assert_eq!(before_last.delay, Duration::from_secs(3));
    assert!(before_last.text.ends_with("savings."));

    assert_eq!(joined_non_whitespace(&chunks), non_whitespace(&text.replace("[pause 3s]", "")));
}

#[test]
fn test_planner_bounds_consolidated_batch_opening_with_greeting() {
    let config = ChunkingConfig {
        max_chars: 80,
        ..Default::default()
    };
    let planner = ChunkPlanner::new(&config);
    let text = format!("Hey!\n\n{}", LOREM);

    let chunks = planner.plan(&text);
    assert!(chunks.iter().all(|c| c.char_count <= 80));
    assert_eq!(joined_non_whitespace(&chunks), non_whitespace(&text));
}

#[test]
fn test_unchunked_text_drops_pause_markers() {
    let planner = ChunkPlanner::new(&ChunkingConfig::default());
    let text = "Hey Jordan!\n\nThis is Riley. [pause 2s]\n\n[pause 4s]\n\nDoes Friday work?";

    assert_eq!(
        planner.unchunked_text(text),
        "Hey Jordan!\n\nThis is Riley.\n\nDoes Friday work?"
    );
    assert_eq!(planner.unchunked_text("plain reply"), "plain reply");
}

#[test]
fn test_unchunked_text_untouched_without_detection() {
    let config = ChunkingConfig {
        detect_pre_paced: false,
        ..Default::default()
    };
    let planner = ChunkPlanner::new(&config);
    assert_eq!(planner.unchunked_text("wait [pause 2s] ok"), "wait [pause 2s] ok");
}
