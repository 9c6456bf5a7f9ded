//! Segmentation: cut a long course text into ordered chunks.
//!
//! Two strategies exist because the text comes from two kinds of sources:
//!
//! * **Fixed-width** windows bound how much text is forwarded to a
//!   token-limited completion service when the source has no usable
//!   structure (raw PDF text).
//! * **Marker-based** splitting keeps human- or model-authored structure when
//!   the text already declares its modules (`Module 1: …`, `Module 2 - …`),
//!   which is the case for customised course output.
//!
//! Both strategies are purely lexical and never fail. Fixed-width windows of
//! blank text are empty; marker splitting only returns nothing for the empty
//! string, and any other text without markers comes back as a single chunk.

use crate::config::SegmentStrategy;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Where a chunk came from in the segmented text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum SourceRange {
    /// Byte offsets (marker-based chunks are verbatim slices).
    Bytes { start: usize, end: usize },
    /// Word offsets (fixed-width chunks are re-joined words).
    Words { start: usize, end: usize },
}

impl SourceRange {
    pub fn bytes(range: Range<usize>) -> Self {
        SourceRange::Bytes {
            start: range.start,
            end: range.end,
        }
    }

    pub fn words(range: Range<usize>) -> Self {
        SourceRange::Words {
            start: range.start,
            end: range.end,
        }
    }
}

/// One ordered unit of segmented text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-indexed position in segmentation order.
    pub index: usize,
    pub text: String,
    pub source_range: Option<SourceRange>,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Splits text according to a [`SegmentStrategy`].
#[derive(Debug, Clone)]
pub struct Segmenter {
    strategy: SegmentStrategy,
}

impl Segmenter {
    pub fn new(strategy: SegmentStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &SegmentStrategy {
        &self.strategy
    }

    /// Segment `text` into ordered chunks.
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        match self.strategy {
            SegmentStrategy::FixedWidth { words_per_chunk } => {
                split_fixed_width(text, words_per_chunk)
            }
            SegmentStrategy::Markers => split_by_markers(text),
            SegmentStrategy::Auto { words_per_chunk } => {
                if has_module_markers(text) {
                    split_by_markers(text)
                } else {
                    split_fixed_width(text, words_per_chunk)
                }
            }
        }
    }
}

/// Convenience wrapper around [`Segmenter::segment`].
pub fn segment(text: &str, strategy: &SegmentStrategy) -> Vec<Chunk> {
    Segmenter::new(strategy.clone()).segment(text)
}

// ── Fixed-width ──────────────────────────────────────────────────────────────

/// Consecutive, non-overlapping windows of `words_per_chunk` whitespace
/// separated words, re-joined with single spaces.
///
/// A window size of 0 is treated as 1; [`crate::config::MindMapConfigBuilder`]
/// rejects it before it gets here.
pub fn split_fixed_width(text: &str, words_per_chunk: usize) -> Vec<Chunk> {
    let window = words_per_chunk.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(window)
        .enumerate()
        .map(|(i, slice)| {
            let start = i * window;
            Chunk {
                index: i + 1,
                text: slice.join(" "),
                source_range: Some(SourceRange::words(start..start + slice.len())),
            }
        })
        .collect()
}

// ── Marker-based ─────────────────────────────────────────────────────────────

/// `Module 3`, `module 3:`, `MODULE12 -` … followed by at least one space.
static RE_MODULE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Module\s*\d+[:\-]?\s+").unwrap());

/// Whether `text` contains at least one module marker.
pub fn has_module_markers(text: &str) -> bool {
    RE_MODULE_MARKER.is_match(text)
}

/// One chunk per module marker, running verbatim to the next marker.
///
/// Text before the first marker (a course title, an intro paragraph) is not
/// part of any module and is dropped. Without any marker the whole text,
/// whitespace-only included, is a single chunk; only `""` yields no chunks.
pub fn split_by_markers(text: &str) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let starts: Vec<usize> = RE_MODULE_MARKER.find_iter(text).map(|m| m.start()).collect();

    if starts.is_empty() {
        return vec![Chunk {
            index: 1,
            text: text.to_string(),
            source_range: Some(SourceRange::bytes(0..text.len())),
        }];
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            Chunk {
                index: i + 1,
                text: text[start..end].to_string(),
                source_range: Some(SourceRange::bytes(start..end)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn fixed_width_preserves_word_count_and_window_size() {
        let text = words(3503);
        for k in [1, 7, 500, 1500, 5000] {
            let chunks = split_fixed_width(&text, k);
            let total: usize = chunks.iter().map(Chunk::word_count).sum();
            assert_eq!(total, 3503, "k={k}");
            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.word_count() == k), "k={k}");
            assert!(last.word_count() <= k && last.word_count() > 0, "k={k}");
        }
    }

    #[test]
    fn fixed_width_keeps_order_and_indices() {
        let chunks = split_fixed_width("a b c d e", 2);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c d", "e"]);
        let idx: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![1, 2, 3]);
        assert_eq!(chunks[2].source_range, Some(SourceRange::words(4..5)));
    }

    #[test]
    fn fixed_width_normalises_whitespace() {
        let chunks = split_fixed_width("  alpha\n\tbeta   gamma \n", 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "alpha beta gamma");
    }

    #[test]
    fn fixed_width_empty_input_yields_nothing() {
        assert!(split_fixed_width("", 100).is_empty());
        assert!(split_fixed_width(" \n\t ", 100).is_empty());
    }

    #[test]
    fn fixed_width_zero_window_does_not_panic() {
        assert_eq!(split_fixed_width("a b", 0).len(), 2);
    }

    #[test]
    fn markers_absent_returns_whole_text() {
        let text = "An introduction with no structure at all.\nSecond line.";
        let chunks = split_by_markers(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].index, 1);
    }

    #[test]
    fn markers_split_in_document_order() {
        let text = "Module 1: Basics\nIntro text.\nModule 2: Advanced\nDeeper text.";
        let chunks = split_by_markers(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("Module 1"));
        assert!(chunks[1].text.starts_with("Module 2"));
        assert_eq!(chunks[0].text, "Module 1: Basics\nIntro text.\n");
        assert_eq!(chunks[1].text, "Module 2: Advanced\nDeeper text.");
        let second = text.find("Module 2").unwrap();
        assert_eq!(
            chunks[1].source_range,
            Some(SourceRange::bytes(second..text.len()))
        );
    }

    #[test]
    fn markers_are_case_insensitive_and_accept_separators() {
        let text = "MODULE 1 - Safety\nbody\nmodule2: Quality\nbody\nModule 3 Lean\nbody";
        let chunks = split_by_markers(text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].text.starts_with("module2:"));
        assert!(chunks[2].text.starts_with("Module 3 Lean"));
    }

    #[test]
    fn markers_drop_preamble() {
        let text = "# Course Title\n\nModule 1: One\nx\nModule 2: Two\ny";
        let chunks = split_by_markers(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.text.contains("Course Title")));
    }

    #[test]
    fn markers_require_trailing_whitespace() {
        // "Module 1" glued to the end of the text is not a marker.
        let chunks = split_by_markers("See Module 1");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "See Module 1");
    }

    #[test]
    fn markers_empty_input_yields_nothing() {
        assert!(split_by_markers("").is_empty());
    }

    #[test]
    fn markers_whitespace_only_input_is_one_chunk() {
        let text = "  \n\t ";
        let chunks = Segmenter::new(SegmentStrategy::Markers).segment(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].source_range, Some(SourceRange::bytes(0..text.len())));
    }

    #[test]
    fn auto_prefers_markers_when_present() {
        let strategy = SegmentStrategy::Auto { words_per_chunk: 2 };
        let with_markers = segment("Module 1: a b c d\nModule 2: e f g h", &strategy);
        assert_eq!(with_markers.len(), 2);
        let without = segment("a b c d e", &strategy);
        assert_eq!(without.len(), 3);
    }

    #[test]
    fn segmenter_is_reproducible() {
        let s = Segmenter::new(SegmentStrategy::Markers);
        let text = "Module 1: x\ny\nModule 2: z";
        assert_eq!(s.segment(text), s.segment(text));
    }
}
