//! Output types returned by the `generate*` entry points.

use crate::error::ExtractionFailure;
use crate::extract::ExtractionResult;
use crate::graph::Graph;
use crate::segment::Chunk;
use serde::{Deserialize, Serialize};

/// What happened to one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// The chunk as produced by the segmenter (full, untruncated text).
    pub chunk: Chunk,
    pub result: ExtractionResult,
    /// Completion calls made for this chunk (1 + retries).
    pub attempts: u32,
    pub duration_ms: u64,
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        self.chunk.index
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.result.graph()
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        self.result.failure()
    }
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub source_chars: usize,
    pub course_chars: usize,
    pub total_chunks: usize,
    pub mapped_chunks: usize,
    pub failed_chunks: usize,
    /// Every completion call of the run (personalisation, chunks, summary), retries included.
    pub completion_calls: u64,
    pub total_duration_ms: u64,
    pub mindmap_duration_ms: u64,
}

/// Everything a renderer needs: the course text, one outcome per chunk in
/// segmentation order, and the optional summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutput {
    /// Customised course text, or the source text when no profile was set.
    pub course_text: String,
    /// Whether `course_text` is the model's personalised rewrite.
    pub customized: bool,
    pub chunks: Vec<ChunkOutcome>,
    pub summary: Option<String>,
    /// Why the summary is missing when one was requested.
    pub summary_error: Option<String>,
    pub stats: RunStats,
}

impl CourseOutput {
    /// Successful graphs with their chunk index, in order.
    pub fn graphs(&self) -> impl Iterator<Item = (usize, &Graph)> {
        self.chunks
            .iter()
            .filter_map(|c| c.graph().map(|g| (c.index(), g)))
    }

    /// Failed chunks with their failure, in order.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ExtractionFailure)> {
        self.chunks
            .iter()
            .filter_map(|c| c.failure().map(|f| (c.index(), f)))
    }
}
