//! Mind-map stage: run the [`GraphExtractor`] over every chunk.
//!
//! Chunks are independent, so they run through a bounded pool
//! (`buffer_unordered(concurrency)`) and are sorted back into segmentation
//! order afterwards. A chunk's failure is recorded in its [`ChunkOutcome`];
//! it never cancels or affects its siblings.
//!
//! Only [`ExtractionFailure::UpstreamError`] is retried. A reply that
//! arrived but carried no usable graph is reported after one attempt.

use crate::completion::TextCompletion;
use crate::config::MindMapConfig;
use crate::error::{CompletionError, ExtractionFailure};
use crate::extract::{ExtractionResult, GraphExtractor};
use crate::output::ChunkOutcome;
use crate::pipeline::llm::complete_once;
use crate::segment::Chunk;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Applies the per-call timeout to every completion the extractor makes.
struct Bounded<'a> {
    inner: &'a dyn TextCompletion,
    config: &'a MindMapConfig,
}

#[async_trait]
impl TextCompletion for Bounded<'_> {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        complete_once(self.inner, prompt, self.config).await
    }
}

/// Extract one chunk's graph, retrying upstream failures.
///
/// Fires the chunk-level progress events when a callback is configured.
pub async fn extract_chunk(
    extractor: &GraphExtractor,
    completion: &dyn TextCompletion,
    chunk: Chunk,
    total: usize,
    config: &MindMapConfig,
) -> ChunkOutcome {
    let start = Instant::now();
    let index = chunk.index;
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_start(index, total);
    }

    let bounded = Bounded {
        inner: completion,
        config,
    };

    let mut attempts = 0;
    let result = loop {
        if attempts > 0 {
            let backoff = config.backoff_for(attempts);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                index,
                attempts,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }
        attempts += 1;

        let result = extractor.extract(&chunk.text, &bounded).await;
        match result {
            ExtractionResult::Failure(ref f) if f.is_retryable() && attempts <= config.max_retries => {
                warn!("Chunk {}: attempt {} failed: {}", index, attempts, f);
            }
            other => break other,
        }
    };

    match &result {
        ExtractionResult::Success(graph) => {
            debug!(
                "Chunk {}: {} nodes, {} edges ({} attempt(s))",
                index,
                graph.node_count(),
                graph.edge_count(),
                attempts
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_complete(index, total, graph.node_count(), graph.edge_count());
            }
        }
        ExtractionResult::Failure(failure) => {
            warn!("Chunk {}: no mind map: {}", index, failure);
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_error(index, total, &failure.to_string());
            }
        }
    }

    ChunkOutcome {
        chunk,
        result,
        attempts,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Extract every chunk and return the outcomes in segmentation order.
pub async fn process_chunks(
    chunks: Vec<Chunk>,
    extractor: &GraphExtractor,
    completion: &dyn TextCompletion,
    config: &MindMapConfig,
) -> Vec<ChunkOutcome> {
    let total = chunks.len();

    let mut outcomes: Vec<ChunkOutcome> = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| extract_chunk(extractor, completion, chunk, total, config)),
    )
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    outcomes.sort_by_key(ChunkOutcome::index);
    outcomes
}

/// Number of outcomes holding a graph.
pub fn success_count(outcomes: &[ChunkOutcome]) -> usize {
    outcomes.iter().filter(|o| o.result.is_success()).count()
}

/// Failures in chunk order, for summary logging.
pub fn failures(outcomes: &[ChunkOutcome]) -> Vec<(usize, &ExtractionFailure)> {
    outcomes
        .iter()
        .filter_map(|o| o.failure().map(|f| (o.index(), f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::FnCompletion;
    use crate::progress::MindMapProgressCallback;
    use crate::segment::split_by_markers;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const GRAPH: &str = r#"{"nodes":[{"id":"a","label":"A"}],"edges":[]}"#;

    fn config(concurrency: usize, max_retries: u32) -> MindMapConfig {
        MindMapConfig::builder()
            .concurrency(concurrency)
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            source_range: None,
        }
    }

    #[tokio::test]
    async fn upstream_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let stub = FnCompletion::new(|_: &str| {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CompletionError::new("503"))
            } else {
                Ok(GRAPH.to_string())
            }
        });
        let outcome = extract_chunk(
            &GraphExtractor::default(),
            &stub,
            chunk(1, "text"),
            1,
            &config(1, 3),
        )
        .await;
        assert!(outcome.result.is_success());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn parse_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let stub = FnCompletion::new(|_: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("no json here".to_string())
        });
        let outcome = extract_chunk(
            &GraphExtractor::default(),
            &stub,
            chunk(1, "text"),
            1,
            &config(1, 3),
        )
        .await;
        assert_eq!(outcome.failure(), Some(&ExtractionFailure::NoJsonFound));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_report_upstream_error() {
        let stub = FnCompletion::new(|_: &str| Err(CompletionError::new("connection reset")));
        let outcome = extract_chunk(
            &GraphExtractor::default(),
            &stub,
            chunk(1, "text"),
            1,
            &config(1, 2),
        )
        .await;
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.failure(),
            Some(&ExtractionFailure::UpstreamError {
                detail: "connection reset".into()
            })
        );
    }

    struct DelayedByChunk;

    #[async_trait]
    impl TextCompletion for DelayedByChunk {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            // Earlier chunks answer later, so completion order is reversed.
            let delay = if prompt.contains("first") { 60 } else { 5 };
            sleep(Duration::from_millis(delay)).await;
            if prompt.contains("broken") {
                return Ok("{ not json }".to_string());
            }
            Ok(GRAPH.to_string())
        }
    }

    #[tokio::test]
    async fn outcomes_keep_chunk_order_and_isolate_failures() {
        let chunks = split_by_markers("Module 1: first\nModule 2: broken\nModule 3: third");
        assert_eq!(chunks.len(), 3);

        let outcomes = process_chunks(
            chunks,
            &GraphExtractor::default(),
            &DelayedByChunk,
            &config(3, 0),
        )
        .await;

        let indices: Vec<usize> = outcomes.iter().map(ChunkOutcome::index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(outcomes[0].result.is_success());
        assert!(matches!(
            outcomes[1].failure(),
            Some(ExtractionFailure::MalformedJson { .. })
        ));
        assert!(outcomes[2].result.is_success());
        assert_eq!(success_count(&outcomes), 2);
        assert_eq!(failures(&outcomes).len(), 1);
    }

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        completed: AtomicUsize,
        errors: AtomicUsize,
    }

    impl MindMapProgressCallback for Counting {
        fn on_chunk_start(&self, _index: usize, _total: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_complete(&self, _index: usize, _total: usize, _n: usize, _e: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn progress_events_fire_per_chunk() {
        let counting = Arc::new(Counting::default());
        let config = MindMapConfig::builder()
            .progress_callback(counting.clone())
            .build()
            .unwrap();
        let chunks = vec![chunk(1, "first"), chunk(2, "broken"), chunk(3, "third")];

        process_chunks(chunks, &GraphExtractor::default(), &DelayedByChunk, &config).await;

        assert_eq!(counting.started.load(Ordering::SeqCst), 3);
        assert_eq!(counting.completed.load(Ordering::SeqCst), 2);
        assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_chunks_no_calls() {
        let stub = FnCompletion::new(|_: &str| -> Result<String, CompletionError> {
            panic!("must not be called")
        });
        let outcomes =
            process_chunks(Vec::new(), &GraphExtractor::default(), &stub, &config(2, 0)).await;
        assert!(outcomes.is_empty());
    }
}
