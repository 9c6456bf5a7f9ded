//! Streaming API: emit chunk outcomes as they complete.
//!
//! Unlike the eager [`crate::generate::generate`] which returns only after
//! every chunk finishes, [`mindmap_stream`] yields each [`ChunkOutcome`] as
//! soon as its extraction settles. With `concurrency > 1` outcomes arrive
//! in completion order; sort by [`ChunkOutcome::index`] if order matters.
//!
//! Personalisation (when a profile is configured) happens before the stream
//! is returned, because segmentation needs the whole course text.

use crate::completion::{LlmCompletion, TextCompletion};
use crate::config::MindMapConfig;
use crate::error::MindMapError;
use crate::extract::GraphExtractor;
use crate::generate::load_text;
use crate::output::ChunkOutcome;
use crate::pipeline::{llm, mindmap};
use crate::segment::Segmenter;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of chunk outcomes.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ChunkOutcome> + Send>>;

/// Load `input_str`, personalise it if configured, and stream its mind maps.
///
/// # Returns
/// - `Ok(ChunkStream)`: one item per chunk, failures included
/// - `Err(MindMapError)`: fatal error (input unreadable, no provider,
///   personalisation failed)
pub async fn mindmap_stream(
    input_str: impl AsRef<str>,
    config: &MindMapConfig,
) -> Result<ChunkStream, MindMapError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming run: {}", input_str);

    let source = load_text(input_str, config).await?;
    let completion: Arc<dyn TextCompletion> = Arc::new(LlmCompletion::from_config(config)?);

    mindmap_stream_from_text(&source, config, completion).await
}

/// Stream mind maps for text already in memory.
pub async fn mindmap_stream_from_text(
    source: &str,
    config: &MindMapConfig,
    completion: Arc<dyn TextCompletion>,
) -> Result<ChunkStream, MindMapError> {
    let course_text = match config.user_profile.as_deref() {
        Some(profile) => {
            llm::customize_course(source, profile, completion.as_ref(), config)
                .await?
                .value
        }
        None => source.to_string(),
    };

    let chunks = Segmenter::new(config.segmentation.clone()).segment(&course_text);
    let total = chunks.len();
    info!("Streaming {} chunk(s)", total);

    let concurrency = config.concurrency.max(1);
    let extractor = GraphExtractor::from_config(config);
    let config_clone = config.clone();

    let s = stream::iter(chunks.into_iter().map(move |chunk| {
        let completion = Arc::clone(&completion);
        let extractor = extractor.clone();
        let cfg = config_clone.clone();
        async move { mindmap::extract_chunk(&extractor, completion.as_ref(), chunk, total, &cfg).await }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::FnCompletion;
    use crate::config::SegmentStrategy;

    #[tokio::test]
    async fn every_chunk_is_streamed_once() {
        let completion: Arc<dyn TextCompletion> = Arc::new(FnCompletion::new(|p: &str| {
            if p.contains("gamma") {
                Ok("no graph".to_string())
            } else {
                Ok(r#"{"nodes":[{"id":1,"label":"X"}],"edges":[]}"#.to_string())
            }
        }));
        let config = MindMapConfig::builder()
            .segmentation(SegmentStrategy::FixedWidth { words_per_chunk: 1 })
            .concurrency(2)
            .build()
            .unwrap();

        let stream = mindmap_stream_from_text("alpha beta gamma", &config, completion)
            .await
            .unwrap();
        let mut outcomes: Vec<ChunkOutcome> = stream.collect().await;
        outcomes.sort_by_key(ChunkOutcome::index);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].chunk.text, "alpha");
        assert!(outcomes[0].result.is_success());
        assert!(outcomes[1].result.is_success());
        assert!(!outcomes[2].result.is_success());
    }

    #[tokio::test]
    async fn empty_text_yields_empty_stream() {
        let completion: Arc<dyn TextCompletion> =
            Arc::new(FnCompletion::new(|_: &str| Ok(String::new())));
        let stream = mindmap_stream_from_text("", &MindMapConfig::default(), completion)
            .await
            .unwrap();
        let outcomes: Vec<ChunkOutcome> = stream.collect().await;
        assert!(outcomes.is_empty());
    }
}
