//! Progress-callback trait for per-chunk mind-map events.
//!
//! Inject an [`Arc<dyn MindMapProgressCallback>`] via
//! [`crate::config::MindMapConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the chunks.
//!
//! # Example
//!
//! ```rust
//! use edgequake_mindmap::{MindMapConfig, MindMapProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     mapped: AtomicUsize,
//! }
//!
//! impl MindMapProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, index: usize, total: usize, nodes: usize, _edges: usize) {
//!         self.mapped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Module {}/{}: {} concepts", index, total, nodes);
//!     }
//! }
//!
//! let config = MindMapConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { mapped: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each chunk.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the chunk
/// events arrive from concurrently running extractions and in completion
/// order. All methods default to no-ops.
pub trait MindMapProgressCallback: Send + Sync {
    /// The course text has been customised (only when a profile is set).
    fn on_customized(&self, course_chars: usize) {
        let _ = course_chars;
    }

    /// Called once, after segmentation, before any extraction.
    fn on_run_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the first completion request for a chunk.
    fn on_chunk_start(&self, index: usize, total_chunks: usize) {
        let _ = (index, total_chunks);
    }

    /// Called when a chunk produced a valid graph.
    fn on_chunk_complete(&self, index: usize, total_chunks: usize, nodes: usize, edges: usize) {
        let _ = (index, total_chunks, nodes, edges);
    }

    /// Called when a chunk ended in a failure (after any retries).
    fn on_chunk_error(&self, index: usize, total_chunks: usize, error: &str) {
        let _ = (index, total_chunks, error);
    }

    /// Called once after every chunk has been attempted.
    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl MindMapProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MindMapConfig`].
pub type ProgressCallback = Arc<dyn MindMapProgressCallback>;
