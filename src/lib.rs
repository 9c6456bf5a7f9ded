//! # edgequake-mindmap
//!
//! Turn course material into per-module mind maps with an LLM.
//!
//! A course (PDF, plain text, or a URL to either) is optionally rewritten for
//! a learner profile, cut into ordered chunks, and each chunk is sent to a
//! text-completion service that answers with a graph of concepts. Replies
//! are validated into [`Graph`] values; anything unusable becomes a typed
//! [`ExtractionFailure`] for that chunk alone.
//!
//! ## Pipeline Overview
//!
//! ```text
//! course.pdf / course.txt / URL
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Text       pdfium text layer (spawn_blocking) or UTF-8 file
//!  ├─ 3. Customise  optional rewrite for a learner profile ("Module N: …")
//!  ├─ 4. Segment    fixed-width word windows or "Module N" markers
//!  ├─ 5. Mind map   concurrent completion calls, JSON → Graph per chunk
//!  └─ 6. Output     ordered outcomes, optional summary, JSON export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_mindmap::{generate, MindMapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = MindMapConfig::builder()
//!         .user_profile("Plant manager, 4 years in lean manufacturing")
//!         .build()?;
//!     let output = generate("course.pdf", &config).await?;
//!     for (index, graph) in output.graphs() {
//!         println!("module {index}: {} concepts", graph.node_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Without a provider
//!
//! The segmenter and the extractor are usable on their own; any
//! [`TextCompletion`] works, including a closure:
//!
//! ```rust
//! use edgequake_mindmap::{FnCompletion, GraphExtractor, Segmenter, SegmentStrategy};
//!
//! # tokio_test::block_on(async {
//! let chunks = Segmenter::new(SegmentStrategy::Markers)
//!     .segment("Module 1: Intro\nHello\nModule 2: Next\nMore");
//! assert_eq!(chunks.len(), 2);
//!
//! let stub = FnCompletion::new(|_: &str| {
//!     Ok(r#"{"nodes":[{"id":"a","label":"Intro"}],"edges":[]}"#.to_string())
//! });
//! let result = GraphExtractor::default().extract(&chunks[0].text, &stub).await;
//! assert!(result.is_success());
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mindmap` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-mindmap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod segment;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use completion::{resolve_provider, FnCompletion, LlmCompletion, TextCompletion};
pub use config::{MindMapConfig, MindMapConfigBuilder, ReferencePolicy, SegmentStrategy};
pub use error::{CompletionError, ExtractionFailure, MindMapError};
pub use extract::{locate_json, parse_graph_response, ExtractionResult, GraphExtractor};
pub use generate::{generate, generate_from_text, generate_sync, generate_to_dir, load_text, write_outputs};
pub use graph::{Graph, GraphEdge, GraphNode};
pub use output::{ChunkOutcome, CourseOutput, RunStats};
pub use progress::{MindMapProgressCallback, NoopProgressCallback, ProgressCallback};
pub use segment::{segment, Chunk, Segmenter, SourceRange};
pub use stream::{mindmap_stream, mindmap_stream_from_text, ChunkStream};
