//! Pipeline stages for course-to-mind-map generation.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own with a stub [`crate::completion::TextCompletion`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ llm ──▶ postprocess ──▶ segment ──▶ mindmap
//! (URL/path) (pdfium) (customise) (cleanup)   (chunks)   (graphs)
//! ```
//!
//! 1. [`input`] resolves the user-supplied path or URL to a local file and
//!    classifies it as PDF or text
//! 2. [`text`] extracts plain text; pdfium runs in `spawn_blocking`
//! 3. [`llm`] personalises the course for a learner profile (optional) and
//!    writes the summary; owns the timeout/retry policy
//! 4. [`postprocess`] cleans the personalised reply before it is segmented
//! 5. segmentation lives in [`crate::segment`]
//! 6. [`mindmap`] extracts one graph per chunk through a bounded pool

pub mod input;
pub mod llm;
pub mod mindmap;
pub mod postprocess;
pub mod text;
