//! Prompts sent to the completion service.
//!
//! Every prompt lives here so wording changes never touch retry, parsing or
//! segmentation logic, and so tests can inspect prompts without a model.

/// Instruction for turning one chunk into a mind-map graph.
///
/// The chunk text is appended after this header by [`mindmap_prompt`].
pub const MINDMAP_INSTRUCTION: &str = r#"Convert the course content below into a mind map.

Return ONLY a JSON object, with no commentary before or after it, and with exactly two top-level keys:
- "nodes": a list of objects with "id", "label" and "group"
- "edges": a list of objects with "from", "to" and "label"

Rules:
- Every node "id" must be unique.
- Every edge "from" and "to" must be the "id" of a node in "nodes".
- Keep labels short (a few words).
- Use "group" to cluster related concepts."#;

/// Build the mind-map prompt for an (already truncated) chunk.
pub fn mindmap_prompt(content: &str) -> String {
    format!("{MINDMAP_INSTRUCTION}\n\nContent:\n{content}")
}

/// Build the course personalisation prompt.
///
/// The "Module N: Title" heading rule exists so the reply can be split with
/// [`crate::config::SegmentStrategy::Markers`].
pub fn customize_prompt(content: &str, user_profile: &str) -> String {
    format!(
        r#"You are an expert instructional designer.
Customize the following course content for this learner profile:
{user_profile}

Structure the result as a sequence of modules. Start every module on its own line with a heading of the form "Module N: Title" (N = 1, 2, 3, ...).
Within each module include:
- a short explanation tailored to the learner's background
- examples related to their field or experience level
- key concepts simplified to match their understanding
Format everything in clean Markdown.

Content:
{content}"#
    )
}

/// Build the course summary prompt for an (already truncated) course text.
pub fn summary_prompt(content: &str) -> String {
    format!(
        "Summarize the following course content in a concise manner, \
listing the main topics and learning outcomes:\n\n{content}"
    )
}
