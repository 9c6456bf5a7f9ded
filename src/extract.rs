//! Graph extraction: one chunk in, one validated mind map (or a typed
//! failure) out.
//!
//! ## Parsing policy
//!
//! Models are told to answer with bare JSON but routinely prepend prose
//! ("Sure! Here is the mind map:") or wrap the object in a ```json fence.
//! [`locate_json`] takes the span from the first `{` to the last `}` in the
//! reply, which tolerates both. It does not tolerate prose that itself
//! contains braces after the JSON; such replies surface as
//! [`ExtractionFailure::MalformedJson`].
//!
//! [`parse_graph_response`] is a pure function from the raw reply to an
//! [`ExtractionResult`], so every failure mode is testable without a model.

use crate::completion::TextCompletion;
use crate::config::{MindMapConfig, ReferencePolicy};
use crate::error::ExtractionFailure;
use crate::graph::{Graph, GraphEdge, GraphNode};
use crate::prompts::mindmap_prompt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Outcome of extracting a graph from one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success(Graph),
    Failure(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    pub fn graph(&self) -> Option<&Graph> {
        match self {
            ExtractionResult::Success(g) => Some(g),
            ExtractionResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionResult::Success(_) => None,
            ExtractionResult::Failure(f) => Some(f),
        }
    }

    pub fn into_result(self) -> Result<Graph, ExtractionFailure> {
        match self {
            ExtractionResult::Success(g) => Ok(g),
            ExtractionResult::Failure(f) => Err(f),
        }
    }
}

impl From<Result<Graph, ExtractionFailure>> for ExtractionResult {
    fn from(r: Result<Graph, ExtractionFailure>) -> Self {
        match r {
            Ok(g) => ExtractionResult::Success(g),
            Err(f) => ExtractionResult::Failure(f),
        }
    }
}

/// Converts chunk text into a mind map through a [`TextCompletion`].
///
/// Holds no state besides its settings, so one extractor can serve any
/// number of concurrent chunks.
#[derive(Debug, Clone)]
pub struct GraphExtractor {
    max_prompt_chars: usize,
    reference_policy: ReferencePolicy,
}

impl Default for GraphExtractor {
    fn default() -> Self {
        Self::new(3000, ReferencePolicy::default())
    }
}

impl GraphExtractor {
    pub fn new(max_prompt_chars: usize, reference_policy: ReferencePolicy) -> Self {
        Self {
            max_prompt_chars,
            reference_policy,
        }
    }

    pub fn from_config(config: &MindMapConfig) -> Self {
        Self::new(config.max_prompt_chars, config.reference_policy)
    }

    /// The exact prompt sent for `chunk_text`.
    pub fn prompt_for(&self, chunk_text: &str) -> String {
        mindmap_prompt(truncate_chars(chunk_text, self.max_prompt_chars))
    }

    /// Make exactly one completion call and validate its reply.
    ///
    /// Never retries; see [`crate::pipeline::mindmap`] for the retry policy.
    pub async fn extract<C>(&self, chunk_text: &str, complete: &C) -> ExtractionResult
    where
        C: TextCompletion + ?Sized,
    {
        let prompt = self.prompt_for(chunk_text);

        match complete.complete(&prompt).await {
            Ok(raw) => self.parse(&raw),
            Err(e) => ExtractionResult::Failure(ExtractionFailure::UpstreamError {
                detail: e.message,
            }),
        }
    }

    /// Parse a raw reply under this extractor's reference policy.
    pub fn parse(&self, raw: &str) -> ExtractionResult {
        parse_graph_response(raw, self.reference_policy)
    }
}

/// The span from the first `{` to the last `}`, if both exist in that order.
pub fn locate_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Turn a raw model reply into a validated graph or a typed failure.
pub fn parse_graph_response(raw: &str, policy: ReferencePolicy) -> ExtractionResult {
    parse_graph(raw, policy).into()
}

fn parse_graph(raw: &str, policy: ReferencePolicy) -> Result<Graph, ExtractionFailure> {
    let json = locate_json(raw).ok_or(ExtractionFailure::NoJsonFound)?;

    let value: Value = serde_json::from_str(json).map_err(|e| ExtractionFailure::MalformedJson {
        detail: e.to_string(),
    })?;

    let object = value
        .as_object()
        .ok_or_else(|| ExtractionFailure::MalformedJson {
            detail: "top-level value is not an object".to_string(),
        })?;

    let missing: Vec<String> = ["nodes", "edges"]
        .into_iter()
        .filter(|k| !object.contains_key(*k))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionFailure::MissingRequiredKeys { missing });
    }

    let nodes: Vec<GraphNode> = decode_list(&object["nodes"], "nodes")?;
    let edges: Vec<GraphEdge> = decode_list(&object["edges"], "edges")?;

    if let Some(pos) = nodes.iter().position(|n| n.label.trim().is_empty()) {
        return Err(ExtractionFailure::MalformedJson {
            detail: format!("nodes[{pos}] has an empty label"),
        });
    }

    let graph = Graph { nodes, edges };

    if policy == ReferencePolicy::Strict {
        let issues = graph.reference_issues();
        if !issues.is_empty() {
            return Err(ExtractionFailure::InvalidGraphReferences {
                duplicate_ids: issues.duplicate_ids,
                dangling_edges: issues.dangling_edges,
            });
        }
    }

    debug!(
        "parsed graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn decode_list<T>(value: &Value, key: &str) -> Result<Vec<T>, ExtractionFailure>
where
    T: for<'de> Deserialize<'de>,
{
    if !value.is_array() {
        return Err(ExtractionFailure::MalformedJson {
            detail: format!("\"{key}\" is not a list"),
        });
    }
    serde_json::from_value(value.clone()).map_err(|e| ExtractionFailure::MalformedJson {
        detail: format!("invalid \"{key}\" entry: {e}"),
    })
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::FnCompletion;
    use crate::error::CompletionError;
    use crate::graph::DEFAULT_GROUP;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn strict(raw: &str) -> ExtractionResult {
        parse_graph_response(raw, ReferencePolicy::Strict)
    }

    #[test]
    fn prose_prefix_is_tolerated() {
        let r = strict(r#"here you go: {"nodes":[{"id":"a","label":"A"}],"edges":[]}"#);
        let g = r.graph().expect("success");
        assert_eq!(
            g.nodes,
            vec![GraphNode {
                id: "a".into(),
                label: "A".into(),
                group: DEFAULT_GROUP.into(),
            }]
        );
        assert!(g.edges.is_empty());
    }

    #[test]
    fn markdown_fence_is_tolerated() {
        let raw = "```json\n{\"nodes\":[{\"id\":\"a\",\"label\":\"A\",\"group\":\"core\"},{\"id\":\"b\",\"label\":\"B\"}],\
                   \"edges\":[{\"from\":\"a\",\"to\":\"b\",\"label\":\"leads to\"}]}\n```";
        let g = strict(raw).into_result().unwrap();
        assert_eq!(g.nodes[0].group, "core");
        assert_eq!(g.edges[0].label, "leads to");
    }

    #[test]
    fn no_braces_is_no_json_found() {
        assert_eq!(
            strict("I could not build a mind map for this."),
            ExtractionResult::Failure(ExtractionFailure::NoJsonFound)
        );
        assert_eq!(
            strict("} backwards {"),
            ExtractionResult::Failure(ExtractionFailure::NoJsonFound)
        );
        assert_eq!(
            strict(""),
            ExtractionResult::Failure(ExtractionFailure::NoJsonFound)
        );
    }

    #[test]
    fn broken_json_is_malformed() {
        let r = strict(r#"{"nodes": [ {"id": "a", "label": "A"} ], "edges": [ }"#);
        assert!(matches!(
            r,
            ExtractionResult::Failure(ExtractionFailure::MalformedJson { .. })
        ));
    }

    #[test]
    fn braces_in_trailing_prose_are_malformed() {
        let r = strict(r#"{"nodes":[],"edges":[]} Note: use {curly} braces."#);
        assert!(matches!(
            r,
            ExtractionResult::Failure(ExtractionFailure::MalformedJson { .. })
        ));
    }

    #[test]
    fn missing_edges_key() {
        let r = strict(r#"{"nodes":[{"id":"a","label":"A"}]}"#);
        assert_eq!(
            r,
            ExtractionResult::Failure(ExtractionFailure::MissingRequiredKeys {
                missing: vec!["edges".into()]
            })
        );
    }

    #[test]
    fn missing_both_keys() {
        let r = strict(r#"{"mindmap":{}}"#);
        assert_eq!(
            r.failure(),
            Some(&ExtractionFailure::MissingRequiredKeys {
                missing: vec!["nodes".into(), "edges".into()]
            })
        );
    }

    #[test]
    fn nodes_not_a_list_is_malformed() {
        let r = strict(r#"{"nodes":{"a":"A"},"edges":[]}"#);
        assert!(matches!(
            r.failure(),
            Some(ExtractionFailure::MalformedJson { detail }) if detail.contains("nodes")
        ));
    }

    #[test]
    fn node_without_label_is_malformed() {
        let r = strict(r#"{"nodes":[{"id":"a"}],"edges":[]}"#);
        assert!(matches!(
            r.failure(),
            Some(ExtractionFailure::MalformedJson { .. })
        ));
    }

    #[test]
    fn empty_label_is_malformed() {
        let r = strict(r#"{"nodes":[{"id":"a","label":"  "}],"edges":[]}"#);
        assert!(matches!(
            r.failure(),
            Some(ExtractionFailure::MalformedJson { detail }) if detail.contains("nodes[0]")
        ));
    }

    #[test]
    fn dangling_edge_strict_vs_lenient() {
        let raw = r#"{"nodes":[{"id":"a","label":"A"}],"edges":[{"from":"a","to":"ghost"}]}"#;
        assert_eq!(
            strict(raw).failure(),
            Some(&ExtractionFailure::InvalidGraphReferences {
                duplicate_ids: vec![],
                dangling_edges: vec![("a".into(), "ghost".into())],
            })
        );
        let lenient = parse_graph_response(raw, ReferencePolicy::Lenient);
        assert_eq!(lenient.graph().map(Graph::edge_count), Some(1));
    }

    #[test]
    fn duplicate_ids_strict_vs_lenient() {
        let raw = r#"{"nodes":[{"id":"a","label":"A"},{"id":"a","label":"Again"}],"edges":[]}"#;
        assert!(matches!(
            strict(raw).failure(),
            Some(ExtractionFailure::InvalidGraphReferences { duplicate_ids, .. }) if duplicate_ids == &vec!["a".to_string()]
        ));
        let lenient = parse_graph_response(raw, ReferencePolicy::Lenient);
        assert_eq!(lenient.graph().map(Graph::node_count), Some(2));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn extract_sends_truncated_prompt_once() {
        let prompts = Mutex::new(Vec::new());
        let stub = FnCompletion::new(|p: &str| {
            prompts.lock().unwrap().push(p.to_string());
            Ok(r#"{"nodes":[],"edges":[]}"#.to_string())
        });
        let extractor = GraphExtractor::new(10, ReferencePolicy::Strict);

        let r = extractor.extract("0123456789ABCDEF", &stub).await;
        assert!(r.is_success());

        let sent = prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].ends_with("0123456789"));
        assert!(!sent[0].contains("ABCDEF"));
    }

    #[tokio::test]
    async fn upstream_error_keeps_detail() {
        let stub = FnCompletion::new(|_: &str| Err(CompletionError::new("429 quota exceeded")));
        let r = GraphExtractor::default().extract("text", &stub).await;
        assert_eq!(
            r,
            ExtractionResult::Failure(ExtractionFailure::UpstreamError {
                detail: "429 quota exceeded".into()
            })
        );
    }

    #[tokio::test]
    async fn extract_is_idempotent_against_deterministic_stub() {
        let calls = AtomicUsize::new(0);
        let stub = FnCompletion::new(|_: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"Mind map: {"nodes":[{"id":"x","label":"X"},{"id":"y","label":"Y"}],"edges":[{"from":"x","to":"y"}]}"#.to_string())
        });
        let extractor = GraphExtractor::default();
        let first = extractor.extract("Module 1: Intro\nSome text", &stub).await;
        let second = extractor.extract("Module 1: Intro\nSome text", &stub).await;
        assert_eq!(first, second);
        assert!(first.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn result_serialises_with_status_tag() {
        let json = serde_json::to_value(ExtractionResult::Failure(ExtractionFailure::NoJsonFound)).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["value"]["reason"], "no_json_found");
    }
}
