//! Eager (whole-course) entry points.
//!
//! [`generate`] waits for every chunk and returns a [`CourseOutput`]. Use
//! [`crate::stream::mindmap_stream`] instead to receive chunk outcomes as
//! they complete.

use crate::completion::{LlmCompletion, TextCompletion};
use crate::config::MindMapConfig;
use crate::error::MindMapError;
use crate::extract::GraphExtractor;
use crate::output::{CourseOutput, RunStats};
use crate::pipeline::{input, llm, mindmap, text};
use crate::segment::Segmenter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// File names written by [`write_outputs`].
pub const COURSE_FILE: &str = "course.md";
pub const ALL_MINDMAPS_FILE: &str = "mindmaps.json";
pub const SUMMARY_FILE: &str = "summary.md";

/// Per-chunk graph file name, e.g. `mindmap-03.json`.
pub fn mindmap_file_name(index: usize) -> String {
    format!("mindmap-{index:02}.json")
}

/// Turn a course file or URL into per-module mind maps.
///
/// The provider is resolved from `config` (see
/// [`crate::completion::resolve_provider`]).
///
/// # Errors
/// Only fatal errors are returned: unreadable input, no extractable text,
/// provider not configured, or a failed personalisation. Individual chunk
/// failures are recorded in [`CourseOutput::chunks`].
pub async fn generate(
    input_str: impl AsRef<str>,
    config: &MindMapConfig,
) -> Result<CourseOutput, MindMapError> {
    let total_start = Instant::now();
    let source = load_text(input_str.as_ref(), config).await?;
    let completion = LlmCompletion::from_config(config)?;

    let mut output = generate_from_text(&source, config, &completion).await?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Resolve `input_str` and extract its text.
///
/// Does not need a provider; the CLI's `--segment-only` mode uses it alone.
pub async fn load_text(input_str: &str, config: &MindMapConfig) -> Result<String, MindMapError> {
    info!("Loading course: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let source = text::extract_text(&resolved, config.password.as_deref()).await?;

    if source.trim().is_empty() {
        return Err(MindMapError::EmptyInput {
            source_name: input_str.to_string(),
        });
    }
    debug!("Extracted {} chars from {}", source.len(), input_str);
    Ok(source)
}

/// Run customisation, segmentation, extraction and (optionally) the summary
/// over text already in memory.
pub async fn generate_from_text(
    source: &str,
    config: &MindMapConfig,
    completion: &dyn TextCompletion,
) -> Result<CourseOutput, MindMapError> {
    let total_start = Instant::now();
    if source.trim().is_empty() {
        return Err(MindMapError::EmptyInput {
            source_name: "<text>".to_string(),
        });
    }

    // ── Step 1: Personalise ──────────────────────────────────────────────
    let (course_text, customized, customization_calls) = match config.user_profile.as_deref()
    {
        Some(profile) => {
            let reply = llm::customize_course(source, profile, completion, config).await?;
            if let Some(ref cb) = config.progress_callback {
                cb.on_customized(reply.value.len());
            }
            (reply.value, true, u64::from(reply.attempts))
        }
        None => (source.to_string(), false, 0),
    };

    // ── Step 2: Segment ──────────────────────────────────────────────────
    let chunks = Segmenter::new(config.segmentation.clone()).segment(&course_text);
    let total_chunks = chunks.len();
    info!("Segmented course into {} chunk(s)", total_chunks);
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_chunks);
    }

    // ── Step 3: Mind maps ────────────────────────────────────────────────
    let mindmap_start = Instant::now();
    let extractor = GraphExtractor::from_config(config);
    let outcomes = mindmap::process_chunks(chunks, &extractor, completion, config).await;
    let mindmap_duration_ms = mindmap_start.elapsed().as_millis() as u64;

    let mapped = mindmap::success_count(&outcomes);
    for (index, failure) in mindmap::failures(&outcomes) {
        warn!("Chunk {} skipped: {}", index, failure);
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_chunks, mapped);
    }

    // ── Step 4: Summary ──────────────────────────────────────────────────
    let (summary, summary_error, summary_calls) = if config.summarize {
        let reply = llm::summarize_course(&course_text, completion, config).await;
        let calls = u64::from(reply.attempts);
        match reply.value {
            Ok(s) => (Some(s), None, calls),
            Err(e) => (None, Some(e), calls),
        }
    } else {
        (None, None, 0)
    };

    let stats = RunStats {
        source_chars: source.chars().count(),
        course_chars: course_text.chars().count(),
        total_chunks,
        mapped_chunks: mapped,
        failed_chunks: total_chunks - mapped,
        completion_calls: outcomes.iter().map(|o| u64::from(o.attempts)).sum::<u64>()
            + customization_calls
            + summary_calls,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        mindmap_duration_ms,
    };

    info!(
        "Mind maps complete: {}/{} chunks, {}ms total",
        mapped, total_chunks, stats.total_duration_ms
    );

    Ok(CourseOutput {
        course_text,
        customized,
        chunks: outcomes,
        summary,
        summary_error,
        stats,
    })
}

/// Generate and write every artefact into `out_dir`.
///
/// See [`write_outputs`] for the file layout.
pub async fn generate_to_dir(
    input_str: impl AsRef<str>,
    out_dir: impl AsRef<Path>,
    config: &MindMapConfig,
) -> Result<RunStats, MindMapError> {
    let output = generate(input_str, config).await?;
    write_outputs(&output, out_dir.as_ref()).await?;
    Ok(output.stats)
}

/// Write `output` into `out_dir`, creating it if needed.
///
/// * `course.md`: the (customised) course text
/// * `mindmap-NN.json`: one graph per successful chunk, NN = chunk index
/// * `mindmaps.json`: every chunk outcome, failures included
/// * `summary.md`: only when a summary was produced
///
/// Each file is written to a temp name and renamed, so a reader never sees
/// a partial file. Returns the paths written.
pub async fn write_outputs(
    output: &CourseOutput,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, MindMapError> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| MindMapError::OutputWriteFailed {
            path: out_dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::new();

    let course_path = out_dir.join(COURSE_FILE);
    write_atomic(&course_path, output.course_text.as_bytes()).await?;
    written.push(course_path);

    for (index, graph) in output.graphs() {
        let json = graph.to_json_pretty().map_err(|e| MindMapError::Serialization {
            what: format!("mind map {index}"),
            detail: e.to_string(),
        })?;
        let path = out_dir.join(mindmap_file_name(index));
        write_atomic(&path, json.as_bytes()).await?;
        written.push(path);
    }

    let all = serde_json::to_string_pretty(&output.chunks).map_err(|e| {
        MindMapError::Serialization {
            what: ALL_MINDMAPS_FILE.to_string(),
            detail: e.to_string(),
        }
    })?;
    let all_path = out_dir.join(ALL_MINDMAPS_FILE);
    write_atomic(&all_path, all.as_bytes()).await?;
    written.push(all_path);

    if let Some(ref summary) = output.summary {
        let path = out_dir.join(SUMMARY_FILE);
        write_atomic(&path, format!("{}\n", summary.trim_end()).as_bytes()).await?;
        written.push(path);
    }

    info!("Wrote {} file(s) to {}", written.len(), out_dir.display());
    Ok(written)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &MindMapConfig,
) -> Result<CourseOutput, MindMapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MindMapError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input_str, config))
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MindMapError> {
    let write_err = |e| MindMapError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}
