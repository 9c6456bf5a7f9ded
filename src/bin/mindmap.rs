//! CLI binary for edgequake-mindmap.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `MindMapConfig` and prints or writes the results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_mindmap::{
    generate, load_text, write_outputs, CourseOutput, Graph, MindMapConfig,
    MindMapProgressCallback, ProgressCallback, ReferencePolicy, SegmentStrategy, Segmenter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per chunk. Chunks may finish out of
/// order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` reports the chunk count.
    fn new_dynamic(customizing: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(if customizing {
            "Personalising course…"
        } else {
            "Reading course…"
        });
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} modules  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Mapping");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl MindMapProgressCallback for CliProgressCallback {
    fn on_customized(&self, course_chars: usize) {
        self.bar.println(format!(
            "{} Course personalised  {}",
            cyan("◆"),
            dim(&format!("{course_chars} chars"))
        ));
    }

    fn on_run_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building mind maps for {total_chunks} modules…"))
        ));
    }

    fn on_chunk_start(&self, index: usize, _total: usize) {
        self.start_times.lock().unwrap().insert(index, Instant::now());
        self.bar.set_message(format!("module {index}"));
    }

    fn on_chunk_complete(&self, index: usize, total: usize, nodes: usize, edges: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Module {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{nodes:>3} concepts, {edges:>3} links")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Module {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_chunks: usize, success_count: usize) {
        let failed = total_chunks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} mind maps generated",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} mind maps generated  ({} failed)",
                if failed == total_chunks {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Mind maps for a PDF course, printed to the terminal
  mindmap course.pdf

  # Personalise for a learner, then write course.md + mindmap-NN.json
  mindmap course.pdf --profile "Plant head, 4 years in lean management" -o out/

  # Profile from a file, with a summary
  mindmap course.txt --profile-file learner.txt --summarize -o out/

  # Fixed 800-word windows instead of "Module N" headings
  mindmap notes.txt --strategy words --words-per-chunk 800

  # Inspect the chunks without calling any model
  mindmap course.pdf --segment-only

  # Full structured output
  mindmap course.pdf --json > course.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium when it is not installed system-wide
  RUST_LOG                Log filter, e.g. edgequake_mindmap=debug
"#;

/// Turn course material into per-module mind maps with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "mindmap",
    version,
    about = "Turn course material into per-module mind maps with an LLM",
    long_about = "Read a course (PDF, text file, or URL), optionally personalise it for a \
learner profile, split it into modules and ask an LLM for a concept graph of each module. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/text file path or HTTP/HTTPS URL.
    input: String,

    /// Write course.md, mindmap-NN.json, mindmaps.json (and summary.md) here.
    #[arg(short, long, env = "MINDMAP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Learner profile used to personalise the course.
    #[arg(long, env = "MINDMAP_PROFILE", conflicts_with = "profile_file")]
    profile: Option<String>,

    /// Read the learner profile from a file.
    #[arg(long, env = "MINDMAP_PROFILE_FILE")]
    profile_file: Option<PathBuf>,

    /// Segmentation: auto (markers if present), words, markers.
    #[arg(long, env = "MINDMAP_STRATEGY", value_enum, default_value = "auto")]
    strategy: StrategyArg,

    /// Words per chunk for the words/auto strategies.
    #[arg(long, env = "MINDMAP_WORDS_PER_CHUNK", default_value_t = 1500,
          value_parser = clap::value_parser!(u64).range(1..))]
    words_per_chunk: u64,

    /// Characters of each chunk sent to the model.
    #[arg(long, env = "MINDMAP_MAX_PROMPT_CHARS", default_value_t = 3000)]
    max_prompt_chars: usize,

    /// Also produce a short course summary.
    #[arg(long, env = "MINDMAP_SUMMARIZE")]
    summarize: bool,

    /// Accept graphs with duplicate ids or edges to unknown nodes.
    #[arg(long, env = "MINDMAP_LENIENT_REFERENCES")]
    lenient_references: bool,

    /// Output structured JSON (CourseOutput) instead of a text rendering.
    #[arg(long, env = "MINDMAP_JSON")]
    json: bool,

    /// Print the chunks only; no model is called.
    #[arg(long)]
    segment_only: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of modules mapped concurrently.
    #[arg(short, long, env = "MINDMAP_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per LLM call on transport failure.
    #[arg(long, env = "MINDMAP_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MINDMAP_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "MINDMAP_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "MINDMAP_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MINDMAP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MINDMAP_PASSWORD")]
    password: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "MINDMAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MINDMAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MINDMAP_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Auto,
    Words,
    Markers,
}

impl StrategyArg {
    fn to_strategy(&self, words_per_chunk: usize) -> SegmentStrategy {
        match self {
            StrategyArg::Auto => SegmentStrategy::Auto { words_per_chunk },
            StrategyArg::Words => SegmentStrategy::FixedWidth { words_per_chunk },
            StrategyArg::Markers => SegmentStrategy::Markers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.segment_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let profile = read_profile(&cli).await?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic(profile.is_some());
        Some(cb as Arc<dyn MindMapProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, profile, progress_cb)?;

    // ── Segment-only mode ────────────────────────────────────────────────
    if cli.segment_only {
        let text = load_text(&cli.input, &config)
            .await
            .context("Failed to read course")?;
        let chunks = Segmenter::new(config.segmentation.clone()).segment(&text);

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&chunks).context("Failed to serialise chunks")?
            );
        } else {
            for chunk in &chunks {
                let preview: String = chunk.text.chars().take(72).collect();
                println!(
                    "{:>3}  {:>6} words  {}",
                    chunk.index,
                    chunk.word_count(),
                    preview.replace('\n', " ")
                );
            }
            if !cli.quiet {
                eprintln!("{} chunk(s)", chunks.len());
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate(&cli.input, &config)
        .await
        .context("Mind-map generation failed")?;

    if let Some(ref dir) = cli.output_dir {
        let written = write_outputs(&output, dir)
            .await
            .context("Failed to write output files")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} modules  {}ms  →  {}  {}",
                if output.stats.failed_chunks == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.mapped_chunks,
                output.stats.total_chunks,
                output.stats.total_duration_ms,
                bold(&dir.display().to_string()),
                dim(&format!("({} files)", written.len())),
            );
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output_dir.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(render_text(&output).as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Mapped {}/{} modules in {}ms ({} LLM calls)",
            output.stats.mapped_chunks,
            output.stats.total_chunks,
            output.stats.total_duration_ms,
            output.stats.completion_calls
        );
    }
    if let Some(ref e) = output.summary_error {
        if !cli.quiet {
            eprintln!("{} summary unavailable: {}", cyan("⚠"), e);
        }
    }

    Ok(())
}

async fn read_profile(cli: &Cli) -> Result<Option<String>> {
    if let Some(ref path) = cli.profile_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read profile from {:?}", path))?;
        return Ok(Some(text));
    }
    Ok(cli.profile.clone())
}

/// Map CLI args to `MindMapConfig`.
fn build_config(
    cli: &Cli,
    profile: Option<String>,
    progress: Option<ProgressCallback>,
) -> Result<MindMapConfig> {
    let words_per_chunk = usize::try_from(cli.words_per_chunk).context("--words-per-chunk too large")?;

    let mut builder = MindMapConfig::builder()
        .segmentation(cli.strategy.to_strategy(words_per_chunk))
        .max_prompt_chars(cli.max_prompt_chars)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .summarize(cli.summarize)
        .reference_policy(if cli.lenient_references {
            ReferencePolicy::Lenient
        } else {
            ReferencePolicy::Strict
        });

    if let Some(profile) = profile {
        builder = builder.user_profile(profile);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Plain-text rendering: each module's concepts by group, then its links.
fn render_text(output: &CourseOutput) -> String {
    let mut out = String::new();

    if let Some(ref summary) = output.summary {
        out.push_str("# Summary\n\n");
        out.push_str(summary.trim_end());
        out.push_str("\n\n");
    }

    for outcome in &output.chunks {
        out.push_str(&format!("# Module {}\n\n", outcome.index()));
        match outcome.graph() {
            Some(graph) => out.push_str(&render_graph(graph)),
            None => {
                if let Some(f) = outcome.failure() {
                    out.push_str(&format!("(no mind map: {f})\n"));
                }
            }
        }
        out.push('\n');
    }
    out
}

fn render_graph(graph: &Graph) -> String {
    let mut out = String::new();
    let mut groups: Vec<&str> = Vec::new();
    for node in &graph.nodes {
        let g = node.group.as_str();
        if !groups.contains(&g) {
            groups.push(g);
        }
    }

    for group in groups {
        out.push_str(&format!("- {group}\n"));
        for node in graph.nodes.iter().filter(|n| n.group == group) {
            out.push_str(&format!("  - {}\n", node.label));
        }
    }

    for edge in &graph.edges {
        let from = graph.node(&edge.from).map_or(edge.from.as_str(), |n| n.label.as_str());
        let to = graph.node(&edge.to).map_or(edge.to.as_str(), |n| n.label.as_str());
        match edge.label.as_str() {
            "" => out.push_str(&format!("  {from} → {to}\n")),
            label => out.push_str(&format!("  {from} → {to} ({label})\n")),
        }
    }
    out
}
