//! Whole-course LLM calls: personalisation and summary.
//!
//! Both go through [`complete_with_retry`], which wraps every completion call
//! in the configured timeout and retries transport failures with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`). With 500 ms base and 3
//! retries the wait sequence is 500 ms → 1 s → 2 s.

use crate::completion::TextCompletion;
use crate::config::MindMapConfig;
use crate::error::{CompletionError, MindMapError};
use crate::extract::truncate_chars;
use crate::pipeline::postprocess::clean_course_text;
use crate::prompts::{customize_prompt, summary_prompt};
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Characters of course text sent for summarisation.
pub const SUMMARY_INPUT_CHARS: usize = 5000;

/// A completion reply together with the number of calls it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    /// Calls made, 1 + retries.
    pub attempts: u32,
}

/// One completion call bounded by `config.api_timeout_secs`.
pub async fn complete_once(
    completion: &dyn TextCompletion,
    prompt: &str,
    config: &MindMapConfig,
) -> Result<String, CompletionError> {
    match timeout(config.api_timeout(), completion.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::new(format!(
            "completion timed out after {}s",
            config.api_timeout_secs
        ))),
    }
}

/// Call `completion` until it succeeds or `config.max_retries` is exhausted.
///
/// `label` only feeds the log lines. On exhaustion the last error is returned.
pub async fn complete_with_retry(
    completion: &dyn TextCompletion,
    prompt: &str,
    label: &str,
    config: &MindMapConfig,
) -> Attempted<Result<String, CompletionError>> {
    let mut last_err = CompletionError::new("no attempt made");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.backoff_for(attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label,
                attempt,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        match complete_once(completion, prompt, config).await {
            Ok(text) => {
                return Attempted {
                    value: Ok(text),
                    attempts: attempt + 1,
                }
            }
            Err(e) => {
                warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                last_err = e;
            }
        }
    }

    Attempted {
        value: Err(last_err),
        attempts: config.max_retries + 1,
    }
}

/// Rewrite `source` for `user_profile` as "Module N: Title" sections.
///
/// Returns the cleaned reply and the calls it took. Any failure after
/// retries is fatal, since every later stage works on this text.
pub async fn customize_course(
    source: &str,
    user_profile: &str,
    completion: &dyn TextCompletion,
    config: &MindMapConfig,
) -> Result<Attempted<String>, MindMapError> {
    let start = Instant::now();
    let prompt = customize_prompt(source, user_profile);
    let reply = complete_with_retry(completion, &prompt, "Customisation", config).await;

    let raw = reply.value.map_err(|e| MindMapError::CustomizationFailed {
        retries: reply.attempts - 1,
        detail: e.message,
    })?;

    let cleaned = clean_course_text(&raw);
    if cleaned.is_empty() {
        return Err(MindMapError::CustomizationFailed {
            retries: reply.attempts - 1,
            detail: "model returned an empty course".into(),
        });
    }

    info!(
        "Customised course: {} → {} chars in {}ms ({} attempt(s))",
        source.len(),
        cleaned.len(),
        start.elapsed().as_millis(),
        reply.attempts
    );
    Ok(Attempted {
        value: cleaned,
        attempts: reply.attempts,
    })
}

/// Summarise the first [`SUMMARY_INPUT_CHARS`] characters of `course`.
///
/// Errors are returned as text for the output record; they never abort a run.
pub async fn summarize_course(
    course: &str,
    completion: &dyn TextCompletion,
    config: &MindMapConfig,
) -> Attempted<Result<String, String>> {
    let prompt = summary_prompt(truncate_chars(course, SUMMARY_INPUT_CHARS));
    let reply = complete_with_retry(completion, &prompt, "Summary", config).await;

    let value = match reply.value {
        Ok(text) => {
            debug!("Summary: {} chars", text.len());
            Ok(text.trim().to_string())
        }
        Err(e) => {
            warn!("Summary unavailable: {}", e);
            Err(e.message)
        }
    };
    Attempted {
        value,
        attempts: reply.attempts,
    }
}
