//! Post-processing: deterministic cleanup of the customised course text.
//!
//! The personalisation reply is displayed and exported as Markdown and then
//! segmented on "Module N" markers, so it has to be free of the usual model
//! artefacts before either happens. Rules, applied in order:
//!
//! 1. Strip an outer ```` ```markdown ```` fence around the whole reply
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Trim trailing whitespace per line
//! 4. Collapse 3+ consecutive blank lines down to 2
//! 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 6. End with exactly one newline
//!
//! Rule 1 must run first: a fence is only recognised on the raw reply.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule to the raw customisation reply.
pub fn clean_course_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
