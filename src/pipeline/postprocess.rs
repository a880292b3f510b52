//! Post-processing: deterministic cleanup of LLM-generated social copy.
//!
//! ## Why is post-processing necessary?
//!
//! Even well-prompted models occasionally return output that is *almost*
//! the JSON we asked for:
//!
//! - wrapped in ` ```json ... ``` ` fences despite the prompt saying not to
//! - preceded by "Sure! Here's your copy:" or followed by a sign-off
//! - hashtags without `#`, with embedded spaces, or repeated
//! - zero-width characters pasted in from training data
//!
//! This module applies cheap string rules that fix those quirks without
//! touching the content itself, then validates the result. Keeping them here
//! rather than in the prompt means the prompt stays focused on *what to
//! write*.
//!
//! ## Rule Order
//!
//! Strip invisible characters first so fence detection sees clean input,
//! strip fences before extracting the JSON object, and normalise hashtags
//! only after parsing.

use crate::output::AISuggestion;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Parse raw model output into an [`AISuggestion`].
///
/// Rules (applied in order):
/// 1. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Strip outer code fences (```` ```json ````, ```` ``` ````)
/// 3. Cut the outermost `{ … }` object out of any surrounding prose
/// 4. Parse; `hashtags` may be an array or one space-separated string
/// 5. Trim headline and caption; both must be non-empty
/// 6. Normalise hashtags: `#`-prefixed, no inner whitespace, deduplicated
pub fn parse_suggestion(raw: &str) -> Result<AISuggestion, String> {
    let s = remove_invisible_chars(raw);
    let s = strip_code_fences(&s);
    let json = extract_json_object(&s).ok_or_else(|| "no JSON object in response".to_string())?;

    let parsed: RawSuggestion =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;

    let headline = collapse_whitespace(&parsed.headline);
    let caption = parsed.caption.trim().to_string();
    if headline.is_empty() {
        return Err("empty headline".into());
    }
    if caption.is_empty() {
        return Err("empty caption".into());
    }

    let tags = match parsed.hashtags {
        Hashtags::List(v) => v,
        Hashtags::Joined(s) => s.split_whitespace().map(String::from).collect(),
    };

    Ok(AISuggestion {
        headline,
        caption,
        hashtags: normalise_hashtags(&tags),
    })
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    headline: String,
    caption: String,
    #[serde(default)]
    hashtags: Hashtags,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Hashtags {
    List(Vec<String>),
    Joined(String),
}

impl Default for Hashtags {
    fn default() -> Self {
        Hashtags::List(Vec::new())
    }
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.trim().to_string()
    }
}

// ── Rule 3: Extract the JSON object ─────────────────────────────────────────

fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

// ── Rule 5: Whitespace ──────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").to_string()
}

// ── Rule 6: Hashtags ────────────────────────────────────────────────────────

/// `"data science"` → `#datascience`, `"##AI"` → `#AI`; empty tags are
/// dropped and repeats (case-insensitive) keep their first spelling.
pub fn normalise_hashtags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        let body: String = tag
            .trim()
            .trim_start_matches('#')
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '#' && *c != ',')
            .collect();
        if body.is_empty() {
            continue;
        }
        if seen.insert(body.to_lowercase()) {
            out.push(format!("#{body}"));
        }
    }
    out
}
