//! Prompts for the social-copy request.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing the default tone or output shape
//!    requires editing exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    calling a real LLM, making prompt regressions easy to catch.
//!
//! Callers can override the system prompt via
//! [`crate::config::ConversionConfig::system_prompt`].

/// Default system prompt: fixes the JSON output contract.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a social media strategist who writes copy for document carousel posts.

Respond with a single JSON object and nothing else, matching exactly this shape:

{"headline": string, "caption": string, "hashtags": [string, ...]}

Rules:
- headline: a catchy hook for the first slide, at most 12 words
- caption: the post body, two to four sentences
- hashtags: 3 to 8 hashtags, each starting with #, no spaces inside a hashtag
- Do NOT wrap the JSON in ```json fences
- Do NOT add commentary before or after the JSON"#;

/// User prompt describing the document the carousel was made from.
pub fn social_copy_prompt(file_name: &str, page_count: usize) -> String {
    format!(
        "Analyze this document info:\n\
         File Name: {file_name}\n\
         Total Pages/Slides: {page_count}\n\
         \n\
         Please generate a social media strategy for a carousel post based on this document.\n\
         Include:\n\
         1. A catchy headline for the first slide.\n\
         2. A comprehensive caption for the post.\n\
         3. Trending hashtags related to professional document sharing."
    )
}
