//! Social copy generation: one LLM call for headline, caption and hashtags.
//!
//! This module is intentionally thin: prompt wording lives in
//! [`crate::prompts`] and response cleanup in [`super::postprocess`].
//!
//! ## Failure policy
//!
//! Copy is a nice-to-have on top of the snapshots, which already exist by
//! the time this runs. Any failure (no provider configured, API error,
//! unparsable reply) is logged and replaced by [`AISuggestion::fallback`].
//! There is no timeout and no retry.

use super::postprocess::parse_suggestion;
use crate::config::ConversionConfig;
use crate::output::AISuggestion;
use crate::prompts::{social_copy_prompt, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Why the copy request did not produce a suggestion. Never leaves this
/// module except in logs.
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM reply could not be used: {0}")]
    Unusable(String),
}

/// Generate copy for a document, falling back to the fixed suggestion on
/// any failure.
pub async fn generate_social_copy(
    file_name: &str,
    page_count: usize,
    config: &ConversionConfig,
) -> AISuggestion {
    or_fallback(try_generate(file_name, page_count, config).await)
}

/// The suggestion, or the fixed fallback (logged) when there is none.
pub fn or_fallback(result: Result<AISuggestion, SuggestError>) -> AISuggestion {
    match result {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!("Social copy unavailable, using fallback: {}", e);
            AISuggestion::fallback()
        }
    }
}

async fn try_generate(
    file_name: &str,
    page_count: usize,
    config: &ConversionConfig,
) -> Result<AISuggestion, SuggestError> {
    let provider = resolve_provider(config)?;
    request_copy(provider.as_ref(), file_name, page_count, config).await
}

/// Send the copy request to `provider` and parse the reply.
pub async fn request_copy(
    provider: &dyn LLMProvider,
    file_name: &str,
    page_count: usize,
    config: &ConversionConfig,
) -> Result<AISuggestion, SuggestError> {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(social_copy_prompt(file_name, page_count)),
    ];
    let options = build_options(config);

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| SuggestError::Request(e.to_string()))?;

    debug!(
        "Copy request: {} input tokens, {} output tokens, {:?}",
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );

    interpret(&response.content)
}

/// Turn raw model output into a suggestion.
pub fn interpret(raw: &str) -> Result<AISuggestion, SuggestError> {
    parse_suggestion(raw).map_err(SuggestError::Unusable)
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SuggestError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SuggestError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, `GEMINI_API_KEY`, …).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured before auto-detection so the model choice sticks even when
///    several API keys are present.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, SuggestError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SuggestError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment. \
                 Set OPENAI_API_KEY, GEMINI_API_KEY, or pass --provider. ({e})"
            ),
        })?;

    info!("Using LLM provider auto-detected from environment");
    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ConversionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn interpret_good_reply() {
        let s = interpret(r#"{"headline":"H","caption":"C","hashtags":["x"]}"#).unwrap();
        assert_eq!(s.hashtags, vec!["#x"]);
    }

    #[test]
    fn interpret_bad_reply_is_unusable() {
        assert!(matches!(
            interpret("no json here"),
            Err(SuggestError::Unusable(_))
        ));
    }

    #[test]
    fn every_failure_falls_back() {
        for err in [
            SuggestError::ProviderNotConfigured {
                provider: "auto".into(),
                hint: "no key".into(),
            },
            SuggestError::Request("HTTP 503".into()),
            interpret("<html>").unwrap_err(),
        ] {
            assert_eq!(or_fallback(Err(err)), AISuggestion::fallback());
        }
    }

    #[test]
    fn success_passes_through() {
        let s = AISuggestion {
            headline: "H".into(),
            caption: "C".into(),
            hashtags: vec![],
        };
        assert_eq!(or_fallback(Ok(s.clone())), s);
    }
}
