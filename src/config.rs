//! Configuration types for document-to-carousel conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A twenty-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::CarouselError;
use crate::pipeline::tree::Color;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a document-to-carousel conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_carousel::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .pixel_ratio(2.0)
///     .generate_copy(true)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Supersampling factor applied to every page. Range: 1–8. Default: 4.
    ///
    /// Social networks downscale uploads aggressively; rendering at 4× the
    /// nominal canvas keeps small text legible after their recompression.
    pub pixel_ratio: f32,

    /// Nominal slide canvas width in CSS pixels. Default: 1280.
    pub canvas_width: u32,

    /// Nominal slide canvas height in CSS pixels. Default: 720.
    pub canvas_height: u32,

    /// DOCX page width in CSS pixels. Default: 816 (8.5 in at 96 px/in).
    pub docx_page_width: u32,

    /// DOCX page margin on every side, CSS pixels. Default: 96 (1 in).
    pub docx_margin: u32,

    /// Colour painted under every page before its own background. Default: white.
    pub background: Color,

    /// Font for regular text. If None, a system font is searched for.
    pub font_path: Option<PathBuf>,

    /// Font for bold runs. If None, a system bold font is searched for.
    pub bold_font_path: Option<PathBuf>,

    /// Page (or slide) selection. Default: All.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Maximum rendered PDF dimension (width or height) in pixels. Default: 8192.
    ///
    /// A 4× render of an A0 poster would be tens of thousands of pixels on
    /// each edge. This caps either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Ask the LLM for a headline, caption and hashtags after rendering. Default: false.
    pub generate_copy: bool,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.5-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the copy request. Default: 0.7.
    ///
    /// Marketing copy benefits from some variety; transcription-grade
    /// determinism would produce the same headline for every deck.
    pub temperature: f32,

    /// Maximum tokens for the copy response. Default: 1024.
    pub max_tokens: usize,

    /// Custom system prompt for the copy request. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 4.0,
            canvas_width: 1280,
            canvas_height: 720,
            docx_page_width: 816,
            docx_margin: 96,
            background: Color::WHITE,
            font_path: None,
            bold_font_path: None,
            pages: PageSelection::default(),
            password: None,
            max_rendered_pixels: 8192,
            download_timeout_secs: 120,
            generate_copy: false,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pixel_ratio", &self.pixel_ratio)
            .field("canvas", &(self.canvas_width, self.canvas_height))
            .field("docx_page_width", &self.docx_page_width)
            .field("docx_margin", &self.docx_margin)
            .field("background", &self.background)
            .field("font_path", &self.font_path)
            .field("bold_font_path", &self.bold_font_path)
            .field("pages", &self.pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("generate_copy", &self.generate_copy)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn Callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pixel_ratio(mut self, ratio: f32) -> Self {
        self.config.pixel_ratio = if ratio.is_finite() {
            ratio.clamp(1.0, 8.0)
        } else {
            4.0
        };
        self
    }

    pub fn canvas_size(mut self, width: u32, height: u32) -> Self {
        self.config.canvas_width = width;
        self.config.canvas_height = height;
        self
    }

    pub fn docx_page_width(mut self, px: u32) -> Self {
        self.config.docx_page_width = px;
        self
    }

    pub fn docx_margin(mut self, px: u32) -> Self {
        self.config.docx_margin = px;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.config.background = color;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn bold_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.bold_font_path = Some(path.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn generate_copy(mut self, v: bool) -> Self {
        self.config.generate_copy = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, CarouselError> {
        let c = &self.config;
        if !(1.0..=8.0).contains(&c.pixel_ratio) {
            return Err(CarouselError::InvalidConfig(format!(
                "Pixel ratio must be 1–8, got {}",
                c.pixel_ratio
            )));
        }
        if c.canvas_width == 0 || c.canvas_height == 0 {
            return Err(CarouselError::InvalidConfig(format!(
                "Canvas must be non-empty, got {}x{}",
                c.canvas_width, c.canvas_height
            )));
        }
        if c.docx_margin.saturating_mul(2) >= c.docx_page_width {
            return Err(CarouselError::InvalidConfig(format!(
                "DOCX margins ({} px each side) leave no room on a {} px page",
                c.docx_margin, c.docx_page_width
            )));
        }
        if c.max_tokens == 0 {
            return Err(CarouselError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages (or slides) to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Render all pages (default).
    #[default]
    All,
    /// Render a single page (1-indexed).
    Single(usize),
    /// Render a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Render specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PageSelection::All)
    }
}
