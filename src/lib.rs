//! # edgequake-carousel
//!
//! Turn PDF, DOCX and PPTX documents into high-resolution PNG snapshots for
//! social-media carousel posts, optionally with LLM-drafted post copy.
//!
//! ## Why this crate?
//!
//! Carousel posts want one crisp image per slide or page. PDFs are easy:
//! pdfium rasterises them. Office documents are not: rendering them usually
//! means shelling out to LibreOffice. This crate instead reads the OOXML
//! package directly, rebuilds a simplified visual tree (backgrounds, filled
//! rectangles, styled text, pictures) and paints it itself, so a slide deck
//! becomes snapshots with nothing but a font file installed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Input    resolve local file or download from URL, detect format
//!  ├─ 2. Parse    zip package → slide / layout XML → relationship maps
//!  ├─ 3. Compose  layout nodes behind slide nodes, EMU → px
//!  ├─ 4. Raster   paint at 4× onto a per-slide surface (pdfium for PDF)
//!  ├─ 5. Encode   RGBA → PNG
//!  └─ 6. Copy     optional headline / caption / hashtags from an LLM
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_carousel::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().generate_copy(true).build()?;
//!     let output = convert("deck.pptx", &config).await?;
//!     for page in &output.pages {
//!         std::fs::write(page.file_name(output.stem()), &page.png)?;
//!     }
//!     if let Some(copy) = &output.suggestion {
//!         println!("{}", copy.post_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `carousel` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-carousel = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! | Input | Needs |
//! |-------|-------|
//! | PPTX / DOCX | a TrueType/OpenType font (auto-detected, or `font_path`) for text |
//! | PDF | the pdfium shared library (`PDFIUM_LIB_PATH` or system install) |
//! | copy | an LLM API key (`OPENAI_API_KEY`, `GEMINI_API_KEY`, …) |
//!
//! Without a font, slides still render with their shapes and pictures; text
//! is skipped with a single warning. Without an API key, the fixed fallback
//! copy is used.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_dir, inspect, inspect_bytes, write_output,
};
pub use error::{CarouselError, PageError};
pub use output::{AISuggestion, ConversionOutput, ConversionStats, DocumentInfo, DocumentKind, DocumentPage};
pub use pipeline::suggest::generate_social_copy;
pub use pipeline::tree::Color;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, convert_stream_from_bytes, PageStream};
