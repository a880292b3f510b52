//! Eager (full-document) conversion entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: wait for all pages, then return.
//! It collects every [`DocumentPage`] into memory, drafts the social copy if
//! asked to, and returns one [`ConversionOutput`]. Use
//! [`crate::stream::convert_stream`] instead when you want pages as they are
//! rasterised or need to bound peak memory on long documents.
//!
//! ## Threading
//!
//! Rendering is CPU-bound and pdfium is not async-aware, so the whole
//! per-document render runs on one `spawn_blocking` worker. Slides are
//! processed strictly one after another; each gets its own render surface
//! that is dropped before the next slide starts.

use crate::config::ConversionConfig;
use crate::error::CarouselError;
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo, DocumentKind, DocumentPage};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::package::Package;
use crate::pipeline::raster::FontSet;
use crate::pipeline::sink::{PageSink, SinkSummary};
use crate::pipeline::{docx, pdf, pptx, suggest};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert a document file or URL to carousel snapshots.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF, DOCX or PPTX
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages were skipped
/// (check `output.stats.skipped_pages`).
///
/// # Errors
/// Returns `Err(CarouselError)` only for fatal errors:
/// - File not found / permission denied / download failure
/// - Unsupported format, corrupt archive or PDF
/// - Render surface could not be allocated
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CarouselError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_resolved(resolved, config).await
}

/// Convert an in-memory document.
///
/// `file_name` is used for output naming and the copy prompt; the format is
/// detected from the bytes.
///
/// # Example
/// ```rust,no_run
/// use edgequake_carousel::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("deck.pptx")?;
/// let output = convert_from_bytes(bytes, "deck.pptx", &ConversionConfig::default()).await?;
/// println!("{} snapshots", output.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: impl Into<Vec<u8>>,
    file_name: impl Into<String>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CarouselError> {
    let resolved = ResolvedInput {
        file_name: file_name.into(),
        bytes: bytes.into(),
    };
    convert_resolved(resolved, config).await
}

async fn convert_resolved(
    resolved: ResolvedInput,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CarouselError> {
    let total_start = Instant::now();
    let ResolvedInput { file_name, bytes } = resolved;

    // ── Step 1: Detect format ────────────────────────────────────────────
    let kind = input::detect_format(&file_name, &bytes)?;
    info!("'{}' detected as {}", file_name, kind);

    // ── Step 2: Render every selected page on one blocking worker ────────
    let render_start = Instant::now();
    let cfg = config.clone();
    let name = file_name.clone();
    let (pages, summary) = tokio::task::spawn_blocking(move || {
        let mut pages: Vec<DocumentPage> = Vec::new();
        let mut sink = PageSink::collecting(cfg.progress_callback.clone(), &mut pages);
        render_document(kind, &name, bytes, &cfg, &mut sink)?;
        let summary = sink.finish();
        Ok::<_, CarouselError>((pages, summary))
    })
    .await
    .map_err(|e| CarouselError::Internal(format!("render task failed: {e}")))??;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {}/{} page(s) in {}ms",
        summary.produced, summary.total, render_duration_ms
    );

    // ── Step 3: Social copy, only once every page exists ─────────────────
    let suggestion = if config.generate_copy {
        Some(suggest::generate_social_copy(&file_name, pages.len(), config).await)
    } else {
        None
    };

    let stats = build_stats(
        summary,
        render_duration_ms,
        total_start.elapsed().as_millis() as u64,
    );
    info!(
        "Conversion complete: {} snapshot(s), {} skipped, {}ms total",
        stats.produced_pages, stats.skipped_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        file_name,
        kind,
        pages,
        suggestion,
        stats,
    })
}

fn build_stats(summary: SinkSummary, render_duration_ms: u64, total_duration_ms: u64) -> ConversionStats {
    ConversionStats {
        total_pages: summary.total,
        produced_pages: summary.produced,
        skipped_pages: summary.errors.len(),
        page_errors: summary.errors,
        render_duration_ms,
        total_duration_ms,
    }
}

/// Dispatch to the renderer for `kind`. Synchronous; call from a blocking
/// worker.
pub(crate) fn render_document(
    kind: DocumentKind,
    name: &str,
    bytes: Vec<u8>,
    config: &ConversionConfig,
    sink: &mut PageSink<'_>,
) -> Result<(), CarouselError> {
    match kind {
        DocumentKind::Pdf => pdf::render_pdf(bytes, name, config, sink),
        DocumentKind::Pptx => {
            let package = Package::from_bytes(name, bytes)?;
            let fonts = load_fonts(config);
            pptx::render_pptx(&package, config, &fonts, sink)
        }
        DocumentKind::Docx => {
            let package = Package::from_bytes(name, bytes)?;
            let fonts = load_fonts(config);
            docx::render_docx(&package, name, config, &fonts, sink)
        }
    }
}

fn load_fonts(config: &ConversionConfig) -> FontSet {
    FontSet::load(config.font_path.as_deref(), config.bold_font_path.as_deref())
}

/// Convert a document and write the snapshots into `dir`.
///
/// See [`write_output`] for the file layout.
pub async fn convert_to_dir(
    input_str: impl AsRef<str>,
    dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CarouselError> {
    let output = convert(input_str, config).await?;
    write_output(&output, dir.as_ref()).await?;
    Ok(output)
}

/// Write `<stem>-snap-<index>.png` for every page and, when a suggestion is
/// present, `<stem>-copy.json`. Returns the written paths in page order.
///
/// Uses atomic writes (temp file + rename) to prevent partial files.
pub async fn write_output(output: &ConversionOutput, dir: &Path) -> Result<Vec<PathBuf>, CarouselError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CarouselError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let stem = output.stem();
    let mut written = Vec::with_capacity(output.pages.len() + 1);

    for page in &output.pages {
        let path = dir.join(page.file_name(stem));
        write_atomic(&path, &page.png).await?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    if let Some(ref suggestion) = output.suggestion {
        let path = dir.join(format!("{stem}-copy.json"));
        let json = serde_json::to_vec_pretty(suggestion)
            .map_err(|e| CarouselError::Internal(format!("serialise suggestion: {e}")))?;
        write_atomic(&path, &json).await?;
        written.push(path);
    }

    info!("Wrote {} file(s) to {}", written.len(), dir.display());
    Ok(written)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CarouselError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| CarouselError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| CarouselError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CarouselError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CarouselError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Document information without rendering any page.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
) -> Result<DocumentInfo, CarouselError> {
    let ResolvedInput { file_name, bytes } = input::resolve_input(input_str.as_ref(), 120).await?;
    let password = password.map(String::from);
    tokio::task::spawn_blocking(move || inspect_bytes(&file_name, bytes, password.as_deref()))
        .await
        .map_err(|e| CarouselError::Internal(format!("inspect task failed: {e}")))?
}

/// Synchronous core of [`inspect`].
pub fn inspect_bytes(
    file_name: &str,
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentInfo, CarouselError> {
    let kind = input::detect_format(file_name, &bytes)?;
    if kind == DocumentKind::Pdf {
        return pdf::inspect_pdf(bytes, file_name, password);
    }

    let size_bytes = bytes.len();
    let package = Package::from_bytes(file_name, bytes)?;
    let props = input::read_core_properties(&package);
    let page_count = match kind {
        DocumentKind::Pptx => pptx::slide_count(&package),
        _ => 1,
    };

    Ok(DocumentInfo {
        file_name: file_name.to_string(),
        kind: Some(kind),
        page_count,
        title: props.title,
        author: props.author,
        subject: props.subject,
        creator: props.application,
        producer: None,
        size_bytes,
    })
}
