//! Streaming conversion API: emit pages as they are rasterised.
//!
//! ## Why stream?
//!
//! A 60-slide deck at 4× is several hundred megabytes of PNG. A stream-based
//! API lets callers upload or write each snapshot as soon as it exists
//! instead of buffering the whole document in memory.
//!
//! Unlike the eager [`crate::convert::convert`] which returns only after
//! all pages finish, [`convert_stream`] yields [`DocumentPage`] items in
//! source order while the render worker is still busy with later pages.
//!
//! ## Backpressure
//!
//! The worker feeds a small bounded channel. When the consumer falls behind
//! the worker blocks, so at most a handful of encoded pages are in flight.
//! Dropping the stream makes the next send fail and the worker stops after
//! the page it is on.
//!
//! Skipped pages do not appear in the stream; they are reported through the
//! progress callback. A fatal error that happens mid-render is delivered as
//! the final `Err` item.

use crate::config::ConversionConfig;
use crate::convert::render_document;
use crate::error::CarouselError;
use crate::output::DocumentPage;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::sink::PageSink;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// A boxed stream of rendered pages.
pub type PageStream = BoxStream<'static, Result<DocumentPage, CarouselError>>;

/// Pages buffered between the render worker and the consumer.
const CHANNEL_CAPACITY: usize = 4;

/// Convert a document, streaming pages as they are ready.
///
/// # Returns
/// - `Ok(PageStream)` — pages in source order; a mid-render fatal error is
///   the last item
/// - `Err(CarouselError)` — the input could not be read or its format is
///   unsupported
pub async fn convert_stream(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<PageStream, CarouselError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming conversion: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    start_stream(resolved, config)
}

/// Stream an in-memory document.
///
/// This is the streaming equivalent of [`crate::convert::convert_from_bytes`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_carousel::{convert_stream_from_bytes, ConversionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("deck.pptx")?;
/// let config = ConversionConfig::default();
/// let mut stream = convert_stream_from_bytes(bytes, "deck.pptx", &config)?;
/// while let Some(page) = stream.next().await {
///     let page = page?;
///     println!("Slide {}: {} bytes", page.index, page.png.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream_from_bytes(
    bytes: impl Into<Vec<u8>>,
    file_name: impl Into<String>,
    config: &ConversionConfig,
) -> Result<PageStream, CarouselError> {
    start_stream(
        ResolvedInput {
            file_name: file_name.into(),
            bytes: bytes.into(),
        },
        config,
    )
}

fn start_stream(resolved: ResolvedInput, config: &ConversionConfig) -> Result<PageStream, CarouselError> {
    let ResolvedInput { file_name, bytes } = resolved;
    let kind = input::detect_format(&file_name, &bytes)?;
    info!("'{}' detected as {}", file_name, kind);

    let (tx, rx) = mpsc::channel::<Result<DocumentPage, CarouselError>>(CHANNEL_CAPACITY);
    let cfg = config.clone();

    tokio::task::spawn_blocking(move || {
        let page_tx = tx.clone();
        let mut sink = PageSink::new(cfg.progress_callback.clone(), move |page| {
            page_tx.blocking_send(Ok(page)).is_ok()
        });

        match render_document(kind, &file_name, bytes, &cfg, &mut sink) {
            Ok(()) => {
                let summary = sink.finish();
                debug!(
                    "Stream for '{}' finished: {}/{} page(s)",
                    file_name, summary.produced, summary.total
                );
            }
            Err(e) => {
                warn!("Streaming conversion of '{}' failed: {}", file_name, e);
                // The receiver may already be gone; nothing left to tell.
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    Ok(ReceiverStream::new(rx).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_format_fails_before_streaming() {
        let result = convert_stream_from_bytes(b"GIF89a".to_vec(), "a.gif", &ConversionConfig::default());
        assert!(matches!(result, Err(CarouselError::UnsupportedFormat { .. })));
    }

    #[tokio::test]
    async fn corrupt_docx_error_arrives_in_stream() {
        use std::io::{Cursor, Write};
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:document><w:body>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut stream = convert_stream_from_bytes(bytes, "broken.docx", &ConversionConfig::default()).unwrap();
        let first = stream.next().await.expect("one item");
        assert!(matches!(first, Err(CarouselError::CorruptArchive { .. })));
        assert!(stream.next().await.is_none());
    }
}
