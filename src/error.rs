//! Error types for the edgequake-carousel library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CarouselError`] — **Fatal**: the conversion cannot proceed at all
//!   (unreadable input, unsupported format, corrupt archive, render surface
//!   could not be allocated). Returned as `Err(CarouselError)` from the
//!   top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single slide or page was skipped
//!   (its XML part could not be read, its raster could not be encoded) but
//!   every other page is fine. Reported through the progress callback and
//!   counted in [`crate::output::ConversionStats`].
//!
//! Everything below those two levels (malformed shape XML, dangling
//! relationship ids, undecodable pictures, a failed caption request) is
//! absorbed where it happens and only logged.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-carousel library.
#[derive(Debug, Error)]
pub enum CarouselError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are neither a PDF nor an OOXML package we can render.
    #[error("Unsupported document '{name}': expected PDF, DOCX or PPTX (first bytes: {magic:?})")]
    UnsupportedFormat { name: String, magic: [u8; 4] },

    // ── Package errors ────────────────────────────────────────────────────
    /// The zip container could not be opened or is structurally broken.
    #[error("Document '{name}' is not a readable zip package: {detail}")]
    CorruptArchive { name: String, detail: String },

    /// A part the format cannot do without (e.g. `word/document.xml`) is missing.
    #[error("Required part '{part}' is missing or unreadable")]
    MissingPart { part: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF snapshots need the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n\
  • Place libpdfium next to the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Render errors ─────────────────────────────────────────────────────
    /// The per-page render surface could not be allocated.
    #[error("Cannot allocate a {width}x{height} px render surface")]
    SurfaceUnavailable { width: u64, height: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output snapshot.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single slide or page.
///
/// The overall conversion continues; the page is simply absent from the
/// produced sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The slide's primary XML part could not be read from the package.
    #[error("Slide {page}: part '{part}' is unreadable, skipped")]
    SlideUnreadable { page: usize, part: String },

    /// The rendered raster could not be PNG-encoded.
    #[error("Page {page}: PNG encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// pdfium failed on one page of an otherwise readable PDF.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::SlideUnreadable { page, .. }
            | PageError::EncodeFailed { page, .. }
            | PageError::RenderFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = CarouselError::UnsupportedFormat {
            name: "notes.txt".into(),
            magic: *b"hell",
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"), "got: {msg}");
        assert!(msg.contains("PPTX"));
    }

    #[test]
    fn surface_unavailable_display() {
        let e = CarouselError::SurfaceUnavailable {
            width: 0,
            height: 2880,
        };
        assert!(e.to_string().contains("0x2880"));
    }

    #[test]
    fn slide_unreadable_reports_page() {
        let e = PageError::SlideUnreadable {
            page: 3,
            part: "ppt/slides/slide3.xml".into(),
        };
        assert_eq!(e.page(), 3);
        assert!(e.to_string().contains("slide3.xml"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::EncodeFailed {
            page: 1,
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("EncodeFailed"));
    }
}
