//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as each slide or page is rasterised.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` because rendering runs on a blocking worker thread,
//! not on the caller's task.
//!
//! # Example
//!
//! ```rust
//! use edgequake_carousel::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::Arc;
//!
//! struct Percent;
//!
//! impl ConversionProgressCallback for Percent {
//!     fn on_page_complete(&self, index: usize, total: usize, fraction: f32) {
//!         eprintln!("page {}/{}: {:.0}%", index, total, fraction * 100.0);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Percent))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Pages are rendered strictly one after another, so events for a single
/// conversion never overlap. All methods have default no-op implementations
/// so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be attempted
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rasterised and encoded.
    ///
    /// # Arguments
    /// * `index`       — 1-indexed page (slide) number
    /// * `total_pages` — pages being attempted
    /// * `fraction`    — completed / total, in `0.0..=1.0`
    fn on_page_complete(&self, index: usize, total_pages: usize, fraction: f32) {
        let _ = (index, total_pages, fraction);
    }

    /// Called when a page is skipped (its XML part is unreadable, or its
    /// raster could not be encoded). Progress still advances.
    fn on_page_skipped(&self, index: usize, total_pages: usize, reason: &str) {
        let _ = (index, total_pages, reason);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`    — pages attempted
    /// * `produced_pages` — pages that made it into the output
    fn on_conversion_complete(&self, total_pages: usize, produced_pages: usize) {
        let _ = (total_pages, produced_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Rounded percentage for `completed` of `total` pages.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Human-readable status line for a progress percentage.
pub fn status_message(percent: u8) -> &'static str {
    match percent {
        0..=19 => "Initializing conversion engine...",
        20..=49 => "Analyzing document structure and layouts...",
        50..=79 => "Rendering ultra-high resolution snapshots...",
        80..=99 => "Finalizing image exports...",
        _ => "Complete!",
    }
}
