//! Pipeline stages for document-to-snapshot conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets the
//! three format renderers share everything below them.
//!
//! ## Data Flow (PPTX)
//!
//! ```text
//! input ──▶ package ──▶ rels ──▶ shapes ──▶ compose ──▶ raster ──▶ encode ──▶ sink
//! (bytes)    (zip)      (ids)    (nodes)    (tree)      (RGBA)     (PNG)     (pages)
//! ```
//!
//! 1. [`input`]   — resolve a path or URL to bytes and detect the format
//! 2. [`package`] — open the zip container, read parts on demand
//! 3. [`xml`]     — parse one part into an element tree
//! 4. [`rels`]    — relationship id → archive path, plus the slide's layout
//! 5. [`shapes`]  — positioned visual nodes from slide or layout XML
//! 6. [`compose`] — layout behind, slide in front, one tree per slide
//! 7. [`raster`]  — paint a tree onto a scoped surface at the pixel ratio
//! 8. [`encode`]  — PNG bytes and `data:` URLs
//! 9. [`sink`]    — deliver pages, fire progress, count skips
//!
//! [`pptx`], [`docx`] and [`pdf`] drive the stages for their format;
//! [`suggest`] and [`postprocess`] draft the social copy afterwards.

pub mod compose;
pub mod docx;
pub mod encode;
pub mod input;
pub mod package;
pub mod pdf;
pub mod postprocess;
pub mod pptx;
pub mod raster;
pub mod rels;
pub mod shapes;
pub mod sink;
pub mod suggest;
pub mod tree;
pub mod xml;

use crate::config::PageSelection;
use crate::error::CarouselError;

/// Expand `selection` against a document of `total` pages.
///
/// An explicit selection that matches nothing in a non-empty document is an
/// error; `All` over an empty document is simply empty.
pub fn selected_indices(selection: &PageSelection, total: usize) -> Result<Vec<usize>, CarouselError> {
    let indices = selection.to_indices(total);
    if indices.is_empty() && total > 0 && !selection.is_all() {
        let page = match selection {
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
            PageSelection::All => 0,
        };
        return Err(CarouselError::PageOutOfRange { page, total });
    }
    Ok(indices)
}
