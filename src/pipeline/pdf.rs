//! PDF rasterisation via pdfium.
//!
//! ## Why no spawn_blocking here?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. Everything in this module is synchronous; the
//! callers in [`crate::convert`] and [`crate::stream`] run it inside
//! `tokio::task::spawn_blocking` together with the other renderers.
//!
//! ## Why scale by factor, then cap pixels?
//!
//! A slide-sized PDF page (960×540 pt) at 4× gives a 3840×2160 snapshot, in
//! line with the PPTX renderer. An A0 poster at 4× would be 13,000+ px per
//! edge, so `max_rendered_pixels` caps the longest edge regardless of the
//! physical page size.
//!
//! ## Library binding
//!
//! `PDFIUM_LIB_PATH` (a file or a directory) wins; otherwise the system
//! library is used, then a copy next to the working directory.

use super::sink::PageSink;
use super::{encode, selected_indices};
use crate::config::ConversionConfig;
use crate::error::{CarouselError, PageError};
use crate::output::DocumentInfo;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, CarouselError> {
    if let Ok(raw) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(&raw);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", lib.display());
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| CarouselError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }

    Pdfium::bind_to_system_library()
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")))
        .map(Pdfium::new)
        .map_err(|e| CarouselError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Map a pdfium load error to the fatal error a user can act on.
fn load_error(name: &str, password: Option<&str>, e: PdfiumError) -> CarouselError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            CarouselError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            CarouselError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        CarouselError::CorruptPdf {
            name: name.to_string(),
            detail: err_str,
        }
    }
}

/// Render the selected pages of a PDF into `sink`.
pub fn render_pdf(
    data: Vec<u8>,
    name: &str,
    config: &ConversionConfig,
    sink: &mut PageSink<'_>,
) -> Result<(), CarouselError> {
    let pdfium = bind_pdfium()?;
    let password = config.password.as_deref();
    let document = pdfium
        .load_pdf_from_byte_vec(data, password)
        .map_err(|e| load_error(name, password, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let indices = selected_indices(&config.pages, total_pages)?;
    info!(
        "PDF '{}' loaded: rendering {} of {} page(s)",
        name,
        indices.len(),
        total_pages
    );
    sink.start(indices.len());

    let max_px = config.max_rendered_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(config.pixel_ratio)
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    for idx in indices {
        let index = idx + 1;
        let rendered = pages
            .get(idx as PdfPageIndex)
            .and_then(|page| {
                page.render_with_config(&render_config)
                    .map(|bitmap| bitmap.as_image().to_rgba8())
            });

        match rendered {
            Ok(img) => {
                debug!("Rendered page {} → {}x{} px", index, img.width(), img.height());
                match encode::page_from_raster(index, &flatten_alpha(img)) {
                    Ok(page) => sink.page(page),
                    Err(e) => sink.skip(e),
                }
            }
            Err(e) => sink.skip(PageError::RenderFailed {
                page: index,
                detail: format!("{:?}", e),
            }),
        }

        if sink.is_closed() {
            break;
        }
    }

    Ok(())
}

/// pdfium leaves unpainted areas transparent; snapshots sit on white.
fn flatten_alpha(mut img: RgbaImage) -> RgbaImage {
    for px in img.pixels_mut() {
        let a = u32::from(px.0[3]);
        if a == 255 {
            continue;
        }
        for c in 0..3 {
            let v = u32::from(px.0[c]);
            px.0[c] = ((v * a + 255 * (255 - a)) / 255) as u8;
        }
        px.0[3] = 255;
    }
    img
}

/// Document metadata without rendering any page.
pub fn inspect_pdf(data: Vec<u8>, name: &str, password: Option<&str>) -> Result<DocumentInfo, CarouselError> {
    let size_bytes = data.len();
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_vec(data, password)
        .map_err(|e| load_error(name, password, e))?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentInfo {
        file_name: name.to_string(),
        kind: Some(crate::output::DocumentKind::Pdf),
        page_count: document.pages().len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        size_bytes,
    })
}
