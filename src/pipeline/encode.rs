//! Image encoding: `RgbaImage` → PNG bytes, and PNG bytes → `data:` URL.
//!
//! ## Why PNG?
//! Carousel snapshots are mostly flat colour and text. PNG keeps edges crisp
//! and compresses flat regions well; JPEG artefacts around glyphs are exactly
//! what a supersampled render is meant to avoid.

use crate::error::PageError;
use crate::output::DocumentPage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Encode a raster into the [`DocumentPage`] for source position `index`.
pub fn page_from_raster(index: usize, img: &RgbaImage) -> Result<DocumentPage, PageError> {
    let png = encode_png(img).map_err(|e| PageError::EncodeFailed {
        page: index,
        detail: e.to_string(),
    })?;
    Ok(DocumentPage {
        index,
        width: img.width(),
        height: img.height(),
        png,
    })
}

/// `data:image/png;base64,…` form of already-encoded PNG bytes.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_small_image() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (10, 10));
        assert_eq!(*decoded.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn page_carries_dimensions() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([0, 0, 0, 255]));
        let page = page_from_raster(2, &img).unwrap();
        assert_eq!((page.index, page.width, page.height), (2, 7, 3));
        assert!(page.data_url().starts_with("data:image/png;base64,iVBOR"));
    }

    #[test]
    fn data_url_prefix() {
        let url = png_data_url(&[1, 2, 3]);
        assert_eq!(url, "data:image/png;base64,AQID");
    }
}
