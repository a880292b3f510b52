//! PPTX page sequencing: slide parts in numeric order → one snapshot each.
//!
//! ## Why numeric order?
//!
//! Slide parts are named `slide1.xml … slideN.xml`, and zip entry order is
//! whatever the producing tool felt like. A lexical sort puts `slide10`
//! before `slide2`, so we sort on the number in the name.
//!
//! ## Failure policy
//!
//! A slide whose XML part cannot be read is skipped and reported as a
//! [`PageError::SlideUnreadable`]; the rest of the deck still renders.
//! Broken XML *inside* a readable part, dangling relationship ids and
//! undecodable pictures only remove the affected content. The only fatal
//! failure is a render surface that cannot be allocated.

use super::package::{Package, PartSource};
use super::raster::{self, FontSet};
use super::rels::{self, RelationshipMap};
use super::sink::PageSink;
use super::tree::SlideRenderTree;
use super::{compose, encode, selected_indices};
use crate::config::ConversionConfig;
use crate::error::{CarouselError, PageError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static RE_SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

/// Slide part paths in ascending numeric order.
pub fn slide_parts<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut slides: Vec<(u64, &str)> = names
        .into_iter()
        .filter_map(|name| {
            let caps = RE_SLIDE_PART.captures(name)?;
            let n = caps[1].parse::<u64>().ok()?;
            Some((n, name))
        })
        .collect();
    slides.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    slides.into_iter().map(|(_, name)| name.to_string()).collect()
}

/// Build the render tree for one slide, or `None` if its XML part is unreadable.
pub fn load_slide(parts: &impl PartSource, slide_path: &str) -> Option<SlideRenderTree> {
    let slide_xml = parts.read_part_text(slide_path)?;

    let rels_path = rels::rels_path_for(slide_path);
    let rels_xml = parts.read_part_text(&rels_path);
    let slide_rels = rels::resolve(slide_path, rels_xml.as_deref()).unwrap_or_else(|e| {
        warn!("{}: malformed relationships ignored: {}", rels_path, e);
        RelationshipMap::empty()
    });

    let tree = compose::compose_slide(slide_path, &slide_xml, &slide_rels, parts);
    debug!(
        "{}: {} layout node(s), {} content node(s), background {:?}",
        slide_path,
        tree.layout_nodes.len(),
        tree.content_nodes.len(),
        tree.background
    );
    Some(tree)
}

/// Render every selected slide of `package` into `sink`.
///
/// Runs synchronously; call it from a blocking worker.
pub fn render_pptx(
    package: &Package,
    config: &ConversionConfig,
    fonts: &FontSet,
    sink: &mut PageSink<'_>,
) -> Result<(), CarouselError> {
    let names = package.part_names();
    let slides = slide_parts(names.iter().map(String::as_str));

    if slides.is_empty() {
        warn!("'{}' contains no slides; nothing to render", package.name());
        sink.start(0);
        return Ok(());
    }

    let indices = selected_indices(&config.pages, slides.len())?;
    info!(
        "Rendering {} of {} slide(s) from '{}'",
        indices.len(),
        slides.len(),
        package.name()
    );
    sink.start(indices.len());

    let width = f64::from(config.canvas_width);
    let height = f64::from(config.canvas_height);

    for idx in indices {
        let index = idx + 1;
        let slide_path = &slides[idx];

        let Some(tree) = load_slide(package, slide_path) else {
            sink.skip(PageError::SlideUnreadable {
                page: index,
                part: slide_path.clone(),
            });
            continue;
        };

        let img = raster::rasterize(
            &tree,
            width,
            height,
            config.pixel_ratio,
            config.background,
            fonts,
        )?;

        match encode::page_from_raster(index, &img) {
            Ok(page) => sink.page(page),
            Err(e) => sink.skip(e),
        }

        if sink.is_closed() {
            break;
        }
    }

    Ok(())
}

/// Number of slide parts in the package.
pub fn slide_count(package: &Package) -> usize {
    let names = package.part_names();
    slide_parts(names.iter().map(String::as_str)).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn numeric_not_lexical_order() {
        let names = [
            "ppt/slides/slide10.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/slide9.xml",
            "ppt/slides/slide1.xml",
        ];
        assert_eq!(
            slide_parts(names),
            vec![
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml",
                "ppt/slides/slide9.xml",
                "ppt/slides/slide10.xml",
            ]
        );
    }

    #[test]
    fn ignores_non_slide_parts() {
        let names = [
            "ppt/slides/_rels/slide1.xml.rels",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/slides/slideX.xml",
            "ppt/slides/slide3.xml",
            "ppt/notesSlides/notesSlide1.xml",
        ];
        assert_eq!(slide_parts(names), vec!["ppt/slides/slide3.xml"]);
    }

    #[test]
    fn unreadable_slide_is_none() {
        let parts: HashMap<String, Vec<u8>> = HashMap::new();
        assert!(load_slide(&parts, "ppt/slides/slide1.xml").is_none());
    }

    #[test]
    fn malformed_rels_do_not_drop_the_slide() {
        let mut parts: HashMap<String, Vec<u8>> = HashMap::new();
        parts.insert(
            "ppt/slides/slide1.xml".into(),
            br#"<p:sld><p:cSld><p:spTree><p:sp><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="9" cy="9"/></a:xfrm></p:spPr></p:sp></p:spTree></p:cSld></p:sld>"#.to_vec(),
        );
        parts.insert("ppt/slides/_rels/slide1.xml.rels".into(), b"<Relationships><".to_vec());
        let tree = load_slide(&parts, "ppt/slides/slide1.xml").unwrap();
        assert_eq!(tree.content_nodes.len(), 1);
    }
}
