//! Render-tree composition: layout layer behind, slide layer in front.

use super::package::PartSource;
use super::rels::{self, RelationshipMap};
use super::shapes;
use super::tree::{ExtractedLayer, SlideRenderTree};
use super::xml;
use tracing::{debug, warn};

/// Build the render tree for one slide whose XML has already been read.
///
/// `slide_rels` is the slide's own relationship map; its layout (if any) is
/// read, resolved and extracted here. Malformed slide XML yields an empty
/// content layer; a missing or malformed layout yields an empty background
/// layer. Neither is an error.
pub fn compose_slide(
    slide_path: &str,
    slide_xml: &str,
    slide_rels: &RelationshipMap,
    parts: &impl PartSource,
) -> SlideRenderTree {
    let layout = slide_rels
        .layout_path()
        .map(|path| extract_layout(path, parts))
        .unwrap_or_default();

    let content = match xml::parse(slide_xml) {
        Ok(doc) => shapes::extract(&doc, slide_rels, parts),
        Err(e) => {
            warn!("{}: malformed slide XML, rendering without content: {}", slide_path, e);
            ExtractedLayer::default()
        }
    };

    merge(layout, content)
}

/// Stack `layout` behind `content`. The slide's background wins when both
/// declare one.
pub fn merge(layout: ExtractedLayer, content: ExtractedLayer) -> SlideRenderTree {
    SlideRenderTree {
        background: content.background.or(layout.background),
        layout_nodes: layout.nodes,
        content_nodes: content.nodes,
    }
}

/// Read and extract a layout part with its own relationships.
fn extract_layout(layout_path: &str, parts: &impl PartSource) -> ExtractedLayer {
    let Some(layout_xml) = parts.read_part_text(layout_path) else {
        debug!("layout '{}' not present in package", layout_path);
        return ExtractedLayer::default();
    };

    let doc = match xml::parse(&layout_xml) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("{}: malformed layout XML ignored: {}", layout_path, e);
            return ExtractedLayer::default();
        }
    };

    let rels_xml = parts.read_part_text(&rels::rels_path_for(layout_path));
    let layout_rels = rels::resolve(layout_path, rels_xml.as_deref()).unwrap_or_else(|e| {
        warn!("{}: malformed relationships ignored: {}", layout_path, e);
        RelationshipMap::empty()
    });

    shapes::extract(&doc, &layout_rels, parts)
}
