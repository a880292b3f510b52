//! Shape extraction: one slide or layout XML document → positioned
//! [`VisualNode`]s.
//!
//! ## What is read
//!
//! | Source                           | Becomes                          |
//! |----------------------------------|----------------------------------|
//! | first `bg` → first `srgbClr`     | container background             |
//! | `xfrm/off` (`x`,`y`)             | frame origin                     |
//! | `xfrm/ext` (`cx`,`cy`)           | frame size                       |
//! | `spPr/solidFill/srgbClr`         | fill colour                      |
//! | `txBody/p/r/t` + `rPr`           | paragraphs of styled spans       |
//! | first `blip` `r:embed`           | picture bytes via relationships  |
//!
//! Everything else in the DrawingML model (rotation, gradients, theme colours,
//! tables, charts) is ignored. A shape we cannot place (no offset or no
//! extent) is dropped; a shape we can place but cannot paint still occupies
//! its frame as [`NodeKind::Empty`].

use super::package::PartSource;
use super::rels::RelationshipMap;
use super::tree::{Color, ExtractedLayer, Frame, NodeKind, Paragraph, TextSpan, VisualNode};
use super::xml::XmlElement;
use tracing::debug;

/// Drawable element categories, independent of namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp` / `sp`
    Shape,
    /// `p:pic` / `pic`
    Picture,
    /// `p:graphicFrame` / `graphicFrame`
    GraphicFrame,
    Other,
}

impl ShapeKind {
    pub fn is_drawable(self) -> bool {
        !matches!(self, ShapeKind::Other)
    }
}

/// Classify an element by its local name. `p:sp` and `sp` are the same shape.
pub fn classify(el: &XmlElement) -> ShapeKind {
    match el.local_name() {
        "sp" => ShapeKind::Shape,
        "pic" => ShapeKind::Picture,
        "graphicFrame" => ShapeKind::GraphicFrame,
        _ => ShapeKind::Other,
    }
}

/// Extract the background and every drawable shape of `doc`, in document order.
pub fn extract(doc: &XmlElement, rels: &RelationshipMap, parts: &impl PartSource) -> ExtractedLayer {
    let background = doc
        .find("bg")
        .and_then(|bg| bg.find("srgbClr"))
        .and_then(colour_of);

    let mut nodes = Vec::new();
    let mut dropped = 0usize;
    for shape in doc.descendants().filter(|e| classify(e).is_drawable()) {
        match extract_shape(shape, rels, parts) {
            Some(node) => nodes.push(node),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("{} shape(s) without offset/extent dropped", dropped);
    }
    ExtractedLayer { background, nodes }
}

fn extract_shape(
    shape: &XmlElement,
    rels: &RelationshipMap,
    parts: &impl PartSource,
) -> Option<VisualNode> {
    let frame = frame_of(shape)?;
    let fill = fill_of(shape);

    if let Some(data) = image_of(shape, rels, parts) {
        return Some(VisualNode {
            frame,
            kind: NodeKind::Image { fill, data },
        });
    }

    if let Some(paragraphs) = shape.child("txBody").map(paragraphs_of) {
        return Some(VisualNode {
            frame,
            kind: NodeKind::TextBlock { fill, paragraphs },
        });
    }

    let kind = match fill {
        Some(fill) => NodeKind::FilledRect { fill },
        None => NodeKind::Empty,
    };
    Some(VisualNode { frame, kind })
}

/// Position and size from the shape's transform. Both `off` and `ext` must
/// be present.
fn frame_of(shape: &XmlElement) -> Option<Frame> {
    let xfrm = shape.find("xfrm")?;
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    Some(Frame::from_emu(
        int_attr(off, "x"),
        int_attr(off, "y"),
        int_attr(ext, "cx"),
        int_attr(ext, "cy"),
    ))
}

fn int_attr(el: &XmlElement, name: &str) -> i64 {
    el.attr(name)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn colour_of(clr: &XmlElement) -> Option<Color> {
    clr.attr("val").and_then(Color::from_hex)
}

/// `spPr/solidFill/srgbClr`. Outline fills (`spPr/ln/solidFill`) don't count.
fn fill_of(shape: &XmlElement) -> Option<Color> {
    shape
        .child("spPr")?
        .child("solidFill")?
        .child("srgbClr")
        .and_then(colour_of)
}

fn paragraphs_of(body: &XmlElement) -> Vec<Paragraph> {
    body.children()
        .filter(|e| e.local_name() == "p")
        .map(|p| Paragraph {
            spans: p
                .find_all("r")
                .filter_map(span_of)
                .collect(),
        })
        .collect()
}

fn span_of(run: &XmlElement) -> Option<TextSpan> {
    let text = run.child("t")?.text();
    if text.is_empty() {
        return None;
    }

    let mut span = TextSpan {
        text,
        ..TextSpan::default()
    };
    if let Some(rpr) = run.child("rPr") {
        span.size_pt = rpr
            .attr("sz")
            .and_then(|s| s.trim().parse::<f32>().ok())
            .filter(|s| *s > 0.0)
            .map(|s| s / 100.0);
        span.bold = matches!(rpr.attr("b"), Some("1") | Some("true"));
        span.color = rpr.find("srgbClr").and_then(colour_of);
    }
    Some(span)
}

/// Picture bytes for the first `blip` in the shape, if its id resolves and the
/// target part exists.
fn image_of(shape: &XmlElement, rels: &RelationshipMap, parts: &impl PartSource) -> Option<Vec<u8>> {
    let blip = shape.find("blip")?;
    let id = blip.attr("r:embed").or_else(|| blip.attr_local("embed"))?;
    let Some(path) = rels.target(id) else {
        debug!("blip references unknown relationship '{}'", id);
        return None;
    };
    let data = parts.read_part(path);
    if data.is_none() {
        debug!("picture part '{}' is missing", path);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{rels, xml};
    use std::collections::HashMap;

    fn slide(shapes: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld>{bg}<p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#,
            bg = ""
        )
    }

    fn no_parts() -> HashMap<String, Vec<u8>> {
        HashMap::new()
    }

    const TEXT_SHAPE: &str = r#"<p:sp>
        <p:spPr><a:xfrm><a:off x="914400" y="457200"/><a:ext cx="1828800" cy="914400"/></a:xfrm>
          <a:solidFill><a:srgbClr val="FF0000"/></a:solidFill>
          <a:ln><a:solidFill><a:srgbClr val="0000FF"/></a:solidFill></a:ln></p:spPr>
        <p:txBody><a:bodyPr/>
          <a:p><a:r><a:rPr sz="2400" b="1"><a:solidFill><a:srgbClr val="00FF00"/></a:solidFill></a:rPr><a:t>Title</a:t></a:r>
               <a:r><a:t></a:t></a:r></a:p>
          <a:p/>
        </p:txBody></p:sp>"#;

    #[test]
    fn classifier_ignores_prefix() {
        let doc = xml::parse("<r><p:sp/><sp/><p:pic/><graphicFrame/><p:grpSp/></r>").unwrap();
        let kinds: Vec<ShapeKind> = doc.children().map(classify).collect();
        assert_eq!(
            kinds,
            vec![
                ShapeKind::Shape,
                ShapeKind::Shape,
                ShapeKind::Picture,
                ShapeKind::GraphicFrame,
                ShapeKind::Other
            ]
        );
    }

    #[test]
    fn outline_only_shape_is_unfilled() {
        let shape = r#"<p:sp><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm>
            <a:ln><a:solidFill><a:srgbClr val="0000FF"/></a:solidFill></a:ln></p:spPr></p:sp>"#;
        let doc = xml::parse(&slide(shape)).unwrap();
        let layer = extract(&doc, &RelationshipMap::empty(), &no_parts());
        assert_eq!(layer.nodes.len(), 1);
        assert!(matches!(layer.nodes[0].kind, NodeKind::Empty));
    }

    #[test]
    fn text_shape_is_positioned_and_styled() {
        let doc = xml::parse(&slide(TEXT_SHAPE)).unwrap();
        let layer = extract(&doc, &RelationshipMap::empty(), &no_parts());
        assert_eq!(layer.nodes.len(), 1);

        let node = &layer.nodes[0];
        assert_eq!(node.frame, Frame::new(96.0, 48.0, 192.0, 96.0));
        let NodeKind::TextBlock { fill, paragraphs } = &node.kind else {
            panic!("expected text block, got {:?}", node.kind);
        };
        assert_eq!(*fill, Some(Color::rgb(255, 0, 0)), "outline colour must not win");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].spans.len(), 1, "empty run contributes nothing");
        let span = &paragraphs[0].spans[0];
        assert_eq!(span.text, "Title");
        assert_eq!(span.size_pt, Some(24.0));
        assert!(span.bold);
        assert_eq!(span.color, Some(Color::rgb(0, 255, 0)));
        assert!(paragraphs[1].spans.is_empty());
    }

    #[test]
    fn shape_without_offset_or_extent_is_dropped() {
        let shapes = r#"
            <p:sp><p:spPr><a:xfrm><a:ext cx="10" cy="10"/></a:xfrm></p:spPr></p:sp>
            <p:sp><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm></p:spPr></p:sp>"#;
        let doc = xml::parse(&slide(shapes)).unwrap();
        let layer = extract(&doc, &RelationshipMap::empty(), &no_parts());
        assert_eq!(layer.nodes.len(), 1);
        assert_eq!(layer.nodes[0].kind, NodeKind::Empty);
        assert_eq!(layer.nodes[0].frame.width, 96.0);
    }

    #[test]
    fn non_numeric_attributes_count_as_zero() {
        let shapes = r#"<sp><spPr><xfrm><off x="abc"/><ext cx="914400" cy="-5"/></xfrm>
            <solidFill><srgbClr val="123456"/></solidFill></spPr></sp>"#;
        let doc = xml::parse(&slide(shapes)).unwrap();
        let layer = extract(&doc, &RelationshipMap::empty(), &no_parts());
        let node = &layer.nodes[0];
        assert_eq!(node.frame, Frame::new(0.0, 0.0, 96.0, 0.0));
        assert_eq!(
            node.kind,
            NodeKind::FilledRect {
                fill: Color::rgb(0x12, 0x34, 0x56)
            }
        );
    }

    #[test]
    fn picture_resolves_through_relationships() {
        let rels_xml = r#"<Relationships><Relationship Id="rId2" Type="image" Target="../media/image1.png"/></Relationships>"#;
        let map = rels::resolve("ppt/slides/slide1.xml", Some(rels_xml)).unwrap();
        let mut parts = no_parts();
        parts.insert("ppt/media/image1.png".into(), vec![9, 9, 9]);

        let shapes = r#"
            <p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill>
              <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm></p:spPr></p:pic>
            <p:pic><p:blipFill><a:blip r:embed="rId9"/></p:blipFill>
              <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm></p:spPr></p:pic>"#;
        let doc = xml::parse(&slide(shapes)).unwrap();
        let layer = extract(&doc, &map, &parts);

        assert_eq!(layer.nodes.len(), 2);
        assert_eq!(
            layer.nodes[0].kind,
            NodeKind::Image {
                fill: None,
                data: vec![9, 9, 9]
            }
        );
        assert_eq!(layer.nodes[1].kind, NodeKind::Empty, "dangling id is not an error");
    }

    #[test]
    fn background_and_document_order() {
        let xml_doc = r#"<p:sldLayout xmlns:a="a" xmlns:p="p"><p:cSld>
            <p:bg><p:bgPr><a:solidFill><a:srgbClr val="00AA00"/></a:solidFill></p:bgPr></p:bg>
            <p:spTree>
              <p:sp><p:spPr><a:xfrm><a:off x="1" y="0"/><a:ext cx="1" cy="1"/></a:xfrm></p:spPr></p:sp>
              <p:graphicFrame><p:xfrm><a:off x="2" y="0"/><a:ext cx="1" cy="1"/></p:xfrm></p:graphicFrame>
              <sp><spPr><xfrm><off x="3" y="0"/><ext cx="1" cy="1"/></xfrm></spPr></sp>
            </p:spTree></p:cSld></p:sldLayout>"#;
        let doc = xml::parse(xml_doc).unwrap();
        let layer = extract(&doc, &RelationshipMap::empty(), &no_parts());
        assert_eq!(layer.background, Some(Color::rgb(0, 0xAA, 0)));
        let xs: Vec<f64> = layer.nodes.iter().map(|n| n.frame.x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "got {xs:?}");
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = xml::parse(&slide(TEXT_SHAPE)).unwrap();
        let a = extract(&doc, &RelationshipMap::empty(), &no_parts());
        let b = extract(&doc, &RelationshipMap::empty(), &no_parts());
        assert_eq!(a, b);
    }
}
