//! DOCX rendering: flow the body of `word/document.xml` onto one tall page.
//!
//! Word documents have no absolute geometry to speak of; pagination depends
//! on fonts, widows, section breaks and a dozen other settings. A carousel
//! only needs a legible snapshot, so we stack paragraphs top to bottom on a
//! paper-width page, wrap them with the same text layout the slide renderer
//! uses, and grow the page until everything fits. Inline pictures become
//! image nodes sized from their `wp:extent`.
//!
//! Tables are flattened to their cell paragraphs in reading order.

use super::package::PartSource;
use super::raster::{self, FontSet, TEXT_INSET_X, TEXT_INSET_Y};
use super::rels::{self, RelationshipMap};
use super::sink::PageSink;
use super::tree::{emu_to_px, Color, Frame, NodeKind, Paragraph, SlideRenderTree, TextSpan, VisualNode};
use super::xml::{self, XmlElement};
use super::{encode, selected_indices};
use crate::config::ConversionConfig;
use crate::error::CarouselError;
use tracing::{debug, info, warn};

pub const DOCUMENT_PART: &str = "word/document.xml";

/// US Letter height at 96 px/in; the page never gets shorter than this.
pub const MIN_PAGE_HEIGHT: f64 = 1056.0;

/// Content below this many letter pages is cut off.
pub const MAX_PAGES_TALL: f64 = 16.0;

/// Word's default body size.
pub const BODY_FONT_PT: f32 = 11.0;

/// Space after each paragraph (8 pt).
pub const PARAGRAPH_GAP: f64 = 8.0 * 96.0 / 72.0;

/// A laid-out document: the tree to paint and the page height it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub tree: SlideRenderTree,
    pub width: f64,
    pub height: f64,
}

/// Style defaults derived from a paragraph's `w:pStyle`.
fn style_defaults(style: Option<&str>) -> (f32, bool) {
    match style.map(str::to_ascii_lowercase).as_deref() {
        Some("title") => (26.0, true),
        Some("heading1") => (16.0, true),
        Some("heading2") => (13.0, true),
        Some(s) if s.starts_with("heading") => (12.0, true),
        Some("subtitle") => (15.0, false),
        _ => (BODY_FONT_PT, false),
    }
}

fn is_on(el: &XmlElement) -> bool {
    !matches!(
        el.attr("w:val").or_else(|| el.attr_local("val")),
        Some("0") | Some("false") | Some("off")
    )
}

fn val(el: &XmlElement) -> Option<&str> {
    el.attr("w:val").or_else(|| el.attr_local("val"))
}

/// One block of body content in reading order.
#[derive(Debug, Clone, PartialEq)]
enum Block {
    Text(Paragraph),
    Picture { width: f64, height: f64, data: Vec<u8> },
}

/// Collect the runs of a paragraph, descending into hyperlinks and
/// tracked insertions.
fn collect_runs<'a>(container: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for child in container.children() {
        match child.local_name() {
            "r" => out.push(child),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" | "sdt" | "sdtContent" => {
                collect_runs(child, out)
            }
            _ => {}
        }
    }
}

fn span_of(run: &XmlElement, default_pt: f32, default_bold: bool) -> Option<TextSpan> {
    let mut text = String::new();
    for part in run.children() {
        match part.local_name() {
            "t" => text.push_str(&part.text()),
            "tab" | "br" | "cr" => text.push(' '),
            _ => {}
        }
    }
    if text.is_empty() {
        return None;
    }

    let mut span = TextSpan {
        text,
        size_pt: Some(default_pt),
        bold: default_bold,
        color: None,
    };
    if let Some(rpr) = run.child("rPr") {
        if let Some(sz) = rpr.child("sz").and_then(val).and_then(|v| v.parse::<f32>().ok()) {
            if sz > 0.0 {
                span.size_pt = Some(sz / 2.0);
            }
        }
        if let Some(b) = rpr.child("b") {
            span.bold = is_on(b);
        }
        span.color = rpr.child("color").and_then(val).and_then(Color::from_hex);
    }
    Some(span)
}

/// Inline pictures of a run: `wp:extent` for size, `a:blip r:embed` for bytes.
fn pictures_of(run: &XmlElement, rels: &RelationshipMap, parts: &impl PartSource) -> Vec<Block> {
    let mut out = Vec::new();
    for drawing in run.find_all("drawing") {
        let Some(extent) = drawing.find("extent") else {
            continue;
        };
        let cx = extent.attr("cx").and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
        let cy = extent.attr("cy").and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
        let Some(id) = drawing
            .find("blip")
            .and_then(|b| b.attr("r:embed").or_else(|| b.attr_local("embed")))
        else {
            continue;
        };
        let Some(data) = rels.target(id).and_then(|path| parts.read_part(path)) else {
            debug!("DOCX picture '{}' could not be resolved", id);
            continue;
        };
        out.push(Block::Picture {
            width: emu_to_px(cx.max(0)),
            height: emu_to_px(cy.max(0)),
            data,
        });
    }
    out
}

fn paragraph_blocks(p: &XmlElement, rels: &RelationshipMap, parts: &impl PartSource) -> Vec<Block> {
    let style = p
        .child("pPr")
        .and_then(|ppr| ppr.child("pStyle"))
        .and_then(val);
    let (default_pt, default_bold) = style_defaults(style);

    let mut runs = Vec::new();
    collect_runs(p, &mut runs);

    let mut spans = Vec::new();
    let mut pictures = Vec::new();
    for run in runs {
        if let Some(span) = span_of(run, default_pt, default_bold) {
            spans.push(span);
        }
        pictures.extend(pictures_of(run, rels, parts));
    }

    let mut blocks = Vec::with_capacity(1 + pictures.len());
    if !spans.is_empty() || pictures.is_empty() {
        if spans.is_empty() {
            // Keep blank lines at the paragraph's own size.
            spans.push(TextSpan {
                text: String::new(),
                size_pt: Some(default_pt),
                ..TextSpan::default()
            });
        }
        blocks.push(Block::Text(Paragraph { spans }));
    }
    blocks.extend(pictures);
    blocks
}

/// Body blocks in reading order; tables are flattened to their paragraphs.
fn body_blocks(body: &XmlElement, rels: &RelationshipMap, parts: &impl PartSource) -> Vec<Block> {
    let mut blocks = Vec::new();
    for child in body.children() {
        match child.local_name() {
            "p" => blocks.extend(paragraph_blocks(child, rels, parts)),
            "tbl" | "sdt" => {
                for p in child.find_all("p") {
                    blocks.extend(paragraph_blocks(p, rels, parts));
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Lay out `document.xml` on a page of `config.docx_page_width`.
pub fn layout_document(
    parts: &impl PartSource,
    config: &ConversionConfig,
    fonts: &FontSet,
) -> Result<DocumentLayout, CarouselError> {
    let document_xml = parts
        .read_part_text(DOCUMENT_PART)
        .ok_or_else(|| CarouselError::MissingPart {
            part: DOCUMENT_PART.to_string(),
        })?;
    let doc = xml::parse(&document_xml).map_err(|e| CarouselError::CorruptArchive {
        name: DOCUMENT_PART.to_string(),
        detail: e.to_string(),
    })?;

    let rels_xml = parts.read_part_text(&rels::rels_path_for(DOCUMENT_PART));
    let doc_rels = rels::resolve(DOCUMENT_PART, rels_xml.as_deref()).unwrap_or_else(|e| {
        warn!("{}: malformed relationships ignored: {}", DOCUMENT_PART, e);
        RelationshipMap::empty()
    });

    let width = f64::from(config.docx_page_width);
    let margin = f64::from(config.docx_margin);
    let content_width = width - 2.0 * margin;
    let max_height = MIN_PAGE_HEIGHT * MAX_PAGES_TALL;

    let blocks = doc
        .find("body")
        .map(|body| body_blocks(body, &doc_rels, parts))
        .unwrap_or_default();

    let mut nodes = Vec::with_capacity(blocks.len());
    let mut y = margin;
    let mut truncated = false;
    for block in blocks {
        let node = match block {
            Block::Text(paragraph) => {
                let paragraphs = vec![paragraph];
                let text_h = raster::measure_text_height(&paragraphs, content_width, fonts);
                VisualNode {
                    frame: Frame::new(
                        margin - TEXT_INSET_X,
                        y - TEXT_INSET_Y,
                        content_width + 2.0 * TEXT_INSET_X,
                        text_h + 2.0 * TEXT_INSET_Y,
                    ),
                    kind: NodeKind::TextBlock {
                        fill: None,
                        paragraphs,
                    },
                }
            }
            Block::Picture {
                width: w,
                height: h,
                data,
            } => {
                // Scale oversized pictures down to the text column.
                let scale = if w > content_width && w > 0.0 {
                    content_width / w
                } else {
                    1.0
                };
                VisualNode {
                    frame: Frame::new(margin, y, w * scale, h * scale),
                    kind: NodeKind::Image { fill: None, data },
                }
            }
        };

        let advance = match &node.kind {
            NodeKind::TextBlock { .. } => node.frame.height - 2.0 * TEXT_INSET_Y,
            _ => node.frame.height,
        };
        if y + advance > max_height - margin {
            truncated = true;
            break;
        }
        y += advance + PARAGRAPH_GAP;
        nodes.push(node);
    }

    if truncated {
        warn!(
            "DOCX content exceeds {} pages; the snapshot is cut off",
            MAX_PAGES_TALL
        );
    }

    let background = doc
        .child("background")
        .and_then(val_color)
        .or(Some(Color::WHITE));

    let height = (y - PARAGRAPH_GAP + margin).max(MIN_PAGE_HEIGHT).min(max_height);
    debug!("DOCX laid out: {} node(s), {:.0}x{:.0} px", nodes.len(), width, height);

    Ok(DocumentLayout {
        tree: SlideRenderTree {
            background,
            layout_nodes: Vec::new(),
            content_nodes: nodes,
        },
        width,
        height,
    })
}

fn val_color(el: &XmlElement) -> Option<Color> {
    el.attr("w:color")
        .or_else(|| el.attr_local("color"))
        .and_then(Color::from_hex)
}

/// Render the document as a single page into `sink`.
pub fn render_docx(
    parts: &impl PartSource,
    name: &str,
    config: &ConversionConfig,
    fonts: &FontSet,
    sink: &mut PageSink<'_>,
) -> Result<(), CarouselError> {
    let indices = selected_indices(&config.pages, 1)?;
    let layout = layout_document(parts, config, fonts)?;
    info!(
        "Rendering '{}' as one {:.0}x{:.0} px page",
        name, layout.width, layout.height
    );

    sink.start(indices.len());
    let img = raster::rasterize(
        &layout.tree,
        layout.width,
        layout.height,
        config.pixel_ratio,
        Color::WHITE,
        fonts,
    )?;
    match encode::page_from_raster(1, &img) {
        Ok(page) => sink.page(page),
        Err(e) => sink.skip(e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="w" xmlns:wp="wp" xmlns:a="a" xmlns:r="r">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Quarterly Review</w:t></w:r></w:p>
    <w:p>
      <w:r><w:rPr><w:b/><w:sz w:val="28"/><w:color w:val="FF0000"/></w:rPr><w:t xml:space="preserve">Bold </w:t></w:r>
      <w:hyperlink r:id="rId9"><w:r><w:t>link</w:t></w:r></w:hyperlink>
      <w:r><w:rPr><w:b w:val="0"/><w:color w:val="auto"/></w:rPr><w:t>plain</w:t></w:r>
    </w:p>
    <w:p/>
    <w:p><w:r><w:drawing><wp:inline><wp:extent cx="9144000" cy="4572000"/>
      <a:graphic><a:graphicData><pic:pic xmlns:pic="pic"><pic:blipFill><a:blip r:embed="rId5"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>
    </wp:inline></w:drawing></w:r></w:p>
    <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
    <w:sectPr/>
  </w:body>
</w:document>"#;

    const RELS: &str = r#"<Relationships>
  <Relationship Id="rId5" Type="image" Target="media/image1.png"/>
  <Relationship Id="rId9" Type="hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    fn parts() -> HashMap<String, Vec<u8>> {
        let mut parts = HashMap::new();
        parts.insert(DOCUMENT_PART.to_string(), DOC.as_bytes().to_vec());
        parts.insert("word/_rels/document.xml.rels".to_string(), RELS.as_bytes().to_vec());
        parts.insert("word/media/image1.png".to_string(), vec![1, 2, 3]);
        parts
    }

    #[test]
    fn flows_blocks_in_reading_order() {
        let layout = layout_document(&parts(), &ConversionConfig::default(), &FontSet::none()).unwrap();
        let nodes = &layout.tree.content_nodes;
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].text(), "Quarterly Review");
        assert_eq!(nodes[1].text(), "Bold linkplain");
        assert_eq!(nodes[2].text(), "");
        assert!(nodes[3].is_image());
        assert_eq!(nodes[4].text(), "cell");

        let ys: Vec<f64> = nodes.iter().map(|n| n.frame.y).collect();
        assert!(ys.windows(2).all(|w| w[0] < w[1]), "{ys:?}");
        assert_eq!(layout.width, 816.0);
        assert_eq!(layout.height, MIN_PAGE_HEIGHT);
        assert_eq!(layout.tree.background, Some(Color::WHITE));
    }

    #[test]
    fn run_styles_follow_word_units() {
        let layout = layout_document(&parts(), &ConversionConfig::default(), &FontSet::none()).unwrap();
        let NodeKind::TextBlock { paragraphs, .. } = &layout.tree.content_nodes[1].kind else {
            panic!("expected text");
        };
        let spans = &paragraphs[0].spans;
        assert_eq!(spans[0].size_pt, Some(14.0), "w:sz is in half-points");
        assert!(spans[0].bold);
        assert_eq!(spans[0].color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(spans[1].size_pt, Some(BODY_FONT_PT));
        assert!(!spans[2].bold, "w:b w:val=0 switches bold off");
        assert_eq!(spans[2].color, None, "auto is not a colour");

        let NodeKind::TextBlock { paragraphs, .. } = &layout.tree.content_nodes[0].kind else {
            panic!("expected text");
        };
        assert!(paragraphs[0].spans[0].bold, "Title style is bold");
    }

    #[test]
    fn wide_pictures_fit_the_text_column() {
        let layout = layout_document(&parts(), &ConversionConfig::default(), &FontSet::none()).unwrap();
        let pic = &layout.tree.content_nodes[3];
        // 10 in wide picture scaled into 816 - 2*96 = 624 px
        assert!((pic.frame.width - 624.0).abs() < 1e-9);
        assert!((pic.frame.height - 312.0).abs() < 1e-9);
        assert_eq!(pic.frame.x, 96.0);
    }

    #[test]
    fn missing_document_part_is_fatal() {
        let empty: HashMap<String, Vec<u8>> = HashMap::new();
        let err = layout_document(&empty, &ConversionConfig::default(), &FontSet::none()).unwrap_err();
        assert!(matches!(err, CarouselError::MissingPart { .. }));
    }

    #[test]
    fn long_documents_grow_the_page() {
        let body: String = (0..80)
            .map(|i| format!("<w:p><w:r><w:t>Paragraph {i}</w:t></w:r></w:p>"))
            .collect();
        let mut p = HashMap::new();
        p.insert(
            DOCUMENT_PART.to_string(),
            format!("<w:document><w:body>{body}</w:body></w:document>").into_bytes(),
        );
        let layout = layout_document(&p, &ConversionConfig::default(), &FontSet::none()).unwrap();
        assert_eq!(layout.tree.content_nodes.len(), 80);
        assert!(layout.height > MIN_PAGE_HEIGHT);
    }
}
