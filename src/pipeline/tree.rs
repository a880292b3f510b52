//! The simplified visual model every renderer produces and the rasterizer
//! consumes.
//!
//! PPTX slides, their layouts and DOCX documents are all reduced to the same
//! handful of node kinds positioned in pixel space. The model deliberately
//! carries no rotation, gradients or per-character formatting; a node is a
//! rectangle that is filled, holds text, or holds a picture.

/// English Metric Units per inch (OOXML drawing coordinates).
pub const EMU_PER_INCH: f64 = 914_400.0;

/// CSS pixels per inch.
pub const PX_PER_INCH: f64 = 96.0;

/// Convert EMU to CSS pixels: `emu * 96 / 914400`.
pub fn emu_to_px(emu: i64) -> f64 {
    emu as f64 * PX_PER_INCH / EMU_PER_INCH
}

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` (with or without a leading `#`). Anything else is `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 0xFF])
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Position and size of a node, in CSS pixels on the nominal canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a frame from raw EMU values. Negative inputs clamp to zero.
    pub fn from_emu(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self::new(
            emu_to_px(x.max(0)),
            emu_to_px(y.max(0)),
            emu_to_px(cx.max(0)),
            emu_to_px(cy.max(0)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// One styled run of text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    pub text: String,
    /// Font size in points; `None` means the renderer default.
    pub size_pt: Option<f32>,
    pub bold: bool,
    pub color: Option<Color>,
}

/// A paragraph; may be empty, in which case it still takes one line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub spans: Vec<TextSpan>,
}

impl Paragraph {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// What a node paints inside its frame.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A solid rectangle.
    FilledRect { fill: Color },
    /// Wrapped paragraphs, optionally on a filled box.
    TextBlock {
        fill: Option<Color>,
        paragraphs: Vec<Paragraph>,
    },
    /// Encoded picture bytes, fitted into the frame.
    Image { fill: Option<Color>, data: Vec<u8> },
    /// Takes up space, paints nothing.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualNode {
    pub frame: Frame,
    pub kind: NodeKind,
}

impl VisualNode {
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::TextBlock { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, NodeKind::Image { .. })
    }

    /// Text content of a text node joined by newlines; empty for other kinds.
    pub fn text(&self) -> String {
        match &self.kind {
            NodeKind::TextBlock { paragraphs, .. } => paragraphs
                .iter()
                .map(Paragraph::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }
}

/// Output of extracting a single XML part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedLayer {
    pub background: Option<Color>,
    pub nodes: Vec<VisualNode>,
}

/// Everything needed to paint one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlideRenderTree {
    /// Whole-canvas colour painted before any node.
    pub background: Option<Color>,
    /// Nodes from the slide layout (painted first).
    pub layout_nodes: Vec<VisualNode>,
    /// Nodes from the slide itself (painted on top).
    pub content_nodes: Vec<VisualNode>,
}

impl SlideRenderTree {
    /// All nodes in paint order: layout layer, then content layer.
    pub fn nodes(&self) -> impl Iterator<Item = &VisualNode> {
        self.layout_nodes.iter().chain(self.content_nodes.iter())
    }

    pub fn len(&self) -> usize {
        self.layout_nodes.len() + self.content_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_inch_is_96_px() {
        assert_eq!(emu_to_px(914_400), 96.0);
        assert_eq!(emu_to_px(0), 0.0);
        // 13.333 in wide default 16:9 slide
        assert!((emu_to_px(12_192_000) - 1280.0).abs() < 1e-9);
    }

    #[test]
    fn emu_conversion_is_monotonic() {
        let mut prev = -1.0;
        for e in (0..10_000_000).step_by(123_457) {
            let px = emu_to_px(e);
            assert!(px > prev);
            prev = px;
        }
    }

    #[test]
    fn negative_frame_values_clamp() {
        let f = Frame::from_emu(-5, 914_400, -1, 914_400);
        assert_eq!(f, Frame::new(0.0, 96.0, 0.0, 96.0));
        assert!(f.is_empty());
    }

    #[test]
    fn hex_colours() {
        assert_eq!(Color::from_hex("00FF00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("#1a2B3c"), Some(Color::rgb(0x1A, 0x2B, 0x3C)));
        assert_eq!(Color::from_hex("auto"), None);
        assert_eq!(Color::from_hex("FFF"), None);
        assert_eq!(Color::rgb(1, 2, 255).to_hex(), "0102FF");
    }

    #[test]
    fn tree_paints_layout_before_content() {
        let node = |x| VisualNode {
            frame: Frame::new(x, 0.0, 1.0, 1.0),
            kind: NodeKind::Empty,
        };
        let tree = SlideRenderTree {
            background: None,
            layout_nodes: vec![node(1.0), node(2.0)],
            content_nodes: vec![node(3.0)],
        };
        let xs: Vec<f64> = tree.nodes().map(|n| n.frame.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
        assert_eq!(tree.len(), 3);
    }
}
