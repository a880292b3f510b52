//! Rasterization of a [`SlideRenderTree`] onto a supersampled RGBA surface.
//!
//! Node geometry is expressed in CSS pixels on the nominal canvas; the
//! surface multiplies everything by the pixel ratio (4 by default), so a
//! 1280×720 slide becomes a 5120×2880 image.
//!
//! ## Why a fresh surface per page?
//!
//! Each page gets its own [`RenderSurface`], created, painted, encoded and
//! dropped before the next page starts. Nothing is shared between pages, so
//! there is no state to reset and nothing to lock.
//!
//! ## Fonts
//!
//! Text is drawn with `ab_glyph` fonts loaded from the configured paths or,
//! failing that, from a few well-known system locations. Without any usable
//! font text nodes are skipped (a warning is logged once per [`FontSet`]);
//! fills and pictures still render.

use super::tree::{Color, Frame, NodeKind, Paragraph, SlideRenderTree, VisualNode};
use crate::error::CarouselError;
use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Font size used when a run does not specify one.
pub const DEFAULT_FONT_PT: f32 = 18.0;

/// Line advance as a multiple of the largest font size on the line.
pub const LINE_HEIGHT: f32 = 1.2;

/// Text-box insets (0.1 in left/right, 0.05 in top/bottom), CSS px.
pub const TEXT_INSET_X: f64 = 9.6;
pub const TEXT_INSET_Y: f64 = 4.8;

/// Largest surface we attempt to allocate (pixels, not bytes).
pub const MAX_SURFACE_PIXELS: u64 = 1 << 28;

const REGULAR_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

// ── Fonts ────────────────────────────────────────────────────────────────

/// Regular and bold faces used for text nodes.
#[derive(Default)]
pub struct FontSet {
    regular: Option<FontVec>,
    bold: Option<FontVec>,
    warned: AtomicBool,
}

impl FontSet {
    /// Load fonts from explicit paths, falling back to system fonts.
    ///
    /// Unreadable or invalid font files are logged and skipped.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Self {
        let regular = regular
            .and_then(load_font)
            .or_else(|| first_available(REGULAR_FONT_CANDIDATES));
        let bold = bold
            .and_then(load_font)
            .or_else(|| first_available(BOLD_FONT_CANDIDATES));
        Self {
            regular,
            bold,
            warned: AtomicBool::new(false),
        }
    }

    /// A font set with no faces; text is measured by estimate and not drawn.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_text_support(&self) -> bool {
        self.regular.is_some() || self.bold.is_some()
    }

    fn face(&self, bold: bool) -> Option<&FontVec> {
        if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref().or(self.bold.as_ref())
        }
    }

    /// Horizontal advance of `text` at `px` device pixels.
    fn advance(&self, text: &str, px: f32, bold: bool) -> f32 {
        match self.face(bold) {
            Some(font) => text_size(PxScale::from(px), font, text).0 as f32,
            // Rough average glyph width for proportional sans fonts.
            None => text.chars().count() as f32 * px * 0.55,
        }
    }

    fn warn_missing_once(&self) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("No usable font found; text will not be drawn. Pass --font to choose one.");
        }
    }
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("regular", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            warn!("Cannot read font '{}': {}", path.display(), e);
            return None;
        }
    };
    match FontVec::try_from_vec(data) {
        Ok(font) => {
            debug!("Loaded font '{}'", path.display());
            Some(font)
        }
        Err(e) => {
            warn!("'{}' is not a usable font: {}", path.display(), e);
            None
        }
    }
}

fn first_available(candidates: &[&str]) -> Option<FontVec> {
    candidates
        .iter()
        .map(Path::new)
        .filter(|p| p.is_file())
        .find_map(load_font)
}

// ── Text layout ──────────────────────────────────────────────────────────

/// One positioned token of a laid-out line.
#[derive(Debug, Clone)]
struct Placed<'a> {
    x: f32,
    text: &'a str,
    px: f32,
    bold: bool,
    color: Color,
}

#[derive(Debug, Clone, Default)]
struct Line<'a> {
    items: Vec<Placed<'a>>,
    height: f32,
    width: f32,
}

fn pt_to_device_px(pt: f32, ratio: f32) -> f32 {
    pt * 96.0 / 72.0 * ratio
}

/// Split into alternating word / whitespace tokens, keeping both.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let ws = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != ws)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (tok, tail) = rest.split_at(end);
        rest = tail;
        Some(tok)
    })
}

/// Greedy word wrap of one paragraph into lines no wider than `max_width`
/// device pixels. An empty paragraph still yields one line.
fn layout_paragraph<'a>(
    paragraph: &'a Paragraph,
    max_width: f32,
    ratio: f32,
    fonts: &FontSet,
) -> Vec<Line<'a>> {
    let default_px = pt_to_device_px(DEFAULT_FONT_PT, ratio);
    let mut lines = Vec::new();
    let mut line = Line::default();

    for span in &paragraph.spans {
        let px = pt_to_device_px(span.size_pt.unwrap_or(DEFAULT_FONT_PT), ratio);
        let color = span.color.unwrap_or(Color::BLACK);
        for tok in tokens(&span.text) {
            let is_space = tok.chars().all(char::is_whitespace);
            if is_space && line.items.is_empty() {
                continue;
            }
            let w = fonts.advance(tok, px, span.bold);
            if !is_space && !line.items.is_empty() && line.width + w > max_width {
                finish_line(&mut line, default_px);
                lines.push(std::mem::take(&mut line));
            }
            line.items.push(Placed {
                x: line.width,
                text: tok,
                px,
                bold: span.bold,
                color,
            });
            line.width += w;
            line.height = line.height.max(px * LINE_HEIGHT);
        }
    }

    finish_line(&mut line, default_px);
    lines.push(line);
    lines
}

fn finish_line(line: &mut Line<'_>, default_px: f32) {
    while line
        .items
        .last()
        .is_some_and(|p| p.text.chars().all(char::is_whitespace))
    {
        line.items.pop();
    }
    if line.height <= 0.0 {
        line.height = default_px * LINE_HEIGHT;
    }
}

/// Height in CSS pixels that `paragraphs` occupy when wrapped to
/// `width` CSS pixels, insets excluded.
pub fn measure_text_height(paragraphs: &[Paragraph], width: f64, fonts: &FontSet) -> f64 {
    let total: f32 = paragraphs
        .iter()
        .flat_map(|p| layout_paragraph(p, width as f32, 1.0, fonts))
        .map(|l| l.height)
        .sum();
    f64::from(total)
}

// ── Surface ──────────────────────────────────────────────────────────────

/// A scoped RGBA canvas for painting exactly one page.
pub struct RenderSurface {
    canvas: RgbaImage,
    ratio: f32,
}

impl RenderSurface {
    /// Allocate a `width`×`height` CSS-pixel surface at `ratio`, filled
    /// with `background`.
    pub fn new(width: f64, height: f64, ratio: f32, background: Color) -> Result<Self, CarouselError> {
        let w = (width * f64::from(ratio)).round();
        let h = (height * f64::from(ratio)).round();
        let (w, h) = (w.max(0.0) as u64, h.max(0.0) as u64);
        let unavailable = || CarouselError::SurfaceUnavailable {
            width: w,
            height: h,
        };

        if w == 0 || h == 0 || w > u64::from(u32::MAX) || h > u64::from(u32::MAX) {
            return Err(unavailable());
        }
        if w * h > MAX_SURFACE_PIXELS {
            return Err(unavailable());
        }

        let len = (w * h * 4) as usize;
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| unavailable())?;
        let px = background.to_rgba().0;
        buf.resize(len, px[0]);
        if px.iter().any(|&b| b != px[0]) {
            for chunk in buf.chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
        let canvas = ImageBuffer::from_raw(w as u32, h as u32, buf).ok_or_else(unavailable)?;

        Ok(Self { canvas, ratio })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Paint the tree's background and every node in order.
    pub fn paint(&mut self, tree: &SlideRenderTree, fonts: &FontSet) {
        if let Some(bg) = tree.background {
            let full = Rect::at(0, 0).of_size(self.canvas.width(), self.canvas.height());
            draw_filled_rect_mut(&mut self.canvas, full, bg.to_rgba());
        }
        for node in tree.nodes() {
            self.paint_node(node, fonts);
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Device-pixel rectangle for a frame, clipped to the canvas.
    fn device_rect(&self, frame: &Frame) -> Option<(i64, i64, u32, u32)> {
        let r = f64::from(self.ratio);
        let x0 = (frame.x * r).round() as i64;
        let y0 = (frame.y * r).round() as i64;
        let x1 = ((frame.x + frame.width) * r).round() as i64;
        let y1 = ((frame.y + frame.height) * r).round() as i64;

        let cx0 = x0.clamp(0, i64::from(self.canvas.width()));
        let cy0 = y0.clamp(0, i64::from(self.canvas.height()));
        let cx1 = x1.clamp(0, i64::from(self.canvas.width()));
        let cy1 = y1.clamp(0, i64::from(self.canvas.height()));
        if cx1 <= cx0 || cy1 <= cy0 {
            return None;
        }
        Some((cx0, cy0, (cx1 - cx0) as u32, (cy1 - cy0) as u32))
    }

    fn fill(&mut self, frame: &Frame, color: Color) {
        if let Some((x, y, w, h)) = self.device_rect(frame) {
            let rect = Rect::at(x as i32, y as i32).of_size(w, h);
            draw_filled_rect_mut(&mut self.canvas, rect, color.to_rgba());
        }
    }

    fn paint_node(&mut self, node: &VisualNode, fonts: &FontSet) {
        match &node.kind {
            NodeKind::FilledRect { fill } => self.fill(&node.frame, *fill),
            NodeKind::TextBlock { fill, paragraphs } => {
                if let Some(fill) = fill {
                    self.fill(&node.frame, *fill);
                }
                self.draw_text(&node.frame, paragraphs, fonts);
            }
            NodeKind::Image { fill, data } => {
                if let Some(fill) = fill {
                    self.fill(&node.frame, *fill);
                }
                self.draw_image(&node.frame, data);
            }
            NodeKind::Empty => {}
        }
    }

    /// Decode `data` and fit it inside the frame, preserving aspect ratio and
    /// centring it. Undecodable bytes leave the frame empty.
    fn draw_image(&mut self, frame: &Frame, data: &[u8]) {
        let r = f64::from(self.ratio);
        let (fw, fh) = ((frame.width * r).round(), (frame.height * r).round());
        if fw < 1.0 || fh < 1.0 {
            return;
        }

        let img = match image::load_from_memory(data) {
            Ok(img) => img,
            Err(e) => {
                debug!("Skipping undecodable picture ({} bytes): {}", data.len(), e);
                return;
            }
        };
        let (iw, ih) = (f64::from(img.width()), f64::from(img.height()));
        if iw < 1.0 || ih < 1.0 {
            return;
        }

        // Fitted placement in device pixels; may extend far past the canvas.
        let scale = (fw / iw).min(fh / ih);
        let (tw, th) = (iw * scale, ih * scale);
        let x = frame.x * r + (fw - tw) / 2.0;
        let y = frame.y * r + (fh - th) / 2.0;

        let Some(window) = visible_window(x, y, tw, th, self.canvas.width(), self.canvas.height()) else {
            return;
        };

        // Only the visible part of the source is resampled, so the scratch
        // image is never larger than the canvas.
        let sx0 = ((window.x0 - x) / scale).floor().clamp(0.0, iw - 1.0);
        let sy0 = ((window.y0 - y) / scale).floor().clamp(0.0, ih - 1.0);
        let sx1 = ((window.x1 - x) / scale).ceil().clamp(sx0 + 1.0, iw);
        let sy1 = ((window.y1 - y) / scale).ceil().clamp(sy0 + 1.0, ih);

        let visible = img
            .crop_imm(sx0 as u32, sy0 as u32, (sx1 - sx0) as u32, (sy1 - sy0) as u32)
            .resize_exact(window.width(), window.height(), FilterType::Triangle)
            .to_rgba8();
        imageops::overlay(&mut self.canvas, &visible, window.x0 as i64, window.y0 as i64);
    }

    fn draw_text(&mut self, frame: &Frame, paragraphs: &[Paragraph], fonts: &FontSet) {
        if paragraphs.iter().all(|p| p.spans.is_empty()) {
            return;
        }
        if !fonts.has_text_support() {
            fonts.warn_missing_once();
            return;
        }

        let r = self.ratio;
        let inset_x = (TEXT_INSET_X * f64::from(r)) as f32;
        let inset_y = (TEXT_INSET_Y * f64::from(r)) as f32;
        let left = (frame.x * f64::from(r)) as f32 + inset_x;
        let max_width = ((frame.width * f64::from(r)) as f32 - 2.0 * inset_x).max(1.0);
        let mut y = (frame.y * f64::from(r)) as f32 + inset_y;

        for paragraph in paragraphs {
            for line in layout_paragraph(paragraph, max_width, r, fonts) {
                for item in &line.items {
                    let Some(font) = fonts.face(item.bold) else {
                        continue;
                    };
                    // Bottom-align mixed sizes on a shared baseline band.
                    let dy = line.height / LINE_HEIGHT - item.px;
                    draw_text_mut(
                        &mut self.canvas,
                        item.color.to_rgba(),
                        (left + item.x) as i32,
                        (y + dy) as i32,
                        PxScale::from(item.px),
                        font,
                        item.text,
                    );
                }
                y += line.height;
            }
        }
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .field("ratio", &self.ratio)
            .finish()
    }
}

/// The part of a placed picture that lands on the canvas, in whole device
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Window {
    fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32
    }

    fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32
    }
}

/// Intersect a `w`×`h` rectangle at (`x`, `y`) with a `cw`×`ch` canvas.
fn visible_window(x: f64, y: f64, w: f64, h: f64, cw: u32, ch: u32) -> Option<Window> {
    if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
        return None;
    }
    let window = Window {
        x0: x.max(0.0).round(),
        y0: y.max(0.0).round(),
        x1: (x + w).min(f64::from(cw)).round(),
        y1: (y + h).min(f64::from(ch)).round(),
    };
    (window.x1 - window.x0 >= 1.0 && window.y1 - window.y0 >= 1.0).then_some(window)
}

/// Allocate a surface, paint `tree` on it and return the image.
pub fn rasterize(
    tree: &SlideRenderTree,
    width: f64,
    height: f64,
    ratio: f32,
    background: Color,
    fonts: &FontSet,
) -> Result<RgbaImage, CarouselError> {
    let mut surface = RenderSurface::new(width, height, ratio, background)?;
    surface.paint(tree, fonts);
    Ok(surface.into_image())
}

/// Convenience for tests and callers that only need a pixel.
pub fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<Rgba<u8>> {
    (x < img.width() && y < img.height()).then(|| *img.get_pixel(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tree::TextSpan;
    use std::io::Cursor;

    fn rect_node(x: f64, y: f64, w: f64, h: f64, fill: Color) -> VisualNode {
        VisualNode {
            frame: Frame::new(x, y, w, h),
            kind: NodeKind::FilledRect { fill },
        }
    }

    fn png_bytes(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn surface_dimensions_follow_ratio() {
        let s = RenderSurface::new(1280.0, 720.0, 4.0, Color::WHITE).unwrap();
        assert_eq!((s.width(), s.height()), (5120, 2880));
    }

    #[test]
    fn surface_starts_as_the_background_colour() {
        let white = RenderSurface::new(8.0, 4.0, 1.0, Color::WHITE).unwrap().into_image();
        assert!(white.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
        let teal = RenderSurface::new(8.0, 4.0, 2.0, Color::rgb(0, 128, 128))
            .unwrap()
            .into_image();
        assert_eq!(teal.dimensions(), (16, 8));
        assert!(teal.pixels().all(|p| *p == Rgba([0, 128, 128, 255])));
    }

    #[test]
    fn zero_sized_surface_is_unavailable() {
        let err = RenderSurface::new(0.0, 720.0, 4.0, Color::WHITE).unwrap_err();
        assert!(matches!(err, CarouselError::SurfaceUnavailable { width: 0, .. }));
    }

    #[test]
    fn absurd_surface_is_unavailable() {
        assert!(RenderSurface::new(1.0e6, 1.0e6, 8.0, Color::WHITE).is_err());
    }

    #[test]
    fn background_then_nodes_in_order() {
        let tree = SlideRenderTree {
            background: Some(Color::rgb(0, 200, 0)),
            layout_nodes: vec![rect_node(0.0, 0.0, 10.0, 10.0, Color::rgb(255, 0, 0))],
            content_nodes: vec![rect_node(5.0, 5.0, 10.0, 10.0, Color::rgb(0, 0, 255))],
        };
        let img = rasterize(&tree, 20.0, 20.0, 2.0, Color::WHITE, &FontSet::none()).unwrap();
        assert_eq!(img.dimensions(), (40, 40));
        assert_eq!(pixel_at(&img, 2, 2), Some(Rgba([255, 0, 0, 255])));
        // overlap: content paints over layout
        assert_eq!(pixel_at(&img, 15, 15), Some(Rgba([0, 0, 255, 255])));
        assert_eq!(pixel_at(&img, 39, 0), Some(Rgba([0, 200, 0, 255])));
    }

    #[test]
    fn default_background_is_used_without_tree_background() {
        let img = rasterize(
            &SlideRenderTree::default(),
            4.0,
            4.0,
            1.0,
            Color::WHITE,
            &FontSet::none(),
        )
        .unwrap();
        assert!(img.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn pictures_are_contained_and_centred() {
        let tree = SlideRenderTree {
            content_nodes: vec![VisualNode {
                frame: Frame::new(0.0, 0.0, 20.0, 10.0),
                kind: NodeKind::Image {
                    fill: None,
                    data: png_bytes(4, 4, [10, 20, 30, 255]),
                },
            }],
            ..Default::default()
        };
        let img = rasterize(&tree, 20.0, 10.0, 1.0, Color::WHITE, &FontSet::none()).unwrap();
        // square picture in a 20x10 frame: 10x10, centred horizontally
        assert_eq!(pixel_at(&img, 10, 5), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(pixel_at(&img, 1, 5), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(pixel_at(&img, 18, 5), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn undecodable_picture_keeps_fill() {
        let tree = SlideRenderTree {
            content_nodes: vec![VisualNode {
                frame: Frame::new(0.0, 0.0, 4.0, 4.0),
                kind: NodeKind::Image {
                    fill: Some(Color::rgb(1, 2, 3)),
                    data: b"not an image".to_vec(),
                },
            }],
            ..Default::default()
        };
        let img = rasterize(&tree, 4.0, 4.0, 1.0, Color::WHITE, &FontSet::none()).unwrap();
        assert_eq!(pixel_at(&img, 2, 2), Some(Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn frames_outside_canvas_are_clipped() {
        let tree = SlideRenderTree {
            content_nodes: vec![rect_node(15.0, 15.0, 100.0, 100.0, Color::BLACK)],
            ..Default::default()
        };
        let img = rasterize(&tree, 20.0, 20.0, 1.0, Color::WHITE, &FontSet::none()).unwrap();
        assert_eq!(pixel_at(&img, 19, 19), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(pixel_at(&img, 14, 14), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn huge_picture_is_resampled_only_where_visible() {
        // ~2.9e9 px square frame: only the canvas-sized corner is drawn.
        let tree = SlideRenderTree {
            content_nodes: vec![VisualNode {
                frame: Frame::from_emu(0, 0, 27_273_042_316_900, 27_273_042_316_900),
                kind: NodeKind::Image {
                    fill: None,
                    data: png_bytes(4, 4, [200, 0, 0, 255]),
                },
            }],
            ..Default::default()
        };
        let img = rasterize(&tree, 32.0, 18.0, 1.0, Color::WHITE, &FontSet::none()).unwrap();
        assert_eq!(img.dimensions(), (32, 18));
        assert!(img.pixels().all(|p| *p == Rgba([200, 0, 0, 255])));
    }

    #[test]
    fn picture_half_off_canvas_keeps_its_visible_half() {
        let tree = SlideRenderTree {
            content_nodes: vec![VisualNode {
                frame: Frame::new(-10.0, 0.0, 20.0, 20.0),
                kind: NodeKind::Image {
                    fill: None,
                    data: png_bytes(2, 2, [0, 0, 250, 255]),
                },
            }],
            ..Default::default()
        };
        let img = rasterize(&tree, 20.0, 20.0, 1.0, Color::WHITE, &FontSet::none()).unwrap();
        assert_eq!(pixel_at(&img, 5, 10), Some(Rgba([0, 0, 250, 255])));
        assert_eq!(pixel_at(&img, 15, 10), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn visible_window_intersects_with_canvas() {
        let w = visible_window(-5.0, 2.0, 20.0, 4.0, 10, 10).unwrap();
        assert_eq!((w.x0, w.y0, w.width(), w.height()), (0.0, 2.0, 10, 4));
        assert!(visible_window(12.0, 0.0, 5.0, 5.0, 10, 10).is_none());
        assert!(visible_window(0.0, 0.0, f64::INFINITY, 5.0, 10, 10).is_none());
    }

    #[test]
    fn tokens_keep_whitespace_runs() {
        let toks: Vec<&str> = tokens("Hello  big world").collect();
        assert_eq!(toks, vec!["Hello", "  ", "big", " ", "world"]);
    }

    #[test]
    fn wrapping_breaks_long_paragraphs() {
        let para = Paragraph {
            spans: vec![TextSpan {
                text: "one two three four five six seven eight".into(),
                size_pt: Some(12.0),
                ..Default::default()
            }],
        };
        let fonts = FontSet::none();
        let narrow = layout_paragraph(&para, 60.0, 1.0, &fonts);
        let wide = layout_paragraph(&para, 10_000.0, 1.0, &fonts);
        assert!(narrow.len() > 1);
        assert_eq!(wide.len(), 1);
        assert!(narrow.iter().all(|l| !l.items.is_empty()));
    }

    #[test]
    fn empty_paragraph_takes_one_line() {
        let h = measure_text_height(&[Paragraph::default()], 500.0, &FontSet::none());
        let expected = f64::from(DEFAULT_FONT_PT * 96.0 / 72.0 * LINE_HEIGHT);
        assert!((h - expected).abs() < 1e-3);
    }
}
