//! Output types: rendered pages, social copy, document info and run stats.

use crate::error::PageError;
use crate::pipeline::encode::png_data_url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three document formats we can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Pptx,
}

impl DocumentKind {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Pptx => "pptx",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Pptx => "PPTX",
        })
    }
}

/// One rendered snapshot.
///
/// `index` is the 1-based position of the slide/page in the source
/// document, so a skipped slide leaves a gap rather than renumbering the
/// ones after it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub index: usize,
    /// Pixel width of the PNG.
    pub width: u32,
    /// Pixel height of the PNG.
    pub height: u32,
    /// Encoded PNG bytes.
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl DocumentPage {
    /// `data:image/png;base64,…` URL for embedding in HTML or JSON.
    pub fn data_url(&self) -> String {
        png_data_url(&self.png)
    }

    /// Conventional download name: `<stem>-snap-<index>.png`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}-snap-{}.png", stem, self.index)
    }
}

impl fmt::Debug for DocumentPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPage")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png", &format_args!("<{} bytes>", self.png.len()))
            .finish()
    }
}

/// Social copy drafted for the carousel post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AISuggestion {
    pub headline: String,
    pub caption: String,
    pub hashtags: Vec<String>,
}

impl AISuggestion {
    /// The copy used whenever the text-generation call cannot produce one.
    pub fn fallback() -> Self {
        Self {
            headline: "Master Your Workflow".to_string(),
            caption: "Check out this document for some great insights!".to_string(),
            hashtags: vec![
                "#Productivity".to_string(),
                "#Workflow".to_string(),
                "#KnowledgeSharing".to_string(),
            ],
        }
    }

    /// Ready-to-paste post body: headline, caption, then the hashtags on one line.
    pub fn post_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            self.headline,
            self.caption,
            self.hashtags.join(" ")
        )
    }
}

/// Document-level information, available without rendering (`inspect`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub kind: Option<DocumentKind>,
    /// Pages (PDF), slides (PPTX), or rendered pages (DOCX: always 1).
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub size_bytes: usize,
}

/// Aggregate statistics for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages (slides) attempted after page selection.
    pub total_pages: usize,
    /// Pages that produced a snapshot.
    pub produced_pages: usize,
    /// Pages skipped as non-fatal errors.
    pub skipped_pages: usize,
    /// Per-page reasons for every skipped page.
    pub page_errors: Vec<PageError>,
    /// Wall time spent rasterising and encoding.
    pub render_duration_ms: u64,
    /// Wall time for the whole conversion, copy generation included.
    pub total_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub file_name: String,
    pub kind: DocumentKind,
    /// Snapshots in source order.
    pub pages: Vec<DocumentPage>,
    /// Present when copy generation was requested.
    pub suggestion: Option<AISuggestion>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// File name without its extension, used for output naming.
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

/// `deck.final.pptx` → `deck.final`; names without a dot are returned whole.
pub fn file_stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_copy_is_fixed() {
        let s = AISuggestion::fallback();
        assert_eq!(s.headline, "Master Your Workflow");
        assert_eq!(s.caption, "Check out this document for some great insights!");
        assert_eq!(
            s.hashtags,
            vec!["#Productivity", "#Workflow", "#KnowledgeSharing"]
        );
    }

    #[test]
    fn post_text_layout() {
        let s = AISuggestion {
            headline: "H".into(),
            caption: "C".into(),
            hashtags: vec!["#a".into(), "#b".into()],
        };
        assert_eq!(s.post_text(), "H\n\nC\n\n#a #b");
    }

    #[test]
    fn page_file_name_and_debug() {
        let page = DocumentPage {
            index: 3,
            width: 5120,
            height: 2880,
            png: vec![0; 42],
        };
        assert_eq!(page.file_name("deck"), "deck-snap-3.png");
        let dbg = format!("{page:?}");
        assert!(dbg.contains("<42 bytes>"), "{dbg}");
    }

    #[test]
    fn stems() {
        assert_eq!(file_stem("deck.pptx"), "deck");
        assert_eq!(file_stem("a.b.pdf"), "a.b");
        assert_eq!(file_stem("/tmp/x/report.docx"), "report");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn kind_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&DocumentKind::Pptx).unwrap(), "\"pptx\"");
        assert_eq!(DocumentKind::Docx.to_string(), "DOCX");
    }
}
