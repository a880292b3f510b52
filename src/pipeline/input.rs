//! Input resolution: turn a user-supplied path or URL into bytes, and work
//! out which of the three formats those bytes are.
//!
//! ## Why read everything into memory?
//!
//! pdfium loads from a byte vector and the zip reader wants `Read + Seek`,
//! so both formats are happiest with the whole document in a `Vec<u8>`. A
//! downloaded document never touches the file system at all.
//!
//! ## Why detect from content?
//!
//! Upload pipelines routinely lose or mangle extensions (`download`,
//! `deck.pptx.zip`). The first bytes and the zip's entry names are reliable;
//! the name is only used for messages and output naming.

use super::package::PartSource;
use super::xml;
use crate::error::CarouselError;
use crate::output::DocumentKind;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A document loaded into memory.
#[derive(Clone)]
pub struct ResolvedInput {
    /// Base file name, from the path or the URL's last segment.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ResolvedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInput")
            .field("file_name", &self.file_name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, CarouselError> {
    if input.trim().is_empty() {
        return Err(CarouselError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, CarouselError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CarouselError::PermissionDenied { path });
        }
        Err(_) => return Err(CarouselError::FileNotFound { path }),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput { file_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, CarouselError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CarouselError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            CarouselError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CarouselError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(CarouselError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?.to_vec();
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        file_name: filename_from_url(url),
        bytes,
    })
}

/// Last path segment of the URL when it looks like a file name.
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded".to_string()
}

/// Identify the document format from its content.
///
/// `%PDF` → PDF. A zip whose entries include `ppt/presentation.xml` or any
/// `ppt/slides/` part → PPTX; one with `word/document.xml` → DOCX. A zip
/// that cannot be opened is a corrupt archive; anything else is unsupported.
pub fn detect_format(name: &str, bytes: &[u8]) -> Result<DocumentKind, CarouselError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(DocumentKind::Pdf);
    }

    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(unsupported(name, bytes));
    }

    let archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| CarouselError::CorruptArchive {
        name: name.to_string(),
        detail: e.to_string(),
    })?;

    let mut is_docx = false;
    for entry in archive.file_names() {
        if entry == "ppt/presentation.xml" || entry.starts_with("ppt/slides/") {
            return Ok(DocumentKind::Pptx);
        }
        if entry == "word/document.xml" {
            is_docx = true;
        }
    }
    if is_docx {
        return Ok(DocumentKind::Docx);
    }

    Err(unsupported(name, bytes))
}

fn unsupported(name: &str, bytes: &[u8]) -> CarouselError {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    CarouselError::UnsupportedFormat {
        name: name.to_string(),
        magic,
    }
}

/// Document properties from an OOXML package's `docProps/` parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    /// Producing application (`docProps/app.xml` → `Application`).
    pub application: Option<String>,
}

/// Read `docProps/core.xml` and `docProps/app.xml`. Missing or malformed
/// parts leave the corresponding fields unset.
pub fn read_core_properties(parts: &impl PartSource) -> CoreProperties {
    let mut props = CoreProperties::default();

    if let Some(core) = parts
        .read_part_text("docProps/core.xml")
        .and_then(|t| xml::parse(&t).ok())
    {
        props.title = non_empty_text(core.find("title"));
        props.author = non_empty_text(core.find("creator"));
        props.subject = non_empty_text(core.find("subject"));
    }

    if let Some(app) = parts
        .read_part_text("docProps/app.xml")
        .and_then(|t| xml::parse(&t).ok())
    {
        props.application = non_empty_text(app.find("Application"));
    }

    props
}

fn non_empty_text(el: Option<&xml::XmlElement>) -> Option<String> {
    el.map(|e| e.text().trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(names: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for name in names {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"<x/>").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/deck.pptx"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.io/a/deck.pptx?dl=1"), "deck.pptx");
        assert_eq!(filename_from_url("https://x.io/download/"), "downloaded");
        assert_eq!(filename_from_url("not a url"), "downloaded");
    }

    #[test]
    fn detects_pdf() {
        assert_eq!(detect_format("a", b"%PDF-1.7\n...").unwrap(), DocumentKind::Pdf);
    }

    #[test]
    fn detects_pptx_and_docx() {
        let pptx = zip_with(&["[Content_Types].xml", "ppt/slides/slide1.xml"]);
        assert_eq!(detect_format("a", &pptx).unwrap(), DocumentKind::Pptx);

        let pptx = zip_with(&["ppt/presentation.xml"]);
        assert_eq!(detect_format("a", &pptx).unwrap(), DocumentKind::Pptx);

        let docx = zip_with(&["word/document.xml", "word/styles.xml"]);
        assert_eq!(detect_format("a", &docx).unwrap(), DocumentKind::Docx);
    }

    #[test]
    fn other_zip_is_unsupported() {
        let xlsx = zip_with(&["xl/workbook.xml"]);
        match detect_format("book.xlsx", &xlsx) {
            Err(CarouselError::UnsupportedFormat { name, magic }) => {
                assert_eq!(name, "book.xlsx");
                assert_eq!(&magic, b"PK\x03\x04");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn text_and_short_inputs_are_unsupported() {
        assert!(matches!(
            detect_format("notes.txt", b"hello world"),
            Err(CarouselError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format("empty", b""),
            Err(CarouselError::UnsupportedFormat { magic: [0, 0, 0, 0], .. })
        ));
    }

    #[test]
    fn truncated_zip_is_corrupt() {
        assert!(matches!(
            detect_format("deck.pptx", b"PK\x03\x04garbage"),
            Err(CarouselError::CorruptArchive { .. })
        ));
    }

    #[test]
    fn reads_core_properties() {
        let mut parts: HashMap<String, Vec<u8>> = HashMap::new();
        parts.insert(
            "docProps/core.xml".into(),
            br#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc">
                 <dc:title>Roadmap 2025</dc:title>
                 <dc:creator>Ops Team</dc:creator>
                 <dc:subject>  </dc:subject>
               </cp:coreProperties>"#
                .to_vec(),
        );
        parts.insert(
            "docProps/app.xml".into(),
            b"<Properties><Application>Microsoft Office PowerPoint</Application></Properties>".to_vec(),
        );
        let props = read_core_properties(&parts);
        assert_eq!(props.title.as_deref(), Some("Roadmap 2025"));
        assert_eq!(props.author.as_deref(), Some("Ops Team"));
        assert_eq!(props.subject, None);
        assert_eq!(props.application.as_deref(), Some("Microsoft Office PowerPoint"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pptx", 5).await.unwrap_err();
        assert!(matches!(err, CarouselError::FileNotFound { .. }));
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(
            tokio_test::block_on(resolve_input("  ", 5)),
            Err(CarouselError::InvalidInput { .. })
        ));
    }
}
