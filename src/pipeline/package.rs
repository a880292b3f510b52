//! Zip package access for OOXML documents (PPTX, DOCX).
//!
//! [`Package`] owns the raw archive bytes for the whole conversion and hands
//! out individual parts on request. Parts are decompressed only when read;
//! nothing is cached, so reading the same picture twice inflates it twice.

use crate::error::CarouselError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;

/// Upper bound on the up-front buffer for one part. Larger parts still read
/// fine; the buffer grows as data actually arrives.
const MAX_CAPACITY_HINT: u64 = 64 << 20;

/// Initial buffer size for a part whose header declares `declared` bytes.
/// The header is untrusted.
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_CAPACITY_HINT) as usize
}

/// Read access to named parts. Implemented by [`Package`] and, for tests,
/// by a plain `HashMap<String, Vec<u8>>`.
pub trait PartSource {
    /// Raw bytes of the part at `path`, or `None` if it does not exist or
    /// cannot be decompressed.
    fn read_part(&self, path: &str) -> Option<Vec<u8>>;

    /// The part decoded as text (see [`decode_xml_bytes`]).
    fn read_part_text(&self, path: &str) -> Option<String> {
        self.read_part(path).map(|b| decode_xml_bytes(&b))
    }
}

impl PartSource for HashMap<String, Vec<u8>> {
    fn read_part(&self, path: &str) -> Option<Vec<u8>> {
        self.get(path).cloned()
    }
}

/// An opened OOXML zip container.
pub struct Package {
    name: String,
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl Package {
    /// Open a package from its raw bytes. `name` is only used in errors and logs.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, CarouselError> {
        let name = name.into();
        let archive = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| {
            CarouselError::CorruptArchive {
                name: name.clone(),
                detail: e.to_string(),
            }
        })?;
        debug!("Opened package '{}' ({} entries)", name, archive.len());
        Ok(Self {
            name,
            archive: RefCell::new(archive),
        })
    }

    /// Display name the package was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every entry name in archive order.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.borrow().file_names().map(String::from).collect()
    }

    /// Whether an entry with this exact name exists.
    pub fn contains(&self, path: &str) -> bool {
        self.archive.borrow().file_names().any(|n| n == path)
    }

    /// Read a part as bytes.
    pub fn read_binary(&self, path: &str) -> Result<Vec<u8>, CarouselError> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive
            .by_name(path)
            .map_err(|_| CarouselError::MissingPart {
                part: path.to_string(),
            })?;
        let mut data = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut data)
            .map_err(|_| CarouselError::MissingPart {
                part: path.to_string(),
            })?;
        Ok(data)
    }

    /// Read a part as text, handling UTF-8/UTF-16 byte-order marks.
    pub fn read_text(&self, path: &str) -> Result<String, CarouselError> {
        self.read_binary(path).map(|b| decode_xml_bytes(&b))
    }
}

impl PartSource for Package {
    fn read_part(&self, path: &str) -> Option<Vec<u8>> {
        self.read_binary(path).ok()
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("entries", &self.archive.borrow().len())
            .finish()
    }
}

/// Decode part bytes to a `String`.
///
/// OOXML parts are normally UTF-8, but some producers write UTF-16 with a BOM.
/// Anything undecodable falls back to lossy UTF-8 so the XML parser gets a
/// chance to reject it with a proper error.
pub fn decode_xml_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return fix_encoding_declaration(decode_utf16(rest, u16::from_le_bytes));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return fix_encoding_declaration(decode_utf16(rest, u16::from_be_bytes));
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], word: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| word([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// The declaration still says UTF-16 after we transcoded to a Rust string.
fn fix_encoding_declaration(content: String) -> String {
    if !content.starts_with("<?xml") {
        return content;
    }
    match content.find("?>") {
        Some(end) => {
            let decl = content[..end].replace("UTF-16", "UTF-8").replace("utf-16", "UTF-8");
            format!("{}{}", decl, &content[end..])
        }
        None => content,
    }
}
