//! Relationship resolution for OOXML parts.
//!
//! Every part that references other parts (pictures, layouts, charts) has a
//! sibling `_rels/<name>.rels` document mapping short ids (`rId2`) to target
//! paths. Targets are written relative to the referencing part, and in
//! practice almost always as `../media/image1.png`: "one level up from the
//! part's directory", i.e. the package root for that document kind (`ppt/`
//! for presentations, `word/` for documents).

use super::xml::{self, XmlError};
use std::collections::HashMap;
use tracing::debug;

/// Relationship id → resolved archive path, plus the associated layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipMap {
    targets: HashMap<String, String>,
    layout: Option<String>,
}

impl RelationshipMap {
    /// An empty map, used when a part has no relationships part.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolved archive path for a relationship id.
    pub fn target(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(String::as_str)
    }

    /// Resolved path of the part's slide layout, if it declares one.
    pub fn layout_path(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Path of the relationships part belonging to `part_path`.
///
/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve a relationship `Target` written inside `part_path`.
///
/// * `/ppt/media/a.png`   → `ppt/media/a.png` (package-absolute)
/// * `../media/a.png`     → `<root>/media/a.png`, where `<root>` is the first
///   directory of `part_path` (`ppt` or `word`)
/// * `media/a.png`        → `<part dir>/media/a.png`
pub fn resolve_target(part_path: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }

    let root = part_path.split('/').next().filter(|r| *r != part_path);
    if target.starts_with("../") {
        let mut rest = target;
        while let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        }
        return match root {
            Some(root) => format!("{root}/{rest}"),
            None => rest.to_string(),
        };
    }

    match part_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{}", target.trim_start_matches("./")),
        None => target.to_string(),
    }
}

/// Build a [`RelationshipMap`] for `part_path` from its rels document.
///
/// `rels_xml = None` (no rels part in the package) yields an empty map. A rels
/// document that does not parse is returned as an error; callers decide
/// whether that matters.
pub fn resolve(part_path: &str, rels_xml: Option<&str>) -> Result<RelationshipMap, XmlError> {
    let Some(rels_xml) = rels_xml else {
        return Ok(RelationshipMap::empty());
    };

    let root = xml::parse(rels_xml)?;
    let mut map = RelationshipMap::empty();

    for rel in root.descendants().filter(|e| e.local_name() == "Relationship") {
        let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) else {
            continue;
        };
        if rel
            .attr("TargetMode")
            .is_some_and(|m| m.eq_ignore_ascii_case("external"))
        {
            continue;
        }

        let resolved = resolve_target(part_path, target);
        if map.layout.is_none() && rel.attr("Type").is_some_and(|t| t.contains("slideLayout")) {
            map.layout = Some(resolved.clone());
        }
        map.targets.insert(id.to_string(), resolved);
    }

    debug!(
        "{}: {} relationships, layout = {:?}",
        part_path,
        map.targets.len(),
        map.layout
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn rels_path_is_sibling_rels_folder() {
        assert_eq!(
            rels_path_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
        assert_eq!(
            rels_path_for("ppt/slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/_rels/slideLayout2.xml.rels"
        );
    }

    #[test]
    fn parent_targets_resolve_under_package_root() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("word/document.xml", "../media/image1.png"),
            "word/media/image1.png"
        );
    }

    #[test]
    fn absolute_and_sibling_targets() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/x.jpeg"),
            "ppt/media/x.jpeg"
        );
        assert_eq!(
            resolve_target("word/document.xml", "media/image2.png"),
            "word/media/image2.png"
        );
    }

    #[test]
    fn builds_map_and_finds_layout() {
        let map = resolve("ppt/slides/slide1.xml", Some(SLIDE_RELS)).unwrap();
        assert_eq!(map.len(), 2, "external hyperlink is not mapped");
        assert_eq!(map.target("rId2"), Some("ppt/media/image1.png"));
        assert_eq!(map.layout_path(), Some("ppt/slideLayouts/slideLayout2.xml"));
        assert_eq!(map.target("rId3"), None);
    }

    #[test]
    fn missing_rels_is_empty_not_error() {
        let map = resolve("ppt/slides/slide1.xml", None).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.layout_path(), None);
    }

    #[test]
    fn malformed_rels_propagates() {
        assert!(resolve("ppt/slides/slide1.xml", Some("<Relationships><Relationship")).is_err());
    }
}
