//! A small owned element tree over `quick-xml`.
//!
//! Slide, layout and relationship parts are a few kilobytes each, so we parse
//! them once into a tree and navigate it with the DOM-style lookups the shape
//! extractor needs (`find`, `find_all`, `child`). Elements keep their
//! qualified name (`p:sp`) so callers can match exactly, while the
//! `local_name` helpers ignore the prefix: decks written by different tools
//! disagree on whether shapes are spelled `p:sp` or plain `sp`.
//!
//! Undeclared namespace prefixes are tolerated on purpose; we never resolve
//! namespace URIs.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Failure to turn a string into an element tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum XmlError {
    /// The tokenizer rejected the input.
    #[error("malformed XML: {0}")]
    Syntax(String),

    /// The input ended with unclosed elements, or had no root element.
    #[error("incomplete XML document: {0}")]
    Incomplete(String),
}

/// A node inside an element: either a child element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// One element with its qualified name, attributes and children in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Qualified tag name as written, e.g. `a:srgbClr`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name without its prefix, e.g. `srgbClr`.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix, if the tag has one.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    /// Attribute lookup by exact qualified name (`r:embed`, `val`).
    pub fn attr(&self, qualified: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == qualified)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute lookup ignoring the prefix (`embed` matches `r:embed`).
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_part(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements, in document order.
    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children().find(|e| e.local_name() == local)
    }

    /// All descendants (not including `self`) in document (pre-)order.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&XmlElement> = self.children().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// First descendant with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// Every descendant with the given local name, in document order.
    pub fn find_all<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.descendants().filter(move |e| e.local_name() == local)
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

/// Pre-order iterator returned by [`XmlElement::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(next.children());
        self.stack[before..].reverse();
        Some(next)
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
        }
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError::Syntax(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Syntax(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Parse `xml` and return its root element.
pub fn parse(xml: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside `a:t` is content ("Hello" + " " + "world").
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let el = element_from_start(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(el)),
                    None => root = root.or(Some(el)),
                }
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| XmlError::Syntax("unexpected closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(el)),
                    None => root = root.or(Some(el)),
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|err| XmlError::Syntax(err.to_string()))?;
                    if !text.is_empty() {
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlError::Syntax(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Incomplete(format!(
            "element <{}> is never closed",
            open.name
        )));
    }
    root.ok_or_else(|| XmlError::Incomplete("no root element".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="urn:p" xmlns:a="urn:a" xmlns:r="urn:r">
  <p:cSld>
    <p:spTree>
      <p:sp><p:txBody><a:p><a:r><a:t>Hello &amp; </a:t></a:r><a:r><a:t>world</a:t></a:r></a:p></p:txBody></p:sp>
      <pic><a:blip r:embed="rId2"/></pic>
    </p:spTree>
  </p:cSld>
</p:sld>"#;

    #[test]
    fn parses_qualified_and_local_names() {
        let root = parse(SAMPLE).unwrap();
        assert_eq!(root.name(), "p:sld");
        assert_eq!(root.local_name(), "sld");
        assert_eq!(root.prefix(), Some("p"));
        assert!(root.child("cSld").is_some());
    }

    #[test]
    fn find_matches_regardless_of_prefix() {
        let root = parse(SAMPLE).unwrap();
        let names: Vec<&str> = root
            .descendants()
            .filter(|e| matches!(e.local_name(), "sp" | "pic"))
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["p:sp", "pic"]);
    }

    #[test]
    fn attribute_lookup_qualified_and_local() {
        let root = parse(SAMPLE).unwrap();
        let blip = root.find("blip").unwrap();
        assert_eq!(blip.attr("r:embed"), Some("rId2"));
        assert_eq!(blip.attr("embed"), None);
        assert_eq!(blip.attr_local("embed"), Some("rId2"));
    }

    #[test]
    fn text_keeps_inner_whitespace_and_unescapes() {
        let root = parse(SAMPLE).unwrap();
        let body = root.find("txBody").unwrap();
        assert_eq!(body.text(), "Hello & world");
    }

    #[test]
    fn descendants_are_document_ordered() {
        let root = parse("<a><b><c/></b><d/></a>").unwrap();
        let order: Vec<&str> = root.descendants().map(|e| e.name()).collect();
        assert_eq!(order, vec!["b", "c", "d"]);
    }

    #[test]
    fn unclosed_document_is_an_error() {
        assert!(matches!(parse("<a><b></b>"), Err(XmlError::Incomplete(_))));
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(parse("<a><b></a>").is_err());
    }

    #[test]
    fn empty_input_has_no_root() {
        assert!(matches!(parse("   "), Err(XmlError::Incomplete(_))));
    }
}
