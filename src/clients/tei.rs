//! A small element tree for TEI markup.
//!
//! Structuring services answer with TEI XML whose shape varies between
//! versions and documents, so instead of binding it to fixed structs the
//! response is read into a generic tree where every lookup may come back empty.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::tiers::TierError;

/// An element with its attributes and children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeiNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<TeiChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TeiChild {
    Element(TeiNode),
    Text(String),
}

impl TeiNode {
    /// Parse a document and return its root element.
    ///
    /// Namespace prefixes are dropped from element and attribute names.
    /// Elements left open at end of input are closed implicitly.
    pub fn parse(xml: &str) -> Result<TeiNode, TierError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<TeiNode> = Vec::new();
        let mut root: Option<TeiNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Self::from_start(&e)),
                Event::Empty(e) => attach(&mut stack, &mut root, Self::from_start(&e)),
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Text(t) => {
                    let text = match t.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    push_text(&mut stack, text);
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    push_text(&mut stack, text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        while let Some(node) = stack.pop() {
            attach(&mut stack, &mut root, node);
        }

        root.ok_or_else(|| TierError::Parse("XML: no root element".to_string()))
    }

    fn from_start(e: &BytesStart<'_>) -> TeiNode {
        let name = String::from_utf8_lossy(e.local_name().as_ref())
            .into_owned();
        let attributes = e
            .attributes()
            .filter_map(Result::ok)
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.local_name().as_ref())
                    .into_owned();
                let value = a
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
                (key, value)
            })
            .collect();

        TeiNode {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Attribute value by (local) name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &TeiNode> {
        self.children.iter().filter_map(|c| match c {
            TeiChild::Element(node) => Some(node),
            TeiChild::Text(_) => None,
        })
    }

    /// First direct child element named `name`
    pub fn child(&self, name: &str) -> Option<&TeiNode> {
        self.elements().find(|n| n.name == name)
    }

    /// Direct child elements named `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TeiNode> + 'a {
        self.elements().filter(move |n| n.name == name)
    }

    /// Follow a chain of child names from this node
    pub fn path(&self, path: &[&str]) -> Option<&TeiNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// First descendant (depth-first, this node included) named `name`
    pub fn find(&self, name: &str) -> Option<&TeiNode> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(name))
    }

    /// All descendants (depth-first, this node included) named `name`
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a TeiNode> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a TeiNode>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_named(name, found);
        }
    }

    /// All text below this node, joined with single spaces
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts
            .iter()
            .flat_map(|p| p.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                TeiChild::Text(text) => parts.push(text),
                TeiChild::Element(node) => node.collect_text(parts),
            }
        }
    }
}

fn attach(stack: &mut [TeiNode], root: &mut Option<TeiNode>, node: TeiNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(TeiChild::Element(node)),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn push_text(stack: &mut [TeiNode], text: String) {
    if text.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(TeiChild::Text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0" xmlns:xml="http://www.w3.org/XML/1998/namespace">
  <teiHeader>
    <fileDesc>
      <titleStmt><title level="a" type="main">A   Study &amp; More</title></titleStmt>
    </fileDesc>
  </teiHeader>
  <text xml:lang="en">
    <body>
      <div><head>Intro</head><p>First <ref>[1]</ref> paragraph.</p></div>
      <div><p><![CDATA[Second]]> paragraph.</p></div>
    </body>
  </text>
</TEI>"#;

    #[test]
    fn test_parse_and_navigate() {
        let root = TeiNode::parse(DOC).unwrap();
        assert_eq!(root.name, "TEI");

        let title = root
            .path(&["teiHeader", "fileDesc", "titleStmt", "title"])
            .unwrap();
        assert_eq!(title.text(), "A Study & More");
        assert_eq!(title.attr("type"), Some("main"));

        let text = root.child("text").unwrap();
        assert_eq!(text.attr("lang"), Some("en"));
    }

    #[test]
    fn test_text_collapses_leaves() {
        let root = TeiNode::parse(DOC).unwrap();
        let body = root.path(&["text", "body"]).unwrap();
        assert_eq!(
            body.text(),
            "Intro First [1] paragraph. Second paragraph."
        );
    }

    #[test]
    fn test_missing_paths_are_none() {
        let root = TeiNode::parse(DOC).unwrap();
        assert!(root
            .path(&["teiHeader", "profileDesc", "abstract"])
            .is_none());
        assert!(root.find("biblStruct").is_none());
        assert_eq!(root.find_all("div").len(), 2);
        let body = root.find("body").unwrap();
        assert_eq!(body.children_named("div").count(), 2);
    }

    #[test]
    fn test_unclosed_elements_are_closed() {
        let root = TeiNode::parse("<TEI><text><body><p>dangling").unwrap();
        let paragraph = root.path(&["text", "body", "p"]).unwrap();
        assert_eq!(paragraph.text(), "dangling");
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(TeiNode::parse(""), Err(TierError::Parse(_))));
        assert!(TeiNode::parse("<a></b>").is_err());
    }
}
