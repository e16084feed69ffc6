// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML parser using html5ever
//!
//! Flattens the parsed tree into an arena of element descriptors that
//! rules can scan without holding any reference-counted DOM nodes.

use std::collections::HashMap;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Namespace an element was parsed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementNamespace {
    Html,
    Svg,
    MathMl,
}

/// One element of the captured DOM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Position in document order
    pub index: usize,
    /// Parent element index (None for the root element)
    pub parent: Option<usize>,
    /// Lower-case tag name
    pub tag: String,
    /// Namespace
    pub namespace: ElementNamespace,
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    /// Concatenated direct text children
    pub text: String,
    /// Selector path locating this element
    pub selector: String,
}

impl ElementInfo {
    /// Get attribute value (attribute names are lower-case)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check for attribute presence
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == name)
    }

    /// Element id
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Element name attribute
    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }

    /// Opening tag rendered back to markup, truncated for report context
    pub fn outer_tag(&self, max: usize) -> String {
        let mut tag = format!("<{}", self.tag);
        for (k, v) in &self.attributes {
            tag.push_str(&format!(" {}=\"{}\"", k, v));
        }
        tag.push('>');
        truncate(&tag, max)
    }
}

/// Result of parsing a page
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// All elements in document order
    pub elements: Vec<ElementInfo>,
    /// HTML comment contents
    pub comments: Vec<String>,
}

/// Parse HTML string into element descriptors
pub fn parse_html(html: &str) -> Result<ParsedDocument> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| Error::capture(format!("HTML parsing failed: {}", e)))?;

    let mut doc = ParsedDocument::default();
    let mut converter = DomFlattener { doc: &mut doc };
    converter.convert_children(&dom.document, None, "");

    Ok(doc)
}

/// Walks the html5ever tree in document order
struct DomFlattener<'a> {
    doc: &'a mut ParsedDocument,
}

impl<'a> DomFlattener<'a> {
    fn convert_children(&mut self, handle: &Handle, parent: Option<usize>, parent_selector: &str) {
        let mut seen_tags: HashMap<String, usize> = HashMap::new();

        for child in handle.children.borrow().iter() {
            match child.data {
                NodeData::Element {
                    ref name,
                    ref attrs,
                    ..
                } => {
                    let tag = name.local.to_string().to_ascii_lowercase();
                    let ns: &str = &name.ns;
                    let namespace = match ns {
                        SVG_NS => ElementNamespace::Svg,
                        MATHML_NS => ElementNamespace::MathMl,
                        _ => ElementNamespace::Html,
                    };

                    let attributes: Vec<(String, String)> = attrs
                        .borrow()
                        .iter()
                        .map(|a| (a.name.local.to_string().to_ascii_lowercase(), a.value.to_string()))
                        .collect();

                    let nth = {
                        let count = seen_tags.entry(tag.clone()).or_insert(0);
                        *count += 1;
                        *count
                    };
                    let selector = build_selector(parent_selector, &tag, &attributes, nth);

                    let index = self.doc.elements.len();
                    self.doc.elements.push(ElementInfo {
                        index,
                        parent,
                        tag,
                        namespace,
                        attributes,
                        text: direct_text(child),
                        selector: selector.clone(),
                    });

                    self.convert_children(child, Some(index), &selector);
                }
                NodeData::Comment { ref contents } => {
                    self.doc.comments.push(contents.to_string());
                }
                _ => {}
            }
        }
    }
}

/// Concatenate the text nodes directly below an element
fn direct_text(handle: &Handle) -> String {
    let mut text = String::new();
    for child in handle.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

fn build_selector(parent: &str, tag: &str, attributes: &[(String, String)], nth: usize) -> String {
    let find = |name: &str| {
        attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty() && !v.contains(char::is_whitespace))
    };

    if let Some(id) = find("id") {
        return format!("{}#{}", tag, id);
    }

    let segment = if let Some(name) = find("name") {
        format!("{}[name=\"{}\"]", tag, name)
    } else if nth > 1 {
        format!("{}:nth-of-type({})", tag, nth)
    } else {
        tag.to_string()
    };

    if parent.is_empty() {
        segment
    } else {
        format!("{} > {}", parent, segment)
    }
}

/// Truncate string on a char boundary
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
