// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Page snapshots
//!
//! A [`Snapshot`] is the immutable capture of one page state: URL, parsed
//! DOM, response headers (when the host exposes them), cookies and the
//! script inventory. Every rule reads from it and nothing writes to it
//! after construction.

mod cookie;
mod parser;

pub use cookie::{Cookie, SameSite};
pub use parser::{parse_html, ElementInfo, ElementNamespace, ParsedDocument};
pub(crate) use parser::truncate;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::error::Result;

/// Raw material handed over by an adapter
#[derive(Debug, Clone, Default)]
pub struct SnapshotParts {
    /// Current page URL
    pub url: String,
    /// Serialized DOM
    pub html: String,
    /// Main response headers, `None` when the host cannot see them
    pub headers: Option<HashMap<String, String>>,
    /// Cookies visible to the host
    pub cookies: Vec<Cookie>,
}

impl SnapshotParts {
    /// Create parts from URL and HTML
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    /// Attach response headers
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a single response header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Attach cookies
    pub fn cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// A script element found in the page
#[derive(Debug, Clone, Serialize)]
pub struct ScriptInfo {
    /// Index of the `<script>` element
    pub element: usize,
    /// External source, if any
    pub src: Option<String>,
    /// Inline body (empty for external scripts)
    pub content: String,
    /// `integrity` attribute
    pub integrity: Option<String>,
    /// `crossorigin` attribute present
    pub crossorigin: bool,
    /// Selector of the element
    pub selector: String,
}

impl ScriptInfo {
    /// Inline script with a body
    pub fn is_inline(&self) -> bool {
        self.src.is_none()
    }
}

/// Where the effective CSP came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CspSource {
    Header,
    ReportOnlyHeader,
    MetaTag,
}

/// Immutable capture of one page state
#[derive(Debug, Clone)]
pub struct Snapshot {
    url: String,
    parsed_url: Option<Url>,
    html: String,
    elements: Vec<ElementInfo>,
    comments: Vec<String>,
    headers: BTreeMap<String, String>,
    headers_available: bool,
    cookies: Vec<Cookie>,
    scripts: Vec<ScriptInfo>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, parsing the HTML once
    pub fn new(parts: SnapshotParts) -> Result<Self> {
        let ParsedDocument { elements, comments } = parse_html(&parts.html)?;

        let headers_available = parts.headers.is_some();
        let headers = parts
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        let scripts = elements
            .iter()
            .filter(|e| e.tag == "script")
            .map(|e| ScriptInfo {
                element: e.index,
                src: e.attr("src").map(str::to_string).filter(|s| !s.trim().is_empty()),
                content: e.text.clone(),
                integrity: e.attr("integrity").map(str::to_string),
                crossorigin: e.has_attr("crossorigin"),
                selector: e.selector.clone(),
            })
            .collect();

        Ok(Self {
            parsed_url: Url::parse(&parts.url).ok(),
            url: parts.url,
            html: parts.html,
            elements,
            comments,
            headers,
            headers_available,
            cookies: parts.cookies,
            scripts,
            captured_at: Utc::now(),
        })
    }

    /// Page URL as captured
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parsed page URL, if valid
    pub fn parsed_url(&self) -> Option<&Url> {
        self.parsed_url.as_ref()
    }

    /// Whether the page was served over HTTPS
    pub fn is_https(&self) -> bool {
        self.parsed_url.as_ref().map_or(false, |u| u.scheme() == "https")
    }

    /// Raw HTML
    pub fn html(&self) -> &str {
        &self.html
    }

    /// All elements in document order
    pub fn elements(&self) -> &[ElementInfo] {
        &self.elements
    }

    /// Element by index
    pub fn element(&self, index: usize) -> Option<&ElementInfo> {
        self.elements.get(index)
    }

    /// Elements with the given tag name
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ElementInfo> + 'a {
        self.elements.iter().filter(move |e| e.tag == tag)
    }

    /// Ancestors of an element, nearest first
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = &ElementInfo> + '_ {
        let mut next = self.elements.get(index).and_then(|e| e.parent);
        std::iter::from_fn(move || {
            let current = self.elements.get(next?)?;
            next = current.parent;
            Some(current)
        })
    }

    /// Nearest ancestor with the given tag
    pub fn closest(&self, index: usize, tag: &str) -> Option<&ElementInfo> {
        self.ancestors(index).find(|e| e.tag == tag)
    }

    /// Elements nested anywhere below `index`
    pub fn descendants(&self, index: usize) -> impl Iterator<Item = &ElementInfo> + '_ {
        // elements are in document order, so a subtree is contiguous and
        // ends at the first element whose parent precedes `index`
        self.elements
            .iter()
            .skip(index + 1)
            .take_while(move |e| e.parent.map_or(false, |p| p >= index))
    }

    /// HTML comments
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Whether response headers were available to the adapter
    pub fn headers_available(&self) -> bool {
        self.headers_available
    }

    /// All response headers (lower-case names)
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Cookies visible to the host
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Script inventory
    pub fn scripts(&self) -> &[ScriptInfo] {
        &self.scripts
    }

    /// Inline script bodies
    pub fn inline_scripts(&self) -> impl Iterator<Item = &ScriptInfo> {
        self.scripts.iter().filter(|s| s.is_inline() && !s.content.trim().is_empty())
    }

    /// `<link rel="stylesheet">` elements
    pub fn stylesheets(&self) -> impl Iterator<Item = &ElementInfo> {
        self.elements_by_tag("link").filter(|l| {
            l.attr("rel").map_or(false, |rel| {
                rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet"))
            })
        })
    }

    /// `<form>` elements
    pub fn forms(&self) -> impl Iterator<Item = &ElementInfo> {
        self.elements_by_tag("form")
    }

    /// Capture time
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Effective CSP: enforced header, then meta tag, then report-only header
    pub fn csp(&self) -> Option<(String, CspSource)> {
        if let Some(policy) = self.header("content-security-policy") {
            return Some((policy.to_string(), CspSource::Header));
        }

        let meta = self.elements_by_tag("meta").find(|m| {
            m.attr("http-equiv")
                .map_or(false, |v| v.trim().eq_ignore_ascii_case("content-security-policy"))
        });
        if let Some(content) = meta.and_then(|m| m.attr("content")) {
            return Some((content.to_string(), CspSource::MetaTag));
        }

        self.header("content-security-policy-report-only")
            .map(|p| (p.to_string(), CspSource::ReportOnlyHeader))
    }

    /// Resolve a (possibly relative) reference against the page URL
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        match &self.parsed_url {
            Some(base) => base.join(reference.trim()).ok(),
            None => Url::parse(reference.trim()).ok(),
        }
    }

    /// Whether a reference points at another origin
    pub fn is_cross_origin(&self, reference: &str) -> bool {
        match (self.parsed_url.as_ref(), self.resolve(reference)) {
            (Some(page), Some(target)) => {
                matches!(target.scheme(), "http" | "https") && target.origin() != page.origin()
            }
            _ => false,
        }
    }
}
