// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Link rules: javascript: URLs, insecure links, reverse tabnabbing and
//! mixed content.

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{ElementInfo, Snapshot};

/// (tag, attribute) pairs that load a subresource, and whether it is active content
const SUBRESOURCES: &[(&str, &str, bool)] = &[
    ("script", "src", true),
    ("iframe", "src", true),
    ("frame", "src", true),
    ("object", "data", true),
    ("embed", "src", true),
    ("link", "href", true),
    ("img", "src", false),
    ("audio", "src", false),
    ("video", "src", false),
    ("source", "src", false),
    ("track", "src", false),
];

/// Strip whitespace and control characters the URL parser ignores
fn normalize_url(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_javascript_url(value: &str) -> bool {
    normalize_url(value).starts_with("javascript:")
}

/// `javascript:void(0)` style placeholders that execute nothing
fn is_noop_javascript(value: &str) -> bool {
    matches!(
        normalize_url(value).as_str(),
        "javascript:" | "javascript:;" | "javascript:void(0)" | "javascript:void(0);" | "javascript:void0"
    )
}

fn javascript_url(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for element in snapshot.elements() {
        let attr = match element.tag.as_str() {
            "a" | "area" => "href",
            "iframe" => "src",
            "form" => "action",
            "button" | "input" => "formaction",
            _ => continue,
        };
        let Some(value) = element.attr(attr) else {
            continue;
        };
        if is_javascript_url(value) && !is_noop_javascript(value) {
            findings.push(Finding::new(
                format!("<{}> {} executes a javascript: URL", element.tag, attr),
                ElementRef::element(element),
            ));
        }
    }

    Ok(findings)
}

fn insecure_link(snapshot: &Snapshot) -> RuleOutcome {
    if !snapshot.is_https() {
        return Ok(Vec::new());
    }

    Ok(snapshot
        .elements()
        .iter()
        .filter(|e| e.tag == "a" || e.tag == "area")
        .filter(|e| e.attr("href").map_or(false, |h| normalize_url(h).starts_with("http://")))
        .map(|e| Finding::new("Link points to an insecure http:// URL", ElementRef::element(e)))
        .collect())
}

fn opens_new_context(element: &ElementInfo) -> bool {
    element.attr("target").map_or(false, |t| {
        let t = t.trim().to_ascii_lowercase();
        !t.is_empty() && t != "_self" && t != "_parent" && t != "_top"
    })
}

fn missing_noopener(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for element in snapshot.elements() {
        let target_attr = match element.tag.as_str() {
            "a" | "area" => "href",
            "form" => "action",
            _ => continue,
        };
        if !opens_new_context(element) {
            continue;
        }
        let Some(href) = element.attr(target_attr) else {
            continue;
        };
        if !snapshot.is_cross_origin(href) {
            continue;
        }

        let rel = element.attr("rel").unwrap_or("").to_ascii_lowercase();
        let protected = rel
            .split_whitespace()
            .any(|r| r == "noopener" || r == "noreferrer");
        if !protected {
            findings.push(Finding::new(
                "Cross-origin link opens a new window without rel=\"noopener\"",
                ElementRef::element(element),
            ));
        }
    }

    Ok(findings)
}

fn mixed_content(snapshot: &Snapshot) -> RuleOutcome {
    if !snapshot.is_https() {
        return Ok(Vec::new());
    }

    let mut findings = Vec::new();
    for element in snapshot.elements() {
        let Some(&(_, attr, active)) = SUBRESOURCES.iter().find(|(tag, _, _)| *tag == element.tag) else {
            continue;
        };

        if element.tag == "link" {
            let rel = element.attr("rel").unwrap_or("").to_ascii_lowercase();
            if !rel.split_whitespace().any(|r| matches!(r, "stylesheet" | "icon" | "preload" | "modulepreload" | "manifest")) {
                continue;
            }
        }

        let Some(value) = element.attr(attr) else {
            continue;
        };
        if normalize_url(value).starts_with("http://") {
            let kind = if active { "Active" } else { "Passive" };
            findings.push(Finding::new(
                format!("{} mixed content: <{}> loads {} over HTTP", kind, element.tag, value.trim()),
                ElementRef::element(element),
            ));
        }
    }

    Ok(findings)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "javascript-url-link",
            name: "javascript: URL",
            category: RuleCategory::Links,
            severity: Severity::Medium,
            description: "Links and frames should not execute javascript: URLs",
            cwe: Some(79),
            evaluate: javascript_url,
        },
        Rule {
            id: "insecure-link",
            name: "Insecure link",
            category: RuleCategory::Links,
            severity: Severity::Low,
            description: "HTTPS pages should not link to http:// URLs",
            cwe: Some(319),
            evaluate: insecure_link,
        },
        Rule {
            id: "missing-noopener",
            name: "Reverse tabnabbing",
            category: RuleCategory::Tabnabbing,
            severity: Severity::Medium,
            description: "Cross-origin links opened in a new window need rel=\"noopener\"",
            cwe: Some(1022),
            evaluate: missing_noopener,
        },
        Rule {
            id: "mixed-content",
            name: "Mixed content",
            category: RuleCategory::MixedContent,
            severity: Severity::High,
            description: "HTTPS pages must not load subresources over HTTP",
            cwe: Some(319),
            evaluate: mixed_content,
        },
    ]
}
