// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM clobbering and prototype pollution vectors
//!
//! Named elements become properties of `window`, `document` and their
//! parent form. Markup that shadows built-ins lets injected HTML change
//! script behaviour without running any script itself.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{truncate, ElementInfo, Snapshot};

lazy_static! {
    static ref WINDOW_PROPERTIES: HashSet<&'static str> = [
        "location", "document", "alert", "confirm", "prompt",
        "open", "close", "print", "fetch", "XMLHttpRequest",
        "eval", "Function", "setTimeout", "setInterval",
        "localStorage", "sessionStorage", "indexedDB",
        "navigator", "history", "screen", "frames",
        "parent", "top", "self", "opener", "name",
    ]
    .into_iter()
    .collect();

    static ref DOCUMENT_PROPERTIES: HashSet<&'static str> = [
        "body", "head", "forms", "links", "images", "scripts",
        "cookie", "domain", "referrer", "URL", "location",
        "createElement", "getElementById", "querySelector",
        "write", "writeln", "defaultView", "currentScript",
    ]
    .into_iter()
    .collect();

    /// Names that application code commonly reads as globals
    static ref DANGEROUS_NAMES: HashSet<&'static str> = [
        "url", "href", "src", "action",
        "callback", "redirect", "next", "goto", "returnurl",
        "config", "settings", "options",
        "token", "auth", "session", "admin", "isadmin", "debug",
    ]
    .into_iter()
    .collect();

    static ref FORM_PROPERTIES: HashSet<&'static str> = [
        "action", "method", "target", "submit", "reset",
        "elements", "length", "encoding", "enctype",
        "attributes", "id", "name", "parentNode", "nodeName",
    ]
    .into_iter()
    .collect();

    static ref PROTO_KEY: Regex =
        Regex::new(r"(?i)__proto__|constructor\s*(\[|\.|%5b)\s*prototype").unwrap();
}

/// Tags whose `name` attribute is exposed on `document` (and `window`)
const NAMED_TAGS: &[&str] = &["form", "iframe", "embed", "object", "img"];

fn clobbered_global(identifier: &str) -> Option<String> {
    if WINDOW_PROPERTIES.contains(identifier) {
        Some(format!("window.{}", identifier))
    } else if DOCUMENT_PROPERTIES.contains(identifier) {
        Some(format!("document.{}", identifier))
    } else if DANGEROUS_NAMES.contains(identifier.to_ascii_lowercase().as_str()) {
        Some(format!("window.{}", identifier))
    } else {
        None
    }
}

fn global_findings(element: &ElementInfo) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(id) = element.id() {
        if let Some(target) = clobbered_global(id) {
            findings.push(Finding::new(
                format!("Element with id='{}' clobbers {}", id, target),
                ElementRef::element(element),
            ));
        }
    }

    if NAMED_TAGS.contains(&element.tag.as_str()) {
        if let Some(name) = element.name().filter(|n| Some(*n) != element.id()) {
            if let Some(target) = clobbered_global(name) {
                findings.push(Finding::new(
                    format!("<{}> with name='{}' clobbers {}", element.tag, name, target),
                    ElementRef::element(element),
                ));
            }
        }
    }

    findings
}

fn clobbering_global(snapshot: &Snapshot) -> RuleOutcome {
    Ok(snapshot.elements().iter().flat_map(global_findings).collect())
}

fn clobbering_form(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for form in snapshot.forms() {
        let controls = snapshot
            .descendants(form.index)
            .filter(|e| matches!(e.tag.as_str(), "input" | "button" | "select" | "textarea" | "fieldset" | "output" | "object"));

        for control in controls {
            for identifier in [control.name(), control.id()].into_iter().flatten() {
                if FORM_PROPERTIES.contains(identifier) {
                    findings.push(Finding::new(
                        format!("<{}> named '{}' clobbers form.{}", control.tag, identifier, identifier),
                        ElementRef::element(control),
                    ));
                    break;
                }
            }
        }
    }

    Ok(findings)
}

fn pollution_attribute(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for element in snapshot.elements() {
        for (name, value) in &element.attributes {
            let keyed = name == "id" || name == "name" || name.starts_with("data-");
            if !keyed {
                continue;
            }
            let value_lower = value.to_ascii_lowercase();
            let proto_name = ["__proto__", "constructor", "prototype"]
                .iter()
                .any(|p| value_lower.starts_with(p));
            if proto_name || PROTO_KEY.is_match(value) || PROTO_KEY.is_match(name) {
                findings.push(Finding::new(
                    format!("Attribute {}='{}' names a prototype property", name, truncate(value, 60)),
                    ElementRef::element(element),
                ));
            }
        }
    }

    Ok(findings)
}

fn pollution_url(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    if let Some(url) = snapshot.parsed_url() {
        let query_hit = url.query_pairs().any(|(k, _)| PROTO_KEY.is_match(&k));
        let fragment_hit = url.fragment().map_or(false, |f| PROTO_KEY.is_match(f));
        if query_hit || fragment_hit {
            findings.push(Finding::new(
                "Page URL carries a prototype pollution payload",
                ElementRef::document(Some(truncate(snapshot.url(), 200))),
            ));
        }
    }

    for element in snapshot.elements() {
        let attr = match element.tag.as_str() {
            "a" | "area" | "link" => "href",
            "form" => "action",
            "iframe" | "script" => "src",
            _ => continue,
        };
        if element.attr(attr).map_or(false, |v| PROTO_KEY.is_match(v)) {
            findings.push(Finding::new(
                format!("<{}> {} carries a prototype pollution key", element.tag, attr),
                ElementRef::element(element),
            ));
        }
    }

    Ok(findings)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "dom-clobbering-global",
            name: "DOM clobbering of globals",
            category: RuleCategory::DomClobbering,
            severity: Severity::Medium,
            description: "id and name attributes shadow window or document properties",
            cwe: Some(79),
            evaluate: clobbering_global,
        },
        Rule {
            id: "dom-clobbering-form",
            name: "Form property clobbering",
            category: RuleCategory::DomClobbering,
            severity: Severity::Medium,
            description: "Form controls named like form properties hijack form.action and friends",
            cwe: Some(79),
            evaluate: clobbering_form,
        },
        Rule {
            id: "prototype-pollution-attribute",
            name: "Prototype pollution via markup",
            category: RuleCategory::PrototypePollution,
            severity: Severity::High,
            description: "Attributes naming __proto__ or constructor.prototype feed object merges",
            cwe: Some(1321),
            evaluate: pollution_attribute,
        },
        Rule {
            id: "prototype-pollution-url",
            name: "Prototype pollution via URL",
            category: RuleCategory::PrototypePollution,
            severity: Severity::High,
            description: "URLs with __proto__ or constructor[prototype] keys",
            cwe: Some(1321),
            evaluate: pollution_url,
        },
    ]
}
