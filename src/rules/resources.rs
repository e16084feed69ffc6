// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Subresource Integrity (SRI) and third-party script rules

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{ElementInfo, Snapshot};

/// More distinct script origins than this is flagged
const MAX_THIRD_PARTY_ORIGINS: usize = 5;

lazy_static! {
    static ref SRI_TOKEN: Regex =
        Regex::new(r"^(sha256|sha384|sha512)-[A-Za-z0-9+/]+={0,2}(\?.*)?$").unwrap();
}

/// SRI hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SriAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl SriAlgorithm {
    fn parse(token: &str) -> Option<Self> {
        let caps = SRI_TOKEN.captures(token)?;
        match &caps[1] {
            "sha256" => Some(SriAlgorithm::Sha256),
            "sha384" => Some(SriAlgorithm::Sha384),
            "sha512" => Some(SriAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// Strongest valid algorithm in an integrity value; browsers use that one
fn strongest(integrity: &str) -> Option<SriAlgorithm> {
    integrity.split_whitespace().filter_map(SriAlgorithm::parse).max()
}

/// External scripts and stylesheets loaded from another origin
fn cross_origin_resources(snapshot: &Snapshot) -> impl Iterator<Item = (&ElementInfo, &str)> + '_ {
    snapshot.elements().iter().filter_map(move |e| {
        let url = match e.tag.as_str() {
            "script" => e.attr("src"),
            "link" => {
                let rel = e.attr("rel").unwrap_or("").to_ascii_lowercase();
                let loads_code = rel
                    .split_whitespace()
                    .any(|r| r == "stylesheet" || r == "modulepreload");
                e.attr("href").filter(|_| loads_code)
            }
            _ => None,
        }?;
        snapshot.is_cross_origin(url).then_some((e, url))
    })
}

fn missing_sri(snapshot: &Snapshot) -> RuleOutcome {
    Ok(cross_origin_resources(snapshot)
        .filter(|(e, _)| e.attr("integrity").map_or(true, |i| i.trim().is_empty()))
        .map(|(e, url)| {
            Finding::new(
                format!("Third-party {} without integrity: {}", kind(e), url),
                ElementRef::element(e),
            )
        })
        .collect())
}

fn weak_sri(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for element in snapshot.elements().iter().filter(|e| e.tag == "script" || e.tag == "link") {
        let Some(integrity) = element.attr("integrity").filter(|i| !i.trim().is_empty()) else {
            continue;
        };

        match strongest(integrity) {
            Some(SriAlgorithm::Sha384) | Some(SriAlgorithm::Sha512) => {}
            Some(SriAlgorithm::Sha256) => findings.push(Finding::new(
                "Integrity uses sha256 only; sha384 or sha512 is recommended",
                ElementRef::element(element),
            )),
            None => findings.push(Finding::new(
                format!("Integrity value '{}' is not a valid SRI hash", integrity),
                ElementRef::element(element),
            )),
        }
    }

    Ok(findings)
}

fn sri_missing_crossorigin(snapshot: &Snapshot) -> RuleOutcome {
    Ok(cross_origin_resources(snapshot)
        .filter(|(e, _)| e.has_attr("integrity") && !e.has_attr("crossorigin"))
        .map(|(e, url)| {
            Finding::new(
                format!("{} has integrity but no crossorigin attribute, so it will fail to load", url),
                ElementRef::element(e),
            )
        })
        .collect())
}

fn kind(element: &ElementInfo) -> &'static str {
    if element.tag == "script" {
        "script"
    } else {
        "stylesheet"
    }
}

fn third_party_script(snapshot: &Snapshot) -> RuleOutcome {
    Ok(snapshot
        .scripts()
        .iter()
        .filter_map(|s| s.src.as_deref().map(|src| (s, src)))
        .filter(|(_, src)| snapshot.is_cross_origin(src))
        .filter_map(|(s, src)| {
            let element = snapshot.element(s.element)?;
            let host = snapshot.resolve(src)?.host_str()?.to_string();
            Some(Finding::new(
                format!("Script loaded from third party {}", host),
                ElementRef::element(element),
            ))
        })
        .collect())
}

fn excessive_third_party(snapshot: &Snapshot) -> RuleOutcome {
    let origins: BTreeSet<String> = snapshot
        .scripts()
        .iter()
        .filter_map(|s| s.src.as_deref())
        .filter(|src| snapshot.is_cross_origin(src))
        .filter_map(|src| snapshot.resolve(src))
        .map(|u| u.origin().ascii_serialization())
        .collect();

    if origins.len() <= MAX_THIRD_PARTY_ORIGINS {
        return Ok(Vec::new());
    }

    let list: Vec<&str> = origins.iter().map(String::as_str).collect();
    Ok(vec![Finding::new(
        format!(
            "Scripts load from {} third-party origins (limit {})",
            origins.len(),
            MAX_THIRD_PARTY_ORIGINS
        ),
        ElementRef::document(Some(crate::snapshot::truncate(&list.join(", "), 200))),
    )])
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "missing-sri-attribute",
            name: "Missing Subresource Integrity",
            category: RuleCategory::Sri,
            severity: Severity::Medium,
            description: "Third-party scripts and stylesheets should pin their content with integrity",
            cwe: Some(353),
            evaluate: missing_sri,
        },
        Rule {
            id: "weak-sri-algorithm",
            name: "Weak or invalid SRI hash",
            category: RuleCategory::Sri,
            severity: Severity::Low,
            description: "Integrity hashes should use sha384 or sha512",
            cwe: Some(328),
            evaluate: weak_sri,
        },
        Rule {
            id: "sri-missing-crossorigin",
            name: "SRI without crossorigin",
            category: RuleCategory::Sri,
            severity: Severity::Low,
            description: "Cross-origin resources with integrity need a crossorigin attribute",
            cwe: Some(353),
            evaluate: sri_missing_crossorigin,
        },
        Rule {
            id: "third-party-script",
            name: "Third-party script",
            category: RuleCategory::ThirdParty,
            severity: Severity::Info,
            description: "Inventory of scripts executing with the page's privileges from other origins",
            cwe: Some(829),
            evaluate: third_party_script,
        },
        Rule {
            id: "excessive-third-party-origins",
            name: "Excessive third-party origins",
            category: RuleCategory::ThirdParty,
            severity: Severity::Medium,
            description: "Many script origins widen the supply-chain attack surface",
            cwe: Some(829),
            evaluate: excessive_third_party,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotParts;

    fn page(html: &str) -> Snapshot {
        Snapshot::new(SnapshotParts::new("https://example.com", html)).unwrap()
    }

    #[test]
    fn test_missing_integrity() {
        let snap = page(
            r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/jquery/3.6.0/jquery.min.js"></script>
               <script src="/js/app.js"></script>
               <link rel="stylesheet" href="https://fonts.example.net/f.css">"#,
        );
        let findings = missing_sri(&snap).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings[1].message.starts_with("Third-party stylesheet"));
    }

    #[test]
    fn test_with_integrity() {
        let snap = page(
            r#"<script src="https://cdnjs.cloudflare.com/jquery.min.js"
                integrity="sha384-oqVuAfXRKap7fdgcCY5uykM6+R9GqQ8K/uxy9rx7HNQlGYl1kPzQho1wx4JwY8wC"
                crossorigin="anonymous"></script>"#,
        );
        assert!(missing_sri(&snap).unwrap().is_empty());
        assert!(weak_sri(&snap).unwrap().is_empty());
        assert!(sri_missing_crossorigin(&snap).unwrap().is_empty());
    }

    #[test]
    fn test_weak_and_invalid_hash() {
        let snap = page(
            r#"<script src="https://cdn.a.net/a.js" integrity="sha256-abc="></script>
               <script src="https://cdn.a.net/b.js" integrity="md5-abc" crossorigin></script>
               <script src="https://cdn.a.net/c.js" integrity="sha256-abc= sha512-def" crossorigin></script>"#,
        );
        let findings = weak_sri(&snap).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings[1].message.contains("md5-abc"));
        assert_eq!(sri_missing_crossorigin(&snap).unwrap().len(), 1);
    }

    #[test]
    fn test_third_party_origins() {
        let scripts: String = (0..7)
            .map(|i| format!(r#"<script src="https://cdn{}.example.org/x.js"></script>"#, i))
            .collect();
        let snap = page(&scripts);

        assert_eq!(third_party_script(&snap).unwrap().len(), 7);
        let findings = excessive_third_party(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("7 third-party origins"));

        let few = page(r#"<script src="https://cdn.a.org/x.js"></script><script src="https://cdn.a.org/y.js"></script>"#);
        assert!(excessive_third_party(&few).unwrap().is_empty());
    }
}
