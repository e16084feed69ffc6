// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Content Security Policy (CSP) analysis
//!
//! Parses the effective policy (header, meta tag or report-only header)
//! and reports the weaknesses that let injected script run anyway.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{without_headers, ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{CspSource, Snapshot};

/// CSP analysis result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CspAnalysis {
    /// Raw CSP policy string
    pub policy: String,
    /// Parsed directives (first occurrence wins, as in browsers)
    pub directives: BTreeMap<String, Vec<String>>,
    /// Identified weaknesses
    pub issues: Vec<CspIssue>,
    /// Whether CSP would block inline scripts
    pub blocks_inline: bool,
    /// Whether CSP would block eval
    pub blocks_eval: bool,
}

/// CSP weakness
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CspIssue {
    /// 'unsafe-inline' allows inline scripts
    UnsafeInline,
    /// 'unsafe-eval' allows eval()
    UnsafeEval,
    /// data: URI allowed for scripts
    DataUri,
    /// Wildcard or bare scheme in a script/object source list
    WildcardSource(String),
    /// Whitelisted CDN hosting script gadgets
    CdnBypass(String),
    /// Missing base-uri allows base tag injection
    MissingBaseUri,
    /// Neither object-src nor default-src
    UnrestrictedObjectSrc,
    /// Nonce/hash with unsafe-inline (nonce wins)
    NonceWithUnsafeInline,
}

impl CspIssue {
    /// Get description
    pub fn description(&self) -> String {
        match self {
            CspIssue::UnsafeInline => "'unsafe-inline' allows arbitrary inline scripts".to_string(),
            CspIssue::UnsafeEval => "'unsafe-eval' allows eval() and similar".to_string(),
            CspIssue::DataUri => "data: URIs can be used to inject scripts".to_string(),
            CspIssue::WildcardSource(src) => format!("Source '{}' allows scripts from many origins", src),
            CspIssue::CdnBypass(cdn) => format!("Allowed CDN {} hosts script gadgets that bypass CSP", cdn),
            CspIssue::MissingBaseUri => "Missing base-uri allows <base> tag hijacking".to_string(),
            CspIssue::UnrestrictedObjectSrc => "object-src not restricted, allows plugin content".to_string(),
            CspIssue::NonceWithUnsafeInline => {
                "Nonce present with 'unsafe-inline' (ignored by modern browsers)".to_string()
            }
        }
    }
}

/// CSP analyzer
pub struct CspAnalyzer {
    /// CDNs known to host CSP bypass gadgets
    bypass_cdns: HashSet<&'static str>,
}

impl Default for CspAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CspAnalyzer {
    /// Create new analyzer
    pub fn new() -> Self {
        let bypass_cdns = [
            "cdnjs.cloudflare.com",
            "cdn.jsdelivr.net",
            "unpkg.com",
            "ajax.googleapis.com",
            "code.jquery.com",
            "stackpath.bootstrapcdn.com",
            "maxcdn.bootstrapcdn.com",
        ]
        .into_iter()
        .collect();

        Self { bypass_cdns }
    }

    /// Parse a policy string
    pub fn parse(&self, csp: &str) -> CspAnalysis {
        let mut analysis = CspAnalysis {
            policy: csp.to_string(),
            ..Default::default()
        };

        for directive in csp.split(';') {
            let mut parts = directive.split_whitespace();
            let Some(name) = parts.next() else {
                continue;
            };
            let name = name.to_ascii_lowercase();
            let values: Vec<String> = parts.map(str::to_string).collect();
            analysis.directives.entry(name).or_insert(values);
        }

        self.check_script_sources(&mut analysis);
        self.check_missing(&mut analysis);

        analysis.blocks_inline = blocks_inline(&analysis);
        analysis.blocks_eval = blocks_eval(&analysis);

        analysis
    }

    fn check_script_sources(&self, analysis: &mut CspAnalysis) {
        let Some(values) = script_sources(analysis).cloned() else {
            return;
        };

        let has_nonce_or_hash = values.iter().any(|v| is_nonce_or_hash(v));
        for value in &values {
            let lower = value.to_ascii_lowercase();
            match lower.as_str() {
                "'unsafe-inline'" if has_nonce_or_hash => {
                    analysis.issues.push(CspIssue::NonceWithUnsafeInline)
                }
                "'unsafe-inline'" => analysis.issues.push(CspIssue::UnsafeInline),
                "'unsafe-eval'" => analysis.issues.push(CspIssue::UnsafeEval),
                "data:" => analysis.issues.push(CspIssue::DataUri),
                "*" | "http:" | "https:" => {
                    analysis.issues.push(CspIssue::WildcardSource(value.clone()))
                }
                _ => {
                    if lower.contains('*') {
                        analysis.issues.push(CspIssue::WildcardSource(value.clone()));
                    }
                    if let Some(cdn) = self.bypass_cdns.iter().find(|cdn| lower.contains(**cdn)) {
                        analysis.issues.push(CspIssue::CdnBypass(cdn.to_string()));
                    }
                }
            }
        }
    }

    fn check_missing(&self, analysis: &mut CspAnalysis) {
        if !analysis.directives.contains_key("base-uri") {
            analysis.issues.push(CspIssue::MissingBaseUri);
        }

        if !analysis.directives.contains_key("object-src")
            && !analysis.directives.contains_key("default-src")
        {
            analysis.issues.push(CspIssue::UnrestrictedObjectSrc);
        }
    }
}

fn script_sources(analysis: &CspAnalysis) -> Option<&Vec<String>> {
    analysis
        .directives
        .get("script-src")
        .or_else(|| analysis.directives.get("default-src"))
}

fn is_nonce_or_hash(value: &str) -> bool {
    let v = value.to_ascii_lowercase();
    v.starts_with("'nonce-") || v.starts_with("'sha256-") || v.starts_with("'sha384-") || v.starts_with("'sha512-")
}

fn blocks_inline(analysis: &CspAnalysis) -> bool {
    match script_sources(analysis) {
        Some(values) => {
            if values.iter().any(|v| v.eq_ignore_ascii_case("'unsafe-inline'")) {
                // Nonce/hash takes precedence over unsafe-inline
                values.iter().any(|v| is_nonce_or_hash(v))
            } else {
                true
            }
        }
        // No script-src or default-src means everything is allowed
        None => false,
    }
}

fn blocks_eval(analysis: &CspAnalysis) -> bool {
    match script_sources(analysis) {
        Some(values) => !values.iter().any(|v| v.eq_ignore_ascii_case("'unsafe-eval'")),
        None => false,
    }
}

/// Analysis of the enforced policy, skipping report-only policies
fn enforced_policy(snapshot: &Snapshot) -> Option<(CspAnalysis, CspSource)> {
    match snapshot.csp() {
        Some((_, CspSource::ReportOnlyHeader)) | None => None,
        Some((policy, source)) => Some((CspAnalyzer::new().parse(&policy), source)),
    }
}

fn policy_ref(source: CspSource, policy: &str) -> ElementRef {
    match source {
        CspSource::MetaTag => ElementRef {
            selector: "meta[http-equiv=\"Content-Security-Policy\"]".to_string(),
            context: Some(crate::snapshot::truncate(policy, 200)),
        },
        CspSource::Header => ElementRef::header("content-security-policy", Some(policy)),
        CspSource::ReportOnlyHeader => {
            ElementRef::header("content-security-policy-report-only", Some(policy))
        }
    }
}

fn issue_findings(snapshot: &Snapshot, pick: fn(&CspIssue) -> bool) -> RuleOutcome {
    let Some((analysis, source)) = enforced_policy(snapshot) else {
        return Ok(Vec::new());
    };

    Ok(analysis
        .issues
        .iter()
        .filter(|issue| pick(issue))
        .map(|issue| Finding::new(issue.description(), policy_ref(source, &analysis.policy)))
        .collect())
}

fn missing_csp(snapshot: &Snapshot) -> RuleOutcome {
    match snapshot.csp() {
        // a report-only policy is reported by csp-report-only
        Some(_) => Ok(Vec::new()),
        None if without_headers(snapshot) => Ok(Vec::new()),
        None => Ok(vec![Finding::new(
            "No Content-Security-Policy header or meta tag",
            ElementRef::header("content-security-policy", None),
        )]),
    }
}

fn unsafe_inline(snapshot: &Snapshot) -> RuleOutcome {
    issue_findings(snapshot, |i| matches!(i, CspIssue::UnsafeInline))
}

fn unsafe_eval(snapshot: &Snapshot) -> RuleOutcome {
    issue_findings(snapshot, |i| matches!(i, CspIssue::UnsafeEval))
}

fn wildcard_source(snapshot: &Snapshot) -> RuleOutcome {
    issue_findings(snapshot, |i| {
        matches!(i, CspIssue::WildcardSource(_) | CspIssue::CdnBypass(_) | CspIssue::DataUri)
    })
}

fn missing_object_src(snapshot: &Snapshot) -> RuleOutcome {
    issue_findings(snapshot, |i| matches!(i, CspIssue::UnrestrictedObjectSrc))
}

fn missing_base_uri(snapshot: &Snapshot) -> RuleOutcome {
    issue_findings(snapshot, |i| matches!(i, CspIssue::MissingBaseUri))
}

fn report_only(snapshot: &Snapshot) -> RuleOutcome {
    let enforced = snapshot.header("content-security-policy").is_some();
    match snapshot.header("content-security-policy-report-only") {
        Some(policy) if !enforced => Ok(vec![Finding::new(
            "Content-Security-Policy-Report-Only is not enforced by browsers",
            ElementRef::header("content-security-policy-report-only", Some(policy)),
        )]),
        _ => Ok(Vec::new()),
    }
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "missing-csp-header",
            name: "Missing Content-Security-Policy",
            category: RuleCategory::Csp,
            severity: Severity::High,
            description: "The page sets no enforced Content-Security-Policy",
            cwe: Some(693),
            evaluate: missing_csp,
        },
        Rule {
            id: "csp-unsafe-inline",
            name: "CSP allows unsafe-inline",
            category: RuleCategory::Csp,
            severity: Severity::High,
            description: "script-src permits inline scripts without nonce or hash",
            cwe: Some(79),
            evaluate: unsafe_inline,
        },
        Rule {
            id: "csp-unsafe-eval",
            name: "CSP allows unsafe-eval",
            category: RuleCategory::Csp,
            severity: Severity::Medium,
            description: "script-src permits eval() and string-to-code APIs",
            cwe: Some(95),
            evaluate: unsafe_eval,
        },
        Rule {
            id: "csp-wildcard-source",
            name: "CSP wildcard or bypassable source",
            category: RuleCategory::Csp,
            severity: Severity::Medium,
            description: "script-src allows wildcards, bare schemes, data: or gadget-hosting CDNs",
            cwe: Some(693),
            evaluate: wildcard_source,
        },
        Rule {
            id: "csp-missing-object-src",
            name: "CSP without object-src",
            category: RuleCategory::Csp,
            severity: Severity::Low,
            description: "Neither object-src nor default-src restricts plugin content",
            cwe: Some(693),
            evaluate: missing_object_src,
        },
        Rule {
            id: "csp-missing-base-uri",
            name: "CSP without base-uri",
            category: RuleCategory::Csp,
            severity: Severity::Low,
            description: "base-uri is not restricted, so injected <base> tags can redirect relative scripts",
            cwe: Some(693),
            evaluate: missing_base_uri,
        },
        Rule {
            id: "csp-report-only",
            name: "CSP in report-only mode",
            category: RuleCategory::Csp,
            severity: Severity::Medium,
            description: "The policy is only reported, never enforced",
            cwe: Some(693),
            evaluate: report_only,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotParts;

    fn with_csp(policy: &str) -> Snapshot {
        Snapshot::new(
            SnapshotParts::new("https://example.com", "<p>x</p>")
                .header("Content-Security-Policy", policy),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_csp() {
        let analyzer = CspAnalyzer::new();
        let analysis = analyzer.parse("default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self'");

        assert!(analysis.issues.contains(&CspIssue::UnsafeInline));
        assert!(!analysis.blocks_inline);
        assert!(analysis.blocks_eval);
    }

    #[test]
    fn test_nonce_with_unsafe_inline() {
        let analysis = CspAnalyzer::new().parse("script-src 'nonce-abc123' 'unsafe-inline'");

        assert!(analysis.issues.contains(&CspIssue::NonceWithUnsafeInline));
        assert!(!analysis.issues.contains(&CspIssue::UnsafeInline));
        assert!(analysis.blocks_inline);
    }

    #[test]
    fn test_cdn_bypass() {
        let analysis = CspAnalyzer::new().parse("script-src 'self' https://cdnjs.cloudflare.com; base-uri 'none'");
        assert!(analysis
            .issues
            .contains(&CspIssue::CdnBypass("cdnjs.cloudflare.com".to_string())));
        assert!(!analysis.issues.contains(&CspIssue::MissingBaseUri));
    }

    #[test]
    fn test_missing_csp_rule() {
        let snap = Snapshot::new(
            SnapshotParts::new("https://example.com", "<p>x</p>").headers(Default::default()),
        )
        .unwrap();
        assert_eq!(missing_csp(&snap).unwrap().len(), 1);

        let no_headers = Snapshot::new(SnapshotParts::new("https://example.com", "<p>x</p>")).unwrap();
        assert!(missing_csp(&no_headers).unwrap().is_empty());
    }

    #[test]
    fn test_meta_csp_counts() {
        let snap = Snapshot::new(
            SnapshotParts::new(
                "https://example.com",
                r#"<meta http-equiv="content-security-policy" content="script-src * 'unsafe-eval'">"#,
            )
            .headers(Default::default()),
        )
        .unwrap();

        assert!(missing_csp(&snap).unwrap().is_empty());
        assert_eq!(unsafe_eval(&snap).unwrap().len(), 1);
        let wildcard = wildcard_source(&snap).unwrap();
        assert_eq!(wildcard.len(), 1);
        assert!(wildcard[0].element.selector.starts_with("meta"));
    }

    #[test]
    fn test_strict_policy_is_clean() {
        let snap = with_csp("default-src 'none'; script-src 'self' 'nonce-r4nd0m'; base-uri 'self'; object-src 'none'");
        for rule in rules() {
            assert!(rule.run(&snap).unwrap().is_empty(), "{} fired", rule.id);
        }
    }

    #[test]
    fn test_report_only() {
        let snap = Snapshot::new(
            SnapshotParts::new("https://example.com", "")
                .header("content-security-policy-report-only", "default-src 'self'"),
        )
        .unwrap();

        assert_eq!(report_only(&snap).unwrap().len(), 1);
        assert!(missing_csp(&snap).unwrap().is_empty());
        // report-only policies are not analysed as if enforced
        assert!(missing_base_uri(&snap).unwrap().is_empty());

        let fired: Vec<&str> = rules()
            .iter()
            .filter(|rule| !rule.run(&snap).unwrap().is_empty())
            .map(|rule| rule.id)
            .collect();
        assert_eq!(fired, vec!["csp-report-only"]);
    }
}
