// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response header rules: transport and content hardening, CORS,
//! clickjacking and permissions policy.
//!
//! Hosts that cannot observe response headers (Cypress, WebDriver) yield no
//! findings here instead of reporting every header as missing.

use super::{without_headers, CspAnalyzer, ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::Snapshot;

/// Six months, the usual preload floor
const MIN_HSTS_MAX_AGE: u64 = 15_552_000;

/// Features that should never be delegated to every origin
const SENSITIVE_FEATURES: &[&str] = &[
    "camera",
    "microphone",
    "geolocation",
    "payment",
    "usb",
    "display-capture",
    "serial",
];

fn missing_header(snapshot: &Snapshot, name: &str, message: &str) -> RuleOutcome {
    if without_headers(snapshot) || snapshot.header(name).is_some() {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(message, ElementRef::header(name, None))])
}

fn missing_hsts(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot) || !snapshot.is_https() {
        return Ok(Vec::new());
    }

    let Some(value) = snapshot.header("strict-transport-security") else {
        return Ok(vec![Finding::new(
            "HTTPS page without Strict-Transport-Security",
            ElementRef::header("strict-transport-security", None),
        )]);
    };

    let max_age = value
        .split(';')
        .filter_map(|d| d.trim().split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("max-age"))
        .and_then(|(_, v)| v.trim().trim_matches('"').parse::<u64>().ok());

    match max_age {
        Some(age) if age >= MIN_HSTS_MAX_AGE => Ok(Vec::new()),
        Some(age) => Ok(vec![Finding::new(
            format!("HSTS max-age {} is shorter than {} seconds", age, MIN_HSTS_MAX_AGE),
            ElementRef::header("strict-transport-security", Some(value)),
        )]),
        None => Ok(vec![Finding::new(
            "Strict-Transport-Security has no valid max-age",
            ElementRef::header("strict-transport-security", Some(value)),
        )]),
    }
}

fn missing_nosniff(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot) {
        return Ok(Vec::new());
    }
    match snapshot.header("x-content-type-options") {
        Some(v) if v.trim().eq_ignore_ascii_case("nosniff") => Ok(Vec::new()),
        Some(v) => Ok(vec![Finding::new(
            format!("X-Content-Type-Options is '{}' instead of 'nosniff'", v),
            ElementRef::header("x-content-type-options", Some(v)),
        )]),
        None => Ok(vec![Finding::new(
            "Missing X-Content-Type-Options: nosniff",
            ElementRef::header("x-content-type-options", None),
        )]),
    }
}

fn missing_x_frame_options(snapshot: &Snapshot) -> RuleOutcome {
    missing_header(snapshot, "x-frame-options", "Missing X-Frame-Options header")
}

/// Referrer policy from the header, falling back to `<meta name="referrer">`
fn referrer_policy(snapshot: &Snapshot) -> Option<(String, ElementRef)> {
    if let Some(value) = snapshot.header("referrer-policy") {
        return Some((value.to_string(), ElementRef::header("referrer-policy", Some(value))));
    }
    snapshot
        .elements_by_tag("meta")
        .find(|m| m.attr("name").map_or(false, |n| n.eq_ignore_ascii_case("referrer")))
        .and_then(|m| m.attr("content").map(|c| (c.to_string(), ElementRef::element(m))))
}

fn missing_referrer_policy(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot) || referrer_policy(snapshot).is_some() {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        "No Referrer-Policy header or meta tag",
        ElementRef::header("referrer-policy", None),
    )])
}

fn unsafe_referrer_policy(snapshot: &Snapshot) -> RuleOutcome {
    let Some((value, element)) = referrer_policy(snapshot) else {
        return Ok(Vec::new());
    };

    // The last recognised token wins
    let effective = value
        .split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .last()
        .unwrap_or_default();

    if effective == "unsafe-url" || effective == "no-referrer-when-downgrade" {
        Ok(vec![Finding::new(
            format!("Referrer-Policy '{}' leaks full URLs to other origins", effective),
            element,
        )])
    } else {
        Ok(Vec::new())
    }
}

fn server_version_disclosure(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot) {
        return Ok(Vec::new());
    }

    let findings = ["server", "x-powered-by", "x-aspnet-version", "x-aspnetmvc-version"]
        .iter()
        .filter_map(|name| snapshot.header(name).map(|v| (*name, v)))
        .filter(|(_, v)| v.chars().any(|c| c.is_ascii_digit()))
        .map(|(name, v)| {
            Finding::new(
                format!("{} header discloses software version '{}'", name, v),
                ElementRef::header(name, Some(v)),
            )
        })
        .collect();

    Ok(findings)
}

fn allow_origin(snapshot: &Snapshot) -> Option<&str> {
    snapshot.header("access-control-allow-origin").map(str::trim)
}

fn cors_wildcard(snapshot: &Snapshot) -> RuleOutcome {
    match allow_origin(snapshot) {
        Some("*") => Ok(vec![Finding::new(
            "Access-Control-Allow-Origin: * lets any site read this response",
            ElementRef::header("access-control-allow-origin", Some("*")),
        )]),
        _ => Ok(Vec::new()),
    }
}

fn cors_null(snapshot: &Snapshot) -> RuleOutcome {
    match allow_origin(snapshot) {
        Some(v) if v.eq_ignore_ascii_case("null") => Ok(vec![Finding::new(
            "Access-Control-Allow-Origin: null is reachable from sandboxed iframes and data: URLs",
            ElementRef::header("access-control-allow-origin", Some(v)),
        )]),
        _ => Ok(Vec::new()),
    }
}

fn cors_credentials_wildcard(snapshot: &Snapshot) -> RuleOutcome {
    let credentials = snapshot
        .header("access-control-allow-credentials")
        .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"));

    match allow_origin(snapshot) {
        Some(origin) if credentials && (origin == "*" || origin.eq_ignore_ascii_case("null")) => {
            Ok(vec![Finding::new(
                format!("Credentials allowed together with Access-Control-Allow-Origin: {}", origin),
                ElementRef::header("access-control-allow-credentials", Some("true")),
            )])
        }
        _ => Ok(Vec::new()),
    }
}

fn has_frame_ancestors(snapshot: &Snapshot) -> bool {
    // frame-ancestors is ignored in meta tags and report-only policies
    snapshot
        .header("content-security-policy")
        .map(|policy| CspAnalyzer::new().parse(policy))
        .map_or(false, |a| a.directives.contains_key("frame-ancestors"))
}

fn no_frame_protection(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot)
        || snapshot.header("x-frame-options").is_some()
        || has_frame_ancestors(snapshot)
    {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        "Page can be framed: no X-Frame-Options and no CSP frame-ancestors",
        ElementRef::header("x-frame-options", None),
    )])
}

fn invalid_x_frame_options(snapshot: &Snapshot) -> RuleOutcome {
    let Some(value) = snapshot.header("x-frame-options") else {
        return Ok(Vec::new());
    };

    let normalized = value.trim().to_ascii_uppercase();
    if normalized == "DENY" || normalized == "SAMEORIGIN" {
        return Ok(Vec::new());
    }

    let message = if normalized.starts_with("ALLOW-FROM") {
        "X-Frame-Options ALLOW-FROM is ignored by modern browsers".to_string()
    } else {
        format!("X-Frame-Options value '{}' is not DENY or SAMEORIGIN", value)
    };
    Ok(vec![Finding::new(message, ElementRef::header("x-frame-options", Some(value)))])
}

fn permissions_policy(snapshot: &Snapshot) -> Option<(&'static str, &str)> {
    snapshot
        .header("permissions-policy")
        .map(|v| ("permissions-policy", v))
        .or_else(|| snapshot.header("feature-policy").map(|v| ("feature-policy", v)))
}

fn missing_permissions_policy(snapshot: &Snapshot) -> RuleOutcome {
    if without_headers(snapshot) || permissions_policy(snapshot).is_some() {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        "No Permissions-Policy header restricts powerful browser features",
        ElementRef::header("permissions-policy", None),
    )])
}

fn permissive_permissions_policy(snapshot: &Snapshot) -> RuleOutcome {
    let Some((name, value)) = permissions_policy(snapshot) else {
        return Ok(Vec::new());
    };

    let mut findings = Vec::new();
    for directive in value.split([',', ';']) {
        let directive = directive.trim();
        // Permissions-Policy: camera=*    Feature-Policy: camera *
        let (feature, allowlist) = match directive.split_once('=') {
            Some((f, a)) => (f.trim(), a.trim()),
            None => match directive.split_once(' ') {
                Some((f, a)) => (f.trim(), a.trim()),
                None => continue,
            },
        };

        let feature = feature.to_ascii_lowercase();
        if SENSITIVE_FEATURES.contains(&feature.as_str())
            && allowlist.split_whitespace().any(|t| t.trim_matches(['(', ')']) == "*")
        {
            findings.push(Finding::new(
                format!("'{}' is delegated to every origin", feature),
                ElementRef::header(name, Some(directive)),
            ));
        }
    }
    Ok(findings)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "missing-hsts",
            name: "Missing or weak HSTS",
            category: RuleCategory::Headers,
            severity: Severity::High,
            description: "HTTPS responses should set Strict-Transport-Security with a long max-age",
            cwe: Some(319),
            evaluate: missing_hsts,
        },
        Rule {
            id: "missing-x-content-type-options",
            name: "Missing X-Content-Type-Options",
            category: RuleCategory::Headers,
            severity: Severity::Medium,
            description: "Responses should disable MIME sniffing with X-Content-Type-Options: nosniff",
            cwe: Some(693),
            evaluate: missing_nosniff,
        },
        Rule {
            id: "missing-x-frame-options",
            name: "Missing X-Frame-Options",
            category: RuleCategory::Headers,
            severity: Severity::Medium,
            description: "Responses should set X-Frame-Options",
            cwe: Some(1021),
            evaluate: missing_x_frame_options,
        },
        Rule {
            id: "missing-referrer-policy",
            name: "Missing Referrer-Policy",
            category: RuleCategory::Headers,
            severity: Severity::Low,
            description: "A Referrer-Policy limits URL leakage to other origins",
            cwe: Some(200),
            evaluate: missing_referrer_policy,
        },
        Rule {
            id: "unsafe-referrer-policy",
            name: "Unsafe Referrer-Policy",
            category: RuleCategory::Headers,
            severity: Severity::Low,
            description: "unsafe-url and no-referrer-when-downgrade send full URLs cross-origin",
            cwe: Some(200),
            evaluate: unsafe_referrer_policy,
        },
        Rule {
            id: "server-version-disclosure",
            name: "Server version disclosure",
            category: RuleCategory::Headers,
            severity: Severity::Info,
            description: "Server and X-Powered-By headers reveal software versions",
            cwe: Some(200),
            evaluate: server_version_disclosure,
        },
        Rule {
            id: "cors-wildcard-origin",
            name: "CORS wildcard origin",
            category: RuleCategory::Cors,
            severity: Severity::Medium,
            description: "Access-Control-Allow-Origin: * exposes the response to every origin",
            cwe: Some(942),
            evaluate: cors_wildcard,
        },
        Rule {
            id: "cors-null-origin",
            name: "CORS null origin",
            category: RuleCategory::Cors,
            severity: Severity::High,
            description: "Trusting the null origin lets sandboxed documents read the response",
            cwe: Some(942),
            evaluate: cors_null,
        },
        Rule {
            id: "cors-credentials-with-wildcard",
            name: "CORS credentials with wildcard",
            category: RuleCategory::Cors,
            severity: Severity::High,
            description: "Credentialed CORS must name explicit origins",
            cwe: Some(942),
            evaluate: cors_credentials_wildcard,
        },
        Rule {
            id: "clickjacking-no-frame-protection",
            name: "No clickjacking protection",
            category: RuleCategory::Clickjacking,
            severity: Severity::High,
            description: "Neither X-Frame-Options nor CSP frame-ancestors prevents framing",
            cwe: Some(1021),
            evaluate: no_frame_protection,
        },
        Rule {
            id: "invalid-x-frame-options",
            name: "Invalid X-Frame-Options",
            category: RuleCategory::Clickjacking,
            severity: Severity::Low,
            description: "X-Frame-Options must be DENY or SAMEORIGIN to be honoured",
            cwe: Some(1021),
            evaluate: invalid_x_frame_options,
        },
        Rule {
            id: "missing-permissions-policy",
            name: "Missing Permissions-Policy",
            category: RuleCategory::PermissionsPolicy,
            severity: Severity::Low,
            description: "A Permissions-Policy restricts camera, microphone, geolocation and similar APIs",
            cwe: None,
            evaluate: missing_permissions_policy,
        },
        Rule {
            id: "permissive-permissions-policy",
            name: "Permissive Permissions-Policy",
            category: RuleCategory::PermissionsPolicy,
            severity: Severity::Medium,
            description: "Sensitive features are delegated to every origin",
            cwe: None,
            evaluate: permissive_permissions_policy,
        },
    ]
}
