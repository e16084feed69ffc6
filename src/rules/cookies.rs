// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie flag rules

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{Cookie, SameSite, Snapshot};

fn cookie_findings(snapshot: &Snapshot, check: impl Fn(&Cookie) -> Option<String>) -> RuleOutcome {
    Ok(snapshot
        .cookies()
        .iter()
        .filter_map(|c| check(c).map(|msg| Finding::new(msg, ElementRef::cookie(&c.name))))
        .collect())
}

fn without_secure(snapshot: &Snapshot) -> RuleOutcome {
    // Unknown flags (document.cookie) are not reported
    cookie_findings(snapshot, |c| match c.secure {
        Some(false) => Some(format!("Cookie '{}' is sent over plain HTTP (no Secure flag)", c.name)),
        _ => None,
    })
}

fn without_http_only(snapshot: &Snapshot) -> RuleOutcome {
    cookie_findings(snapshot, |c| {
        (!c.http_only && c.is_session_like())
            .then(|| format!("Session cookie '{}' is readable from JavaScript (no HttpOnly)", c.name))
    })
}

fn without_samesite(snapshot: &Snapshot) -> RuleOutcome {
    // Attributes are unknown when the host only sees document.cookie
    cookie_findings(snapshot, |c| {
        (c.secure.is_some() && c.same_site.is_none())
            .then(|| format!("Cookie '{}' has no SameSite attribute", c.name))
    })
}

fn samesite_none_insecure(snapshot: &Snapshot) -> RuleOutcome {
    cookie_findings(snapshot, |c| {
        (c.same_site == Some(SameSite::None) && c.secure == Some(false))
            .then(|| format!("Cookie '{}' uses SameSite=None without Secure", c.name))
    })
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "cookie-without-secure",
            name: "Cookie without Secure",
            category: RuleCategory::Cookies,
            severity: Severity::Medium,
            description: "Cookies should carry the Secure flag so they never travel over HTTP",
            cwe: Some(614),
            evaluate: without_secure,
        },
        Rule {
            id: "insecure-cookie-httponly",
            name: "Session cookie without HttpOnly",
            category: RuleCategory::Cookies,
            severity: Severity::High,
            description: "Session and auth cookies should be hidden from scripts with HttpOnly",
            cwe: Some(1004),
            evaluate: without_http_only,
        },
        Rule {
            id: "cookie-without-samesite",
            name: "Cookie without SameSite",
            category: RuleCategory::Cookies,
            severity: Severity::Low,
            description: "An explicit SameSite attribute limits cross-site request forgery",
            cwe: Some(1275),
            evaluate: without_samesite,
        },
        Rule {
            id: "cookie-samesite-none-insecure",
            name: "SameSite=None without Secure",
            category: RuleCategory::Cookies,
            severity: Severity::Medium,
            description: "SameSite=None cookies must also be Secure",
            cwe: Some(1275),
            evaluate: samesite_none_insecure,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotParts;
    use url::Url;

    fn page(cookies: Vec<Cookie>) -> Snapshot {
        Snapshot::new(SnapshotParts::new("https://example.com", "").cookies(cookies)).unwrap()
    }

    #[test]
    fn test_secure_flag() {
        let snap = page(vec![
            Cookie::new("theme", "dark"),
            Cookie::new("sid", "1").secure(true).http_only(true).same_site(SameSite::Lax),
        ]);
        let findings = without_secure(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].element.selector, "cookie:theme");
    }

    #[test]
    fn test_http_only_only_for_session_cookies() {
        let snap = page(vec![Cookie::new("theme", "dark"), Cookie::new("auth_token", "x")]);
        let findings = without_http_only(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("auth_token"));
    }

    #[test]
    fn test_document_cookie_flags_unknown() {
        let url = Url::parse("https://example.com").unwrap();
        let snap = page(Cookie::from_document_cookie("sessionid=abc; theme=dark", &url));

        assert!(without_secure(&snap).unwrap().is_empty());
        assert!(without_samesite(&snap).unwrap().is_empty());
        // Visible in document.cookie means HttpOnly is definitely absent
        assert_eq!(without_http_only(&snap).unwrap().len(), 1);
    }

    #[test]
    fn test_samesite_none_insecure() {
        let snap = page(vec![
            Cookie::new("a", "1").same_site(SameSite::None),
            Cookie::new("b", "1").secure(true).same_site(SameSite::None),
        ]);
        assert_eq!(samesite_none_insecure(&snap).unwrap().len(), 1);
        assert!(without_samesite(&snap).unwrap().is_empty());
    }
}
