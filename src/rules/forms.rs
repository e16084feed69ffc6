// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Form submission rules

use lazy_static::lazy_static;
use regex::Regex;

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{ElementInfo, Snapshot};

lazy_static! {
    static ref CSRF_FIELD: Regex =
        Regex::new(r"(?i)(csrf|xsrf|_token|authenticity|requestverificationtoken|nonce)").unwrap();
}

/// Effective submission method (GET when absent or unknown)
fn method(form: &ElementInfo) -> String {
    match form.attr("method").map(|m| m.trim().to_ascii_lowercase()) {
        Some(m) if m == "post" || m == "dialog" => m,
        _ => "get".to_string(),
    }
}

fn inputs<'a>(snapshot: &'a Snapshot, form: &'a ElementInfo) -> impl Iterator<Item = &'a ElementInfo> + 'a {
    snapshot.descendants(form.index).filter(|e| e.tag == "input")
}

fn input_type(input: &ElementInfo) -> String {
    input.attr("type").unwrap_or("text").trim().to_ascii_lowercase()
}

fn has_password(snapshot: &Snapshot, form: &ElementInfo) -> bool {
    inputs(snapshot, form).any(|i| input_type(i) == "password")
}

fn action_insecure(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for form in snapshot.forms() {
        let action = form.attr("action").unwrap_or("");
        let target = if action.trim().is_empty() {
            snapshot.parsed_url().cloned()
        } else {
            snapshot.resolve(action)
        };
        let Some(target) = target else {
            continue;
        };

        if target.scheme() != "http" {
            continue;
        }

        if snapshot.is_https() {
            findings.push(Finding::new(
                format!("Form on HTTPS page submits to insecure {}", target),
                ElementRef::element(form),
            ));
        } else if has_password(snapshot, form) {
            findings.push(Finding::new(
                "Password form is submitted over plain HTTP",
                ElementRef::element(form),
            ));
        }
    }

    Ok(findings)
}

fn password_in_get(snapshot: &Snapshot) -> RuleOutcome {
    Ok(snapshot
        .elements_by_tag("form")
        .filter(|f| method(f) == "get" && has_password(snapshot, f))
        .map(|f| {
            Finding::new(
                "Password form uses GET, credentials end up in URLs and logs",
                ElementRef::element(f),
            )
        })
        .collect())
}

fn password_autocomplete(snapshot: &Snapshot) -> RuleOutcome {
    let findings = snapshot
        .elements_by_tag("input")
        .filter(|i| input_type(i) == "password")
        .filter(|i| {
            let own = i.attr("autocomplete").map(|v| v.trim().to_ascii_lowercase());
            let form = snapshot
                .closest(i.index, "form")
                .and_then(|f| f.attr("autocomplete"))
                .map(|v| v.trim().to_ascii_lowercase());
            match own.or(form).as_deref() {
                Some("off") | Some("new-password") | Some("current-password") => false,
                _ => true,
            }
        })
        .map(|i| {
            Finding::new(
                "Password field allows generic autocomplete",
                ElementRef::element(i),
            )
        })
        .collect();
    Ok(findings)
}

fn missing_csrf_token(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for form in snapshot.forms().filter(|f| method(f) == "post") {
        // Cross-origin posts carry someone else's tokens
        if form.attr("action").map_or(false, |a| snapshot.is_cross_origin(a)) {
            continue;
        }

        let has_token = inputs(snapshot, form).any(|i| {
            input_type(i) == "hidden"
                && i.name().map_or(false, |n| CSRF_FIELD.is_match(n))
        });

        if !has_token {
            findings.push(Finding::new(
                "POST form without an anti-CSRF token field",
                ElementRef::element(form),
            ));
        }
    }

    Ok(findings)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "form-action-insecure",
            name: "Insecure form action",
            category: RuleCategory::Forms,
            severity: Severity::High,
            description: "Forms must not submit data over plain HTTP",
            cwe: Some(319),
            evaluate: action_insecure,
        },
        Rule {
            id: "password-in-get-form",
            name: "Password submitted with GET",
            category: RuleCategory::Forms,
            severity: Severity::High,
            description: "Forms with password fields must use POST",
            cwe: Some(598),
            evaluate: password_in_get,
        },
        Rule {
            id: "password-autocomplete-enabled",
            name: "Password autocomplete",
            category: RuleCategory::Forms,
            severity: Severity::Low,
            description: "Password fields should declare autocomplete=current-password, new-password or off",
            cwe: Some(522),
            evaluate: password_autocomplete,
        },
        Rule {
            id: "missing-csrf-token",
            name: "Missing CSRF token",
            category: RuleCategory::Forms,
            severity: Severity::Medium,
            description: "State-changing forms should carry an anti-CSRF token",
            cwe: Some(352),
            evaluate: missing_csrf_token,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotParts;

    fn page(url: &str, html: &str) -> Snapshot {
        Snapshot::new(SnapshotParts::new(url, html)).unwrap()
    }

    #[test]
    fn test_insecure_action() {
        let snap = page(
            "https://shop.example.com",
            r#"<form action="http://shop.example.com/buy" method="post"></form>
               <form action="/search"></form>"#,
        );
        assert_eq!(action_insecure(&snap).unwrap().len(), 1);

        let http = page(
            "http://shop.example.com",
            r#"<form method="post"><input type="password" name="pw"></form>"#,
        );
        assert_eq!(action_insecure(&http).unwrap().len(), 1);
    }

    #[test]
    fn test_password_get_default_method() {
        let snap = page(
            "https://a.com",
            r#"<form action="/login"><div><input type="PASSWORD"></div></form>
               <form action="/login" method="post"><input type="password"></form>"#,
        );
        let findings = password_in_get(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].element.context.as_deref().unwrap().contains("/login"));
    }

    #[test]
    fn test_autocomplete_inherits_from_form() {
        let snap = page(
            "https://a.com",
            r#"<form autocomplete="off"><input type="password"></form>
               <input type="password" autocomplete="new-password">
               <input type="password" id="pw">"#,
        );
        let findings = password_autocomplete(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].element.selector, "input#pw");
    }

    #[test]
    fn test_csrf_token() {
        let snap = page(
            "https://a.com",
            r#"<form id="ok" method="post"><input type="hidden" name="csrf_token" value="x"></form>
               <form id="bad" method="POST"><input name="q"></form>
               <form id="ext" method="post" action="https://payments.other.com/pay"></form>
               <form id="get"></form>"#,
        );
        let findings = missing_csrf_token(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].element.selector, "form#bad");
    }
}
