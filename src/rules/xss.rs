// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! XSS surface rules
//!
//! Static checks over the captured DOM and inline script bodies: inline
//! handlers, mutation XSS vectors, dangerous DOM sinks, string-to-code
//! APIs and URL parameters reflected into the page.

use lazy_static::lazy_static;
use regex::Regex;

use super::{ElementRef, Finding, Rule, RuleCategory, RuleOutcome, Severity};
use crate::snapshot::{truncate, ElementInfo, ElementNamespace, Snapshot};

/// Types of DOM sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkType {
    Eval,
    FunctionConstructor,
    SetTimeoutString,
    SetIntervalString,
    DocumentWrite,
    InnerHtml,
    OuterHtml,
    InsertAdjacentHtml,
    LocationAssign,
    JQueryHtml,
    AngularBypassSecurity,
}

impl SinkType {
    /// Executes a string as code
    fn is_execution(&self) -> bool {
        matches!(
            self,
            SinkType::Eval
                | SinkType::FunctionConstructor
                | SinkType::SetTimeoutString
                | SinkType::SetIntervalString
        )
    }

    fn description(&self) -> &'static str {
        match self {
            SinkType::Eval => "eval()",
            SinkType::FunctionConstructor => "new Function()",
            SinkType::SetTimeoutString => "setTimeout with a string",
            SinkType::SetIntervalString => "setInterval with a string",
            SinkType::DocumentWrite => "document.write()",
            SinkType::InnerHtml => "innerHTML assignment",
            SinkType::OuterHtml => "outerHTML assignment",
            SinkType::InsertAdjacentHtml => "insertAdjacentHTML()",
            SinkType::LocationAssign => "location assignment",
            SinkType::JQueryHtml => "jQuery .html()/.append()",
            SinkType::AngularBypassSecurity => "Angular bypassSecurityTrust*",
        }
    }
}

lazy_static! {
    static ref SINKS: Vec<(SinkType, Regex)> = [
        (SinkType::Eval, r"\beval\s*\("),
        (SinkType::FunctionConstructor, r"\bnew\s+Function\s*\("),
        (SinkType::SetTimeoutString, r#"\bsetTimeout\s*\(\s*['"`]"#),
        (SinkType::SetIntervalString, r#"\bsetInterval\s*\(\s*['"`]"#),
        (SinkType::DocumentWrite, r"\bdocument\.writeln?\s*\("),
        (SinkType::InnerHtml, r"\.innerHTML\s*\+?=[^=]"),
        (SinkType::OuterHtml, r"\.outerHTML\s*=[^=]"),
        (SinkType::InsertAdjacentHtml, r"\.insertAdjacentHTML\s*\("),
        (SinkType::LocationAssign, r"\blocation(\.href)?\s*=[^=]|\blocation\.(replace|assign)\s*\("),
        (SinkType::JQueryHtml, r"\$\([^)]*\)\.(html|append|prepend|after|before)\s*\(\s*[^)\s]"),
        (SinkType::AngularBypassSecurity, r"bypassSecurityTrust\w*\s*\("),
    ]
    .into_iter()
    .map(|(sink, pattern)| (sink, Regex::new(pattern).unwrap()))
    .collect();

    /// Attacker-controllable sources
    static ref SOURCES: Regex = Regex::new(
        r"location\.(hash|search|href|pathname)|document\.(referrer|URL|documentURI|cookie)|window\.name|(local|session)Storage\.|\.data\b"
    )
    .unwrap();

    static ref RAW_TEXT_MARKUP: Regex =
        Regex::new(r"(?i)<\s*/?\s*(img|script|svg|iframe|style|math)\b|\bon[a-z]+\s*=").unwrap();

    static ref ATTR_BREAKOUT: Regex =
        Regex::new(r"(?i)</\s*(style|noscript|title|textarea|xmp|noembed|noframes|iframe|script|template)").unwrap();
}

/// HTML raw-text tags that change parsing in foreign content
const NAMESPACE_CONFUSION_TAGS: &[&str] = &[
    "style", "title", "textarea", "noscript", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Raw-text elements whose content is re-parsed when serialized
const RAW_TEXT_TAGS: &[&str] = &["noscript", "textarea", "title", "xmp", "noembed", "noframes", "iframe"];

/// Script types that hold data, not code
fn is_executable_script(script: &ElementInfo) -> bool {
    match script.attr("type").map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "module" | "text/javascript" | "application/javascript" | "text/ecmascript" | "application/ecmascript"
        ),
    }
}

fn event_handlers(element: &ElementInfo) -> impl Iterator<Item = &(String, String)> {
    element
        .attributes
        .iter()
        .filter(|(name, _)| name.len() > 2 && name.starts_with("on"))
}

/// Inline code: executable script bodies and event handler attributes
fn inline_code(snapshot: &Snapshot) -> Vec<(&ElementInfo, &str)> {
    let mut code = Vec::new();
    for element in snapshot.elements() {
        if element.tag == "script"
            && !element.has_attr("src")
            && is_executable_script(element)
            && !element.text.trim().is_empty()
        {
            code.push((element, element.text.as_str()));
        }
        for (_, value) in event_handlers(element) {
            code.push((element, value.as_str()));
        }
    }
    code
}

/// Code snippet around a match, on one line
fn snippet(code: &str, start: usize) -> String {
    let line_start = code[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = code[start..].find('\n').map_or(code.len(), |i| start + i);
    truncate(code[line_start..line_end].trim(), 120)
}

/// Whether a source appears near a match
fn source_near(code: &str, start: usize, end: usize) -> Option<String> {
    let mut from = start.saturating_sub(100);
    while !code.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + 100).min(code.len());
    while !code.is_char_boundary(to) {
        to += 1;
    }
    SOURCES.find(&code[from..to]).map(|m| m.as_str().to_string())
}

fn sink_findings(snapshot: &Snapshot, execution: bool) -> RuleOutcome {
    let mut findings = Vec::new();

    for (element, code) in inline_code(snapshot) {
        for (sink, pattern) in SINKS.iter().filter(|(s, _)| s.is_execution() == execution) {
            for m in pattern.find_iter(code) {
                let message = match source_near(code, m.start(), m.end()) {
                    Some(source) => format!("{} fed from {}", sink.description(), source),
                    None => format!("{} in inline code", sink.description()),
                };
                findings.push(Finding::new(
                    message,
                    ElementRef {
                        selector: element.selector.clone(),
                        context: Some(snippet(code, m.start())),
                    },
                ));
            }
        }
    }

    Ok(findings)
}

fn inline_event_handlers(snapshot: &Snapshot) -> RuleOutcome {
    Ok(snapshot
        .elements()
        .iter()
        .filter_map(|e| {
            let names: Vec<&str> = event_handlers(e).map(|(n, _)| n.as_str()).collect();
            (!names.is_empty()).then(|| {
                Finding::new(
                    format!("Inline event handler {} on <{}>", names.join(", "), e.tag),
                    ElementRef::element(e),
                )
            })
        })
        .collect())
}

fn inline_scripts(snapshot: &Snapshot) -> RuleOutcome {
    Ok(snapshot
        .elements_by_tag("script")
        .filter(|s| !s.has_attr("src") && !s.has_attr("nonce") && is_executable_script(s))
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| {
            Finding::new(
                "Inline script without a CSP nonce",
                ElementRef {
                    selector: s.selector.clone(),
                    context: Some(truncate(s.text.trim(), 120)),
                },
            )
        })
        .collect())
}

fn mutation_xss(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = Vec::new();

    for element in snapshot.elements() {
        if element.namespace != ElementNamespace::Html
            && NAMESPACE_CONFUSION_TAGS.contains(&element.tag.as_str())
        {
            findings.push(Finding::new(
                format!("<{}> inside {:?} content causes namespace confusion", element.tag, element.namespace),
                ElementRef::element(element),
            ));
        }

        if element.namespace == ElementNamespace::Html
            && RAW_TEXT_TAGS.contains(&element.tag.as_str())
            && RAW_TEXT_MARKUP.is_match(&element.text)
        {
            findings.push(Finding::new(
                format!("<{}> raw text contains markup that re-parses on serialization", element.tag),
                ElementRef {
                    selector: element.selector.clone(),
                    context: Some(truncate(&element.text, 120)),
                },
            ));
        }

        for (name, value) in &element.attributes {
            if ATTR_BREAKOUT.is_match(value) {
                findings.push(Finding::new(
                    format!("Attribute '{}' contains a closing raw-text tag", name),
                    ElementRef::element(element),
                ));
            }
        }
    }

    Ok(findings)
}

fn unsafe_dom_sink(snapshot: &Snapshot) -> RuleOutcome {
    let mut findings = sink_findings(snapshot, false)?;

    // Framework bindings that render raw HTML
    for element in snapshot.elements() {
        if element.has_attr("v-html") || element.has_attr("ng-bind-html") || element.has_attr("[innerhtml]") {
            findings.push(Finding::new(
                "Template binding renders raw HTML",
                ElementRef::element(element),
            ));
        }
    }

    Ok(findings)
}

fn eval_usage(snapshot: &Snapshot) -> RuleOutcome {
    sink_findings(snapshot, true)
}

fn reflected_url_parameter(snapshot: &Snapshot) -> RuleOutcome {
    let Some(url) = snapshot.parsed_url() else {
        return Ok(Vec::new());
    };

    let scripts: Vec<&str> = inline_code(snapshot).into_iter().map(|(_, c)| c).collect();
    let mut findings = Vec::new();

    for (name, value) in url.query_pairs() {
        let value = value.trim();
        if value.len() < 4 {
            continue;
        }

        let has_markup = value.contains(['<', '>', '"', '\'']);
        let message = if has_markup && snapshot.html().contains(value) {
            format!("URL parameter '{}' is reflected without HTML encoding", name)
        } else if scripts.iter().any(|code| code.contains(value)) {
            format!("URL parameter '{}' is reflected into inline script", name)
        } else {
            continue;
        };

        findings.push(Finding::new(
            message,
            ElementRef::document(Some(truncate(value, 120))),
        ));
    }

    Ok(findings)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "inline-event-handlers",
            name: "Inline event handlers",
            category: RuleCategory::InlineHandlers,
            severity: Severity::Medium,
            description: "on* attributes execute inline code and defeat a strict CSP",
            cwe: Some(79),
            evaluate: inline_event_handlers,
        },
        Rule {
            id: "inline-scripts",
            name: "Inline scripts",
            category: RuleCategory::InlineHandlers,
            severity: Severity::Low,
            description: "Inline scripts without a nonce require 'unsafe-inline'",
            cwe: Some(79),
            evaluate: inline_scripts,
        },
        Rule {
            id: "mutation-xss-vector",
            name: "Mutation XSS vector",
            category: RuleCategory::MutationXss,
            severity: Severity::High,
            description: "Markup that changes meaning when the DOM is serialized and re-parsed",
            cwe: Some(79),
            evaluate: mutation_xss,
        },
        Rule {
            id: "unsafe-dom-sink",
            name: "Unsafe DOM sink",
            category: RuleCategory::HtmlInjection,
            severity: Severity::High,
            description: "Inline code writes HTML or navigates through injection-prone sinks",
            cwe: Some(79),
            evaluate: unsafe_dom_sink,
        },
        Rule {
            id: "eval-usage",
            name: "Dynamic code evaluation",
            category: RuleCategory::HtmlInjection,
            severity: Severity::Medium,
            description: "eval, new Function and string timers execute strings as code",
            cwe: Some(95),
            evaluate: eval_usage,
        },
        Rule {
            id: "reflected-url-parameter",
            name: "Reflected URL parameter",
            category: RuleCategory::HtmlInjection,
            severity: Severity::High,
            description: "Query parameter values appear unencoded in the page",
            cwe: Some(79),
            evaluate: reflected_url_parameter,
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
    fn test_inline_handlers() {
        let snap = page(
            "https://a.com",
            r#"<button id="b" onclick="go()" onmouseover="x()">Go</button><div class="one"></div>"#,
        );
        let findings = inline_event_handlers(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("onclick, onmouseover"));
        assert_eq!(findings[0].element.selector, "button#b");
    }

    #[test]
    fn test_inline_scripts_skip_data_and_nonce() {
        let snap = page(
            "https://a.com",
            r#"<script>init();</script>
               <script nonce="abc">init();</script>
               <script type="application/ld+json">{"a":1}</script>
               <script src="/app.js"></script>"#,
        );
        assert_eq!(inline_scripts(&snap).unwrap().len(), 1);
    }

    #[test]
    fn test_sink_detection() {
        let snap = page(
            "https://a.com",
            r#"<script>
                var userInput = location.hash.slice(1);
                document.getElementById('output').innerHTML = userInput;
                if (a.innerHTML == b) {}
            </script>"#,
        );
        let findings = unsafe_dom_sink(&snap).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("location.hash"));
        assert!(findings[0].element.context.as_deref().unwrap().contains("innerHTML"));
        assert!(eval_usage(&snap).unwrap().is_empty());
    }

    #[test]
    fn test_eval_in_handler() {
        let snap = page(
            "https://a.com",
            r##"<a href="#" onclick="eval(this.dataset.code)">x</a>
               <script>setTimeout("tick()", 10); setTimeout(tick, 10);</script>"##,
        );
        assert_eq!(eval_usage(&snap).unwrap().len(), 2);
    }

    #[test]
    fn test_framework_binding() {
        let snap = page("https://a.com", r#"<div v-html="comment.body"></div>"#);
        assert_eq!(unsafe_dom_sink(&snap).unwrap().len(), 1);
    }

    #[test]
    fn test_mutation_vectors() {
        let snap = page(
            "https://a.com",
            r#"<svg><style>&lt;img src=x onerror=alert(1)&gt;</style></svg>
               <div title="</noscript><img src=x>"></div>
               <p>plain</p>"#,
        );
        let findings = mutation_xss(&snap).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("Svg"));
        assert!(findings[1].message.contains("title"));
    }

    #[test]
    fn test_reflected_parameter() {
        let snap = page(
            "https://a.com/search?q=%3Cb%3Ehello%3C%2Fb%3E&id=42&term=widget",
            r#"<p>Results for <b>hello</b></p><script>var term = "widget";</script>"#,
        );
        let findings = reflected_url_parameter(&snap).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("'q'"));
        assert!(findings[1].message.contains("inline script"));
    }
}
