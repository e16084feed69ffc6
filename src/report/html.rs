// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML reporters
//!
//! Self-contained documents with inline CSS. The full report lists every
//! rule run grouped by category; the summary carries only counts and the
//! most severe findings.

use std::collections::BTreeMap;

use super::{escape_html, Reporter, TOOL_NAME};
use crate::error::Result;
use crate::results::{AuditResults, RuleRun, Violation};
use crate::rules::{RuleCategory, Severity};
use crate::VERSION;

/// Full HTML report
#[derive(Debug, Clone)]
pub struct HtmlReporter {
    pub title: String,
}

impl HtmlReporter {
    pub fn new() -> Self {
        Self {
            title: "QAstell Security Audit".to_string(),
        }
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render without tier checks
    pub fn render(&self, results: &AuditResults) -> String {
        let mut html = String::with_capacity(16 * 1024);
        let title = escape_html(&self.title);

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str(&format!("<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n", title, FULL_CSS));
        html.push_str(&format!("<div class=\"container\">\n<h1>{}</h1>\n", title));

        push_verdict(&mut html, results);
        push_metadata(&mut html, results);
        push_counts(&mut html, results);

        if results.skipped {
            html.push_str("<p class=\"skipped\">Audit skipped: daily scan quota exhausted.</p>\n");
        }

        let mut by_category: BTreeMap<RuleCategory, Vec<&RuleRun>> = BTreeMap::new();
        for run in &results.raw.results {
            by_category.entry(run.rule.category).or_default().push(run);
        }

        for (category, runs) in by_category {
            let count: usize = runs.iter().map(|r| r.violations.len()).sum();
            html.push_str(&format!(
                "<section class=\"category\">\n<h2>{} <span class=\"count\">{}</span></h2>\n",
                escape_html(category.as_str()),
                count
            ));

            let mut runs = runs;
            runs.sort_by(|a, b| {
                b.rule
                    .severity
                    .cmp(&a.rule.severity)
                    .then_with(|| a.rule.id.cmp(&b.rule.id))
            });

            for run in runs {
                push_rule(&mut html, run);
            }
            html.push_str("</section>\n");
        }

        html.push_str(&format!(
            "<footer>Generated by {} v{}</footer>\n</div>\n</body>\n</html>\n",
            TOOL_NAME,
            escape_html(VERSION)
        ));
        html
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for HtmlReporter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn generate(&self, results: &AuditResults) -> Result<String> {
        Ok(self.render(results))
    }
}

/// Compact HTML report
#[derive(Debug, Clone)]
pub struct SummaryHtmlReporter {
    /// How many findings to list
    pub top_n: usize,
}

impl SummaryHtmlReporter {
    pub fn new() -> Self {
        Self { top_n: 5 }
    }

    pub fn with_top_n(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Render without tier checks
    pub fn render(&self, results: &AuditResults) -> String {
        let mut html = String::with_capacity(2048);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str(&format!("<title>QAstell Summary</title>\n<style>{}</style>\n</head>\n<body>\n", SUMMARY_CSS));
        html.push_str(&format!(
            "<h1>QAstell Summary</h1>\n<p>{} &middot; {} finding(s) &middot; {} rule(s) &middot; {}</p>\n",
            escape_html(&results.raw.url),
            results.summary.total,
            results.summary.rules_run,
            if results.passed() { "PASSED" } else { "FAILED" }
        ));

        html.push_str("<p>");
        let counts: Vec<String> = Severity::ALL
            .iter()
            .map(|s| format!("{}: {}", s, results.summary.severity_count(*s)))
            .collect();
        html.push_str(&counts.join(" | "));
        html.push_str("</p>\n");

        let mut top: Vec<&Violation> = results.violations.iter().collect();
        top.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.rule_id.cmp(&b.rule_id)));
        if !top.is_empty() {
            html.push_str("<ol>\n");
            for violation in top.into_iter().take(self.top_n) {
                html.push_str(&format!(
                    "<li>[{}] {}</li>\n",
                    violation.severity,
                    escape_html(&violation.rule_id)
                ));
            }
            html.push_str("</ol>\n");
        }

        html.push_str(&format!("<footer>{} v{}</footer>\n</body>\n</html>\n", TOOL_NAME, escape_html(VERSION)));
        html
    }
}

impl Default for SummaryHtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for SummaryHtmlReporter {
    fn name(&self) -> &'static str {
        "summary-html"
    }

    fn generate(&self, results: &AuditResults) -> Result<String> {
        Ok(self.render(results))
    }
}

fn push_verdict(html: &mut String, results: &AuditResults) {
    let decision = results.decision();
    let (class, label) = if decision.passed {
        ("verdict pass", "PASSED")
    } else {
        ("verdict fail", "FAILED")
    };
    html.push_str(&format!(
        "<div class=\"{}\"><strong>{}</strong> &middot; {} finding(s), {} failing rule(s)</div>\n",
        class,
        label,
        results.summary.total,
        decision.failures.len()
    ));
}

fn push_metadata(html: &mut String, results: &AuditResults) {
    let rows = [
        ("URL", escape_html(&results.raw.url)),
        ("Framework", results.raw.framework.to_string()),
        ("License tier", results.tier.display_name().to_string()),
        ("Duration", format!("{} ms", results.raw.duration_ms)),
        ("Rules run", results.summary.rules_run.to_string()),
    ];

    html.push_str("<table class=\"meta\">\n");
    for (label, value) in rows {
        html.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>\n", label, value));
    }
    html.push_str(&format!(
        "<tr><th>Generated at</th><td class=\"generated-at\">{}</td></tr>\n",
        results.generated_at.to_rfc3339()
    ));
    html.push_str("</table>\n");
}

fn push_counts(html: &mut String, results: &AuditResults) {
    html.push_str("<div class=\"counts\">\n");
    for severity in Severity::ALL {
        html.push_str(&format!(
            "<div class=\"badge {}\"><span>{}</span>{}</div>\n",
            severity_class(severity),
            results.summary.severity_count(severity),
            severity
        ));
    }
    html.push_str("</div>\n");
}

fn push_rule(html: &mut String, run: &RuleRun) {
    let status = match (&run.error, run.violations.is_empty()) {
        (Some(_), _) => "error",
        (None, true) => "clean",
        (None, false) => "flagged",
    };

    html.push_str(&format!(
        "<div class=\"rule {}\">\n<h3><span class=\"sev {}\">{}</span> {} <code>{}</code></h3>\n<p class=\"desc\">{}</p>\n",
        status,
        severity_class(run.rule.severity),
        run.rule.severity,
        escape_html(&run.rule.name),
        escape_html(&run.rule.id),
        escape_html(&run.rule.description)
    ));

    if let Some(error) = &run.error {
        html.push_str(&format!("<p class=\"rule-error\">Evaluation error: {}</p>\n", escape_html(error)));
    }

    if !run.violations.is_empty() {
        html.push_str("<table class=\"violations\">\n<tr><th>Severity</th><th>Message</th><th>Element</th></tr>\n");
        for violation in &run.violations {
            let context = violation
                .element
                .context
                .as_deref()
                .map(|c| format!("<pre>{}</pre>", escape_html(c)))
                .unwrap_or_default();
            html.push_str(&format!(
                "<tr><td class=\"sev {}\">{}</td><td>{}</td><td><code>{}</code>{}</td></tr>\n",
                severity_class(violation.severity),
                violation.severity,
                escape_html(&violation.message),
                escape_html(&violation.element.selector),
                context
            ));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</div>\n");
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "sev-critical",
        Severity::High => "sev-high",
        Severity::Medium => "sev-medium",
        Severity::Low => "sev-low",
        Severity::Info => "sev-info",
    }
}

const FULL_CSS: &str = r#"* { box-sizing: border-box; }
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f5f6f8; color: #1f2328; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
h1 { margin-top: 0; }
.verdict { padding: 12px 16px; border-radius: 6px; margin-bottom: 16px; }
.verdict.pass { background: #dafbe1; border: 1px solid #2da44e; }
.verdict.fail { background: #ffebe9; border: 1px solid #cf222e; }
table { border-collapse: collapse; width: 100%; margin: 8px 0; background: #fff; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #d0d7de; vertical-align: top; }
.meta th { width: 160px; color: #57606a; }
.counts { display: flex; gap: 8px; margin: 16px 0; }
.badge { flex: 1; padding: 10px; border-radius: 6px; background: #fff; text-align: center; text-transform: capitalize; }
.badge span { display: block; font-size: 1.6em; font-weight: 600; }
.category { margin-top: 24px; }
.category h2 { text-transform: capitalize; border-bottom: 2px solid #d0d7de; padding-bottom: 4px; }
.count { font-size: 0.7em; background: #eaeef2; border-radius: 10px; padding: 2px 8px; }
.rule { background: #fff; border-left: 4px solid #d0d7de; margin: 8px 0; padding: 8px 12px; }
.rule.flagged { border-left-color: #cf222e; }
.rule.clean { border-left-color: #2da44e; }
.rule.error { border-left-color: #9a6700; }
.rule h3 { font-size: 1em; margin: 4px 0; }
.desc { color: #57606a; margin: 4px 0; }
.rule-error { color: #9a6700; }
.sev { font-weight: 600; text-transform: uppercase; font-size: 0.8em; }
.sev-critical { color: #82071e; }
.sev-high { color: #cf222e; }
.sev-medium { color: #9a6700; }
.sev-low { color: #0969da; }
.sev-info { color: #57606a; }
pre { white-space: pre-wrap; word-break: break-all; background: #f6f8fa; padding: 4px; margin: 4px 0 0; font-size: 0.85em; }
.skipped { background: #fff8c5; padding: 8px; border-radius: 6px; }
footer { margin-top: 32px; color: #57606a; font-size: 0.85em; }
"#;

const SUMMARY_CSS: &str = "body{font-family:sans-serif;margin:16px}li{margin:2px 0}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Framework;
    use crate::decision::ThresholdConfig;
    use crate::license::Tier;
    use crate::results::RawResults;
    use crate::rules::{ElementRef, RuleInfo};

    fn sample() -> AuditResults {
        let info = RuleInfo {
            id: "unsafe-dom-sink".to_string(),
            name: "Unsafe DOM sink".to_string(),
            category: RuleCategory::HtmlInjection,
            severity: Severity::High,
            description: "Writes to innerHTML".to_string(),
            cwe: Some(79),
        };
        let violations = (0..8)
            .map(|i| Violation {
                rule_id: info.id.clone(),
                rule_name: info.name.clone(),
                category: info.category,
                severity: info.severity,
                message: format!("<script>alert({})</script>", i),
                element: ElementRef {
                    selector: format!("div#out{}", i),
                    context: Some("<div onclick=\"x\">".to_string()),
                },
            })
            .collect();
        let raw = RawResults {
            url: "https://example.com/?q=<b>".to_string(),
            framework: Framework::Playwright,
            duration_ms: 42,
            results: vec![RuleRun {
                rule: info,
                violations,
                error: None,
            }],
        };
        AuditResults::new(raw, Tier::Free, ThresholdConfig::default())
    }

    #[test]
    fn test_full_report_escapes_and_has_version() {
        let html = HtmlReporter::new().render(&sample());
        assert!(html.contains(&format!("v{}", VERSION)));
        assert!(html.contains("&lt;script&gt;alert(0)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("https://example.com/?q=&lt;b&gt;"));
        assert!(html.contains("FAILED"));
    }

    #[test]
    fn test_summary_is_at_most_half() {
        let results = sample();
        let full = HtmlReporter::new().render(&results);
        let summary = SummaryHtmlReporter::new().render(&results);
        assert!(summary.len() * 2 <= full.len(), "{} vs {}", summary.len(), full.len());
        assert_eq!(summary.matches("<li>").count(), 5);
    }

    #[test]
    fn test_render_is_deterministic() {
        let results = sample();
        assert_eq!(HtmlReporter::new().render(&results), HtmlReporter::new().render(&results));
    }
}
