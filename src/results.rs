// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Audit result model
//!
//! One [`AuditResults`] is produced per audit and never changes afterward.
//! Every report format is a pure function of it; `generated_at` is the only
//! field that differs between two otherwise identical runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapter::Framework;
use crate::decision::{decide, Decision, RuleFailure, ThresholdConfig};
use crate::error::Result;
use crate::license::Tier;
use crate::report::{HtmlReporter, JsonReporter, Reporter, SarifReporter, SummaryHtmlReporter};
use crate::rules::{ElementRef, RuleCategory, RuleInfo, Severity};

/// One finding, tied to its rule by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    /// Resolved severity
    pub severity: Severity,
    pub message: String,
    pub element: ElementRef,
}

/// Evaluation of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRun {
    pub rule: RuleInfo,
    pub violations: Vec<Violation>,
    /// Evaluation failure; the rule then has no violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-rule output of one audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResults {
    pub url: String,
    pub framework: Framework,
    pub duration_ms: u64,
    pub results: Vec<RuleRun>,
}

/// Aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    /// Every severity present, zero included
    pub by_severity: BTreeMap<Severity, usize>,
    /// Only categories with findings
    pub by_category: BTreeMap<RuleCategory, usize>,
    pub rules_run: usize,
}

impl Summary {
    /// Count violations
    pub fn from_violations(violations: &[Violation], rules_run: usize) -> Self {
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_category = BTreeMap::new();

        for violation in violations {
            *by_severity.entry(violation.severity).or_insert(0) += 1;
            *by_category.entry(violation.category).or_insert(0) += 1;
        }

        Self {
            total: violations.len(),
            by_severity,
            by_category,
            rules_run,
        }
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }

    pub fn category_count(&self, category: RuleCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

/// Result of one audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResults {
    pub raw: RawResults,
    pub violations: Vec<Violation>,
    pub summary: Summary,
    pub tier: Tier,
    /// Audit skipped because the daily quota is exhausted
    pub skipped: bool,
    pub generated_at: DateTime<Utc>,
    /// Decision settings used by `passed()` and `failures()`
    #[serde(skip)]
    pub thresholds: ThresholdConfig,
}

impl AuditResults {
    /// Assemble results from per-rule runs
    pub fn new(raw: RawResults, tier: Tier, thresholds: ThresholdConfig) -> Self {
        let violations: Vec<Violation> = raw
            .results
            .iter()
            .flat_map(|run| run.violations.iter().cloned())
            .collect();
        let summary = Summary::from_violations(&violations, raw.results.len());

        Self {
            raw,
            violations,
            summary,
            tier,
            skipped: false,
            generated_at: Utc::now(),
            thresholds,
        }
    }

    /// Empty result for an audit the license gate refused
    pub fn skipped(url: impl Into<String>, framework: Framework, tier: Tier) -> Self {
        let raw = RawResults {
            url: url.into(),
            framework,
            duration_ms: 0,
            results: Vec::new(),
        };
        Self {
            skipped: true,
            ..Self::new(raw, tier, ThresholdConfig::default())
        }
    }

    /// Decision under the configured thresholds
    pub fn decision(&self) -> Decision {
        self.decide_with(&self.thresholds)
    }

    /// Decision under other thresholds
    pub fn decide_with(&self, config: &ThresholdConfig) -> Decision {
        decide(&self.violations, config)
    }

    /// No rule over its threshold
    pub fn passed(&self) -> bool {
        self.decision().passed
    }

    /// Failing rules, most severe first
    pub fn failures(&self) -> Vec<RuleFailure> {
        self.decision().failures
    }

    /// Rules that failed to evaluate, as `(rule_id, reason)`
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.raw
            .results
            .iter()
            .filter_map(|run| run.error.as_deref().map(|e| (run.rule.id.as_str(), e)))
            .collect()
    }

    /// Violations of one rule
    pub fn violations_for<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.rule_id == rule_id)
    }

    /// Full HTML report
    pub fn to_html(&self) -> String {
        HtmlReporter::new().render(self)
    }

    /// Compact HTML report: counts and the top findings
    pub fn to_summary_html(&self) -> String {
        SummaryHtmlReporter::new().render(self)
    }

    /// JSON report; Enterprise tier or higher
    pub fn to_json(&self) -> Result<String> {
        JsonReporter::new().generate(self)
    }

    /// SARIF 2.1.0 report; Corporate tier
    pub fn to_sarif(&self) -> Result<String> {
        SarifReporter::new().generate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, category: RuleCategory, severity: Severity, count: usize) -> RuleRun {
        let info = RuleInfo {
            id: id.to_string(),
            name: id.to_string(),
            category,
            severity,
            description: String::new(),
            cwe: None,
        };
        let violations = (0..count)
            .map(|i| Violation {
                rule_id: id.to_string(),
                rule_name: id.to_string(),
                category,
                severity,
                message: format!("finding {}", i),
                element: ElementRef::document(None),
            })
            .collect();
        RuleRun {
            rule: info,
            violations,
            error: None,
        }
    }

    fn results(runs: Vec<RuleRun>) -> AuditResults {
        let raw = RawResults {
            url: "https://example.com/".to_string(),
            framework: Framework::Playwright,
            duration_ms: 12,
            results: runs,
        };
        AuditResults::new(raw, Tier::Free, ThresholdConfig::default())
    }

    #[test]
    fn test_summary_totals_agree() {
        let results = results(vec![
            run("a", RuleCategory::Headers, Severity::High, 2),
            run("b", RuleCategory::Cookies, Severity::Low, 3),
            run("c", RuleCategory::Csp, Severity::Info, 0),
        ]);
        let summary = &results.summary;
        assert_eq!(summary.total, 5);
        assert_eq!(summary.by_severity.values().sum::<usize>(), 5);
        assert_eq!(summary.by_category.values().sum::<usize>(), 5);
        assert_eq!(summary.rules_run, 3);
        assert_eq!(summary.category_count(RuleCategory::Csp), 0);
        assert_eq!(summary.severity_count(Severity::Critical), 0);
    }

    #[test]
    fn test_errors_listed() {
        let mut failing = run("broken", RuleCategory::Forms, Severity::Medium, 0);
        failing.error = Some("bad input".to_string());
        let results = results(vec![failing]);
        assert_eq!(results.errors(), vec![("broken", "bad input")]);
        assert!(results.passed());
    }

    #[test]
    fn test_skipped_result() {
        let results = AuditResults::skipped("https://a.com", Framework::Cypress, Tier::Free);
        assert!(results.skipped);
        assert_eq!(results.summary.total, 0);
        assert!(results.passed());
    }

    #[test]
    fn test_custom_thresholds() {
        let results = results(vec![run("a", RuleCategory::Headers, Severity::Medium, 2)]);
        assert!(!results.passed());
        let lenient = ThresholdConfig::new().threshold(Severity::Medium, 2);
        assert!(results.decide_with(&lenient).passed);
        assert_eq!(results.violations_for("a").count(), 2);
    }
}
