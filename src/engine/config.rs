// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Auditor and audit configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::Framework;
use crate::decision::ThresholdConfig;
use crate::error::{Error, Result};
use crate::license::LicenseSession;
use crate::rules::{Rule, RuleCategory, Severity};

/// Default time allowed for one snapshot capture
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Auditor construction options
#[derive(Debug, Clone)]
pub struct AuditorOptions {
    /// Skip detection and use this framework
    pub framework: Option<Framework>,
    /// Rules to run instead of the built-in catalogue
    pub rules: Option<Vec<Rule>>,
    /// Snapshot capture timeout
    pub capture_timeout: Duration,
    /// License session; the process-wide one when unset
    pub license: Option<LicenseSession>,
    /// Decision defaults; per-call settings are layered on top
    pub thresholds: ThresholdConfig,
}

impl Default for AuditorOptions {
    fn default() -> Self {
        Self {
            framework: None,
            rules: None,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            license: None,
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl AuditorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the framework
    pub fn framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    /// Replace the rule set
    pub fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set capture timeout
    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Use a dedicated license session
    pub fn license(mut self, session: LicenseSession) -> Self {
        self.license = Some(session);
        self
    }

    /// Default thresholds for every audit
    pub fn thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Per-audit options: rule selection plus decision settings
///
/// Loadable from JSON with camelCase keys:
///
/// ```json
/// {
///   "include": ["headers", "csp"],
///   "skipRules": ["inline-scripts"],
///   "thresholds": {"critical": 0, "high": 0, "medium": 5},
///   "ruleThresholds": {"missing-sri-attribute": 3},
///   "allowedViolations": ["third-party-script"],
///   "severityOverrides": {"server-version-disclosure": "low"}
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditOptions {
    /// Only these categories; all when empty
    pub include: Vec<RuleCategory>,
    /// Drop these categories
    pub exclude: Vec<RuleCategory>,
    /// Drop these rule ids
    pub skip_rules: Vec<String>,
    /// Explicit rule set for this call; wins over include/exclude
    #[serde(skip)]
    pub rules: Option<Vec<Rule>>,
    /// Thresholds and allow-list
    #[serde(flatten)]
    pub decision: ThresholdConfig,
    /// Resolved severity per rule id
    pub severity_overrides: BTreeMap<String, Severity>,
}

impl AuditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("invalid audit options: {}", e)))
    }

    /// Security headers, CSP, cookies and framing only
    pub fn headers_only() -> Self {
        Self::new()
            .include(RuleCategory::Headers)
            .include(RuleCategory::Csp)
            .include(RuleCategory::Cookies)
            .include(RuleCategory::Cors)
            .include(RuleCategory::Clickjacking)
            .include(RuleCategory::PermissionsPolicy)
    }

    /// Script injection surface only
    pub fn xss_focused() -> Self {
        Self::new()
            .include(RuleCategory::InlineHandlers)
            .include(RuleCategory::MutationXss)
            .include(RuleCategory::HtmlInjection)
            .include(RuleCategory::DomClobbering)
            .include(RuleCategory::PrototypePollution)
            .include(RuleCategory::Csp)
    }

    pub fn include(mut self, category: RuleCategory) -> Self {
        if !self.include.contains(&category) {
            self.include.push(category);
        }
        self
    }

    pub fn exclude(mut self, category: RuleCategory) -> Self {
        if !self.exclude.contains(&category) {
            self.exclude.push(category);
        }
        self
    }

    pub fn skip_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.skip_rules.push(rule_id.into());
        self
    }

    /// Run exactly these rules
    pub fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Replace decision settings
    pub fn decision(mut self, decision: ThresholdConfig) -> Self {
        self.decision = decision;
        self
    }

    pub fn threshold(mut self, severity: Severity, max: usize) -> Self {
        self.decision = self.decision.threshold(severity, max);
        self
    }

    pub fn rule_threshold(mut self, rule_id: impl Into<String>, max: usize) -> Self {
        self.decision = self.decision.rule_threshold(rule_id, max);
        self
    }

    pub fn allow(mut self, rule_id: impl Into<String>) -> Self {
        self.decision = self.decision.allow(rule_id);
        self
    }

    /// Report a rule's findings at another severity
    pub fn severity_override(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    /// Whether a category passes the include/exclude filters
    pub fn selects(&self, category: RuleCategory) -> bool {
        (self.include.is_empty() || self.include.contains(&category))
            && !self.exclude.contains(&category)
    }

    /// Severity a rule's findings are reported at
    pub fn resolved_severity(&self, rule: &Rule) -> Severity {
        self.severity_overrides
            .get(rule.id)
            .copied()
            .unwrap_or(rule.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let options = AuditOptions::from_json(
            r#"{
                "include": ["headers", "third-party"],
                "exclude": ["cors"],
                "skipRules": ["missing-hsts"],
                "thresholds": {"critical": 0, "low": 10},
                "ruleThresholds": {"missing-sri-attribute": 3},
                "allowedViolations": ["third-party-script"],
                "severityOverrides": {"server-version-disclosure": "high"}
            }"#,
        )
        .unwrap();

        assert_eq!(options.include, vec![RuleCategory::Headers, RuleCategory::ThirdParty]);
        assert!(options.selects(RuleCategory::Headers));
        assert!(!options.selects(RuleCategory::Cors));
        assert!(!options.selects(RuleCategory::Csp));
        assert_eq!(options.decision.limit_for("missing-sri-attribute", Severity::High), 3);
        assert_eq!(options.decision.limit_for("x", Severity::Low), 10);
        assert!(options.decision.is_allowed("third-party-script"));
        assert_eq!(
            options.severity_overrides.get("server-version-disclosure"),
            Some(&Severity::High)
        );
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = AuditOptions::from_json(r#"{"include": ["nope"]}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_presets() {
        let headers = AuditOptions::headers_only();
        assert!(headers.selects(RuleCategory::Csp));
        assert!(!headers.selects(RuleCategory::MutationXss));

        let xss = AuditOptions::xss_focused().exclude(RuleCategory::Csp);
        assert!(xss.selects(RuleCategory::HtmlInjection));
        assert!(!xss.selects(RuleCategory::Csp));
    }

    #[test]
    fn test_auditor_options_builder() {
        let options = AuditorOptions::new()
            .framework(Framework::Playwright)
            .capture_timeout(Duration::from_secs(5));
        assert_eq!(options.framework, Some(Framework::Playwright));
        assert_eq!(options.capture_timeout, Duration::from_secs(5));
        assert!(options.license.is_none());
    }
}
