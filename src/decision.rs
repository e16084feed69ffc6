// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Pass/fail decision over audit findings
//!
//! A rule fails when its violation count exceeds its limit. The limit is
//! the per-rule threshold when one is configured, otherwise the threshold
//! of the rule's resolved severity, otherwise zero. Allow-listed rules
//! never fail but still count in the summary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::results::Violation;
use crate::rules::{RuleCategory, Severity};

/// Thresholds and allow-list for one decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdConfig {
    /// Max violations tolerated per rule, by severity
    pub thresholds: BTreeMap<Severity, usize>,
    /// Max violations tolerated for specific rules; overrides `thresholds`
    pub rule_thresholds: BTreeMap<String, usize>,
    /// Rules that never fail
    pub allowed_violations: BTreeSet<String>,
}

impl ThresholdConfig {
    /// Zero tolerance for everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit for a severity
    pub fn threshold(mut self, severity: Severity, max: usize) -> Self {
        self.thresholds.insert(severity, max);
        self
    }

    /// Set the limit for one rule
    pub fn rule_threshold(mut self, rule_id: impl Into<String>, max: usize) -> Self {
        self.rule_thresholds.insert(rule_id.into(), max);
        self
    }

    /// Allow-list a rule
    pub fn allow(mut self, rule_id: impl Into<String>) -> Self {
        self.allowed_violations.insert(rule_id.into());
        self
    }

    /// Only critical findings fail
    pub fn critical_only() -> Self {
        Self::new()
            .threshold(Severity::Critical, 0)
            .threshold(Severity::High, usize::MAX)
            .threshold(Severity::Medium, usize::MAX)
            .threshold(Severity::Low, usize::MAX)
            .threshold(Severity::Info, usize::MAX)
    }

    /// Strict on critical and high, lenient below
    pub fn permissive() -> Self {
        Self::new()
            .threshold(Severity::Critical, 0)
            .threshold(Severity::High, 0)
            .threshold(Severity::Medium, 5)
            .threshold(Severity::Low, 20)
            .threshold(Severity::Info, usize::MAX)
    }

    /// Limit that applies to a rule
    pub fn limit_for(&self, rule_id: &str, severity: Severity) -> usize {
        self.rule_thresholds
            .get(rule_id)
            .or_else(|| self.thresholds.get(&severity))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_allowed(&self, rule_id: &str) -> bool {
        self.allowed_violations.contains(rule_id)
    }

    /// Overlay `other` onto `self`; entries in `other` win
    pub fn merged(&self, other: &ThresholdConfig) -> ThresholdConfig {
        let mut merged = self.clone();
        merged.thresholds.extend(other.thresholds.iter().map(|(k, v)| (*k, *v)));
        merged
            .rule_thresholds
            .extend(other.rule_thresholds.iter().map(|(k, v)| (k.clone(), *v)));
        merged
            .allowed_violations
            .extend(other.allowed_violations.iter().cloned());
        merged
    }
}

/// A rule over its limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub count: usize,
    pub limit: usize,
    pub violations: Vec<Violation>,
}

/// Outcome of a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub passed: bool,
    /// Most severe first, then by rule id
    pub failures: Vec<RuleFailure>,
}

impl Decision {
    /// Ids of failing rules, in failure order
    pub fn failing_rule_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.rule_id.clone()).collect()
    }
}

/// Apply a threshold config to a set of violations
pub fn decide(violations: &[Violation], config: &ThresholdConfig) -> Decision {
    let mut by_rule: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
    for violation in violations {
        by_rule.entry(violation.rule_id.as_str()).or_default().push(violation);
    }

    let mut failures: Vec<RuleFailure> = by_rule
        .into_iter()
        .filter(|(rule_id, _)| !config.is_allowed(rule_id))
        .filter_map(|(rule_id, group)| {
            let first = group[0];
            let severity = group.iter().map(|v| v.severity).max().unwrap_or(first.severity);
            let limit = config.limit_for(rule_id, severity);

            (group.len() > limit).then(|| RuleFailure {
                rule_id: rule_id.to_string(),
                rule_name: first.rule_name.clone(),
                category: first.category,
                severity,
                count: group.len(),
                limit,
                violations: group.into_iter().cloned().collect(),
            })
        })
        .collect();

    failures.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });

    Decision {
        passed: failures.is_empty(),
        failures,
    }
}
