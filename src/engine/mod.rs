// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Audit engine
//!
//! A [`SecurityAuditor`] is bound to one host handle. Each `audit()` call
//! resolves the rule set, takes one unit of license quota, captures a fresh
//! snapshot and evaluates every selected rule against it. Rules run on
//! blocking tasks; a rule that errors or panics is recorded in the raw
//! results and the others carry on.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qastell::adapter::{HostHandle, StaticHost};
//! use qastell::engine::{AuditOptions, SecurityAuditor};
//! use qastell::rules::RuleCategory;
//!
//! # async fn run() -> qastell::Result<()> {
//! let page = StaticHost::playwright("https://example.com", "<html></html>");
//! let auditor = SecurityAuditor::new(HostHandle::page(Arc::new(page)));
//!
//! let results = auditor
//!     .audit(&AuditOptions::new().include(RuleCategory::Headers))
//!     .await?;
//! println!("{} findings", results.summary.total);
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::{AuditOptions, AuditorOptions, DEFAULT_CAPTURE_TIMEOUT};

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::adapter::{adapter_for, detect_framework, Framework, HostHandle};
use crate::decision::ThresholdConfig;
use crate::error::{Error, Result};
use crate::license::{global_license, Admission, LicenseSession};
use crate::results::{AuditResults, RawResults, RuleRun, Violation};
use crate::rules::{all_rules, Rule, RuleRegistry};
use crate::snapshot::Snapshot;

const URL_HINT_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs security rules against the page behind a host handle
#[derive(Debug, Clone)]
pub struct SecurityAuditor {
    handle: HostHandle,
    /// `None` when detection found nothing
    framework: Option<Framework>,
    rules: Option<Vec<Rule>>,
    capture_timeout: Duration,
    license: LicenseSession,
    thresholds: ThresholdConfig,
}

impl SecurityAuditor {
    /// Auditor with detected framework and the built-in rules
    pub fn new(handle: HostHandle) -> Self {
        Self::with_options(handle, AuditorOptions::default())
    }

    /// Auditor running only `rules`
    pub fn with_rules(handle: HostHandle, rules: Vec<Rule>) -> Self {
        Self::with_options(handle, AuditorOptions::new().rules(rules))
    }

    /// Auditor with explicit options
    pub fn with_options(handle: HostHandle, options: AuditorOptions) -> Self {
        let framework = match options.framework {
            Some(Framework::Unknown) | None => Some(detect_framework(&handle)),
            Some(forced) => Some(forced),
        }
        .filter(|f| *f != Framework::Unknown);

        match framework {
            Some(framework) => debug!(framework = %framework, handle = handle.kind(), "Auditor created"),
            None => warn!(handle = handle.kind(), "No automation framework detected"),
        }

        Self {
            handle,
            framework,
            rules: options.rules,
            capture_timeout: options.capture_timeout,
            license: options.license.unwrap_or_else(global_license),
            thresholds: options.thresholds,
        }
    }

    /// Resolved framework, override or detected
    pub fn framework(&self) -> Result<Framework> {
        self.framework.ok_or_else(|| Error::FrameworkDetection {
            handle_kind: self.handle.kind().to_string(),
        })
    }

    /// The handle being audited
    pub fn handle(&self) -> &HostHandle {
        &self.handle
    }

    /// License session consulted by this auditor
    pub fn license(&self) -> &LicenseSession {
        &self.license
    }

    /// Rule set an audit with `options` would run
    ///
    /// Explicit rules (per call, else per auditor) replace the catalogue;
    /// category filters only narrow the catalogue. Skipped ids are removed
    /// either way. Duplicate ids and empty sets are rejected.
    pub fn select_rules(&self, options: &AuditOptions) -> Result<RuleRegistry> {
        let mut rules: Vec<Rule> = match options.rules.as_ref().or(self.rules.as_ref()) {
            Some(explicit) => explicit.clone(),
            None => all_rules()
                .iter()
                .filter(|rule| options.selects(rule.category))
                .copied()
                .collect(),
        };

        rules.retain(|rule| !options.skip_rules.iter().any(|id| id == rule.id));

        let registry = RuleRegistry::new(rules)?;
        if registry.is_empty() {
            return Err(Error::config("no rules selected for audit"));
        }
        Ok(registry)
    }

    /// Capture a snapshot and run the selected rules
    pub async fn audit(&self, options: &AuditOptions) -> Result<AuditResults> {
        let framework = self.framework()?;
        if !framework.serves(&self.handle) {
            return Err(Error::FrameworkMismatch {
                framework,
                handle_kind: self.handle.kind().to_string(),
            });
        }
        let adapter = adapter_for(framework).ok_or_else(|| Error::FrameworkDetection {
            handle_kind: self.handle.kind().to_string(),
        })?;
        let registry = self.select_rules(options)?;

        let tier = match self.license.try_consume() {
            Admission::Granted { tier, remaining } => {
                debug!(tier = %tier, remaining, "License quota consumed");
                tier
            }
            Admission::Denied { tier } => {
                warn!(tier = %tier, "Audit skipped: daily quota exhausted");
                return Ok(AuditResults::skipped(String::new(), framework, tier));
            }
        };

        let started = Instant::now();
        let snapshot = match tokio::time::timeout(self.capture_timeout, adapter.capture(&self.handle)).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                self.license.refund();
                return Err(e);
            }
            Err(_) => {
                self.license.refund();
                warn!(framework = %framework, "Snapshot capture timed out");
                let err = Error::capture_timeout(framework, self.capture_timeout.as_millis() as u64);
                return Err(match self.page_url_hint().await {
                    Some(url) => err.with_url(url),
                    None => err,
                });
            }
        };

        let url = snapshot.url().to_string();
        let results = evaluate(Arc::new(snapshot), registry.rules(), options).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let raw = RawResults {
            url,
            framework,
            duration_ms,
            results,
        };
        let audit = AuditResults::new(raw, tier, self.thresholds.merged(&options.decision));

        info!(
            url = %audit.raw.url,
            framework = %framework,
            rules = audit.summary.rules_run,
            violations = audit.summary.total,
            errors = audit.errors().len(),
            duration_ms,
            "Audit complete"
        );

        Ok(audit)
    }

    /// Best-effort URL lookup after a stalled capture
    async fn page_url_hint(&self) -> Option<String> {
        match tokio::time::timeout(URL_HINT_TIMEOUT, self.handle.current_url()).await {
            Ok(Ok(url)) => Some(url),
            _ => None,
        }
    }

    /// Audit and fail if any rule exceeds its threshold
    ///
    /// Skipped audits pass. Rules that failed to evaluate do not fail the
    /// assertion; they stay visible through [`AuditResults::errors`].
    pub async fn assert_no_violations(&self, options: &AuditOptions) -> Result<AuditResults> {
        let results = self.audit(options).await?;
        if results.skipped {
            return Ok(results);
        }

        for (rule_id, reason) in results.errors() {
            warn!(rule_id, reason, "Rule did not evaluate");
        }

        let decision = results.decision();
        if decision.passed {
            return Ok(results);
        }

        Err(Error::AssertionFailed {
            failing_rules: decision.failures.len(),
            rule_ids: decision.failing_rule_ids(),
            total_violations: results.summary.total,
        })
    }
}

/// Evaluate rules concurrently; output follows rule order
async fn evaluate(snapshot: Arc<Snapshot>, rules: &[Rule], options: &AuditOptions) -> Vec<RuleRun> {
    let tasks = rules.iter().copied().map(|rule| {
        let snapshot = Arc::clone(&snapshot);
        tokio::task::spawn_blocking(move || rule.run(&snapshot))
    });

    join_all(tasks)
        .await
        .into_iter()
        .zip(rules)
        .map(|(outcome, rule)| {
            let severity = options.resolved_severity(rule);
            let outcome = match outcome {
                Ok(Ok(findings)) => Ok(findings),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) if e.is_panic() => Err(format!("rule panicked: {}", panic_message(e.into_panic()))),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(findings) => {
                    debug!(rule_id = rule.id, findings = findings.len(), "Rule evaluated");
                    let violations = findings
                        .into_iter()
                        .map(|finding| Violation {
                            rule_id: rule.id.to_string(),
                            rule_name: rule.name.to_string(),
                            category: rule.category,
                            severity,
                            message: finding.message,
                            element: finding.element,
                        })
                        .collect();
                    RuleRun {
                        rule: rule.info(),
                        violations,
                        error: None,
                    }
                }
                Err(reason) => {
                    let err = Error::rule_evaluation(rule.id, reason);
                    warn!(rule_id = rule.id, error = %err, "Rule evaluation failed");
                    RuleRun {
                        rule: rule.info(),
                        violations: Vec::new(),
                        error: Some(err.to_string()),
                    }
                }
            }
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
