// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # QAstell - Browser Security Audit Engine
//!
//! Audits a page that a browser-automation harness has already loaded and
//! reports security findings: missing headers, weak CSP, insecure cookies,
//! XSS vectors, clickjacking exposure and more.
//!
//! ## Features
//!
//! - Framework agnostic: Cypress windows, Playwright/Puppeteer pages,
//!   WebDriver sessions
//! - 50 built-in rules across 18 categories
//! - Severity thresholds, per-rule thresholds and allow-lists
//! - HTML, summary HTML, JSON and SARIF 2.1.0 reports
//! - Tier-based daily scan quota
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qastell::{AuditOptions, HostHandle, SecurityAuditor, Severity, StaticHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     qastell::init_license(None);
//!
//!     let page = StaticHost::playwright("https://example.com", "<html></html>")
//!         .with_header("Content-Security-Policy", "default-src 'self'");
//!     let auditor = SecurityAuditor::new(HostHandle::page(Arc::new(page)));
//!
//!     let options = AuditOptions::new()
//!         .threshold(Severity::Critical, 0)
//!         .threshold(Severity::Low, 10);
//!     let results = auditor.audit(&options).await?;
//!
//!     for failure in results.failures() {
//!         println!("{} ({}): {} finding(s)", failure.rule_id, failure.severity, failure.count);
//!     }
//!     std::fs::write("qastell-report.html", results.to_html())?;
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod decision;
pub mod engine;
pub mod error;
pub mod license;
pub mod report;
pub mod results;
pub mod rules;
pub mod snapshot;

// Adapters
pub use adapter::{
    detect_framework, Adapter, DriverHost, Framework, HostHandle, PageHost, StaticHost, StaticWindow,
    WebDriverClient, WebDriverConfig, WindowHost,
};

// Engine
pub use engine::{AuditOptions, AuditorOptions, SecurityAuditor};

// Decision
pub use decision::{decide, Decision, RuleFailure, ThresholdConfig};

// Errors
pub use error::{Error, Result};

// License
pub use license::{
    get_license_usage, get_tier_display_name, init_license, reset_license, LicenseSession, LicenseUsage, Tier,
};

// Reports
pub use report::{HtmlReporter, JsonReporter, Reporter, SarifReporter, SummaryHtmlReporter};

// Results
pub use results::{AuditResults, RawResults, RuleRun, Summary, Violation};

// Rules
pub use rules::{all_rules, Rule, RuleCategory, RuleRegistry, Severity};

// Snapshot
pub use snapshot::{Cookie, SameSite, Snapshot, SnapshotParts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
