// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Report generation
//!
//! Every reporter is a pure function of [`AuditResults`]. HTML formats are
//! available on every tier; JSON needs Enterprise and SARIF needs
//! Corporate, and asking for them on a lower tier is a license error.

mod html;
mod json;
mod sarif;

pub use html::{HtmlReporter, SummaryHtmlReporter};
pub use json::JsonReporter;
pub use sarif::SarifReporter;

use crate::error::Result;
use crate::results::AuditResults;

/// Product name used in report metadata
pub const TOOL_NAME: &str = "QAstell";

/// Turns audit results into a report document
pub trait Reporter {
    /// Short format name
    fn name(&self) -> &'static str;

    /// Render the report
    fn generate(&self, results: &AuditResults) -> Result<String>;
}

/// All built-in reporters
pub fn reporters() -> Vec<Box<dyn Reporter>> {
    vec![
        Box::new(HtmlReporter::new()),
        Box::new(SummaryHtmlReporter::new()),
        Box::new(JsonReporter::new()),
        Box::new(SarifReporter::new()),
    ]
}

/// Reporter by format name
pub fn reporter_for(name: &str) -> Option<Box<dyn Reporter>> {
    reporters().into_iter().find(|r| r.name() == name)
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
