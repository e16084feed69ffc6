// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JSON reporter

use serde_json::json;

use super::{Reporter, TOOL_NAME};
use crate::error::Result;
use crate::license::Tier;
use crate::results::AuditResults;
use crate::VERSION;

/// Machine-readable report; Enterprise tier or higher
#[derive(Debug, Clone)]
pub struct JsonReporter {
    pub pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn generate(&self, results: &AuditResults) -> Result<String> {
        results.tier.require("JSON", Tier::Enterprise)?;

        let decision = results.decision();
        let mut report = serde_json::to_value(results)?;
        report["tool"] = json!({ "name": TOOL_NAME, "version": VERSION });
        report["passed"] = json!(decision.passed);
        report["failures"] = json!(decision.failing_rule_ids());

        let output = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Framework;
    use crate::decision::ThresholdConfig;
    use crate::results::RawResults;

    fn results(tier: Tier) -> AuditResults {
        let raw = RawResults {
            url: "https://example.com/".to_string(),
            framework: Framework::WebDriver,
            duration_ms: 3,
            results: Vec::new(),
        };
        AuditResults::new(raw, tier, ThresholdConfig::default())
    }

    #[test]
    fn test_free_tier_rejected() {
        let err = JsonReporter::new().generate(&results(Tier::Free)).unwrap_err();
        assert!(err.is_license());
    }

    #[test]
    fn test_structure() {
        let output = JsonReporter::compact().generate(&results(Tier::Enterprise)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["raw"]["framework"], "webdriver");
        assert_eq!(value["tier"], "enterprise");
        assert_eq!(value["passed"], true);
        assert_eq!(value["summary"]["total"], 0);
        assert_eq!(value["tool"]["version"], VERSION);
        assert!(value["generatedAt"].is_string());
    }
}
