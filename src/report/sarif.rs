// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! SARIF 2.1.0 reporter for code-scanning dashboards

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{Reporter, TOOL_NAME};
use crate::error::Result;
use crate::license::Tier;
use crate::results::AuditResults;
use crate::rules::Severity;
use crate::VERSION;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

/// SARIF 2.1.0 report; Corporate tier
#[derive(Debug, Clone)]
pub struct SarifReporter {
    pub tool_name: String,
    pub tool_version: String,
}

impl SarifReporter {
    pub fn new() -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            tool_version: VERSION.to_string(),
        }
    }

    fn level(severity: Severity) -> &'static str {
        match severity {
            Severity::Critical | Severity::High => "error",
            Severity::Medium => "warning",
            Severity::Low | Severity::Info => "note",
        }
    }

    fn build_rules(&self, results: &AuditResults) -> Vec<Value> {
        results
            .raw
            .results
            .iter()
            .map(|run| {
                let info = &run.rule;
                let mut tags = vec![info.category.as_str().to_string(), "security".to_string()];
                if let Some(cwe) = info.cwe {
                    tags.push(format!("CWE-{cwe}"));
                }

                let mut rule = json!({
                    "id": info.id,
                    "name": info.name,
                    "shortDescription": { "text": info.name },
                    "fullDescription": { "text": info.description },
                    "defaultConfiguration": { "level": Self::level(info.severity) },
                    "properties": {
                        "tags": tags,
                        "category": info.category,
                        "severity": info.severity
                    }
                });

                if let Some(cwe) = info.cwe {
                    rule["relationships"] = json!([{
                        "target": {
                            "id": format!("CWE-{cwe}"),
                            "toolComponent": { "name": "CWE", "index": 0 }
                        },
                        "kinds": ["superset"]
                    }]);
                }
                rule
            })
            .collect()
    }

    fn build_results(&self, results: &AuditResults) -> Vec<Value> {
        results
            .violations
            .iter()
            .map(|violation| {
                let rule_index = results
                    .raw
                    .results
                    .iter()
                    .position(|run| run.rule.id == violation.rule_id);

                let mut result = json!({
                    "ruleId": violation.rule_id,
                    "level": Self::level(violation.severity),
                    "message": { "text": violation.message },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": results.raw.url }
                        },
                        "logicalLocations": [{
                            "fullyQualifiedName": violation.element.selector,
                            "kind": "element"
                        }]
                    }],
                    "properties": {
                        "category": violation.category,
                        "severity": violation.severity
                    }
                });

                if let Some(index) = rule_index {
                    result["ruleIndex"] = json!(index);
                }
                if let Some(context) = &violation.element.context {
                    result["locations"][0]["physicalLocation"]["contextRegion"] =
                        json!({ "snippet": { "text": context } });
                }
                result
            })
            .collect()
    }

    fn build_taxonomies(&self, results: &AuditResults) -> Vec<Value> {
        let cwes: BTreeSet<u32> = results.raw.results.iter().filter_map(|run| run.rule.cwe).collect();
        if cwes.is_empty() {
            return Vec::new();
        }

        let taxa: Vec<Value> = cwes
            .into_iter()
            .map(|cwe| json!({ "id": format!("CWE-{cwe}"), "name": format!("CWE-{cwe}") }))
            .collect();

        vec![json!({
            "name": "CWE",
            "organization": "MITRE",
            "shortDescription": { "text": "Common Weakness Enumeration" },
            "taxa": taxa
        })]
    }

    fn build_notifications(&self, results: &AuditResults) -> Vec<Value> {
        results
            .errors()
            .into_iter()
            .map(|(rule_id, reason)| {
                json!({
                    "level": "error",
                    "message": { "text": reason },
                    "associatedRule": { "id": rule_id }
                })
            })
            .collect()
    }
}

impl Default for SarifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for SarifReporter {
    fn name(&self) -> &'static str {
        "sarif"
    }

    fn generate(&self, results: &AuditResults) -> Result<String> {
        results.tier.require("SARIF", Tier::Corporate)?;

        let mut run = json!({
            "tool": {
                "driver": {
                    "name": self.tool_name,
                    "version": self.tool_version,
                    "semanticVersion": self.tool_version,
                    "rules": self.build_rules(results)
                }
            },
            "invocations": [{
                "executionSuccessful": !results.skipped,
                "toolExecutionNotifications": self.build_notifications(results)
            }],
            "results": self.build_results(results),
            "properties": {
                "framework": results.raw.framework,
                "durationMs": results.raw.duration_ms,
                "generatedAt": results.generated_at.to_rfc3339()
            }
        });

        let taxonomies = self.build_taxonomies(results);
        if !taxonomies.is_empty() {
            run["taxonomies"] = Value::Array(taxonomies);
        }

        let sarif = json!({
            "$schema": SARIF_SCHEMA,
            "version": "2.1.0",
            "runs": [run]
        });

        Ok(serde_json::to_string_pretty(&sarif)?)
    }
}
