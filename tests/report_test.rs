// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::fs;
use std::sync::Arc;

use qastell::license::LicenseKey;
use qastell::report::reporter_for;
use qastell::{
    AuditOptions, AuditResults, AuditorOptions, HostHandle, HtmlReporter, LicenseSession, Reporter,
    SecurityAuditor, StaticHost, SummaryHtmlReporter, Tier, VERSION,
};

const PAGE: &str = r#"<html><head>
<script src="https://cdn.other.net/a.js"></script>
<script src="https://cdn.other.net/b.js"></script>
</head><body>
<form method="post" action="/transfer"><input name="amount"></form>
<a href="javascript:steal()">x</a>
<div onmouseover="x()"></div><span onclick="y()"></span>
<!-- TODO remove admin password: hunter2 -->
</body></html>"#;

async fn audit(tier: Tier) -> AuditResults {
    let host = StaticHost::puppeteer("https://bank.example.com/account?q=<i>", PAGE);
    let auditor = SecurityAuditor::with_options(
        HostHandle::page(Arc::new(host)),
        AuditorOptions::new().license(LicenseSession::with_key(&LicenseKey::new(tier).encode())),
    );
    auditor.audit(&AuditOptions::new()).await.unwrap()
}

#[tokio::test]
async fn test_html_reports_written_to_disk() {
    let results = audit(Tier::Free).await;
    assert!(results.summary.total > 0);

    let dir = tempfile::tempdir().unwrap();
    let full_path = dir.path().join("qastell-report.html");
    let summary_path = dir.path().join("qastell-summary.html");
    fs::write(&full_path, results.to_html()).unwrap();
    fs::write(&summary_path, results.to_summary_html()).unwrap();

    let full = fs::read_to_string(&full_path).unwrap();
    let summary = fs::read_to_string(&summary_path).unwrap();

    assert!(full.contains(&format!("v{}", VERSION)));
    assert!(full.contains("bank.example.com/account?q=&lt;i&gt;"));
    assert!(!full.contains("<i>"));
    assert!(summary.len() * 2 <= full.len());
    assert_eq!(HtmlReporter::new().generate(&results).unwrap(), full);
    assert_eq!(SummaryHtmlReporter::new().generate(&results).unwrap(), summary);
}

#[tokio::test]
async fn test_premium_formats_gated_by_tier() {
    let free = audit(Tier::Free).await;
    assert!(free.to_json().unwrap_err().is_license());
    assert!(free.to_sarif().unwrap_err().is_license());
    // Callers fall back to HTML
    assert!(!free.to_html().is_empty());

    let enterprise = audit(Tier::Enterprise).await;
    assert!(enterprise.to_json().is_ok());
    assert!(enterprise.to_sarif().unwrap_err().is_license());

    let corporate = audit(Tier::Corporate).await;
    let sarif: serde_json::Value = serde_json::from_str(&corporate.to_sarif().unwrap()).unwrap();
    let results = sarif["runs"][0]["results"].as_array().unwrap();
    assert_eq!(results.len(), corporate.summary.total);
}

#[tokio::test]
async fn test_json_matches_raw_results() {
    let results = audit(Tier::Enterprise).await;
    let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();

    assert_eq!(json["raw"]["results"].as_array().unwrap().len(), results.raw.results.len());
    assert_eq!(json["summary"]["total"], results.summary.total);
    assert_eq!(json["violations"].as_array().unwrap().len(), results.violations.len());
    assert_eq!(json["passed"], results.passed());
    assert_eq!(json["raw"]["framework"], "puppeteer");
}

#[tokio::test]
async fn test_reports_are_repeatable() {
    let results = audit(Tier::Corporate).await;
    for name in ["html", "summary-html", "json", "sarif"] {
        let reporter = reporter_for(name).unwrap();
        assert_eq!(
            reporter.generate(&results).unwrap(),
            reporter.generate(&results).unwrap(),
            "{} output differs between runs",
            name
        );
    }
}
