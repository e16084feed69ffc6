// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::Arc;

use qastell::license::LicenseKey;
use qastell::{
    get_license_usage, get_tier_display_name, init_license, reset_license, AuditOptions, HostHandle,
    RuleCategory, SecurityAuditor, StaticHost, Tier,
};

// The process-wide session is shared, so everything touching it lives in
// one test.
#[tokio::test]
async fn test_global_license_lifecycle() {
    reset_license();
    std::env::remove_var("QASTELL_LICENSE");

    let usage = init_license(None);
    assert_eq!(usage.tier, Tier::Free);
    assert_eq!(usage.remaining, 10);
    assert_eq!(get_tier_display_name(usage.tier), "Free");

    std::env::set_var(
        "QASTELL_LICENSE",
        LicenseKey::new(Tier::Enterprise).with_daily_limit(2).encode(),
    );
    let usage = init_license(None);
    assert_eq!(usage.tier, Tier::Enterprise);
    assert_eq!(usage.daily_limit, 2);

    let usage = init_license(Some("your-license-key-here"));
    assert_eq!(usage.tier, Tier::Free);

    init_license(None);
    let host = StaticHost::playwright("https://example.com/", "<p>hi</p>");
    let auditor = SecurityAuditor::new(HostHandle::page(Arc::new(host)));
    let options = AuditOptions::new().include(RuleCategory::Headers);

    assert!(!auditor.audit(&options).await.unwrap().skipped);
    assert_eq!(get_license_usage().remaining, 1);
    assert_eq!(get_license_usage(), get_license_usage());

    assert!(!auditor.audit(&options).await.unwrap().skipped);
    assert!(get_license_usage().exhausted);

    let skipped = auditor.audit(&options).await.unwrap();
    assert!(skipped.skipped);
    assert_eq!(skipped.tier, Tier::Enterprise);

    reset_license();
    std::env::remove_var("QASTELL_LICENSE");
    let usage = get_license_usage();
    assert_eq!(usage.tier, Tier::Free);
    assert!(!usage.exhausted);
}
