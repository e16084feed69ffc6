// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Framework detection from host markers
//!
//! Each host family has a characteristic set of globals or method names.
//! Detection is a pure function of the handle family and those markers.

use tracing::debug;

use super::{Framework, HostHandle};

/// Playwright pages carry a browser context and locators
const PLAYWRIGHT_MARKERS: &[&str] = &["context", "locator"];

/// Puppeteer pages expose their CDP target and browser
const PUPPETEER_MARKERS: &[&str] = &["target", "browser"];

fn has(markers: &[String], name: &str) -> bool {
    markers.iter().any(|m| m == name)
}

fn has_all(markers: &[String], names: &[&str]) -> bool {
    names.iter().all(|n| has(markers, n))
}

/// Identify the automation framework behind a handle
pub fn detect_framework(handle: &HostHandle) -> Framework {
    let markers = handle.markers();

    let framework = match handle {
        HostHandle::Window(_) if has(&markers, "Cypress") => Framework::Cypress,
        HostHandle::Page(_) if has_all(&markers, PLAYWRIGHT_MARKERS) => Framework::Playwright,
        HostHandle::Page(_) if has_all(&markers, PUPPETEER_MARKERS) || has(&markers, "$eval") => {
            Framework::Puppeteer
        }
        HostHandle::Driver(_) if has(&markers, "sessionId") || has(&markers, "getPageSource") => {
            Framework::WebDriver
        }
        _ => Framework::Unknown,
    };

    debug!(handle = handle.kind(), framework = %framework, "Detected framework");
    framework
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapter::{StaticHost, StaticWindow};

    #[test]
    fn test_detect_page_flavours() {
        let playwright = HostHandle::page(Arc::new(StaticHost::playwright("https://a.com", "")));
        assert_eq!(detect_framework(&playwright), Framework::Playwright);

        let puppeteer = HostHandle::page(Arc::new(StaticHost::puppeteer("https://a.com", "")));
        assert_eq!(detect_framework(&puppeteer), Framework::Puppeteer);

        let eval_only = HostHandle::page(Arc::new(
            StaticHost::new("https://a.com", "").with_markers(&["$eval", "goto"]),
        ));
        assert_eq!(detect_framework(&eval_only), Framework::Puppeteer);
    }

    #[test]
    fn test_detect_window() {
        let cypress = HostHandle::window(Arc::new(StaticWindow::cypress("https://a.com", "")));
        assert_eq!(detect_framework(&cypress), Framework::Cypress);

        let bare = HostHandle::window(Arc::new(
            StaticWindow::new("https://a.com", "").with_markers(&["document"]),
        ));
        assert_eq!(detect_framework(&bare), Framework::Unknown);
    }

    #[test]
    fn test_markers_without_family_are_unknown() {
        // A page object with only one Playwright marker is not enough
        let page = HostHandle::page(Arc::new(
            StaticHost::new("https://a.com", "").with_markers(&["context", "goto"]),
        ));
        assert_eq!(detect_framework(&page), Framework::Unknown);
    }
}
