// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Playwright and Puppeteer adapter
//!
//! Both drive a page object from outside the browser, so they see the
//! navigation response headers and full cookie attributes.

use async_trait::async_trait;
use tracing::debug;

use super::{mismatch, Adapter, Framework, HostHandle};
use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotParts};

/// Captures snapshots from a page handle
#[derive(Debug, Clone, Copy)]
pub struct PageAdapter {
    framework: Framework,
}

impl PageAdapter {
    /// Adapter reporting the given page flavour
    pub fn new(framework: Framework) -> Self {
        Self { framework }
    }

    pub fn playwright() -> Self {
        Self::new(Framework::Playwright)
    }

    pub fn puppeteer() -> Self {
        Self::new(Framework::Puppeteer)
    }
}

#[async_trait]
impl Adapter for PageAdapter {
    fn framework(&self) -> Framework {
        self.framework
    }

    async fn capture(&self, handle: &HostHandle) -> Result<Snapshot> {
        let HostHandle::Page(page) = handle else {
            return Err(mismatch(self.framework, handle));
        };

        let url = page.url().await?;
        let html = page.content().await?;
        let cookies = page.cookies().await?;
        let headers = page.response_headers().await?;

        debug!(
            framework = %self.framework,
            url = %url,
            html_len = html.len(),
            headers = headers.as_ref().map_or(0, |h| h.len()),
            "Captured page snapshot"
        );

        let mut parts = SnapshotParts::new(url, html).cookies(cookies);
        if let Some(headers) = headers {
            parts = parts.headers(headers);
        }
        Snapshot::new(parts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapter::{StaticHost, StaticWindow};
    use crate::snapshot::Cookie;

    #[tokio::test]
    async fn test_page_capture_with_headers() {
        let host = StaticHost::playwright("https://example.com/", "<p>ok</p>")
            .with_header("Strict-Transport-Security", "max-age=31536000")
            .with_cookies(vec![Cookie::new("sid", "1").secure(true).http_only(true)]);
        let handle = HostHandle::page(Arc::new(host));

        let snapshot = PageAdapter::playwright().capture(&handle).await.unwrap();
        assert!(snapshot.headers_available());
        assert_eq!(snapshot.header("strict-transport-security"), Some("max-age=31536000"));
        assert_eq!(snapshot.cookies()[0].secure, Some(true));
    }

    #[tokio::test]
    async fn test_missing_response_headers() {
        let handle = HostHandle::page(Arc::new(StaticHost::puppeteer("https://example.com/", "")));
        let snapshot = PageAdapter::puppeteer().capture(&handle).await.unwrap();
        assert!(!snapshot.headers_available());
    }

    #[tokio::test]
    async fn test_window_handle_rejected() {
        let handle = HostHandle::window(Arc::new(StaticWindow::cypress("https://a.com", "")));
        let err = PageAdapter::playwright().capture(&handle).await.unwrap_err();
        assert!(matches!(err, crate::Error::FrameworkMismatch { .. }));
    }
}
