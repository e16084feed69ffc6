// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cypress adapter
//!
//! Cypress runs the audit inside the application window, so there is no
//! access to response headers and cookies come from `document.cookie`.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{mismatch, Adapter, Framework, HostHandle};
use crate::error::Result;
use crate::snapshot::{Cookie, Snapshot, SnapshotParts};

/// Captures snapshots from a Cypress `cy.window()` handle
#[derive(Debug, Clone, Copy, Default)]
pub struct CypressAdapter;

#[async_trait]
impl Adapter for CypressAdapter {
    fn framework(&self) -> Framework {
        Framework::Cypress
    }

    async fn capture(&self, handle: &HostHandle) -> Result<Snapshot> {
        let HostHandle::Window(window) = handle else {
            return Err(mismatch(Framework::Cypress, handle));
        };

        let href = window.location_href().await?;
        let html = window.document_html().await?;
        let cookie_string = window.document_cookie().await?;

        let cookies = match Url::parse(&href) {
            Ok(url) => Cookie::from_document_cookie(&cookie_string, &url),
            Err(_) => Vec::new(),
        };

        debug!(url = %href, html_len = html.len(), cookies = cookies.len(), "Captured window snapshot");

        Snapshot::new(SnapshotParts::new(href, html).cookies(cookies))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapter::StaticWindow;

    #[tokio::test]
    async fn test_window_capture() {
        let window = StaticWindow::cypress("https://app.example.com/", "<h1>Dashboard</h1>")
            .with_document_cookie("sessionid=abc; theme=dark");
        let handle = HostHandle::window(Arc::new(window));

        let snapshot = CypressAdapter.capture(&handle).await.unwrap();
        assert_eq!(snapshot.url(), "https://app.example.com/");
        assert!(!snapshot.headers_available());
        assert_eq!(snapshot.cookies().len(), 2);
        assert!(snapshot.cookies().iter().all(|c| c.secure.is_none() && !c.http_only));
        assert!(snapshot.elements_by_tag("h1").next().is_some());
    }
}
