// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-memory hosts for offline audits and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{PageHost, WindowHost};
use crate::error::{Error, Result};
use crate::snapshot::Cookie;

fn to_markers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Page host serving fixed content
#[derive(Debug, Default)]
pub struct StaticHost {
    url: String,
    html: String,
    headers: Option<HashMap<String, String>>,
    cookies: Vec<Cookie>,
    markers: Vec<String>,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StaticHost {
    /// Host with no framework markers
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    /// Host that looks like a Playwright page
    pub fn playwright(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self::new(url, html).with_markers(&["goto", "content", "url", "context", "locator"])
    }

    /// Host that looks like a Puppeteer page
    pub fn puppeteer(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self::new(url, html).with_markers(&["goto", "content", "url", "target", "browser", "$eval"])
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = to_markers(markers);
        self
    }

    /// Set all response headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add one response header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Delay every content read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every content read fail
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of introspection calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageHost for StaticHost {
    fn markers(&self) -> Vec<String> {
        self.markers.clone()
    }

    async fn url(&self) -> Result<String> {
        self.record();
        Ok(self.url.clone())
    }

    async fn content(&self) -> Result<String> {
        self.record();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(Error::capture(message.clone())),
            None => Ok(self.html.clone()),
        }
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        self.record();
        Ok(self.cookies.clone())
    }

    async fn response_headers(&self) -> Result<Option<HashMap<String, String>>> {
        self.record();
        Ok(self.headers.clone())
    }
}

/// Window host serving fixed content, as seen from inside the page
#[derive(Debug, Default)]
pub struct StaticWindow {
    href: String,
    html: String,
    cookie: String,
    markers: Vec<String>,
    calls: AtomicUsize,
}

impl StaticWindow {
    pub fn new(href: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    /// Window of a page under Cypress control
    pub fn cypress(href: impl Into<String>, html: impl Into<String>) -> Self {
        Self::new(href, html).with_markers(&["Cypress", "document", "location"])
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = to_markers(markers);
        self
    }

    /// Set the `document.cookie` string
    pub fn with_document_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowHost for StaticWindow {
    fn markers(&self) -> Vec<String> {
        self.markers.clone()
    }

    async fn location_href(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.href.clone())
    }

    async fn document_html(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }

    async fn document_cookie(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cookie.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_are_counted() {
        let host = StaticHost::new("https://a.com", "<p></p>").with_header("X-Test", "1");
        tokio_test::block_on(async {
            assert_eq!(host.url().await.unwrap(), "https://a.com");
            assert_eq!(host.response_headers().await.unwrap().unwrap()["X-Test"], "1");
        });
        assert_eq!(host.calls(), 2);
    }

    #[test]
    fn test_failing_host() {
        let host = StaticHost::new("https://a.com", "").failing("target closed");
        let err = tokio_test::block_on(host.content()).unwrap_err();
        assert!(err.to_string().contains("target closed"));
    }

    #[test]
    fn test_window_cookie_string() {
        let window = StaticWindow::cypress("https://a.com", "").with_document_cookie("a=1; b=2");
        assert_eq!(tokio_test::block_on(window.document_cookie()).unwrap(), "a=1; b=2");
        assert!(window.markers().contains(&"Cypress".to_string()));
    }
}
