// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Automation host adapters
//!
//! A host handle is whatever the test harness gives us: a Cypress window,
//! a Playwright/Puppeteer page or a WebDriver session. Adapters turn one of
//! those into a [`Snapshot`] without knowing anything about rules.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qastell::adapter::{detect_framework, Framework, HostHandle, StaticHost};
//!
//! let page = StaticHost::playwright("https://example.com", "<html></html>");
//! let handle = HostHandle::page(Arc::new(page));
//! assert_eq!(detect_framework(&handle), Framework::Playwright);
//! ```

mod cypress;
mod detect;
mod page;
mod static_host;
mod webdriver;

pub use cypress::CypressAdapter;
pub use detect::detect_framework;
pub use page::PageAdapter;
pub use static_host::{StaticHost, StaticWindow};
pub use webdriver::{WebDriverAdapter, WebDriverClient, WebDriverConfig};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot::{Cookie, Snapshot};

/// Supported automation frameworks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Cypress,
    Playwright,
    Puppeteer,
    #[serde(rename = "webdriver")]
    WebDriver,
    Unknown,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Cypress => "cypress",
            Framework::Playwright => "playwright",
            Framework::Puppeteer => "puppeteer",
            Framework::WebDriver => "webdriver",
            Framework::Unknown => "unknown",
        }
    }

    /// Handle family this framework's adapter serves
    pub fn handle_kind(&self) -> Option<&'static str> {
        match self {
            Framework::Cypress => Some("window"),
            Framework::Playwright | Framework::Puppeteer => Some("page"),
            Framework::WebDriver => Some("driver"),
            Framework::Unknown => None,
        }
    }

    /// Whether this framework's adapter can capture from `handle`
    pub fn serves(&self, handle: &HostHandle) -> bool {
        self.handle_kind() == Some(handle.kind())
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cypress `cy.window()` object
#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Globals present on the window
    fn markers(&self) -> Vec<String>;

    /// `window.location.href`
    async fn location_href(&self) -> Result<String>;

    /// `document.documentElement.outerHTML`
    async fn document_html(&self) -> Result<String>;

    /// `document.cookie`
    async fn document_cookie(&self) -> Result<String>;
}

/// Playwright or Puppeteer page object
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Method and property names present on the page object
    fn markers(&self) -> Vec<String>;

    async fn url(&self) -> Result<String>;

    /// Serialized DOM
    async fn content(&self) -> Result<String>;

    /// Browser context cookies with full attributes
    async fn cookies(&self) -> Result<Vec<Cookie>>;

    /// Headers of the main navigation response, `None` when unavailable
    async fn response_headers(&self) -> Result<Option<HashMap<String, String>>>;
}

/// WebDriver session (Selenium, WebdriverIO)
#[async_trait]
pub trait DriverHost: Send + Sync {
    /// Method and property names present on the driver object
    fn markers(&self) -> Vec<String>;

    async fn current_url(&self) -> Result<String>;

    async fn page_source(&self) -> Result<String>;

    async fn cookies(&self) -> Result<Vec<Cookie>>;
}

/// Opaque handle to a live browser context
#[derive(Clone)]
pub enum HostHandle {
    Window(Arc<dyn WindowHost>),
    Page(Arc<dyn PageHost>),
    Driver(Arc<dyn DriverHost>),
}

impl HostHandle {
    pub fn window(host: Arc<dyn WindowHost>) -> Self {
        HostHandle::Window(host)
    }

    pub fn page(host: Arc<dyn PageHost>) -> Self {
        HostHandle::Page(host)
    }

    pub fn driver(host: Arc<dyn DriverHost>) -> Self {
        HostHandle::Driver(host)
    }

    /// Handle family, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            HostHandle::Window(_) => "window",
            HostHandle::Page(_) => "page",
            HostHandle::Driver(_) => "driver",
        }
    }

    /// Markers exposed by the underlying host
    pub fn markers(&self) -> Vec<String> {
        match self {
            HostHandle::Window(h) => h.markers(),
            HostHandle::Page(h) => h.markers(),
            HostHandle::Driver(h) => h.markers(),
        }
    }

    /// Current page URL, as the host reports it
    pub async fn current_url(&self) -> Result<String> {
        match self {
            HostHandle::Window(h) => h.location_href().await,
            HostHandle::Page(h) => h.url().await,
            HostHandle::Driver(h) => h.current_url().await,
        }
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostHandle").field(&self.kind()).finish()
    }
}

/// Turns a host handle into a snapshot
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Framework this adapter speaks
    fn framework(&self) -> Framework;

    /// Capture the current page state
    async fn capture(&self, handle: &HostHandle) -> Result<Snapshot>;
}

/// Adapter for a framework, `None` for [`Framework::Unknown`]
pub fn adapter_for(framework: Framework) -> Option<Box<dyn Adapter>> {
    match framework {
        Framework::Cypress => Some(Box::new(CypressAdapter)),
        Framework::Playwright | Framework::Puppeteer => Some(Box::new(PageAdapter::new(framework))),
        Framework::WebDriver => Some(Box::new(WebDriverAdapter)),
        Framework::Unknown => None,
    }
}

/// Mismatch error for a forced framework and a foreign handle
pub(crate) fn mismatch(framework: Framework, handle: &HostHandle) -> crate::error::Error {
    crate::error::Error::FrameworkMismatch {
        framework,
        handle_kind: handle.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_serde() {
        assert_eq!(serde_json::to_string(&Framework::WebDriver).unwrap(), "\"webdriver\"");
        let parsed: Framework = serde_json::from_str("\"playwright\"").unwrap();
        assert_eq!(parsed, Framework::Playwright);
        assert_eq!(Framework::Cypress.to_string(), "cypress");
    }

    #[test]
    fn test_adapter_for() {
        assert!(adapter_for(Framework::Unknown).is_none());
        for framework in [
            Framework::Cypress,
            Framework::Playwright,
            Framework::Puppeteer,
            Framework::WebDriver,
        ] {
            assert_eq!(adapter_for(framework).unwrap().framework(), framework);
        }
    }

    #[tokio::test]
    async fn test_mismatch_is_configuration_error() {
        let handle = HostHandle::page(Arc::new(StaticHost::playwright("https://a.com", "")));
        let err = CypressAdapter.capture(&handle).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("page"));
    }
}
