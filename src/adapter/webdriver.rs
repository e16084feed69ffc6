// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! WebDriver adapter and W3C wire-protocol client
//!
//! Selenium and WebdriverIO sessions only expose the page through the
//! WebDriver protocol: URL, page source and cookies. Response headers are
//! never visible.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{mismatch, Adapter, DriverHost, Framework, HostHandle};
use crate::error::{Error, Result};
use crate::snapshot::{Cookie, SameSite, Snapshot, SnapshotParts};

/// WebDriver client configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Remote end, e.g. `http://localhost:4444`
    pub endpoint: String,
    /// Per-command timeout
    pub timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Every W3C response wraps its payload in `value`
#[derive(Debug, Deserialize)]
struct W3cResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct W3cError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct W3cCookie {
    name: String,
    value: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    secure: Option<bool>,
    #[serde(default)]
    http_only: Option<bool>,
    #[serde(default)]
    same_site: Option<String>,
}

impl From<W3cCookie> for Cookie {
    fn from(c: W3cCookie) -> Self {
        Cookie {
            name: c.name,
            value: c.value,
            domain: c.domain.unwrap_or_default().trim_start_matches('.').to_string(),
            path: c.path.unwrap_or_else(|| "/".to_string()),
            secure: Some(c.secure.unwrap_or(false)),
            http_only: c.http_only.unwrap_or(false),
            same_site: c.same_site.as_deref().and_then(SameSite::parse),
        }
    }
}

/// Client for one existing WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    client: Client,
    endpoint: Url,
    session_id: String,
}

impl WebDriverClient {
    /// Attach to a session on the given remote end
    pub fn new(endpoint: &str, session_id: impl Into<String>) -> Result<Self> {
        Self::with_config(
            WebDriverConfig {
                endpoint: endpoint.to_string(),
                ..Default::default()
            },
            session_id,
        )
    }

    /// Attach with custom configuration
    pub fn with_config(config: WebDriverConfig, session_id: impl Into<String>) -> Result<Self> {
        let session_id = session_id.into();
        if session_id.trim().is_empty() {
            return Err(Error::config("WebDriver session id is empty"));
        }

        let mut endpoint = Url::parse(&config.endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command<T: DeserializeOwned>(&self, command: &str) -> Result<T> {
        let url = self
            .endpoint
            .join(&format!("session/{}/{}", self.session_id, command))?;

        debug!(url = %url, "WebDriver command");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<W3cResponse<W3cError>>(&body)
                .map(|r| format!("{}: {}", r.value.error, r.value.message))
                .unwrap_or(body);
            warn!(command, status = status.as_u16(), "WebDriver command failed");
            return Err(Error::capture(format!(
                "WebDriver '{}' failed with {}: {}",
                command, status, detail
            )));
        }

        let parsed: W3cResponse<T> = response.json().await?;
        Ok(parsed.value)
    }
}

#[async_trait]
impl DriverHost for WebDriverClient {
    fn markers(&self) -> Vec<String> {
        vec!["sessionId".to_string(), "getPageSource".to_string()]
    }

    async fn current_url(&self) -> Result<String> {
        self.command("url").await
    }

    async fn page_source(&self) -> Result<String> {
        self.command("source").await
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let cookies: Vec<W3cCookie> = self.command("cookie").await?;
        Ok(cookies.into_iter().map(Cookie::from).collect())
    }
}

/// Captures snapshots from a WebDriver session handle
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDriverAdapter;

#[async_trait]
impl Adapter for WebDriverAdapter {
    fn framework(&self) -> Framework {
        Framework::WebDriver
    }

    async fn capture(&self, handle: &HostHandle) -> Result<Snapshot> {
        let HostHandle::Driver(driver) = handle else {
            return Err(mismatch(Framework::WebDriver, handle));
        };

        let url = driver.current_url().await?;
        let html = driver.page_source().await?;
        let cookies = driver.cookies().await?;

        debug!(url = %url, html_len = html.len(), cookies = cookies.len(), "Captured driver snapshot");

        Snapshot::new(SnapshotParts::new(url, html).cookies(cookies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w3c_cookie_conversion() {
        let raw = r#"{"value":[{"name":"sid","value":"x","path":"/","domain":".example.com","secure":true,"httpOnly":true,"sameSite":"Strict"},{"name":"t","value":"y"}]}"#;
        let parsed: W3cResponse<Vec<W3cCookie>> = serde_json::from_str(raw).unwrap();
        let cookies: Vec<Cookie> = parsed.value.into_iter().map(Cookie::from).collect();

        assert_eq!(cookies[0].domain, "example.com");
        assert_eq!(cookies[0].same_site, Some(SameSite::Strict));
        assert!(cookies[0].http_only);
        assert_eq!(cookies[1].secure, Some(false));
        assert_eq!(cookies[1].path, "/");
    }

    #[test]
    fn test_empty_session_rejected() {
        let err = WebDriverClient::new("http://localhost:4444", " ").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_endpoint_with_base_path() {
        let client = WebDriverClient::new("http://grid.local:4444/wd/hub", "abc").unwrap();
        let url = client.endpoint.join("session/abc/url").unwrap();
        assert_eq!(url.as_str(), "http://grid.local:4444/wd/hub/session/abc/url");
    }
}
