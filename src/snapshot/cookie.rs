// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie records as seen by the audited page

use serde::{Deserialize, Serialize};
use url::Url;

/// A single cookie captured from the host
///
/// `secure` and `same_site` are `None` when the host cannot tell
/// (for example cookies read through `document.cookie`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain the cookie belongs to
    pub domain: String,
    /// Path the cookie is valid for
    pub path: String,
    /// Secure flag (HTTPS only)
    pub secure: Option<bool>,
    /// HttpOnly flag (not accessible via JavaScript)
    pub http_only: bool,
    /// SameSite attribute
    pub same_site: Option<SameSite>,
}

/// SameSite cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Cookie sent with all requests
    None,
    /// Cookie sent with same-site and top-level navigations
    Lax,
    /// Cookie only sent with same-site requests
    Strict,
}

impl SameSite {
    /// Parse an attribute value, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

impl Cookie {
    /// Create a new cookie with all attributes known and unset
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            secure: Some(false),
            http_only: false,
            same_site: None,
        }
    }

    /// Set the domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set secure flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set http_only flag
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set same_site attribute
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Whether the name looks like a session or auth token
    pub fn is_session_like(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        ["sess", "sid", "auth", "token", "jwt", "login", "remember"]
            .iter()
            .any(|marker| name.contains(marker))
    }

    /// Parse a Set-Cookie header value
    pub fn parse(header: &str, url: &Url) -> Option<Self> {
        let mut parts = header.split(';');
        let first = parts.next()?.trim();

        let (name, value) = first.split_once('=')?;
        let mut cookie = Cookie::new(name.trim(), value.trim());

        // Default domain to request host
        cookie.domain = url.host_str().unwrap_or("").to_string();

        for part in parts {
            let part = part.trim();
            if let Some((attr, val)) = part.split_once('=') {
                let val = val.trim();
                match attr.trim().to_ascii_lowercase().as_str() {
                    "domain" => cookie.domain = val.trim_start_matches('.').to_string(),
                    "path" => cookie.path = val.to_string(),
                    "samesite" => cookie.same_site = SameSite::parse(val),
                    _ => {}
                }
            } else {
                match part.to_ascii_lowercase().as_str() {
                    "secure" => cookie.secure = Some(true),
                    "httponly" => cookie.http_only = true,
                    _ => {}
                }
            }
        }

        Some(cookie)
    }

    /// Parse a `document.cookie` string
    ///
    /// Everything visible there is readable by script, so `http_only` is
    /// known to be false; the other attributes are not exposed.
    pub fn from_document_cookie(cookie_string: &str, url: &Url) -> Vec<Self> {
        let domain = url.host_str().unwrap_or("").to_string();

        cookie_string
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Self {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                    domain: domain.clone(),
                    path: "/".to_string(),
                    secure: None,
                    http_only: false,
                    same_site: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_parsing() {
        let url = Url::parse("https://example.com/path").unwrap();
        let header = "session=abc123; Domain=.example.com; Path=/; Secure; HttpOnly; SameSite=Lax";
        let cookie = Cookie::parse(header, &url).unwrap();

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, "example.com");
        assert_eq!(cookie.secure, Some(true));
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
    }

    #[test]
    fn test_plain_set_cookie_has_known_flags() {
        let url = Url::parse("https://example.com/").unwrap();
        let cookie = Cookie::parse("theme=dark", &url).unwrap();

        assert_eq!(cookie.secure, Some(false));
        assert!(!cookie.http_only);
        assert_eq!(cookie.same_site, None);
    }

    #[test]
    fn test_document_cookie() {
        let url = Url::parse("https://shop.example.com/").unwrap();
        let cookies = Cookie::from_document_cookie("a=1; sessionid=xyz; =broken; b=", &url);

        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[1].name, "sessionid");
        assert!(cookies[1].is_session_like());
        assert_eq!(cookies[1].secure, None);
        assert_eq!(cookies[0].domain, "shop.example.com");
    }
}
