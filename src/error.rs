// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the QAstell audit engine
//!
//! Configuration mistakes are reported before any host call is made,
//! host failures abort only the current audit, and per-rule failures are
//! never raised at all: they are recorded inside the raw results.

use thiserror::Error;

use crate::adapter::Framework;
use crate::license::Tier;

/// Result type alias for QAstell operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the audit engine
#[derive(Error, Debug)]
pub enum Error {
    /// No framework override and the handle carries no known markers
    #[error("Could not detect automation framework for {handle_kind} handle; pass a framework override")]
    FrameworkDetection { handle_kind: String },

    /// Forced framework cannot serve this kind of handle
    #[error("Framework {framework} cannot audit a {handle_kind} handle")]
    FrameworkMismatch {
        framework: Framework,
        handle_kind: String,
    },

    /// A single rule failed to evaluate
    #[error("Rule '{rule_id}' failed to evaluate: {reason}")]
    RuleEvaluation { rule_id: String, reason: String },

    /// Snapshot capture did not finish in time
    #[error("Snapshot capture timed out after {duration_ms}ms ({framework})")]
    CaptureTimeout {
        framework: Framework,
        duration_ms: u64,
        url: Option<String>,
    },

    /// The host failed to answer an introspection call
    #[error("Snapshot capture failed: {0}")]
    Capture(String),

    /// Report format needs a higher license tier
    #[error("{format} reports require the {required} tier or higher (current: {actual})")]
    License {
        format: String,
        required: Tier,
        actual: Tier,
    },

    /// `assert_no_violations` found rules over their thresholds
    #[error("Security audit failed: {failing_rules} rule(s) exceeded thresholds: {}", rule_ids.join(", "))]
    AssertionFailed {
        failing_rules: usize,
        rule_ids: Vec<String>,
        total_violations: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// WebDriver transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a capture error
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a rule evaluation error
    pub fn rule_evaluation(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::RuleEvaluation {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a capture timeout error
    pub fn capture_timeout(framework: Framework, duration_ms: u64) -> Self {
        Error::CaptureTimeout {
            framework,
            duration_ms,
            url: None,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a capture timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::CaptureTimeout { .. })
    }

    /// Check if this is a license (tier) error
    pub fn is_license(&self) -> bool {
        matches!(self, Error::License { .. })
    }

    /// Configuration mistakes, reported before any host call
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::FrameworkMismatch { .. } | Error::FrameworkDetection { .. }
        )
    }

    /// Errors that abort the current audit call
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::RuleEvaluation { .. } | Error::License { .. } | Error::AssertionFailed { .. }
        )
    }

    /// Get rule id if the error concerns a single rule
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            Error::RuleEvaluation { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }

    /// Add URL context to a capture timeout
    pub fn with_url(mut self, page_url: impl Into<String>) -> Self {
        if let Error::CaptureTimeout { ref mut url, .. } = self {
            *url = Some(page_url.into());
        }
        self
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let err = Error::capture_timeout(Framework::Playwright, 5000).with_url("https://example.com");

        assert!(err.is_timeout());
        assert!(err.is_fatal());
        if let Error::CaptureTimeout { url, .. } = &err {
            assert_eq!(url.as_deref(), Some("https://example.com"));
        } else {
            panic!("Expected CaptureTimeout");
        }
    }

    #[test]
    fn test_rule_error_is_recoverable() {
        let err = Error::rule_evaluation("missing-hsts", "bad header");
        assert!(!err.is_fatal());
        assert_eq!(err.rule_id(), Some("missing-hsts"));
    }

    #[test]
    fn test_assertion_message_names_rules() {
        let err = Error::AssertionFailed {
            failing_rules: 2,
            rule_ids: vec!["a".to_string(), "b".to_string()],
            total_violations: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 rule(s)"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn test_license_error() {
        let err = Error::License {
            format: "SARIF".to_string(),
            required: Tier::Corporate,
            actual: Tier::Free,
        };
        assert!(err.is_license());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("Corporate"));
    }

    #[test]
    fn test_config_errors() {
        assert!(Error::config("duplicate rule id").is_configuration());
        assert!(Error::FrameworkDetection {
            handle_kind: "page".to_string()
        }
        .is_configuration());
    }
}
