// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Rule catalogue
//!
//! Every rule is a stateless value record: a stable id, a category, a
//! default severity and a pure `fn(&Snapshot)` that returns findings.
//! Findings, thresholds and allow-lists refer to rules by id only, so
//! persisted configuration survives catalogue additions.
//!
//! - `headers` - security headers, CORS, clickjacking, permissions policy
//! - `csp` - Content Security Policy analysis
//! - `cookies` - cookie flags
//! - `forms` - form submission safety
//! - `links` - javascript: links, tabnabbing, mixed content
//! - `resources` - SRI and third-party scripts
//! - `xss` - inline handlers, mXSS vectors, DOM sinks, reflection
//! - `clobbering` - DOM clobbering and prototype pollution vectors
//! - `sensitive` - leaked secrets and sensitive URLs

mod clobbering;
mod cookies;
mod csp;
mod forms;
mod headers;
mod links;
mod resources;
mod sensitive;
mod xss;

pub use csp::{CspAnalysis, CspAnalyzer, CspIssue};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::snapshot::{ElementInfo, Snapshot};

/// Finding severity, ordered `Info < Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule category. Open to extension, never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    Headers,
    Csp,
    Cookies,
    Forms,
    Cors,
    Clickjacking,
    Links,
    Tabnabbing,
    Sri,
    ThirdParty,
    InlineHandlers,
    DomClobbering,
    MutationXss,
    HtmlInjection,
    PrototypePollution,
    SensitiveData,
    PermissionsPolicy,
    MixedContent,
}

impl RuleCategory {
    /// Every category, in catalogue order
    pub const ALL: [RuleCategory; 18] = [
        RuleCategory::Headers,
        RuleCategory::Csp,
        RuleCategory::Cookies,
        RuleCategory::Forms,
        RuleCategory::Cors,
        RuleCategory::Clickjacking,
        RuleCategory::Links,
        RuleCategory::Tabnabbing,
        RuleCategory::Sri,
        RuleCategory::ThirdParty,
        RuleCategory::InlineHandlers,
        RuleCategory::DomClobbering,
        RuleCategory::MutationXss,
        RuleCategory::HtmlInjection,
        RuleCategory::PrototypePollution,
        RuleCategory::SensitiveData,
        RuleCategory::PermissionsPolicy,
        RuleCategory::MixedContent,
    ];

    /// Kebab-case identifier used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Headers => "headers",
            RuleCategory::Csp => "csp",
            RuleCategory::Cookies => "cookies",
            RuleCategory::Forms => "forms",
            RuleCategory::Cors => "cors",
            RuleCategory::Clickjacking => "clickjacking",
            RuleCategory::Links => "links",
            RuleCategory::Tabnabbing => "tabnabbing",
            RuleCategory::Sri => "sri",
            RuleCategory::ThirdParty => "third-party",
            RuleCategory::InlineHandlers => "inline-handlers",
            RuleCategory::DomClobbering => "dom-clobbering",
            RuleCategory::MutationXss => "mutation-xss",
            RuleCategory::HtmlInjection => "html-injection",
            RuleCategory::PrototypePollution => "prototype-pollution",
            RuleCategory::SensitiveData => "sensitive-data",
            RuleCategory::PermissionsPolicy => "permissions-policy",
            RuleCategory::MixedContent => "mixed-content",
        }
    }

    /// Parse a kebab-case identifier
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a finding in the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Selector (or pseudo-selector such as `header:x-frame-options`)
    pub selector: String,
    /// Snippet of offending markup or value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ElementRef {
    /// Reference to a DOM element, with its opening tag as context
    pub fn element(element: &ElementInfo) -> Self {
        Self {
            selector: element.selector.clone(),
            context: Some(element.outer_tag(200)),
        }
    }

    /// Reference to a response header
    pub fn header(name: &str, value: Option<&str>) -> Self {
        Self {
            selector: format!("header:{}", name),
            context: value.map(|v| crate::snapshot::truncate(v, 200)),
        }
    }

    /// Reference to a cookie
    pub fn cookie(name: &str) -> Self {
        Self {
            selector: format!("cookie:{}", name),
            context: None,
        }
    }

    /// Reference to the page itself
    pub fn document(context: Option<String>) -> Self {
        Self {
            selector: "document".to_string(),
            context,
        }
    }
}

/// One occurrence of a rule's condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Human-readable message
    pub message: String,
    /// Where it was found
    pub element: ElementRef,
}

impl Finding {
    /// Create a finding
    pub fn new(message: impl Into<String>, element: ElementRef) -> Self {
        Self {
            message: message.into(),
            element,
        }
    }
}

/// A rule could not make sense of its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RuleError(pub String);

impl RuleError {
    pub fn new(msg: impl Into<String>) -> Self {
        RuleError(msg.into())
    }
}

/// What a rule evaluation returns
pub type RuleOutcome = std::result::Result<Vec<Finding>, RuleError>;

/// Rule evaluation function
pub type RuleFn = fn(&Snapshot) -> RuleOutcome;

/// A named, categorized, severity-tagged check
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable unique id
    pub id: &'static str,
    /// Short human name
    pub name: &'static str,
    /// Category
    pub category: RuleCategory,
    /// Default severity
    pub severity: Severity,
    /// What the rule checks
    pub description: &'static str,
    /// CWE id, used in SARIF output
    pub cwe: Option<u32>,
    /// Evaluation function
    pub evaluate: RuleFn,
}

impl Rule {
    /// Run the check
    pub fn run(&self, snapshot: &Snapshot) -> RuleOutcome {
        (self.evaluate)(snapshot)
    }

    /// Serializable description of this rule
    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category,
            severity: self.severity,
            description: self.description.to_string(),
            cwe: self.cwe,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .finish()
    }
}

/// Rule metadata without the evaluation function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<u32>,
}

lazy_static::lazy_static! {
    static ref ALL_RULES: Vec<Rule> = {
        let mut rules = Vec::new();
        rules.extend(headers::rules());
        rules.extend(csp::rules());
        rules.extend(cookies::rules());
        rules.extend(forms::rules());
        rules.extend(links::rules());
        rules.extend(resources::rules());
        rules.extend(xss::rules());
        rules.extend(clobbering::rules());
        rules.extend(sensitive::rules());
        rules
    };
}

/// The built-in catalogue
pub fn all_rules() -> &'static [Rule] {
    &ALL_RULES
}

/// Built-in rules in one category
pub fn rules_in_category(category: RuleCategory) -> Vec<Rule> {
    all_rules()
        .iter()
        .filter(|r| r.category == category)
        .copied()
        .collect()
}

/// A validated rule set keyed by id
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    index: HashMap<&'static str, usize>,
}

impl RuleRegistry {
    /// Build a registry, rejecting duplicate ids
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.id, i).is_some() {
                return Err(Error::config(format!("duplicate rule id '{}'", rule.id)));
            }
        }
        Ok(Self { rules, index })
    }

    /// Registry over the built-in catalogue
    pub fn builtin() -> Result<Self> {
        Self::new(all_rules().to_vec())
    }

    /// Rule by id
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    /// All rules in registration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules of one category
    pub fn by_category(&self, category: RuleCategory) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    /// All ids
    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Shorthand used by header-based rules: no headers, no findings
pub(crate) fn without_headers(snapshot: &Snapshot) -> bool {
    !snapshot.headers_available()
}
