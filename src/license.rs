// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! License gate
//!
//! Tier-based daily quota and premium report gating. A [`LicenseSession`]
//! is a cheap cloneable handle to shared state; one process-wide session
//! backs the free functions ([`init_license`], [`get_license_usage`],
//! [`reset_license`]) and auditors use it unless given their own.
//!
//! States: uninitialized, active (tier, remaining), exhausted. The quota
//! decrement is a single mutex-guarded compare-and-decrement so concurrent
//! audits can never overrun the daily limit.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Environment variable holding the default license key
pub const LICENSE_ENV_VAR: &str = "QASTELL_LICENSE";

/// Key prefix
const KEY_PREFIX: &str = "QASTELL-";

/// Placeholder shipped in `.env.example`
const PLACEHOLDER_KEY: &str = "your-license-key-here";

/// License tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Enterprise,
    Corporate,
}

impl Tier {
    /// Scans per UTC day
    pub fn daily_limit(&self) -> u32 {
        match self {
            Tier::Free => 10,
            Tier::Enterprise => 1_000,
            Tier::Corporate => 10_000,
        }
    }

    /// Name shown in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Enterprise => "Enterprise",
            Tier::Corporate => "Corporate",
        }
    }

    /// Fail with a license error unless this tier is at least `required`
    pub fn require(self, format: &str, required: Tier) -> Result<()> {
        if self >= required {
            Ok(())
        } else {
            Err(Error::License {
                format: format.to_string(),
                required,
                actual: self,
            })
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Display name of a tier
pub fn get_tier_display_name(tier: Tier) -> &'static str {
    tier.display_name()
}

/// Decoded license key payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKey {
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u32>,
}

impl LicenseKey {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            daily_limit: None,
        }
    }

    /// Override the tier's default daily limit
    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    /// Effective daily limit
    pub fn limit(&self) -> u32 {
        self.daily_limit.unwrap_or_else(|| self.tier.daily_limit())
    }

    /// Encode as `QASTELL-<base64 json>`
    pub fn encode(&self) -> String {
        // Serializing a plain struct with derived impls cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!("{}{}", KEY_PREFIX, STANDARD.encode(json))
    }

    /// Decode a key string
    pub fn decode(key: &str) -> Result<Self> {
        let key = key.trim();
        if key == PLACEHOLDER_KEY {
            return Err(Error::config("license key is still the placeholder value"));
        }

        let payload = key
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| Error::config(format!("license key must start with {}", KEY_PREFIX)))?;

        let bytes = STANDARD
            .decode(payload)
            .or_else(|_| URL_SAFE_NO_PAD.decode(payload))
            .map_err(|e| Error::config(format!("license key is not valid base64: {}", e)))?;

        let decoded: LicenseKey = serde_json::from_slice(&bytes)?;
        if decoded.daily_limit == Some(0) {
            return Err(Error::config("license key daily limit must be positive"));
        }
        Ok(decoded)
    }
}

/// Snapshot of license state, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUsage {
    pub tier: Tier,
    pub remaining: u32,
    pub daily_limit: u32,
    pub exhausted: bool,
}

/// Outcome of asking for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Quota unit taken
    Granted { tier: Tier, remaining: u32 },
    /// Quota exhausted for today
    Denied { tier: Tier },
}

impl Admission {
    pub fn tier(&self) -> Tier {
        match self {
            Admission::Granted { tier, .. } | Admission::Denied { tier } => *tier,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LicenseState {
    Uninitialized,
    Active {
        tier: Tier,
        remaining: u32,
        daily_limit: u32,
        day: NaiveDate,
    },
    Exhausted {
        tier: Tier,
        daily_limit: u32,
        day: NaiveDate,
    },
}

/// Shared license state
#[derive(Debug, Clone)]
pub struct LicenseSession {
    state: Arc<Mutex<LicenseState>>,
}

impl Default for LicenseSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LicenseSession {
    /// New uninitialized session
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LicenseState::Uninitialized)),
        }
    }

    /// Session already initialized with a key
    pub fn with_key(key: &str) -> Self {
        let session = Self::new();
        session.init(Some(key));
        session
    }

    /// Activate the session
    ///
    /// With no key, `QASTELL_LICENSE` is read. Missing or invalid keys fall
    /// back to the free tier.
    pub fn init(&self, key: Option<&str>) -> LicenseUsage {
        self.init_on(key, Utc::now().date_naive())
    }

    fn init_on(&self, key: Option<&str>, today: NaiveDate) -> LicenseUsage {
        *self.state.lock() = activate(key, today);
        self.usage()
    }

    /// Current state; never mutates
    pub fn usage(&self) -> LicenseUsage {
        match *self.state.lock() {
            LicenseState::Uninitialized => LicenseUsage {
                tier: Tier::Free,
                remaining: Tier::Free.daily_limit(),
                daily_limit: Tier::Free.daily_limit(),
                exhausted: false,
            },
            LicenseState::Active {
                tier,
                remaining,
                daily_limit,
                ..
            } => LicenseUsage {
                tier,
                remaining,
                daily_limit,
                exhausted: false,
            },
            LicenseState::Exhausted {
                tier, daily_limit, ..
            } => LicenseUsage {
                tier,
                remaining: 0,
                daily_limit,
                exhausted: true,
            },
        }
    }

    /// Current tier
    pub fn tier(&self) -> Tier {
        self.usage().tier
    }

    /// Take one quota unit if any is left
    pub fn try_consume(&self) -> Admission {
        self.try_consume_on(Utc::now().date_naive())
    }

    fn try_consume_on(&self, today: NaiveDate) -> Admission {
        let mut state = self.state.lock();
        if matches!(*state, LicenseState::Uninitialized) {
            *state = activate(None, today);
        }

        // New UTC day restores the full quota
        match *state {
            LicenseState::Active { tier, daily_limit, day, .. }
            | LicenseState::Exhausted { tier, daily_limit, day }
                if day < today =>
            {
                debug!(tier = %tier, "New quota day");
                *state = LicenseState::Active {
                    tier,
                    remaining: daily_limit,
                    daily_limit,
                    day: today,
                };
            }
            _ => {}
        }

        match *state {
            LicenseState::Active {
                tier,
                remaining,
                daily_limit,
                day,
            } if remaining > 0 => {
                let remaining = remaining - 1;
                *state = if remaining == 0 {
                    LicenseState::Exhausted {
                        tier,
                        daily_limit,
                        day,
                    }
                } else {
                    LicenseState::Active {
                        tier,
                        remaining,
                        daily_limit,
                        day,
                    }
                };
                Admission::Granted { tier, remaining }
            }
            LicenseState::Active { tier, .. } | LicenseState::Exhausted { tier, .. } => {
                warn!(tier = %tier, "Daily scan quota exhausted");
                Admission::Denied { tier }
            }
            // activate always leaves the session active
            LicenseState::Uninitialized => Admission::Denied { tier: Tier::Free },
        }
    }

    /// Give back a unit taken by an audit that did not complete
    pub fn refund(&self) {
        let mut state = self.state.lock();
        match *state {
            LicenseState::Active {
                tier,
                remaining,
                daily_limit,
                day,
            } => {
                *state = LicenseState::Active {
                    tier,
                    remaining: (remaining + 1).min(daily_limit),
                    daily_limit,
                    day,
                };
            }
            LicenseState::Exhausted {
                tier,
                daily_limit,
                day,
            } => {
                *state = LicenseState::Active {
                    tier,
                    remaining: 1,
                    daily_limit,
                    day,
                };
            }
            LicenseState::Uninitialized => {}
        }
    }

    /// Back to uninitialized
    pub fn reset(&self) {
        *self.state.lock() = LicenseState::Uninitialized;
    }
}

/// Active state for a key; with no key, `QASTELL_LICENSE` is read
fn activate(key: Option<&str>, today: NaiveDate) -> LicenseState {
    let env_key = match key {
        Some(_) => None,
        None => std::env::var(LICENSE_ENV_VAR).ok(),
    };
    let key = key.or(env_key.as_deref()).filter(|k| !k.trim().is_empty());

    let license = match key.map(LicenseKey::decode) {
        Some(Ok(license)) => license,
        Some(Err(e)) => {
            warn!(error = %e, "Invalid license key, falling back to Free tier");
            LicenseKey::new(Tier::Free)
        }
        None => {
            debug!("No license key, using Free tier");
            LicenseKey::new(Tier::Free)
        }
    };

    let daily_limit = license.limit();
    info!(tier = %license.tier, daily_limit, "License initialized");

    LicenseState::Active {
        tier: license.tier,
        remaining: daily_limit,
        daily_limit,
        day: today,
    }
}

lazy_static! {
    static ref GLOBAL_LICENSE: LicenseSession = LicenseSession::new();
}

/// The process-wide session
pub fn global_license() -> LicenseSession {
    GLOBAL_LICENSE.clone()
}

/// Initialize the process-wide license
pub fn init_license(key: Option<&str>) -> LicenseUsage {
    GLOBAL_LICENSE.init(key)
}

/// Usage of the process-wide license
pub fn get_license_usage() -> LicenseUsage {
    GLOBAL_LICENSE.usage()
}

/// Reset the process-wide license to uninitialized
pub fn reset_license() {
    GLOBAL_LICENSE.reset()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_key_roundtrip_and_limits() {
        let key = LicenseKey::new(Tier::Enterprise).encode();
        assert!(key.starts_with("QASTELL-"));

        let session = LicenseSession::with_key(&key);
        let usage = session.usage();
        assert_eq!(usage.tier, Tier::Enterprise);
        assert_eq!(usage.daily_limit, 1_000);
    }

    #[test]
    fn test_invalid_keys_fall_back_to_free() {
        for key in ["your-license-key-here", "QASTELL-!!!", "garbage", "QASTELL-e30="] {
            let usage = LicenseSession::with_key(key).usage();
            assert_eq!(usage.tier, Tier::Free, "{}", key);
            assert_eq!(usage.remaining, 10);
        }
    }

    #[test]
    fn test_exhaustion() {
        let session = LicenseSession::new();
        session.init_on(Some(&LicenseKey::new(Tier::Free).with_daily_limit(2).encode()), day(1));

        assert_eq!(
            session.try_consume_on(day(1)),
            Admission::Granted {
                tier: Tier::Free,
                remaining: 1
            }
        );
        assert!(session.try_consume_on(day(1)).is_granted());
        assert!(session.usage().exhausted);
        assert!(!session.try_consume_on(day(1)).is_granted());
    }

    #[test]
    fn test_new_day_restores_quota() {
        let session = LicenseSession::new();
        session.init_on(Some(&LicenseKey::new(Tier::Free).with_daily_limit(1).encode()), day(1));
        assert!(session.try_consume_on(day(1)).is_granted());
        assert!(!session.try_consume_on(day(1)).is_granted());

        assert_eq!(
            session.try_consume_on(day(2)),
            Admission::Granted {
                tier: Tier::Free,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_refund() {
        let session = LicenseSession::with_key(&LicenseKey::new(Tier::Free).with_daily_limit(1).encode());
        assert!(session.try_consume().is_granted());
        assert!(session.usage().exhausted);
        session.refund();
        assert_eq!(session.usage().remaining, 1);
        session.refund();
        assert_eq!(session.usage().remaining, 1);
    }

    #[test]
    fn test_usage_is_pure() {
        let session = LicenseSession::new();
        let before = session.usage();
        let _ = session.usage();
        assert_eq!(before, session.usage());
        assert_eq!(before.tier, Tier::Free);
    }

    #[test]
    fn test_concurrent_consume_never_overruns() {
        let session = LicenseSession::with_key(&LicenseKey::new(Tier::Free).encode());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let s = session.clone();
                std::thread::spawn(move || s.try_consume().is_granted())
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 10);
        assert!(session.usage().exhausted);
    }

    #[test]
    fn test_report_gating() {
        assert!(Tier::Free.require("JSON", Tier::Enterprise).unwrap_err().is_license());
        assert!(Tier::Enterprise.require("JSON", Tier::Enterprise).is_ok());
        assert!(Tier::Enterprise.require("SARIF", Tier::Corporate).is_err());
        assert_eq!(get_tier_display_name(Tier::Corporate), "Corporate");
    }
}
