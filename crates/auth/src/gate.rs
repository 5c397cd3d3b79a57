//! Feature gating: a licensing check that can disable authorization globally.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the feature that turns authorization enforcement on.
pub const AUTHORIZATION_FEATURE: &str = "authorization";

/// Global switch consulted before every decision.
pub trait FeatureGate: Send + Sync {
    /// `true` means every check is bypassed and permitted.
    fn authorization_disabled(&self) -> bool;
}

/// Authorization is always enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enforced;

impl FeatureGate for Enforced {
    fn authorization_disabled(&self) -> bool {
        false
    }
}

/// Authorization is never enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bypassed;

impl FeatureGate for Bypassed {
    fn authorization_disabled(&self) -> bool {
        true
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// License-backed gate.
///
/// Authorization is enforced when the plan includes the `authorization`
/// feature, or while a trial is running.
#[derive(Clone, Serialize, Deserialize)]
pub struct License {
    pub plan: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "system_clock")]
    clock: Clock,
}

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

impl License {
    pub fn new(plan: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            features: BTreeSet::new(),
            trial_ends_at: None,
            clock: system_clock(),
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn with_trial_until(mut self, ends_at: DateTime<Utc>) -> Self {
        self.trial_ends_at = Some(ends_at);
        self
    }

    /// Replace the clock (tests).
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn has(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    pub fn trial_active(&self) -> bool {
        self.trial_ends_at.is_some_and(|ends_at| (self.clock)() < ends_at)
    }

    /// The feature is missing and no trial covers it.
    pub fn lacks_with_trial(&self, feature: &str) -> bool {
        !self.has(feature) && !self.trial_active()
    }
}

impl core::fmt::Debug for License {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("License")
            .field("plan", &self.plan)
            .field("features", &self.features)
            .field("trial_ends_at", &self.trial_ends_at)
            .finish_non_exhaustive()
    }
}

impl FeatureGate for License {
    fn authorization_disabled(&self) -> bool {
        self.lacks_with_trial(AUTHORIZATION_FEATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn static_gates() {
        assert!(!Enforced.authorization_disabled());
        assert!(Bypassed.authorization_disabled());
    }

    #[test]
    fn license_with_feature_enforces() {
        let license = License::new("pro").with_feature(AUTHORIZATION_FEATURE);
        assert!(!license.authorization_disabled());
    }

    #[test]
    fn license_without_feature_bypasses() {
        let license = License::new("community");
        assert!(license.authorization_disabled());
    }

    #[test]
    fn running_trial_enforces_until_it_ends() {
        let ends_at = at(12);
        let during = License::new("community")
            .with_trial_until(ends_at)
            .with_clock(|| at(10));
        let after = License::new("community")
            .with_trial_until(ends_at)
            .with_clock(move || ends_at + Duration::minutes(1));

        assert!(!during.authorization_disabled());
        assert!(after.authorization_disabled());
    }

    #[test]
    fn license_deserializes_from_json() {
        let license: License = serde_json::from_value(serde_json::json!({
            "plan": "pro",
            "features": ["authorization", "audit"],
        }))
        .unwrap();
        assert!(license.has("audit"));
        assert!(!license.authorization_disabled());
    }
}
