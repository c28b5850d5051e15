// src/stability.rs

//! Stability levels and optional-package inclusion policy.
//!
//! Every package (and feature spec) carries a stability classification.
//! Provisioning runs with a minimum stability threshold: content below the
//! threshold is filtered out. How a filtered dependency is handled depends
//! on the dependency kind — required edges fail hard, optional edges are
//! skipped, passive edges are dropped silently by contract.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Ordered stability classification gating package/feature/config inclusion.
///
/// Ordering is `experimental < preview < community < default`, so a
/// threshold of [`StabilityLevel::Community`] admits `community` and
/// `default` content and filters the rest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StabilityLevel {
    Experimental,
    Preview,
    Community,
    Default,
}

impl StabilityLevel {
    /// Check whether content of the given stability passes this threshold.
    pub fn admits(&self, candidate: StabilityLevel) -> bool {
        candidate >= *self
    }
}

impl Default for StabilityLevel {
    fn default() -> Self {
        Self::Default
    }
}

/// Policy controlling whether optional and passive package dependency
/// edges are followed during package resolution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OptionalPackagePolicy {
    /// Optional and passive edges are never followed.
    Off,
    /// Only passive edges are followed.
    Passive,
    /// Both optional and passive edges are followed.
    PassivePlus,
}

impl OptionalPackagePolicy {
    /// Whether plain optional edges extend the package closure.
    pub fn follows_optional(&self) -> bool {
        matches!(self, Self::PassivePlus)
    }

    /// Whether passive edges extend the package closure.
    pub fn follows_passive(&self) -> bool {
        matches!(self, Self::Passive | Self::PassivePlus)
    }
}

impl Default for OptionalPackagePolicy {
    fn default() -> Self {
        Self::PassivePlus
    }
}
