// src/spec/package.rs

//! Package specs and their dependency edges.
//!
//! A package is a named bundle of installable content with its own
//! dependency graph inside one feature-pack. Edges come in three kinds:
//!
//! - **required**: always pulled into the closure
//! - **optional**: pulled in only when the inclusion policy allows it
//! - **passive**: like optional, but dropped silently (never an error) when
//!   stability filtering would exclude the target
//!
//! The kind is a tagged enum, so a "required passive" edge is
//! unrepresentable by construction.

use crate::stability::StabilityLevel;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Kind of a package dependency edge
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Required,
    Optional,
    Passive,
}

/// A dependency edge onto another package of the same feature-pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    /// Target package name
    pub name: String,
    /// Edge kind
    pub kind: DependencyKind,
    /// Stability of the dependency content, when it differs from the
    /// target package's own declaration
    pub min_stability: Option<StabilityLevel>,
}

impl PackageDependency {
    /// Create a required dependency edge
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DependencyKind::Required,
            min_stability: None,
        }
    }

    /// Create an optional dependency edge
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DependencyKind::Optional,
            min_stability: None,
        }
    }

    /// Create a passive dependency edge
    pub fn passive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DependencyKind::Passive,
            min_stability: None,
        }
    }

    /// Stamp the edge with a minimum stability level
    pub fn with_min_stability(mut self, level: StabilityLevel) -> Self {
        self.min_stability = Some(level);
        self
    }
}

/// Spec of one package inside a feature-pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Package name, unique within the feature-pack
    pub name: String,
    /// Stability of the package content; `None` means default stability
    pub stability: Option<StabilityLevel>,
    /// Outgoing dependency edges
    pub dependencies: Vec<PackageDependency>,
}

impl PackageSpec {
    /// Create a new package spec with no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stability: None,
            dependencies: Vec::new(),
        }
    }

    /// Declare the package's stability level
    pub fn with_stability(mut self, level: StabilityLevel) -> Self {
        self.stability = Some(level);
        self
    }

    /// Add a dependency edge
    pub fn with_dependency(mut self, dep: PackageDependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// The stability used for filtering: declared level or default
    pub fn effective_stability(&self) -> StabilityLevel {
        self.stability.unwrap_or_default()
    }
}
