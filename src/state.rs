// src/state.rs

//! Provisioned state: the final, ordered output of a resolution pass.
//!
//! The state is what downstream installers consume: the ordered
//! feature-pack list with resolved package sets, and per config id the
//! ordered batch sequence of resolved features. Everything here is
//! immutable and serializable; resolving the same request against the same
//! specs twice yields an identical state.

use crate::spec::config::ConfigId;
use crate::spec::feature::{ResolvedFeatureId, SpecId};
use crate::spec::producer::FeaturePackId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A substituted capability requirement carried by a resolved feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    /// Fully substituted capability name
    pub name: String,
    pub optional: bool,
}

/// A fully parameter-resolved feature node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFeature {
    pub id: ResolvedFeatureId,
    /// Complete parameter values, defaults applied
    pub params: BTreeMap<String, String>,
    /// Incoming dependency edges: explicit plus reference-implied
    pub dependencies: Vec<ResolvedFeatureId>,
    /// Substituted capability provisions
    pub provides: Vec<String>,
    /// Substituted capability requirements
    pub requires: Vec<CapabilityRequirement>,
    /// Set when this feature was declared inline under another feature
    pub parent: Option<ResolvedFeatureId>,
}

impl ResolvedFeature {
    /// Value of one resolved parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }
}

/// One event in a scheduled batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchEvent {
    /// The following features instantiate a different spec
    SpecChange(SpecId),
    Feature(ResolvedFeature),
    /// Opens the nested features of the preceding feature
    BranchStart,
    BranchEnd,
}

/// A maximal run of features whose dependencies are satisfied within the
/// batch or by earlier batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeatureBatch {
    pub events: Vec<BatchEvent>,
}

impl FeatureBatch {
    /// The features emitted in this batch, in order
    pub fn features(&self) -> impl Iterator<Item = &ResolvedFeature> {
        self.events.iter().filter_map(|e| match e {
            BatchEvent::Feature(f) => Some(f),
            _ => None,
        })
    }
}

/// The scheduled form of one config model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedConfig {
    pub id: ConfigId,
    /// Merged property values
    pub properties: BTreeMap<String, String>,
    pub batches: Vec<FeatureBatch>,
}

impl ProvisionedConfig {
    /// All features across all batches, in emission order
    pub fn features(&self) -> impl Iterator<Item = &ResolvedFeature> {
        self.batches.iter().flat_map(|b| b.features())
    }
}

/// One provisioned feature-pack with its resolved package set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedFeaturePack {
    pub id: FeaturePackId,
    /// Installed packages, in resolution order
    pub packages: Vec<String>,
    /// Packages whose inclusion depended only on passive edges
    pub passive_packages: Vec<String>,
}

/// Final output of a resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProvisionedState {
    /// Feature-packs in layout order, root-first
    pub feature_packs: Vec<ProvisionedFeaturePack>,
    /// Configs in first-seen config-id order
    pub configs: Vec<ProvisionedConfig>,
}

impl ProvisionedState {
    pub fn feature_pack(&self, id: &FeaturePackId) -> Option<&ProvisionedFeaturePack> {
        self.feature_packs.iter().find(|fp| &fp.id == id)
    }

    pub fn config(&self, id: &ConfigId) -> Option<&ProvisionedConfig> {
        self.configs.iter().find(|c| &c.id == id)
    }

    /// Whether any provisioned pack installs the named package
    pub fn has_package(&self, name: &str) -> bool {
        self.feature_packs
            .iter()
            .any(|fp| fp.packages.iter().any(|p| p == name))
    }
}
