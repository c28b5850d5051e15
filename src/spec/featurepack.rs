// src/spec/featurepack.rs

//! Feature-pack specs, dependency edges, and the provisioning request.
//!
//! A feature-pack is a versioned, distributable unit contributing packages,
//! feature specs, feature groups, layers, and config models. A
//! [`FeaturePackConfig`] is a dependency edge onto one pack build, carrying
//! the modifiers that shape what the depending side inherits from it.

use crate::spec::config::{ConfigId, ConfigLayerSpec, ConfigModel, FeatureGroup};
use crate::spec::feature::FeatureSpec;
use crate::spec::package::PackageSpec;
use crate::spec::producer::FeaturePackId;
use crate::stability::{OptionalPackagePolicy, StabilityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dependency edge onto a feature-pack build, with modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackConfig {
    pub id: FeaturePackId,
    /// A version pin for a transitively-reached pack: authoritative for its
    /// channel, but does not itself root a pack into the layout
    pub transitive: bool,
    /// Follow the target's own dependency edges; when false the target
    /// contributes no nested packs
    pub inherit_dependencies: bool,
    /// Seed the package closure from the target's default packages
    pub inherit_packages: bool,
    pub included_packages: Vec<String>,
    pub excluded_packages: Vec<String>,
    /// Merge the target's shipped config models
    pub inherit_configs: bool,
    pub included_configs: Vec<ConfigId>,
    pub excluded_configs: Vec<ConfigId>,
    /// Patches overlaid onto the target's package graph, in order
    pub patches: Vec<FeaturePackId>,
}

impl FeaturePackConfig {
    pub fn new(id: FeaturePackId) -> Self {
        Self {
            id,
            transitive: false,
            inherit_dependencies: true,
            inherit_packages: true,
            included_packages: Vec::new(),
            excluded_packages: Vec::new(),
            inherit_configs: true,
            included_configs: Vec::new(),
            excluded_configs: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Turn the edge into a transitive version pin
    pub fn transitive(id: FeaturePackId) -> Self {
        let mut config = Self::new(id);
        config.transitive = true;
        config
    }

    pub fn without_dependencies(mut self) -> Self {
        self.inherit_dependencies = false;
        self
    }

    pub fn without_default_packages(mut self) -> Self {
        self.inherit_packages = false;
        self
    }

    pub fn include_package(mut self, name: impl Into<String>) -> Self {
        self.included_packages.push(name.into());
        self
    }

    pub fn exclude_package(mut self, name: impl Into<String>) -> Self {
        self.excluded_packages.push(name.into());
        self
    }

    pub fn without_configs(mut self) -> Self {
        self.inherit_configs = false;
        self
    }

    pub fn include_config(mut self, id: ConfigId) -> Self {
        self.included_configs.push(id);
        self
    }

    pub fn exclude_config(mut self, id: ConfigId) -> Self {
        self.excluded_configs.push(id);
        self
    }

    pub fn with_patch(mut self, id: FeaturePackId) -> Self {
        self.patches.push(id);
        self
    }
}

/// Parsed spec of one feature-pack build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackSpec {
    pub id: FeaturePackId,
    /// Set on patch packs: the build this patch overlays
    pub patch_for: Option<FeaturePackId>,
    pub dependencies: Vec<FeaturePackConfig>,
    /// Packages seeding the closure when package inheritance is on
    pub default_packages: Vec<String>,
    pub packages: BTreeMap<String, PackageSpec>,
    pub features: BTreeMap<String, FeatureSpec>,
    pub groups: BTreeMap<String, FeatureGroup>,
    pub layers: Vec<ConfigLayerSpec>,
    /// Config models shipped by this pack, in declaration order
    pub configs: Vec<ConfigModel>,
}

impl FeaturePackSpec {
    pub fn new(id: FeaturePackId) -> Self {
        Self {
            id,
            patch_for: None,
            dependencies: Vec::new(),
            default_packages: Vec::new(),
            packages: BTreeMap::new(),
            features: BTreeMap::new(),
            groups: BTreeMap::new(),
            layers: Vec::new(),
            configs: Vec::new(),
        }
    }

    /// Mark this spec as a patch overlaying the given build
    pub fn patch_for(mut self, target: FeaturePackId) -> Self {
        self.patch_for = Some(target);
        self
    }

    pub fn with_dependency(mut self, dep: FeaturePackConfig) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Add a package and mark it as a default closure seed
    pub fn with_default_package(mut self, package: PackageSpec) -> Self {
        self.default_packages.push(package.name.clone());
        self.packages.insert(package.name.clone(), package);
        self
    }

    /// Add a package without seeding the closure from it
    pub fn with_package(mut self, package: PackageSpec) -> Self {
        self.packages.insert(package.name.clone(), package);
        self
    }

    pub fn with_feature_spec(mut self, spec: FeatureSpec) -> Self {
        self.features.insert(spec.name.clone(), spec);
        self
    }

    pub fn with_group(mut self, group: FeatureGroup) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    pub fn with_layer(mut self, layer: ConfigLayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_config(mut self, config: ConfigModel) -> Self {
        self.configs.push(config);
        self
    }

    /// Look up a layer spec by model and name
    pub fn layer(&self, model: &str, name: &str) -> Option<&ConfigLayerSpec> {
        self.layers
            .iter()
            .find(|l| l.model == model && l.name == name)
    }
}

/// Global options of one provisioning request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningOptions {
    /// Content below this stability level is filtered out
    pub min_stability: StabilityLevel,
    pub optional_packages: OptionalPackagePolicy,
    /// Global switch over per-edge config inheritance
    pub inherit_configs: bool,
    /// Global switch over per-edge package inheritance
    pub inherit_packages: bool,
}

impl Default for ProvisioningOptions {
    fn default() -> Self {
        Self {
            min_stability: StabilityLevel::default(),
            optional_packages: OptionalPackagePolicy::default(),
            inherit_configs: true,
            inherit_packages: true,
        }
    }
}

/// The root of a provisioning request: feature-pack edges, config
/// customizations, and global options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProvisioningConfig {
    pub feature_packs: Vec<FeaturePackConfig>,
    /// Config customizations applied after all pack contributions
    pub configs: Vec<ConfigModel>,
    pub options: ProvisioningOptions,
}

impl ProvisioningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_pack(mut self, config: FeaturePackConfig) -> Self {
        self.feature_packs.push(config);
        self
    }

    pub fn with_config(mut self, config: ConfigModel) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_options(mut self, options: ProvisioningOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_min_stability(mut self, level: StabilityLevel) -> Self {
        self.options.min_stability = level;
        self
    }

    pub fn with_optional_packages(mut self, policy: OptionalPackagePolicy) -> Self {
        self.options.optional_packages = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::package::PackageDependency;

    fn fp1() -> FeaturePackId {
        FeaturePackId::new("core", "1.0", "1.0.0")
    }

    #[test]
    fn test_edge_modifiers() {
        let edge = FeaturePackConfig::new(fp1())
            .without_default_packages()
            .include_package("base")
            .exclude_package("docs")
            .with_patch(FeaturePackId::new("core", "1.0", "1.0.0-patch1"));

        assert!(!edge.inherit_packages);
        assert!(edge.inherit_configs);
        assert_eq!(edge.included_packages, vec!["base"]);
        assert_eq!(edge.excluded_packages, vec!["docs"]);
        assert_eq!(edge.patches.len(), 1);
        assert!(!edge.transitive);
    }

    #[test]
    fn test_transitive_pin() {
        let pin = FeaturePackConfig::transitive(fp1());
        assert!(pin.transitive);
    }

    #[test]
    fn test_spec_default_packages() {
        let spec = FeaturePackSpec::new(fp1())
            .with_default_package(
                PackageSpec::new("base").with_dependency(PackageDependency::required("lib")),
            )
            .with_package(PackageSpec::new("lib"));

        assert_eq!(spec.default_packages, vec!["base"]);
        assert_eq!(spec.packages.len(), 2);
    }

    #[test]
    fn test_layer_lookup() {
        let spec = FeaturePackSpec::new(fp1())
            .with_layer(ConfigLayerSpec::new("standard", "base"));
        assert!(spec.layer("standard", "base").is_some());
        assert!(spec.layer("standard", "ha").is_none());
        assert!(spec.layer("other", "base").is_none());
    }

    #[test]
    fn test_options_defaults() {
        let options = ProvisioningOptions::default();
        assert_eq!(options.min_stability, StabilityLevel::Default);
        assert_eq!(
            options.optional_packages,
            OptionalPackagePolicy::PassivePlus
        );
        assert!(options.inherit_configs);
        assert!(options.inherit_packages);
    }
}
