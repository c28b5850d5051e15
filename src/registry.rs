// src/registry.rs

//! Repository and plugin registries.
//!
//! The engine never fetches or unpacks archives: an artifact-resolution
//! collaborator hands it a [`FeaturePackRepository`], a mapping from
//! feature-pack id to an already-parsed spec bundle.
//!
//! Install-time plugins are likewise outside the core; what the core needs
//! from them is only the option names they expose, discovered through an
//! explicit [`PluginRegistry`] keyed by feature-pack id.

use crate::error::{Error, Result};
use crate::spec::featurepack::FeaturePackSpec;
use crate::spec::producer::FeaturePackId;
use std::collections::HashMap;

/// Mapping from feature-pack id to a locally available parsed spec
pub trait FeaturePackRepository {
    fn get(&self, id: &FeaturePackId) -> Option<&FeaturePackSpec>;

    /// Like [`get`](Self::get), failing with a structured error
    fn resolve(&self, id: &FeaturePackId) -> Result<&FeaturePackSpec> {
        self.get(id)
            .ok_or_else(|| Error::UnknownFeaturePack(id.clone()))
    }
}

/// In-memory repository, keyed by spec id
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    packs: HashMap<FeaturePackId, FeaturePackSpec>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec, replacing any previous spec with the same id
    pub fn add(&mut self, spec: FeaturePackSpec) -> &mut Self {
        self.packs.insert(spec.id.clone(), spec);
        self
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl FeaturePackRepository for InMemoryRepository {
    fn get(&self, id: &FeaturePackId) -> Option<&FeaturePackSpec> {
        self.packs.get(id)
    }
}

/// One option an install-time plugin recognizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOption {
    pub name: String,
    pub required: bool,
    pub default: Option<String>,
}

impl PluginOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// An install-time plugin surface, reduced to what resolution needs:
/// a name and the options it exposes. Execution is a downstream concern.
pub trait ProvisioningPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn options(&self) -> Vec<PluginOption>;
}

/// Explicit plugin registry keyed by feature-pack id
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<FeaturePackId, Vec<Box<dyn ProvisioningPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pack: FeaturePackId, plugin: Box<dyn ProvisioningPlugin>) {
        self.plugins.entry(pack).or_default().push(plugin);
    }

    /// Names of plugins contributed by one feature-pack
    pub fn plugin_names(&self, pack: &FeaturePackId) -> Vec<&str> {
        self.plugins
            .get(pack)
            .map(|list| list.iter().map(|p| p.name()).collect())
            .unwrap_or_default()
    }

    /// All options exposed by one feature-pack's plugins, in registration
    /// order
    pub fn options_for(&self, pack: &FeaturePackId) -> Vec<PluginOption> {
        self.plugins
            .get(pack)
            .map(|list| list.iter().flat_map(|p| p.options()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .plugins
            .iter()
            .map(|(pack, list)| format!("{}: {} plugin(s)", pack, list.len()))
            .collect();
        f.debug_struct("PluginRegistry")
            .field("plugins", &names)
            .finish()
    }
}
