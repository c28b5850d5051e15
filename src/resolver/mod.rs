// src/resolver/mod.rs

//! The resolution pipeline.
//!
//! This module drives the five resolution stages over a provisioning
//! request: feature-pack layout (dependency closure, version conflicts,
//! patches), per-pack package resolution, config model merging, feature
//! graph building, and batch scheduling. Each stage consumes the complete,
//! immutable output of the prior one; the pipeline is synchronous, pure
//! computation that fails fast on the first inconsistency.
//!
//! # Example
//!
//! ```
//! use carrack::resolver::ProvisioningRuntime;
//! use carrack::registry::InMemoryRepository;
//! use carrack::spec::{FeaturePackConfig, FeaturePackId, FeaturePackSpec, ProvisioningConfig};
//!
//! let mut repo = InMemoryRepository::new();
//! let id = FeaturePackId::new("core", "1.0", "1.0.0");
//! repo.add(FeaturePackSpec::new(id.clone()));
//!
//! let request = ProvisioningConfig::new().with_feature_pack(FeaturePackConfig::new(id));
//! let state = ProvisioningRuntime::new(&repo).provision(&request).unwrap();
//! assert_eq!(state.feature_packs.len(), 1);
//! ```

pub mod batches;
pub mod configs;
pub mod features;
pub mod layout;
pub mod packages;

pub use configs::MergedConfig;
pub use features::ConfigFeatureGraph;
pub use layout::{FeaturePackLayout, ResolvedFeaturePack};
pub use packages::ResolvedPackages;

use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressListener, SilentProgress, Stage};
use crate::registry::FeaturePackRepository;
use crate::spec::featurepack::ProvisioningConfig;
use crate::state::{ProvisionedFeaturePack, ProvisionedState};
use tracing::debug;

/// One resolution pass over a provisioning request.
///
/// A runtime owns no state between passes; independent runtimes may run
/// concurrently over a shared repository.
pub struct ProvisioningRuntime<'a> {
    repo: &'a dyn FeaturePackRepository,
    listener: Option<&'a dyn ProgressListener>,
    silent: SilentProgress,
}

impl<'a> ProvisioningRuntime<'a> {
    pub fn new(repo: &'a dyn FeaturePackRepository) -> Self {
        Self {
            repo,
            listener: None,
            silent: SilentProgress::new(),
        }
    }

    /// Subscribe a progress listener to this runtime's passes
    pub fn with_listener(mut self, listener: &'a dyn ProgressListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn listener(&self) -> &dyn ProgressListener {
        self.listener.unwrap_or(&self.silent)
    }

    /// Resolve a provisioning request into its provisioned state
    pub fn provision(&self, config: &ProvisioningConfig) -> Result<ProvisionedState> {
        let listener = self.listener();

        let layout = FeaturePackLayout::resolve(config, self.repo)?;
        let total = layout.packs.len() as u64;
        listener.stage_started(Stage::Layout, total);
        for (i, pack) in layout.packs.iter().enumerate() {
            listener.item_processed(&ProgressEvent {
                stage: Stage::Layout,
                item: pack.id.to_string(),
                position: i as u64 + 1,
                total,
            });
        }
        listener.stage_finished(Stage::Layout);

        listener.stage_started(Stage::Packages, total);
        let mut feature_packs = Vec::with_capacity(layout.packs.len());
        for (i, pack) in layout.packs.iter().enumerate() {
            listener.item_processed(&ProgressEvent {
                stage: Stage::Packages,
                item: pack.id.to_string(),
                position: i as u64 + 1,
                total,
            });
            let resolved = packages::resolve(&pack.spec, &pack.config, &config.options)?;
            feature_packs.push(ProvisionedFeaturePack {
                id: pack.id.clone(),
                packages: resolved.packages,
                passive_packages: resolved.passive,
            });
        }
        listener.stage_finished(Stage::Packages);

        let merged = configs::merge(&layout, config, &config.options)?;
        let total = merged.len() as u64;
        listener.stage_started(Stage::Configs, total);
        for (i, model) in merged.iter().enumerate() {
            listener.item_processed(&ProgressEvent {
                stage: Stage::Configs,
                item: model.id.to_string(),
                position: i as u64 + 1,
                total,
            });
        }
        listener.stage_finished(Stage::Configs);

        listener.stage_started(Stage::Features, total);
        let mut graphs = Vec::with_capacity(merged.len());
        for (i, model) in merged.iter().enumerate() {
            listener.item_processed(&ProgressEvent {
                stage: Stage::Features,
                item: model.id.to_string(),
                position: i as u64 + 1,
                total,
            });
            graphs.push(features::build(model, &layout)?);
        }
        listener.stage_finished(Stage::Features);

        listener.stage_started(Stage::Schedule, total);
        let mut provisioned_configs = Vec::with_capacity(graphs.len());
        for (i, graph) in graphs.iter().enumerate() {
            listener.item_processed(&ProgressEvent {
                stage: Stage::Schedule,
                item: graph.id.to_string(),
                position: i as u64 + 1,
                total,
            });
            provisioned_configs.push(batches::schedule(graph)?);
        }
        listener.stage_finished(Stage::Schedule);

        debug!(
            packs = feature_packs.len(),
            configs = provisioned_configs.len(),
            "provisioning resolved"
        );
        Ok(ProvisionedState {
            feature_packs,
            configs: provisioned_configs,
        })
    }
}

/// Resolve a provisioning request with a one-off runtime
pub fn provision(
    config: &ProvisioningConfig,
    repo: &dyn FeaturePackRepository,
) -> Result<ProvisionedState> {
    ProvisioningRuntime::new(repo).provision(config)
}
