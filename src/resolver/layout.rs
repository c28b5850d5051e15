// src/resolver/layout.rs

//! Feature-pack layout resolution.
//!
//! Resolves the transitive closure of feature-pack dependency edges into a
//! flattened, root-first, conflict-free ordered pack list. Root-declared
//! edges (including transitive version pins) are authoritative for their
//! `(producer, channel)`: builds reached through pack-declared dependencies
//! are silently replaced. Two distinct builds reached with no authority is
//! a version conflict carrying the full candidate set. Declared patches are
//! overlaid onto their target's package graph before package resolution.

use crate::error::{Error, Result};
use crate::registry::FeaturePackRepository;
use crate::spec::config::{ConfigLayerSpec, FeatureGroup};
use crate::spec::feature::FeatureSpec;
use crate::spec::featurepack::{FeaturePackConfig, FeaturePackSpec, ProvisioningConfig};
use crate::spec::producer::{FeaturePackId, ProducerChannel};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// One resolved entry of the layout: the effective build, its
/// patch-applied spec, and the edge modifiers that apply to it
#[derive(Debug, Clone)]
pub struct ResolvedFeaturePack {
    pub id: FeaturePackId,
    pub spec: FeaturePackSpec,
    pub config: FeaturePackConfig,
}

/// Flattened, patch-applied, conflict-free ordered feature-pack list
#[derive(Debug, Clone, Default)]
pub struct FeaturePackLayout {
    /// Root-first resolution order
    pub packs: Vec<ResolvedFeaturePack>,
}

impl FeaturePackLayout {
    /// Resolve the layout for a provisioning request
    pub fn resolve(
        config: &ProvisioningConfig,
        repo: &dyn FeaturePackRepository,
    ) -> Result<Self> {
        // Root edges are authoritative for their channel; two root edges
        // disagreeing on the build is already a conflict.
        let mut authoritative: HashMap<ProducerChannel, FeaturePackId> = HashMap::new();
        let mut pins: HashMap<ProducerChannel, FeaturePackConfig> = HashMap::new();
        for edge in &config.feature_packs {
            let channel = edge.id.origin();
            match authoritative.get(&channel).cloned() {
                Some(existing) if existing != edge.id => {
                    return Err(Error::VersionConflict {
                        channel,
                        candidates: vec![existing, edge.id.clone()],
                    });
                }
                Some(_) => {}
                None => {
                    authoritative.insert(channel.clone(), edge.id.clone());
                }
            }
            if edge.transitive {
                pins.insert(channel, edge.clone());
            }
        }

        let mut order: Vec<ProducerChannel> = Vec::new();
        let mut chosen: HashMap<ProducerChannel, (FeaturePackId, FeaturePackConfig)> =
            HashMap::new();
        let mut candidates: HashMap<ProducerChannel, Vec<FeaturePackId>> = HashMap::new();

        let mut queue: VecDeque<(FeaturePackConfig, usize)> = config
            .feature_packs
            .iter()
            .filter(|e| !e.transitive)
            .map(|e| (e.clone(), 0))
            .collect();

        while let Some((edge, depth)) = queue.pop_front() {
            let channel = edge.id.origin();
            if depth > 0 {
                let reached = candidates.entry(channel.clone()).or_default();
                if !reached.contains(&edge.id) {
                    reached.push(edge.id.clone());
                }
            }

            if chosen.contains_key(&channel) {
                continue;
            }

            let effective_id = authoritative
                .get(&channel)
                .cloned()
                .unwrap_or_else(|| edge.id.clone());
            let spec = repo.resolve(&effective_id)?;
            trace!(pack = %effective_id, depth, "visiting feature-pack");

            // Root pins override a transitively-reached pack's modifiers
            let effective_edge = pins.get(&channel).cloned().unwrap_or_else(|| edge.clone());

            if edge.inherit_dependencies {
                for dep in &spec.dependencies {
                    queue.push_back((dep.clone(), depth + 1));
                }
            }

            order.push(channel.clone());
            chosen.insert(channel, (effective_id, effective_edge));
        }

        // Conflict check across the whole discovery, in reach order
        for channel in &order {
            if authoritative.contains_key(channel) {
                continue;
            }
            if let Some(reached) = candidates.get(channel) {
                if reached.len() > 1 {
                    return Err(Error::VersionConflict {
                        channel: channel.clone(),
                        candidates: reached.clone(),
                    });
                }
            }
        }

        let mut packs = Vec::with_capacity(order.len());
        for channel in order {
            let (id, edge) = chosen.remove(&channel).expect("visited channel");
            let mut spec = repo.resolve(&id)?.clone();
            apply_patches(&mut spec, &id, &edge, repo)?;
            debug!(pack = %id, patches = edge.patches.len(), "resolved feature-pack");
            packs.push(ResolvedFeaturePack {
                id,
                spec,
                config: edge,
            });
        }

        Ok(Self { packs })
    }

    /// Entry for a concrete build, when it is part of the layout
    pub fn pack(&self, id: &FeaturePackId) -> Option<&ResolvedFeaturePack> {
        self.packs.iter().find(|p| &p.id == id)
    }

    /// Entry contributed by the named producer
    pub fn producer(&self, producer: &str) -> Option<&ResolvedFeaturePack> {
        self.packs.iter().find(|p| p.id.producer == producer)
    }

    /// Locate a feature spec by name, optionally qualified by producer.
    ///
    /// Unqualified lookups search packs in layout order.
    pub fn find_feature_spec(
        &self,
        origin: Option<&str>,
        name: &str,
    ) -> Result<(&ResolvedFeaturePack, &FeatureSpec)> {
        self.packs
            .iter()
            .filter(|p| origin.is_none_or(|o| p.id.producer == o))
            .find_map(|p| p.spec.features.get(name).map(|s| (p, s)))
            .ok_or_else(|| Error::UnknownFeatureSpec {
                name: match origin {
                    Some(o) => format!("{}/{}", o, name),
                    None => name.to_string(),
                },
            })
    }

    /// Locate a feature group by name, optionally qualified by producer
    pub fn find_group(
        &self,
        origin: Option<&str>,
        name: &str,
    ) -> Result<(&ResolvedFeaturePack, &FeatureGroup)> {
        self.packs
            .iter()
            .filter(|p| origin.is_none_or(|o| p.id.producer == o))
            .find_map(|p| p.spec.groups.get(name).map(|g| (p, g)))
            .ok_or_else(|| Error::UnknownFeatureGroup {
                name: match origin {
                    Some(o) => format!("{}/{}", o, name),
                    None => name.to_string(),
                },
            })
    }

    /// Locate a layer spec by model and name across the layout
    pub fn find_layer(&self, model: &str, name: &str) -> Result<&ConfigLayerSpec> {
        self.packs
            .iter()
            .find_map(|p| p.spec.layer(model, name))
            .ok_or_else(|| Error::UnknownLayer {
                model: model.to_string(),
                name: name.to_string(),
            })
    }
}

/// Overlay the edge's declared patches onto the target spec's package graph
fn apply_patches(
    spec: &mut FeaturePackSpec,
    target: &FeaturePackId,
    edge: &FeaturePackConfig,
    repo: &dyn FeaturePackRepository,
) -> Result<()> {
    for patch_id in &edge.patches {
        let patch = repo.resolve(patch_id)?;
        if patch.patch_for.as_ref() != Some(target) {
            return Err(Error::PatchTargetMismatch {
                patch: patch_id.clone(),
                declared: patch
                    .patch_for
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "no target".to_string()),
                target: target.clone(),
            });
        }
        for (name, package) in &patch.packages {
            trace!(pack = %target, package = %name, patch = %patch_id, "patch overlay");
            spec.packages.insert(name.clone(), package.clone());
        }
    }
    Ok(())
}
