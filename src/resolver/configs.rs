// src/resolver/configs.rs

//! Config model merging.
//!
//! Gathers every config model contributed by the resolved layout (filtered
//! by the consuming edge's config-inheritance modifiers), appends the
//! provisioning request's own customizations, and folds contributions with
//! the same config id into one model. Each merge step is a pure
//! `(accumulator, contribution) -> accumulator` fold. Included layers are
//! expanded afterwards, layer features ahead of the config's own.

use crate::error::{Error, Result};
use crate::resolver::layout::FeaturePackLayout;
use crate::spec::config::{ConfigId, ConfigItem, ConfigModel, ConfigProperty};
use crate::spec::feature::FeatureId;
use crate::spec::featurepack::{ProvisioningConfig, ProvisioningOptions};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// One config model after merging and layer expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    pub id: ConfigId,
    pub properties: BTreeMap<String, ConfigProperty>,
    /// Effective item list: included layers' items, then the config's own
    pub items: Vec<ConfigItem>,
    pub excluded_specs: Vec<String>,
    pub excluded_features: Vec<FeatureId>,
}

/// Merge all config contributions of the resolved layout
pub fn merge(
    layout: &FeaturePackLayout,
    provisioning: &ProvisioningConfig,
    options: &ProvisioningOptions,
) -> Result<Vec<MergedConfig>> {
    let mut contributions: Vec<&ConfigModel> = Vec::new();
    for pack in &layout.packs {
        let edge = &pack.config;
        let inherit = edge.inherit_configs && options.inherit_configs;
        for model in &pack.spec.configs {
            let listed_in = edge.included_configs.contains(&model.id);
            let listed_out = edge.excluded_configs.contains(&model.id);
            if listed_in && listed_out {
                return Err(Error::ConflictingDirective(format!(
                    "config {} of {} is both included and excluded",
                    model.id, pack.id
                )));
            }
            let take = if inherit { !listed_out } else { listed_in };
            if take {
                contributions.push(model);
            } else {
                trace!(config = %model.id, pack = %pack.id, "config contribution filtered out");
            }
        }
    }
    contributions.extend(provisioning.configs.iter());

    let mut order: Vec<ConfigId> = Vec::new();
    let mut merged: HashMap<ConfigId, ConfigModel> = HashMap::new();
    for contribution in contributions {
        match merged.entry(contribution.id.clone()) {
            Entry::Occupied(mut accumulator) => {
                merge_into(accumulator.get_mut(), contribution)?;
            }
            Entry::Vacant(slot) => {
                validate(contribution)?;
                order.push(contribution.id.clone());
                slot.insert(contribution.clone());
            }
        }
    }

    let mut result = Vec::with_capacity(order.len());
    for id in order {
        let model = merged.remove(&id).expect("merged config");
        let mut items = Vec::new();
        for layer in &model.included_layers {
            let spec = layout.find_layer(&id.model, layer)?;
            items.extend(spec.items.iter().cloned());
        }
        items.extend(model.items);
        debug!(config = %id, items = items.len(), "merged config model");
        result.push(MergedConfig {
            id,
            properties: model.properties,
            items,
            excluded_specs: model.excluded_specs,
            excluded_features: model.excluded_features,
        });
    }
    Ok(result)
}

/// A layer both included and excluded inside one contribution is a hard
/// error; across contributions the last directive wins.
fn validate(model: &ConfigModel) -> Result<()> {
    for layer in &model.included_layers {
        if model.excluded_layers.contains(layer) {
            return Err(Error::ConflictingDirective(format!(
                "layer '{}' is both included and excluded in config {}",
                layer, model.id
            )));
        }
    }
    Ok(())
}

/// Fold one contribution into the accumulator for its config id
fn merge_into(accumulator: &mut ConfigModel, contribution: &ConfigModel) -> Result<()> {
    validate(contribution)?;

    if !contribution.inherit_features {
        accumulator.items.clear();
        accumulator.included_layers.clear();
        accumulator.excluded_layers.clear();
        accumulator.excluded_specs.clear();
        accumulator.excluded_features.clear();
    }

    for (name, property) in &contribution.properties {
        match accumulator.properties.get(name) {
            Some(existing) if !existing.overridable => {
                trace!(property = %name, "keeping non-overridable property");
            }
            _ => {
                accumulator
                    .properties
                    .insert(name.clone(), property.clone());
            }
        }
    }

    for layer in &contribution.included_layers {
        accumulator.excluded_layers.retain(|l| l != layer);
        if !accumulator.included_layers.contains(layer) {
            accumulator.included_layers.push(layer.clone());
        }
    }
    for layer in &contribution.excluded_layers {
        accumulator.included_layers.retain(|l| l != layer);
        if !accumulator.excluded_layers.contains(layer) {
            accumulator.excluded_layers.push(layer.clone());
        }
    }

    accumulator.items.extend(contribution.items.iter().cloned());
    for spec in &contribution.excluded_specs {
        if !accumulator.excluded_specs.contains(spec) {
            accumulator.excluded_specs.push(spec.clone());
        }
    }
    for feature in &contribution.excluded_features {
        if !accumulator.excluded_features.contains(feature) {
            accumulator.excluded_features.push(feature.clone());
        }
    }
    Ok(())
}
