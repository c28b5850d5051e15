// src/spec/config.rs

//! Declarative configuration models: features, groups, and layers.
//!
//! A config model is identified by `(model, name)` and assembled from
//! reusable parts: individual feature configs, named feature groups, and
//! includable layers. Multiple feature-packs may contribute to the same
//! config id; the contributions are merged by the configuration merger in
//! feature-pack resolution order.

use crate::spec::feature::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identity of a config model: model dimension plus name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigId {
    pub model: String,
    pub name: String,
}

impl ConfigId {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.name)
    }
}

/// A named config property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProperty {
    pub value: String,
    /// Later contributions may overwrite the value; defaults to true
    pub overridable: bool,
}

impl ConfigProperty {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            overridable: true,
        }
    }

    pub fn locked(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            overridable: false,
        }
    }
}

/// An explicit feature-dependency edge declared on a feature config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDependency {
    pub feature: FeatureId,
    /// Include the target even when an exclusion directive covers it
    pub include: bool,
}

impl FeatureDependency {
    pub fn new(feature: FeatureId) -> Self {
        Self {
            feature,
            include: false,
        }
    }

    pub fn include_if_excluded(feature: FeatureId) -> Self {
        Self {
            feature,
            include: true,
        }
    }
}

/// An unresolved feature instance as declared in a config, group, or layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Target spec name
    pub spec: String,
    /// Producer qualifier when the spec name is ambiguous across the layout
    pub origin: Option<String>,
    pub params: BTreeMap<String, String>,
    /// Parameters explicitly reset to unset
    pub unset: BTreeSet<String>,
    pub dependencies: Vec<FeatureDependency>,
    /// Inline nested feature configs (scheduled as a branch under this one)
    pub nested: Vec<FeatureConfig>,
}

impl FeatureConfig {
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            origin: None,
            params: BTreeMap::new(),
            unset: BTreeSet::new(),
            dependencies: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn with_origin(mut self, producer: impl Into<String>) -> Self {
        self.origin = Some(producer.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_unset_param(mut self, name: impl Into<String>) -> Self {
        self.unset.insert(name.into());
        self
    }

    pub fn with_dependency(mut self, dep: FeatureDependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    pub fn with_nested(mut self, child: FeatureConfig) -> Self {
        self.nested.push(child);
        self
    }
}

/// One entry in a config, group, or layer body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigItem {
    Feature(FeatureConfig),
    Group(GroupInclusion),
}

/// Usage site of a named feature group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInclusion {
    pub name: String,
    /// Producer qualifier when the group name is ambiguous across the layout
    pub origin: Option<String>,
    /// When false, only explicitly included specs/features are expanded
    pub inherit_features: bool,
    pub included_specs: Vec<String>,
    /// Per-feature includes; matched by identity params, carrying overrides
    pub included_features: Vec<FeatureConfig>,
    pub excluded_specs: Vec<String>,
    pub excluded_features: Vec<FeatureId>,
}

impl GroupInclusion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            inherit_features: true,
            included_specs: Vec::new(),
            included_features: Vec::new(),
            excluded_specs: Vec::new(),
            excluded_features: Vec::new(),
        }
    }

    pub fn with_origin(mut self, producer: impl Into<String>) -> Self {
        self.origin = Some(producer.into());
        self
    }

    pub fn without_inherited_features(mut self) -> Self {
        self.inherit_features = false;
        self
    }

    pub fn include_spec(mut self, spec: impl Into<String>) -> Self {
        self.included_specs.push(spec.into());
        self
    }

    pub fn include_feature(mut self, feature: FeatureConfig) -> Self {
        self.included_features.push(feature);
        self
    }

    pub fn exclude_spec(mut self, spec: impl Into<String>) -> Self {
        self.excluded_specs.push(spec.into());
        self
    }

    pub fn exclude_feature(mut self, feature: FeatureId) -> Self {
        self.excluded_features.push(feature);
        self
    }
}

/// Named, reusable bundle of feature configs and nested group references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub name: String,
    pub items: Vec<ConfigItem>,
}

impl FeatureGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: FeatureConfig) -> Self {
        self.items.push(ConfigItem::Feature(feature));
        self
    }

    pub fn with_group(mut self, group: GroupInclusion) -> Self {
        self.items.push(ConfigItem::Group(group));
        self
    }
}

/// A named, includable subset of a config model's features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayerSpec {
    /// Model dimension the layer belongs to
    pub model: String,
    pub name: String,
    pub items: Vec<ConfigItem>,
}

impl ConfigLayerSpec {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: FeatureConfig) -> Self {
        self.items.push(ConfigItem::Feature(feature));
        self
    }

    pub fn with_group(mut self, group: GroupInclusion) -> Self {
        self.items.push(ConfigItem::Group(group));
        self
    }
}

/// One contribution to a config model, keyed by [`ConfigId`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigModel {
    pub id: ConfigId,
    /// When false, this contribution resets previously accumulated feature
    /// content (items, layer directives, exclusions) for the config id
    pub inherit_features: bool,
    pub properties: BTreeMap<String, ConfigProperty>,
    pub included_layers: Vec<String>,
    pub excluded_layers: Vec<String>,
    pub items: Vec<ConfigItem>,
    pub excluded_specs: Vec<String>,
    pub excluded_features: Vec<FeatureId>,
}

impl ConfigModel {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ConfigId::new(model, name),
            inherit_features: true,
            properties: BTreeMap::new(),
            included_layers: Vec::new(),
            excluded_layers: Vec::new(),
            items: Vec::new(),
            excluded_specs: Vec::new(),
            excluded_features: Vec::new(),
        }
    }

    pub fn without_inherited_features(mut self) -> Self {
        self.inherit_features = false;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, prop: ConfigProperty) -> Self {
        self.properties.insert(name.into(), prop);
        self
    }

    pub fn include_layer(mut self, name: impl Into<String>) -> Self {
        self.included_layers.push(name.into());
        self
    }

    pub fn exclude_layer(mut self, name: impl Into<String>) -> Self {
        self.excluded_layers.push(name.into());
        self
    }

    pub fn with_feature(mut self, feature: FeatureConfig) -> Self {
        self.items.push(ConfigItem::Feature(feature));
        self
    }

    pub fn with_group(mut self, group: GroupInclusion) -> Self {
        self.items.push(ConfigItem::Group(group));
        self
    }

    pub fn exclude_spec(mut self, spec: impl Into<String>) -> Self {
        self.excluded_specs.push(spec.into());
        self
    }

    pub fn exclude_feature(mut self, feature: FeatureId) -> Self {
        self.excluded_features.push(feature);
        self
    }
}
