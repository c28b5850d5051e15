// src/resolver/features.rs

//! Feature graph building.
//!
//! Expands one merged config model into a flat, ordered list of resolved
//! features: groups are expanded recursively with their inclusion site's
//! include/exclude/override directives applied, parameters are filled from
//! spec defaults and validated against their declared types, references are
//! resolved into dependency edges, and capability provisions/requirements
//! are substituted. Provisions are registered in the capability index in
//! declaration order; requirements are verified against the full index
//! after the whole pass, so a provider declared later than its consumer is
//! legal.

use crate::capability::{substitute, CapabilityIndex, SubstitutionError};
use crate::error::{Error, Result};
use crate::resolver::configs::MergedConfig;
use crate::resolver::layout::FeaturePackLayout;
use crate::spec::config::{ConfigId, ConfigItem, FeatureConfig, FeatureDependency, GroupInclusion};
use crate::spec::feature::{
    FeatureId, FeatureSpec, ResolvedFeatureId, SpecId,
};
use crate::state::{CapabilityRequirement, ResolvedFeature};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// The resolved feature graph of one config id
#[derive(Debug)]
pub struct ConfigFeatureGraph {
    pub id: ConfigId,
    pub properties: BTreeMap<String, String>,
    /// Features in resolved declaration order
    pub features: Vec<ResolvedFeature>,
    /// Frozen capability provider index
    pub index: CapabilityIndex,
}

/// Build the feature graph for one merged config
pub fn build(merged: &MergedConfig, layout: &FeaturePackLayout) -> Result<ConfigFeatureGraph> {
    let mut builder = GraphBuilder::new(layout);
    builder.collect_forced(&merged.items, &mut HashSet::new())?;
    let root = GroupScope::root(merged);
    builder.push_items(&merged.items, None, &mut vec![root], &mut HashSet::new())?;
    builder.resolve(merged)
}

/// A feature instance gathered during expansion, before reference and
/// capability resolution
struct PendingFeature {
    id: ResolvedFeatureId,
    params: BTreeMap<String, String>,
    dependencies: Vec<FeatureDependency>,
    parent: Option<ResolvedFeatureId>,
}

/// Include/exclude view contributed by one group inclusion site (or the
/// config itself, as the outermost scope)
struct GroupScope<'a> {
    inherit: bool,
    included_specs: &'a [String],
    included_features: &'a [FeatureConfig],
    excluded_specs: &'a [String],
    excluded_features: &'a [FeatureId],
}

impl<'a> GroupScope<'a> {
    fn root(merged: &'a MergedConfig) -> Self {
        Self {
            inherit: true,
            included_specs: &[],
            included_features: &[],
            excluded_specs: &merged.excluded_specs,
            excluded_features: &merged.excluded_features,
        }
    }

    fn site(inclusion: &'a GroupInclusion) -> Self {
        Self {
            inherit: inclusion.inherit_features,
            included_specs: &inclusion.included_specs,
            included_features: &inclusion.included_features,
            excluded_specs: &inclusion.excluded_specs,
            excluded_features: &inclusion.excluded_features,
        }
    }
}

struct GraphBuilder<'a> {
    layout: &'a FeaturePackLayout,
    order: Vec<ResolvedFeatureId>,
    nodes: HashMap<ResolvedFeatureId, PendingFeature>,
    /// Targets of include-if-excluded dependency edges
    forced: HashSet<FeatureId>,
}

impl<'a> GraphBuilder<'a> {
    fn new(layout: &'a FeaturePackLayout) -> Self {
        Self {
            layout,
            order: Vec::new(),
            nodes: HashMap::new(),
            forced: HashSet::new(),
        }
    }

    /// Pre-scan for include-if-excluded dependency directives, so an
    /// exclusion is lifted no matter where the lifting edge is declared
    fn collect_forced(
        &mut self,
        items: &'a [ConfigItem],
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        for item in items {
            match item {
                ConfigItem::Feature(fc) => self.collect_forced_from_feature(fc),
                ConfigItem::Group(inclusion) => {
                    if !visiting.insert(inclusion.name.clone()) {
                        return Err(Error::ConflictingDirective(format!(
                            "feature group '{}' includes itself",
                            inclusion.name
                        )));
                    }
                    for fc in &inclusion.included_features {
                        self.collect_forced_from_feature(fc);
                    }
                    let layout = self.layout;
                    let (_, group) =
                        layout.find_group(inclusion.origin.as_deref(), &inclusion.name)?;
                    self.collect_forced(&group.items, visiting)?;
                    visiting.remove(&inclusion.name);
                }
            }
        }
        Ok(())
    }

    fn collect_forced_from_feature(&mut self, fc: &FeatureConfig) {
        for dep in &fc.dependencies {
            if dep.include {
                self.forced.insert(dep.feature.clone());
            }
        }
        for nested in &fc.nested {
            self.collect_forced_from_feature(nested);
        }
    }

    fn push_items(
        &mut self,
        items: &'a [ConfigItem],
        parent: Option<&ResolvedFeatureId>,
        scopes: &mut Vec<GroupScope<'a>>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        for item in items {
            match item {
                ConfigItem::Feature(fc) => {
                    self.push_feature(fc, parent, scopes)?;
                }
                ConfigItem::Group(inclusion) => {
                    self.push_group(inclusion, parent, scopes, visiting)?;
                }
            }
        }
        Ok(())
    }

    fn push_group(
        &mut self,
        inclusion: &'a GroupInclusion,
        parent: Option<&ResolvedFeatureId>,
        scopes: &mut Vec<GroupScope<'a>>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        if !visiting.insert(inclusion.name.clone()) {
            return Err(Error::ConflictingDirective(format!(
                "feature group '{}' includes itself",
                inclusion.name
            )));
        }
        let layout = self.layout;
        let (pack, group) = layout.find_group(inclusion.origin.as_deref(), &inclusion.name)?;
        trace!(group = %inclusion.name, pack = %pack.id, "expanding feature group");
        scopes.push(GroupScope::site(inclusion));
        let result = self.push_items(&group.items, parent, scopes, visiting);
        scopes.pop();
        visiting.remove(&inclusion.name);
        result
    }

    fn push_feature(
        &mut self,
        fc: &FeatureConfig,
        parent: Option<&ResolvedFeatureId>,
        scopes: &mut Vec<GroupScope<'a>>,
    ) -> Result<Option<ResolvedFeatureId>> {
        let layout = self.layout;
        let (pack, spec) = layout.find_feature_spec(fc.origin.as_deref(), &fc.spec)?;
        let producer = pack.id.producer.clone();

        // Spec defaults under the instance's own values
        let mut params: BTreeMap<String, String> = spec
            .params
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        for (k, v) in &fc.params {
            params.insert(k.clone(), v.clone());
        }
        let mut unset: BTreeSet<String> = fc.unset.clone();

        let identity = identity_params(spec, &params)?;
        let unresolved = FeatureId {
            spec: spec.name.clone(),
            params: identity.clone(),
        };

        // Scope filtering: every enclosing site must admit the feature
        let forced = self.forced.contains(&unresolved);
        let mut overrides: Vec<&FeatureConfig> = Vec::new();
        for scope in scopes.iter() {
            if scope.inherit {
                let excluded = scope.excluded_specs.iter().any(|s| *s == spec.name)
                    || scope.excluded_features.iter().any(|f| *f == unresolved);
                if excluded && !forced {
                    trace!(feature = %unresolved, "skipping excluded feature");
                    return Ok(None);
                }
            } else {
                let listed = scope.included_specs.iter().any(|s| *s == spec.name)
                    || scope
                        .included_features
                        .iter()
                        .any(|f| matches_feature(f, spec, &unresolved));
                if !listed {
                    return Ok(None);
                }
            }
            overrides.extend(
                scope
                    .included_features
                    .iter()
                    .filter(|f| matches_feature(f, spec, &unresolved)),
            );
        }

        // Inclusion-site overrides, outermost last so the config-side wins
        let mut dependencies = fc.dependencies.clone();
        for directive in overrides.iter().rev() {
            for (k, v) in &directive.params {
                params.insert(k.clone(), v.clone());
            }
            unset.extend(directive.unset.iter().cloned());
            dependencies.extend(directive.dependencies.iter().cloned());
        }
        for name in &unset {
            params.remove(name);
        }

        validate_params(spec, &params)?;

        let id = ResolvedFeatureId::new(SpecId::new(producer, spec.name.clone()), identity);

        if self.nodes.contains_key(&id) {
            // Re-including an existing feature refines it in place
            let mut explicit: BTreeMap<String, String> = fc.params.clone();
            for directive in overrides.iter().rev() {
                for (k, v) in &directive.params {
                    explicit.insert(k.clone(), v.clone());
                }
            }
            let node = self.nodes.get_mut(&id).expect("existing node");
            for (k, v) in explicit {
                node.params.insert(k, v);
            }
            for name in &unset {
                node.params.remove(name);
            }
            node.dependencies.extend(dependencies);
        } else {
            self.order.push(id.clone());
            self.nodes.insert(
                id.clone(),
                PendingFeature {
                    id: id.clone(),
                    params,
                    dependencies,
                    parent: parent.cloned(),
                },
            );
        }

        for nested in &fc.nested {
            self.push_feature(nested, Some(&id), scopes)?;
        }
        Ok(Some(id))
    }

    /// Second pass: resolve references, dependencies, and capabilities in
    /// declaration order, then verify requirements against the full index
    fn resolve(mut self, merged: &MergedConfig) -> Result<ConfigFeatureGraph> {
        let mut index = CapabilityIndex::new();
        let mut features = Vec::with_capacity(self.order.len());

        for id in &self.order {
            let node = self.nodes.remove(id).expect("pending node");
            let (_, spec) = self
                .layout
                .find_feature_spec(Some(&id.spec.producer), &id.spec.name)?;

            let mut dependencies: Vec<ResolvedFeatureId> = Vec::new();
            for dep in &node.dependencies {
                let target = self.resolve_feature_id(&dep.feature)?;
                if !self.known(&target, &features) {
                    return Err(Error::UnresolvedFeatureDependency {
                        feature: id.clone(),
                        dependency: dep.feature.clone(),
                    });
                }
                dependencies.push(target);
            }

            // Nillable references that resolve to none also disarm their
            // capability twin
            let mut skipped_caps: HashSet<&str> = HashSet::new();
            for reference in &spec.refs {
                let (target_pack, target_spec) = self
                    .layout
                    .find_feature_spec(None, &reference.target)?;
                let mappings: Vec<(String, String)> = if reference.mappings.is_empty() {
                    target_spec
                        .identity_params()
                        .map(|p| (p.name.clone(), p.name.clone()))
                        .collect()
                } else {
                    reference
                        .mappings
                        .iter()
                        .map(|m| (m.local.clone(), m.target.clone()))
                        .collect()
                };

                let mut target_params = BTreeMap::new();
                let mut complete = true;
                for (local, target) in &mappings {
                    match node.params.get(local) {
                        Some(value) => {
                            target_params.insert(target.clone(), value.clone());
                        }
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }

                if !complete {
                    if reference.nillable {
                        if let Some(cap) = &reference.capability {
                            skipped_caps.insert(cap.as_str());
                        }
                        trace!(
                            feature = %id,
                            reference = reference.display_name(),
                            "nillable reference resolved to none"
                        );
                        continue;
                    }
                    return Err(Error::UnresolvedReference {
                        feature: id.clone(),
                        reference: reference.display_name().to_string(),
                    });
                }

                let target_id = ResolvedFeatureId::new(
                    SpecId::new(target_pack.id.producer.clone(), reference.target.clone()),
                    target_params,
                );
                if !self.known(&target_id, &features) {
                    return Err(Error::UnresolvedFeatureDependency {
                        feature: id.clone(),
                        dependency: target_id.unresolved(),
                    });
                }
                dependencies.push(target_id);
            }

            let mut provides = Vec::new();
            for cap in &spec.provides {
                match substitute(&cap.name, &node.params, spec) {
                    Ok(names) => {
                        for name in names {
                            index.register(name.clone(), id.clone())?;
                            provides.push(name);
                        }
                    }
                    Err(SubstitutionError::EmptyList { .. }) => {}
                    Err(e) => return Err(map_substitution(e, &id.spec.name)),
                }
            }

            let mut requires = Vec::new();
            for cap in &spec.requires {
                if skipped_caps.contains(cap.name.as_str()) {
                    continue;
                }
                match substitute(&cap.name, &node.params, spec) {
                    Ok(names) => {
                        for name in names {
                            requires.push(CapabilityRequirement {
                                name,
                                optional: cap.optional,
                            });
                        }
                    }
                    Err(SubstitutionError::EmptyList { .. }) if cap.optional => {}
                    Err(SubstitutionError::EmptyList { .. }) => {
                        return Err(Error::UnresolvedCapability {
                            capability: cap.name.clone(),
                            feature: id.clone(),
                        });
                    }
                    Err(SubstitutionError::UnsetParameter { .. }) if cap.optional => {}
                    Err(e) => return Err(map_substitution(e, &id.spec.name)),
                }
            }

            features.push(ResolvedFeature {
                id: id.clone(),
                params: node.params,
                dependencies,
                provides,
                requires,
                parent: node.parent,
            });
        }

        index.freeze();
        for feature in &features {
            for requirement in &feature.requires {
                if !requirement.optional && !index.has_provider(&requirement.name) {
                    return Err(Error::UnresolvedCapability {
                        capability: requirement.name.clone(),
                        feature: feature.id.clone(),
                    });
                }
            }
        }

        debug!(config = %merged.id, features = features.len(), "feature graph built");
        Ok(ConfigFeatureGraph {
            id: merged.id.clone(),
            properties: merged
                .properties
                .iter()
                .map(|(k, p)| (k.clone(), p.value.clone()))
                .collect(),
            features,
            index,
        })
    }

    /// Resolve a config-side feature id against the layout
    fn resolve_feature_id(&self, feature: &FeatureId) -> Result<ResolvedFeatureId> {
        let (pack, _) = self.layout.find_feature_spec(None, &feature.spec)?;
        Ok(ResolvedFeatureId::new(
            SpecId::new(pack.id.producer.clone(), feature.spec.clone()),
            feature.params.clone(),
        ))
    }

    /// Whether the id names a feature of this graph (already emitted into
    /// `features` or still pending)
    fn known(&self, id: &ResolvedFeatureId, features: &[ResolvedFeature]) -> bool {
        self.nodes.contains_key(id) || features.iter().any(|f| &f.id == id)
    }
}

/// The identity parameter values of one instance
fn identity_params(
    spec: &FeatureSpec,
    params: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut identity = BTreeMap::new();
    for param in spec.identity_params() {
        let value = params
            .get(&param.name)
            .ok_or_else(|| Error::ParameterMissing {
                spec: spec.name.clone(),
                param: param.name.clone(),
            })?;
        identity.insert(param.name.clone(), value.clone());
    }
    Ok(identity)
}

/// Reject undeclared parameters and type-invalid values
fn validate_params(spec: &FeatureSpec, params: &BTreeMap<String, String>) -> Result<()> {
    for (name, value) in params {
        let declared = spec.param(name).ok_or_else(|| Error::UnknownParameter {
            spec: spec.name.clone(),
            param: name.clone(),
        })?;
        if !declared.ptype.accepts(value) {
            return Err(Error::MalformedParameterValue {
                spec: spec.name.clone(),
                param: name.clone(),
                value: value.clone(),
                expected: declared.ptype,
            });
        }
    }
    Ok(())
}

/// Whether an include/override directive addresses the given instance
fn matches_feature(directive: &FeatureConfig, spec: &FeatureSpec, id: &FeatureId) -> bool {
    if directive.spec != spec.name {
        return false;
    }
    spec.identity_params()
        .all(|p| directive.params.get(&p.name) == id.params.get(&p.name))
}

fn map_substitution(error: SubstitutionError, spec: &str) -> Error {
    match error {
        SubstitutionError::UnknownParameter { param, .. } => Error::UnknownParameter {
            spec: spec.to_string(),
            param,
        },
        SubstitutionError::UnsetParameter { param, .. } => Error::ParameterMissing {
            spec: spec.to_string(),
            param,
        },
        SubstitutionError::EmptyList { param, .. } => Error::ParameterMissing {
            spec: spec.to_string(),
            param,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::layout::ResolvedFeaturePack;
    use crate::spec::config::{ConfigModel, FeatureGroup};
    use crate::spec::feature::{CapabilitySpec, FeatureParameter, FeatureReference, ParameterType};
    use crate::spec::featurepack::{FeaturePackConfig, FeaturePackSpec};
    use crate::spec::producer::FeaturePackId;

    fn pack_id() -> FeaturePackId {
        FeaturePackId::new("core", "1.0", "1.0.0")
    }

    fn layout_with(spec: FeaturePackSpec) -> FeaturePackLayout {
        FeaturePackLayout {
            packs: vec![ResolvedFeaturePack {
                id: spec.id.clone(),
                config: FeaturePackConfig::new(spec.id.clone()),
                spec,
            }],
        }
    }

    fn merged_from(model: ConfigModel) -> MergedConfig {
        MergedConfig {
            id: model.id,
            properties: model.properties,
            items: model.items,
            excluded_specs: model.excluded_specs,
            excluded_features: model.excluded_features,
        }
    }

    fn unit_spec() -> FeatureSpec {
        FeatureSpec::new("unit")
            .with_param(FeatureParameter::identity("name"))
            .with_param(FeatureParameter::new("value").with_default("0"))
    }

    #[test]
    fn test_defaults_and_overrides() {
        let layout = layout_with(FeaturePackSpec::new(pack_id()).with_feature_spec(unit_spec()));
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("unit").with_param("name", "a")),
        );

        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features.len(), 1);
        assert_eq!(graph.features[0].param("value"), Some("0"));
        assert_eq!(graph.features[0].id.to_string(), "core/unit:name=a");
    }

    #[test]
    fn test_duplicate_id_merges_params() {
        let layout = layout_with(FeaturePackSpec::new(pack_id()).with_feature_spec(unit_spec()));
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(
                    FeatureConfig::new("unit")
                        .with_param("name", "a")
                        .with_param("value", "1"),
                )
                .with_feature(
                    FeatureConfig::new("unit")
                        .with_param("name", "a")
                        .with_param("value", "2"),
                ),
        );

        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features.len(), 1);
        assert_eq!(graph.features[0].param("value"), Some("2"));
    }

    #[test]
    fn test_group_expansion_with_override() {
        let spec = FeaturePackSpec::new(pack_id())
            .with_feature_spec(unit_spec())
            .with_group(
                FeatureGroup::new("base")
                    .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                    .with_feature(FeatureConfig::new("unit").with_param("name", "b")),
            );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main").with_group(
                GroupInclusion::new("base").include_feature(
                    FeatureConfig::new("unit")
                        .with_param("name", "b")
                        .with_param("value", "7"),
                ),
            ),
        );

        let graph = build(&merged, &layout).unwrap();
        let names: Vec<_> = graph
            .features
            .iter()
            .map(|f| f.param("name").unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(graph.features[1].param("value"), Some("7"));
        assert_eq!(graph.features[0].param("value"), Some("0"));
    }

    #[test]
    fn test_group_exclusions() {
        let spec = FeaturePackSpec::new(pack_id())
            .with_feature_spec(unit_spec())
            .with_group(
                FeatureGroup::new("base")
                    .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                    .with_feature(FeatureConfig::new("unit").with_param("name", "b")),
            );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main").with_group(
                GroupInclusion::new("base")
                    .exclude_feature(FeatureId::new("unit").with_param("name", "a")),
            ),
        );
        let graph = build(&merged, &layout).unwrap();
        let names: Vec<_> = graph
            .features
            .iter()
            .map(|f| f.param("name").unwrap())
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_group_without_inherited_features() {
        let spec = FeaturePackSpec::new(pack_id())
            .with_feature_spec(unit_spec())
            .with_feature_spec(
                FeatureSpec::new("other").with_param(FeatureParameter::identity("name")),
            )
            .with_group(
                FeatureGroup::new("base")
                    .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                    .with_feature(FeatureConfig::new("other").with_param("name", "x")),
            );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main").with_group(
                GroupInclusion::new("base")
                    .without_inherited_features()
                    .include_spec("other"),
            ),
        );
        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features.len(), 1);
        assert_eq!(graph.features[0].id.spec.name, "other");
    }

    #[test]
    fn test_config_level_exclusion_and_forced_include() {
        let spec = FeaturePackSpec::new(pack_id()).with_feature_spec(unit_spec());
        let layout = layout_with(spec);

        // excluded outright
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                .exclude_feature(FeatureId::new("unit").with_param("name", "a")),
        );
        let graph = build(&merged, &layout).unwrap();
        assert!(graph.features.is_empty());

        // exclusion lifted by an include-if-excluded dependency edge
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                .with_feature(
                    FeatureConfig::new("unit")
                        .with_param("name", "b")
                        .with_dependency(FeatureDependency::include_if_excluded(
                            FeatureId::new("unit").with_param("name", "a"),
                        )),
                )
                .exclude_feature(FeatureId::new("unit").with_param("name", "a")),
        );
        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features.len(), 2);
    }

    #[test]
    fn test_explicit_dependency_on_excluded_fails() {
        let spec = FeaturePackSpec::new(pack_id()).with_feature_spec(unit_spec());
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("unit").with_param("name", "a"))
                .with_feature(
                    FeatureConfig::new("unit")
                        .with_param("name", "b")
                        .with_dependency(FeatureDependency::new(
                            FeatureId::new("unit").with_param("name", "a"),
                        )),
                )
                .exclude_feature(FeatureId::new("unit").with_param("name", "a")),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::UnresolvedFeatureDependency { .. })
        ));
    }

    #[test]
    fn test_nested_features_carry_parent() {
        let spec = FeaturePackSpec::new(pack_id())
            .with_feature_spec(unit_spec())
            .with_feature_spec(
                FeatureSpec::new("sub").with_param(FeatureParameter::identity("name")),
            );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main").with_feature(
                FeatureConfig::new("unit")
                    .with_param("name", "a")
                    .with_nested(FeatureConfig::new("sub").with_param("name", "a.1")),
            ),
        );
        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features.len(), 2);
        assert_eq!(
            graph.features[1].parent.as_ref().unwrap(),
            &graph.features[0].id
        );
    }

    fn referencing_specs() -> FeaturePackSpec {
        FeaturePackSpec::new(pack_id())
            .with_feature_spec(
                FeatureSpec::new("server").with_param(FeatureParameter::identity("name")),
            )
            .with_feature_spec(
                FeatureSpec::new("binding")
                    .with_param(FeatureParameter::identity("name"))
                    .with_param(FeatureParameter::new("server").nillable())
                    .with_reference(
                        FeatureReference::new("server").map("server", "name").nillable(),
                    ),
            )
    }

    #[test]
    fn test_nillable_reference_unset_resolves_to_none() {
        let layout = layout_with(referencing_specs());
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("binding").with_param("name", "http")),
        );
        let graph = build(&merged, &layout).unwrap();
        assert!(graph.features[0].dependencies.is_empty());
    }

    #[test]
    fn test_non_nillable_reference_unset_fails() {
        let mut spec = referencing_specs();
        let binding = spec.features.get_mut("binding").unwrap();
        binding.refs[0].nillable = false;
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("binding").with_param("name", "http")),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_reference_set_implies_dependency_edge() {
        let layout = layout_with(referencing_specs());
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("server").with_param("name", "main"))
                .with_feature(
                    FeatureConfig::new("binding")
                        .with_param("name", "http")
                        .with_param("server", "main"),
                ),
        );
        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features[1].dependencies.len(), 1);
        assert_eq!(
            graph.features[1].dependencies[0].to_string(),
            "core/server:name=main"
        );
    }

    #[test]
    fn test_capability_forward_provision_is_legal() {
        // consumer declared ahead of its provider in the same pass
        let spec = FeaturePackSpec::new(pack_id())
            .with_feature_spec(
                FeatureSpec::new("consumer")
                    .with_param(FeatureParameter::identity("name"))
                    .requires(CapabilitySpec::new("cap.$name")),
            )
            .with_feature_spec(
                FeatureSpec::new("provider")
                    .with_param(FeatureParameter::identity("name"))
                    .provides(CapabilitySpec::new("cap.$name")),
            );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("consumer").with_param("name", "x"))
                .with_feature(FeatureConfig::new("provider").with_param("name", "x")),
        );
        let graph = build(&merged, &layout).unwrap();
        assert_eq!(graph.features[0].requires[0].name, "cap.x");
        assert!(graph.index.has_provider("cap.x"));
    }

    #[test]
    fn test_unresolved_capability_fails() {
        let spec = FeaturePackSpec::new(pack_id()).with_feature_spec(
            FeatureSpec::new("consumer")
                .with_param(FeatureParameter::identity("name"))
                .requires(CapabilitySpec::new("cap.$name")),
        );
        let layout = layout_with(spec);

        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("consumer").with_param("name", "x")),
        );
        match build(&merged, &layout) {
            Err(Error::UnresolvedCapability { capability, .. }) => {
                assert_eq!(capability, "cap.x");
            }
            other => panic!("expected unresolved capability, got {:?}", other),
        }
    }

    fn list_capability_spec(optional: bool) -> FeaturePackSpec {
        let requirement = if optional {
            CapabilitySpec::optional("cap.$targets")
        } else {
            CapabilitySpec::new("cap.$targets")
        };
        FeaturePackSpec::new(pack_id())
            .with_feature_spec(
                FeatureSpec::new("consumer")
                    .with_param(FeatureParameter::identity("name"))
                    .with_param(FeatureParameter::new("targets").of_type(ParameterType::List))
                    .requires(requirement),
            )
            .with_feature_spec(
                FeatureSpec::new("provider")
                    .with_param(FeatureParameter::identity("name"))
                    .provides(CapabilitySpec::new("cap.$name")),
            )
    }

    #[test]
    fn test_capability_multiplicity_over_list() {
        let layout = layout_with(list_capability_spec(false));
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(
                    FeatureConfig::new("consumer")
                        .with_param("name", "x")
                        .with_param("targets", "[c1,c2]"),
                )
                .with_feature(FeatureConfig::new("provider").with_param("name", "c1"))
                .with_feature(FeatureConfig::new("provider").with_param("name", "c2")),
        );
        let graph = build(&merged, &layout).unwrap();
        let required: Vec<_> = graph.features[0]
            .requires
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(required, vec!["cap.c1", "cap.c2"]);

        // drop one provider: the multiplied requirement must fail
        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(
                    FeatureConfig::new("consumer")
                        .with_param("name", "x")
                        .with_param("targets", "[c1,c2]"),
                )
                .with_feature(FeatureConfig::new("provider").with_param("name", "c1")),
        );
        match build(&merged, &layout) {
            Err(Error::UnresolvedCapability { capability, .. }) => {
                assert_eq!(capability, "cap.c2")
            }
            other => panic!("expected unresolved capability, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_list_requirement() {
        // optional: vacuously satisfied
        let layout = layout_with(list_capability_spec(true));
        let merged = merged_from(
            ConfigModel::new("standard", "main").with_feature(
                FeatureConfig::new("consumer")
                    .with_param("name", "x")
                    .with_param("targets", "[]"),
            ),
        );
        let graph = build(&merged, &layout).unwrap();
        assert!(graph.features[0].requires.is_empty());

        // required: fails naming the template
        let layout = layout_with(list_capability_spec(false));
        let merged = merged_from(
            ConfigModel::new("standard", "main").with_feature(
                FeatureConfig::new("consumer")
                    .with_param("name", "x")
                    .with_param("targets", "[]"),
            ),
        );
        match build(&merged, &layout) {
            Err(Error::UnresolvedCapability { capability, .. }) => {
                assert_eq!(capability, "cap.$targets")
            }
            other => panic!("expected unresolved capability, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_parameter_value() {
        let spec = FeaturePackSpec::new(pack_id()).with_feature_spec(
            FeatureSpec::new("unit")
                .with_param(FeatureParameter::identity("name"))
                .with_param(FeatureParameter::new("count").of_type(ParameterType::Integer)),
        );
        let layout = layout_with(spec);
        let merged = merged_from(
            ConfigModel::new("standard", "main").with_feature(
                FeatureConfig::new("unit")
                    .with_param("name", "a")
                    .with_param("count", "many"),
            ),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::MalformedParameterValue { .. })
        ));
    }

    #[test]
    fn test_unknown_parameter_and_missing_identity() {
        let layout = layout_with(FeaturePackSpec::new(pack_id()).with_feature_spec(unit_spec()));

        let merged = merged_from(
            ConfigModel::new("standard", "main").with_feature(
                FeatureConfig::new("unit")
                    .with_param("name", "a")
                    .with_param("ghost", "v"),
            ),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::UnknownParameter { .. })
        ));

        let merged = merged_from(
            ConfigModel::new("standard", "main")
                .with_feature(FeatureConfig::new("unit").with_param("value", "3")),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::ParameterMissing { .. })
        ));
    }

    #[test]
    fn test_unknown_group_fails() {
        let layout = layout_with(FeaturePackSpec::new(pack_id()));
        let merged = merged_from(
            ConfigModel::new("standard", "main").with_group(GroupInclusion::new("ghost")),
        );
        assert!(matches!(
            build(&merged, &layout),
            Err(Error::UnknownFeatureGroup { .. })
        ));
    }
}
