// src/resolver/batches.rs

//! Mixed-loop batch scheduling.
//!
//! Orders a resolved feature graph into batches consumable sequentially by
//! an installer. Features are walked strictly in declaration order; the
//! scheduler never reorders, only defers. A feature whose dependency or
//! capability requirement targets something not yet emitted closes the
//! current batch and opens a new one, deferring the edge: apparent circular
//! references between two specs are legal because each direction is only
//! needed once the other side already appeared in an earlier batch. Edges
//! still unmet when the walk ends are a genuine scheduling failure.

use crate::error::{Error, Result};
use crate::resolver::features::ConfigFeatureGraph;
use crate::spec::feature::ResolvedFeatureId;
use crate::state::{BatchEvent, FeatureBatch, ProvisionedConfig};
use std::collections::HashSet;
use tracing::{debug, trace};

enum DeferredEdge {
    Feature(ResolvedFeatureId),
    Capability(String),
}

/// Schedule one resolved feature graph into ordered batches
pub fn schedule(graph: &ConfigFeatureGraph) -> Result<ProvisionedConfig> {
    let mut batches: Vec<FeatureBatch> = Vec::new();
    let mut current = FeatureBatch::default();
    let mut current_spec = None;
    let mut emitted: HashSet<ResolvedFeatureId> = HashSet::new();
    let mut provided: HashSet<String> = HashSet::new();
    let mut deferred: Vec<(ResolvedFeatureId, DeferredEdge)> = Vec::new();
    // Open branch parents, outermost first
    let mut branches: Vec<ResolvedFeatureId> = Vec::new();
    let mut previous: Option<ResolvedFeatureId> = None;

    for feature in &graph.features {
        let mut unsatisfied: Vec<DeferredEdge> = Vec::new();
        for dep in &feature.dependencies {
            if !emitted.contains(dep) {
                unsatisfied.push(DeferredEdge::Feature(dep.clone()));
            }
        }
        for requirement in &feature.requires {
            if provided.contains(&requirement.name) {
                continue;
            }
            // A feature providing its own requirement satisfies itself
            if feature.provides.iter().any(|p| p == &requirement.name) {
                continue;
            }
            // An optional requirement nothing provides is vacuous
            if requirement.optional && !graph.index.has_provider(&requirement.name) {
                continue;
            }
            unsatisfied.push(DeferredEdge::Capability(requirement.name.clone()));
        }

        if !unsatisfied.is_empty() && !current.events.is_empty() {
            trace!(feature = %feature.id, "deferring unmet edges, closing batch");
            for _ in branches.drain(..) {
                current.events.push(BatchEvent::BranchEnd);
            }
            batches.push(std::mem::take(&mut current));
            current_spec = None;
        }
        for edge in unsatisfied {
            deferred.push((feature.id.clone(), edge));
        }

        // Branch bookkeeping from parent links: close branches until the
        // stack matches this feature's parent, open one when it nests
        // directly under the previously emitted feature
        while let Some(top) = branches.last() {
            if feature.parent.as_ref() == Some(top) {
                break;
            }
            branches.pop();
            current.events.push(BatchEvent::BranchEnd);
        }
        if let Some(parent) = &feature.parent {
            if branches.last() != Some(parent) && previous.as_ref() == Some(parent) {
                branches.push(parent.clone());
                current.events.push(BatchEvent::BranchStart);
            }
        }

        if current_spec.as_ref() != Some(&feature.id.spec) {
            current.events.push(BatchEvent::SpecChange(feature.id.spec.clone()));
            current_spec = Some(feature.id.spec.clone());
        }

        emitted.insert(feature.id.clone());
        provided.extend(feature.provides.iter().cloned());
        previous = Some(feature.id.clone());
        current.events.push(BatchEvent::Feature(feature.clone()));
    }

    for _ in branches.drain(..) {
        current.events.push(BatchEvent::BranchEnd);
    }
    if !current.events.is_empty() {
        batches.push(current);
    }

    // Deferred edges must have been satisfied by something emitted later
    let mut unsatisfied: Vec<ResolvedFeatureId> = Vec::new();
    for (feature, edge) in &deferred {
        let met = match edge {
            DeferredEdge::Feature(id) => emitted.contains(id),
            DeferredEdge::Capability(name) => provided.contains(name),
        };
        if !met && !unsatisfied.contains(feature) {
            unsatisfied.push(feature.clone());
        }
    }
    if !unsatisfied.is_empty() {
        return Err(Error::UnsatisfiableSchedule {
            config: graph.id.clone(),
            unsatisfied,
        });
    }

    debug!(config = %graph.id, batches = batches.len(), "schedule complete");
    Ok(ProvisionedConfig {
        id: graph.id.clone(),
        properties: graph.properties.clone(),
        batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityIndex;
    use crate::spec::config::ConfigId;
    use crate::spec::feature::SpecId;
    use crate::state::{CapabilityRequirement, ResolvedFeature};
    use std::collections::BTreeMap;

    fn feature(spec: &str, name: &str) -> ResolvedFeature {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), name.to_string());
        ResolvedFeature {
            id: ResolvedFeatureId::new(SpecId::new("core", spec), params.clone()),
            params,
            dependencies: Vec::new(),
            provides: Vec::new(),
            requires: Vec::new(),
            parent: None,
        }
    }

    fn graph_of(features: Vec<ResolvedFeature>) -> ConfigFeatureGraph {
        let mut index = CapabilityIndex::new();
        for f in &features {
            for cap in &f.provides {
                index.register(cap.clone(), f.id.clone()).unwrap();
            }
        }
        index.freeze();
        ConfigFeatureGraph {
            id: ConfigId::new("standard", "main"),
            properties: BTreeMap::new(),
            features,
            index,
        }
    }

    fn batch_names(batch: &FeatureBatch) -> Vec<String> {
        batch
            .features()
            .map(|f| f.param("name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_single_batch_in_order() {
        let graph = graph_of(vec![
            feature("unit", "a"),
            feature("unit", "b"),
            feature("other", "x"),
        ]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 1);
        assert_eq!(batch_names(&config.batches[0]), vec!["a", "b", "x"]);
    }

    #[test]
    fn test_spec_change_markers() {
        let graph = graph_of(vec![
            feature("unit", "a"),
            feature("unit", "b"),
            feature("other", "x"),
        ]);
        let config = schedule(&graph).unwrap();
        let events = &config.batches[0].events;
        assert!(matches!(&events[0], BatchEvent::SpecChange(s) if s.name == "unit"));
        assert!(matches!(&events[1], BatchEvent::Feature(_)));
        assert!(matches!(&events[2], BatchEvent::Feature(_)));
        assert!(matches!(&events[3], BatchEvent::SpecChange(s) if s.name == "other"));
        assert!(matches!(&events[4], BatchEvent::Feature(_)));
    }

    #[test]
    fn test_satisfied_dependency_stays_in_batch() {
        let a = feature("unit", "a");
        let mut b = feature("unit", "b");
        b.dependencies.push(a.id.clone());
        let graph = graph_of(vec![a, b]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 1);
    }

    #[test]
    fn test_forward_dependency_splits_batch() {
        // b is declared before its dependency c, with a already emitted
        let a = feature("unit", "a");
        let c = feature("unit", "c");
        let mut b = feature("unit", "b");
        b.dependencies.push(c.id.clone());
        let graph = graph_of(vec![a, b, c]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 2);
        assert_eq!(batch_names(&config.batches[0]), vec!["a"]);
        assert_eq!(batch_names(&config.batches[1]), vec!["b", "c"]);
    }

    #[test]
    fn test_mixed_loop_three_batches() {
        // spec A requires cap of B per instance; spec B references A.
        // Three interleaved instances per spec: exactly three batches,
        // one instance per spec each, declaration order preserved.
        let mut features = Vec::new();
        for n in ["1", "2", "3"] {
            let mut a = feature("a", n);
            a.requires.push(CapabilityRequirement {
                name: format!("cap.b.{}", n),
                optional: false,
            });
            let mut b = feature("b", n);
            b.provides.push(format!("cap.b.{}", n));
            b.dependencies.push(a.id.clone());
            features.push(a);
            features.push(b);
        }
        let graph = graph_of(features);
        let config = schedule(&graph).unwrap();

        assert_eq!(config.batches.len(), 3);
        for (i, batch) in config.batches.iter().enumerate() {
            let expected = format!("{}", i + 1);
            assert_eq!(batch_names(batch), vec![expected.clone(), expected]);
            // fixed event trace: spec-change, feature, spec-change, feature
            assert!(matches!(&batch.events[0], BatchEvent::SpecChange(s) if s.name == "a"));
            assert!(matches!(&batch.events[1], BatchEvent::Feature(_)));
            assert!(matches!(&batch.events[2], BatchEvent::SpecChange(s) if s.name == "b"));
            assert!(matches!(&batch.events[3], BatchEvent::Feature(_)));
        }
    }

    #[test]
    fn test_self_provided_capability_does_not_split() {
        let mut a = feature("unit", "a");
        a.provides.push("cap.a".to_string());
        a.requires.push(CapabilityRequirement {
            name: "cap.a".to_string(),
            optional: false,
        });
        let b = feature("unit", "b");
        let graph = graph_of(vec![b, a]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 1);
    }

    #[test]
    fn test_optional_requirement_without_provider_is_vacuous() {
        let mut a = feature("unit", "a");
        a.requires.push(CapabilityRequirement {
            name: "cap.ghost".to_string(),
            optional: true,
        });
        let b = feature("unit", "b");
        let graph = graph_of(vec![b, a]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 1);
    }

    #[test]
    fn test_unsatisfiable_schedule() {
        let ghost = feature("unit", "ghost").id;
        let mut a = feature("unit", "a");
        a.dependencies.push(ghost);
        let graph = graph_of(vec![a]);
        match schedule(&graph) {
            Err(Error::UnsatisfiableSchedule { unsatisfied, .. }) => {
                assert_eq!(unsatisfied.len(), 1);
            }
            other => panic!("expected unsatisfiable schedule, got {:?}", other),
        }
    }

    #[test]
    fn test_branch_markers_bracket_nested_features() {
        let parent = feature("unit", "a");
        let mut child1 = feature("sub", "a.1");
        child1.parent = Some(parent.id.clone());
        let mut child2 = feature("sub", "a.2");
        child2.parent = Some(parent.id.clone());
        let sibling = feature("unit", "b");
        let graph = graph_of(vec![parent, child1, child2, sibling]);
        let config = schedule(&graph).unwrap();

        let events = &config.batches[0].events;
        // unit:a, branch-start, sub features, branch-end, unit:b
        assert!(matches!(&events[0], BatchEvent::SpecChange(_)));
        assert!(matches!(&events[1], BatchEvent::Feature(_)));
        assert!(matches!(&events[2], BatchEvent::BranchStart));
        assert!(matches!(&events[3], BatchEvent::SpecChange(s) if s.name == "sub"));
        assert!(matches!(&events[4], BatchEvent::Feature(_)));
        assert!(matches!(&events[5], BatchEvent::Feature(_)));
        assert!(matches!(&events[6], BatchEvent::BranchEnd));
        assert!(matches!(&events[7], BatchEvent::SpecChange(s) if s.name == "unit"));
        assert!(matches!(&events[8], BatchEvent::Feature(_)));
    }

    #[test]
    fn test_branch_closed_before_batch_split() {
        let parent = feature("unit", "a");
        let mut child = feature("sub", "a.1");
        child.parent = Some(parent.id.clone());
        let provider = feature("prov", "p");
        let mut consumer = feature("unit", "b");
        consumer.requires.push(CapabilityRequirement {
            name: "cap.late".to_string(),
            optional: false,
        });
        let mut late = feature("prov", "late");
        late.provides.push("cap.late".to_string());

        let graph = graph_of(vec![parent, child, provider, consumer, late]);
        let config = schedule(&graph).unwrap();
        assert_eq!(config.batches.len(), 2);

        // every branch-start in the first batch is matched before it ends
        let mut depth = 0i32;
        for event in &config.batches[0].events {
            match event {
                BatchEvent::BranchStart => depth += 1,
                BatchEvent::BranchEnd => depth -= 1,
                _ => {}
            }
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn test_empty_graph_yields_no_batches() {
        let graph = graph_of(Vec::new());
        let config = schedule(&graph).unwrap();
        assert!(config.batches.is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let build = || {
            let mut features = Vec::new();
            for n in ["1", "2", "3"] {
                let mut a = feature("a", n);
                a.requires.push(CapabilityRequirement {
                    name: format!("cap.b.{}", n),
                    optional: false,
                });
                let mut b = feature("b", n);
                b.provides.push(format!("cap.b.{}", n));
                features.push(a);
                features.push(b);
            }
            schedule(&graph_of(features)).unwrap()
        };
        assert_eq!(build(), build());
    }
}
