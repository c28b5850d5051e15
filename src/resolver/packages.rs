// src/resolver/packages.rs

//! Per-feature-pack package resolution.
//!
//! Computes the closure of installed packages for one (patch-applied)
//! feature-pack under the effective edge modifiers and global options. The
//! closure walk carries an inclusion strength per package
//! (required > optional > passive); a package reached again through a
//! stronger path is promoted and its edges re-walked, so inclusion does not
//! depend on edge discovery order. Packages whose final strength is passive
//! are reported separately for later patch/diff reconciliation.

use crate::error::{Error, Result};
use crate::spec::featurepack::{FeaturePackConfig, FeaturePackSpec, ProvisioningOptions};
use crate::spec::package::DependencyKind;
use crate::stability::StabilityLevel;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

const PASSIVE: u8 = 0;
const OPTIONAL: u8 = 1;
const REQUIRED: u8 = 2;

fn kind_strength(kind: DependencyKind) -> u8 {
    match kind {
        DependencyKind::Required => REQUIRED,
        DependencyKind::Optional => OPTIONAL,
        DependencyKind::Passive => PASSIVE,
    }
}

/// The resolved package set of one feature-pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackages {
    /// Included packages, in inclusion order
    pub packages: Vec<String>,
    /// Included packages reachable only through passive edges
    pub passive: Vec<String>,
}

struct WorkItem {
    name: String,
    strength: u8,
    via: String,
    /// Whether a stability or lookup failure is a hard error
    strict: bool,
    edge_stability: Option<StabilityLevel>,
}

/// Resolve the package closure of one feature-pack
pub fn resolve(
    spec: &FeaturePackSpec,
    edge: &FeaturePackConfig,
    options: &ProvisioningOptions,
) -> Result<ResolvedPackages> {
    let excluded: HashSet<&str> = edge.excluded_packages.iter().map(|s| s.as_str()).collect();
    for name in &edge.included_packages {
        if excluded.contains(name.as_str()) {
            return Err(Error::ConflictingDirective(format!(
                "package '{}' of {} is both included and excluded",
                name, spec.id
            )));
        }
    }

    let policy = options.optional_packages;
    let threshold = options.min_stability;
    let mut strengths: HashMap<String, u8> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut queue: VecDeque<WorkItem> = VecDeque::new();

    if edge.inherit_packages && options.inherit_packages {
        for name in &spec.default_packages {
            queue.push_back(WorkItem {
                name: name.clone(),
                strength: REQUIRED,
                via: format!("defaults of {}", spec.id),
                strict: false,
                edge_stability: None,
            });
        }
    }
    for name in &edge.included_packages {
        queue.push_back(WorkItem {
            name: name.clone(),
            strength: REQUIRED,
            via: "explicit include".to_string(),
            strict: true,
            edge_stability: None,
        });
    }

    while let Some(item) = queue.pop_front() {
        if excluded.contains(item.name.as_str()) {
            // Default seeds are exactly what an exclusion is meant to
            // remove; a required edge onto an excluded package is not.
            if item.strict {
                return Err(Error::ConflictingDirective(format!(
                    "package '{}' is excluded but required by '{}'",
                    item.name, item.via
                )));
            }
            trace!(package = %item.name, "skipping excluded package");
            continue;
        }

        let package = match spec.packages.get(&item.name) {
            Some(p) => p,
            None if item.strength == PASSIVE => {
                trace!(package = %item.name, "dropping unknown passive dependency");
                continue;
            }
            None => {
                return Err(Error::UnknownPackage {
                    feature_pack: spec.id.clone(),
                    package: item.name.clone(),
                });
            }
        };

        let stability = item
            .edge_stability
            .unwrap_or_else(|| package.effective_stability());
        if !threshold.admits(stability) {
            if item.strict {
                return Err(Error::UnsatisfiedStability {
                    package: item.name.clone(),
                    required_by: item.via.clone(),
                    stability,
                    threshold,
                });
            }
            trace!(
                package = %item.name,
                %stability,
                %threshold,
                "dropping stability-filtered package"
            );
            continue;
        }

        let walk = match strengths.get(&item.name).copied() {
            None => {
                strengths.insert(item.name.clone(), item.strength);
                order.push(item.name.clone());
                true
            }
            Some(current) if current < item.strength => {
                // Stronger path found later: promote and re-walk the edges
                strengths.insert(item.name.clone(), item.strength);
                true
            }
            Some(_) => false,
        };
        if !walk {
            continue;
        }

        let path_strength = strengths[&item.name];
        for dep in &package.dependencies {
            match dep.kind {
                DependencyKind::Optional if !policy.follows_optional() => continue,
                DependencyKind::Passive if !policy.follows_passive() => continue,
                _ => {}
            }
            let child_strength = kind_strength(dep.kind).min(path_strength);
            queue.push_back(WorkItem {
                name: dep.name.clone(),
                strength: child_strength,
                via: item.name.clone(),
                strict: child_strength == REQUIRED,
                edge_stability: dep.min_stability,
            });
        }
    }

    let passive: Vec<String> = order
        .iter()
        .filter(|name| strengths[name.as_str()] == PASSIVE)
        .cloned()
        .collect();
    debug!(
        pack = %spec.id,
        packages = order.len(),
        passive = passive.len(),
        "resolved package set"
    );

    Ok(ResolvedPackages {
        packages: order,
        passive,
    })
}
