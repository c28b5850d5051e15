// src/error.rs

//! Crate-wide error type for provisioning resolution.
//!
//! Every stage fails fast: the first detected inconsistency aborts the
//! whole resolution pass with one of the variants below. Variants carry
//! structured context (pack ids, feature ids, capability strings) so a
//! caller can render diagnostics without re-deriving resolver state. The
//! only intentional recovery anywhere in the pipeline is the passive
//! dependency stability drop, which is a designed no-op, not an error.

use crate::spec::config::ConfigId;
use crate::spec::feature::{FeatureId, ParameterType, ResolvedFeatureId};
use crate::spec::producer::{FeaturePackId, PackIdParseError, ProducerChannel};
use crate::stability::StabilityLevel;
use thiserror::Error;

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a provisioning resolution pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Two or more builds of the same producer channel reached the layout
    /// closure with no authoritative override
    #[error("version conflict for {channel}: builds [{}] reached with no override", format_ids(.candidates))]
    VersionConflict {
        channel: ProducerChannel,
        candidates: Vec<FeaturePackId>,
    },

    /// A required capability substitution found no provider
    #[error("no provider found for capability '{capability}' required by {feature}")]
    UnresolvedCapability {
        capability: String,
        feature: ResolvedFeatureId,
    },

    /// A non-nillable feature reference resolved to no target
    #[error("reference '{reference}' of {feature} cannot be null")]
    UnresolvedReference {
        feature: ResolvedFeatureId,
        reference: String,
    },

    /// An explicit feature-dependency edge's target was excluded or never
    /// declared
    #[error("feature dependency of {feature} on unknown or excluded feature {dependency}")]
    UnresolvedFeatureDependency {
        feature: ResolvedFeatureId,
        dependency: FeatureId,
    },

    /// The same package or layer was both included and excluded
    #[error("conflicting directives: {0}")]
    ConflictingDirective(String),

    /// A parameter's string value failed to parse under its declared type
    #[error("value '{value}' of parameter {spec}.{param} is not a valid {expected}")]
    MalformedParameterValue {
        spec: String,
        param: String,
        value: String,
        expected: ParameterType,
    },

    /// The batch scheduler exhausted input with unmet dependencies
    #[error("unsatisfiable schedule for config {config}: [{}] never had their dependencies met", format_features(.unsatisfied))]
    UnsatisfiableSchedule {
        config: ConfigId,
        unsatisfied: Vec<ResolvedFeatureId>,
    },

    /// A required dependency target is filtered out by the stability
    /// threshold
    #[error("package '{package}' (stability {stability}) required by '{required_by}' is below the {threshold} threshold")]
    UnsatisfiedStability {
        package: String,
        required_by: String,
        stability: StabilityLevel,
        threshold: StabilityLevel,
    },

    /// A patch declared a different target than the pack it was applied to
    #[error("patch {patch} targets {declared}, not {target}")]
    PatchTargetMismatch {
        patch: FeaturePackId,
        declared: String,
        target: FeaturePackId,
    },

    #[error("feature-pack {0} not found in the repository")]
    UnknownFeaturePack(FeaturePackId),

    #[error("package '{package}' not found in feature-pack {feature_pack}")]
    UnknownPackage {
        feature_pack: FeaturePackId,
        package: String,
    },

    #[error("feature spec '{name}' not found in the resolved layout")]
    UnknownFeatureSpec { name: String },

    #[error("feature group '{name}' not found in the resolved layout")]
    UnknownFeatureGroup { name: String },

    #[error("layer {model}/{name} not found in the resolved layout")]
    UnknownLayer { model: String, name: String },

    #[error("parameter '{param}' is not declared by spec '{spec}'")]
    UnknownParameter { spec: String, param: String },

    #[error("parameter '{param}' of spec '{spec}' has no value")]
    ParameterMissing { spec: String, param: String },

    /// Capability registration after the index was frozen for scheduling
    #[error("capability '{0}' registered after the index was frozen")]
    FrozenIndex(String),

    #[error(transparent)]
    PackId(#[from] PackIdParseError),
}

fn format_ids(ids: &[FeaturePackId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_features(ids: &[ResolvedFeatureId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_names_all_candidates() {
        let err = Error::VersionConflict {
            channel: ProducerChannel::new("core", "1.0"),
            candidates: vec![
                FeaturePackId::new("core", "1.0", "1.0.1"),
                FeaturePackId::new("core", "1.0", "1.0.2"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("core@1.0#1.0.1"));
        assert!(message.contains("core@1.0#1.0.2"));
    }

    #[test]
    fn test_pack_id_error_converts() {
        let parse_err = FeaturePackId::parse("oops").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::PackId(_)));
    }
}
