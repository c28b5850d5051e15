// src/spec/mod.rs

//! Parsed spec objects consumed by the resolution pipeline.
//!
//! Everything in this module is the already-parsed form handed over by a
//! spec-loading collaborator: feature-pack identities and dependency edges,
//! package specs, feature specs, and declarative config models. The
//! resolver never mutates these; each stage builds new resolved objects
//! from them.

pub mod config;
pub mod feature;
pub mod featurepack;
pub mod package;
pub mod producer;

pub use config::{
    ConfigId, ConfigItem, ConfigLayerSpec, ConfigModel, ConfigProperty, FeatureConfig,
    FeatureDependency, FeatureGroup, GroupInclusion,
};
pub use feature::{
    CapabilitySpec, FeatureId, FeatureParameter, FeatureReference, FeatureSpec, ParameterMapping,
    ParameterType, ResolvedFeatureId, SpecId,
};
pub use featurepack::{
    FeaturePackConfig, FeaturePackSpec, ProvisioningConfig, ProvisioningOptions,
};
pub use package::{DependencyKind, PackageDependency, PackageSpec};
pub use producer::{FeaturePackId, PackIdParseError, ProducerChannel};
