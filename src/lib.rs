// src/lib.rs

//! Carrack Provisioning Engine
//!
//! Composes reusable, versioned feature-packs into a deterministic,
//! internally consistent provisioned state: the resolved package sets, the
//! resolved feature graph per config, and a batch ordering suitable for
//! sequential consumption by downstream installers.
//!
//! # Architecture
//!
//! - Spec-first: the engine consumes already-parsed spec objects and never
//!   touches archives, files, or the network
//! - Staged pipeline: layout -> packages -> configs -> features -> batches,
//!   each stage building immutable resolved objects from the prior one
//! - Capabilities: named, parametrizable contracts connect features without
//!   direct id references; apparent reference cycles are legal and broken
//!   by batch deferral
//! - Fail-fast: the first inconsistency aborts the pass with a structured
//!   error; the only designed recovery is the passive stability drop

pub mod capability;
mod error;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod spec;
pub mod stability;
pub mod state;

pub use capability::CapabilityIndex;
pub use error::{Error, Result};
pub use progress::{LogProgress, ProgressEvent, ProgressListener, SilentProgress, Stage};
pub use registry::{
    FeaturePackRepository, InMemoryRepository, PluginOption, PluginRegistry, ProvisioningPlugin,
};
pub use resolver::{provision, FeaturePackLayout, ProvisioningRuntime};
pub use spec::{
    CapabilitySpec, ConfigId, ConfigItem, ConfigLayerSpec, ConfigModel, ConfigProperty,
    DependencyKind, FeatureConfig, FeatureDependency, FeatureGroup, FeatureId, FeaturePackConfig,
    FeaturePackId, FeaturePackSpec, FeatureParameter, FeatureReference, FeatureSpec,
    GroupInclusion, PackageDependency, PackageSpec, ParameterType, ProducerChannel,
    ProvisioningConfig, ProvisioningOptions, ResolvedFeatureId, SpecId,
};
pub use stability::{OptionalPackagePolicy, StabilityLevel};
pub use state::{
    BatchEvent, CapabilityRequirement, FeatureBatch, ProvisionedConfig, ProvisionedFeaturePack,
    ProvisionedState, ResolvedFeature,
};
