// tests/common/mod.rs

//! Shared fixture builders for integration tests.

use carrack::{
    CapabilitySpec, FeaturePackId, FeatureParameter, FeatureReference, FeatureSpec,
    InMemoryRepository,
};

/// Install a tracing subscriber for test debugging; safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The conventional single test pack id: `core@1.0#1.0.0`
pub fn core_pack() -> FeaturePackId {
    FeaturePackId::new("core", "1.0", "1.0.0")
}

/// Build a repository from a set of specs
#[allow(dead_code)]
pub fn repo_with(specs: Vec<carrack::FeaturePackSpec>) -> InMemoryRepository {
    let mut repo = InMemoryRepository::new();
    for spec in specs {
        repo.add(spec);
    }
    repo
}

/// The two mutually-entangled specs of the mixed-loop scenario: `a`
/// requires the capability its same-numbered `b` provides, while `b`
/// references its `a` back.
#[allow(dead_code)]
pub fn mixed_loop_specs() -> (FeatureSpec, FeatureSpec) {
    let a = FeatureSpec::new("a")
        .with_param(FeatureParameter::identity("name"))
        .requires(CapabilitySpec::new("cap.b.$name"));
    let b = FeatureSpec::new("b")
        .with_param(FeatureParameter::identity("name"))
        .provides(CapabilitySpec::new("cap.b.$name"))
        .with_reference(FeatureReference::new("a").map("name", "name"));
    (a, b)
}
