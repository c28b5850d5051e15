// src/spec/feature.rs

//! Feature specs: typed parameters, references, and capabilities.
//!
//! A feature spec declares the shape of a configuration feature: an ordered
//! parameter list (at least one marked as an identity parameter), references
//! onto other specs, and the capabilities its instances provide or require.
//! Capability names may embed `$param` substitution tokens that are resolved
//! against an instance's parameter values.

use crate::stability::StabilityLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a feature parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Boolean,
    Integer,
    /// Bracketed, comma-separated element list: `[a,b,c]`
    List,
}

impl ParameterType {
    /// Check whether a raw string value parses under this type
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::String => true,
            Self::Boolean => matches!(value, "true" | "false"),
            Self::Integer => !value.is_empty() && value.parse::<i64>().is_ok(),
            Self::List => value.starts_with('[') && value.ends_with(']'),
        }
    }

    /// Split a list-typed value into its elements.
    ///
    /// Returns `None` when the value is not list-syntax; `[]` yields an
    /// empty vector.
    pub fn parse_list(value: &str) -> Option<Vec<String>> {
        let inner = value.strip_prefix('[')?.strip_suffix(']')?;
        let inner = inner.trim();
        if inner.is_empty() {
            return Some(Vec::new());
        }
        Some(inner.split(',').map(|e| e.trim().to_string()).collect())
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::List => write!(f, "list"),
        }
    }
}

/// One declared parameter of a feature spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParameter {
    pub name: String,
    /// Identity parameters form the feature's resolved id
    pub identity: bool,
    /// Default value applied when an instance leaves the parameter unset
    pub default: Option<String>,
    /// Whether instances may leave the parameter unset
    pub nillable: bool,
    pub ptype: ParameterType,
}

impl FeatureParameter {
    /// Create a plain string parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: false,
            default: None,
            nillable: false,
            ptype: ParameterType::String,
        }
    }

    /// Create an identity parameter
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: true,
            default: None,
            nillable: false,
            ptype: ParameterType::String,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    pub fn of_type(mut self, ptype: ParameterType) -> Self {
        self.ptype = ptype;
        self
    }
}

/// Mapping of a local parameter onto a target spec's parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub local: String,
    pub target: String,
}

/// A declared reference onto another feature spec.
///
/// A resolved reference becomes an explicit dependency edge on the target
/// feature instance. A nillable reference whose mapped parameters are unset
/// resolves to no edge at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureReference {
    /// Target spec name
    pub target: String,
    /// Alias distinguishing multiple references onto the same spec
    pub alias: Option<String>,
    pub nillable: bool,
    /// Local-to-target parameter mappings; when empty, the target's
    /// identity parameters are mapped by name
    pub mappings: Vec<ParameterMapping>,
    /// Capability requirement tied to this reference: skipped when the
    /// reference itself resolves to none
    pub capability: Option<String>,
}

impl FeatureReference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
            nillable: false,
            mappings: Vec::new(),
            capability: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    pub fn map(mut self, local: impl Into<String>, target: impl Into<String>) -> Self {
        self.mappings.push(ParameterMapping {
            local: local.into(),
            target: target.into(),
        });
        self
    }

    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capability = Some(name.into());
        self
    }

    /// Name used in diagnostics: the alias when present, else the target
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

/// A capability a feature provides or requires.
///
/// The name is a template; `$param` tokens are substituted from the
/// instance's parameter values. A list-typed parameter multiplies the
/// capability per element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    /// Only meaningful on requirements: an optional requirement with no
    /// provider (or an empty list substitution) is vacuously satisfied
    pub optional: bool,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// Spec of one feature kind inside a feature-pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub stability: Option<StabilityLevel>,
    /// Declared parameters, in declaration order
    pub params: Vec<FeatureParameter>,
    pub refs: Vec<FeatureReference>,
    /// Capability provisions
    pub provides: Vec<CapabilitySpec>,
    /// Capability requirements
    pub requires: Vec<CapabilitySpec>,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stability: None,
            params: Vec::new(),
            refs: Vec::new(),
            provides: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn with_stability(mut self, level: StabilityLevel) -> Self {
        self.stability = Some(level);
        self
    }

    pub fn with_param(mut self, param: FeatureParameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_reference(mut self, reference: FeatureReference) -> Self {
        self.refs.push(reference);
        self
    }

    pub fn provides(mut self, cap: CapabilitySpec) -> Self {
        self.provides.push(cap);
        self
    }

    pub fn requires(mut self, cap: CapabilitySpec) -> Self {
        self.requires.push(cap);
        self
    }

    /// Look up a declared parameter by name
    pub fn param(&self, name: &str) -> Option<&FeatureParameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The parameters forming the feature's identity, in declaration order
    pub fn identity_params(&self) -> impl Iterator<Item = &FeatureParameter> {
        self.params.iter().filter(|p| p.identity)
    }
}

/// Identity of a feature as written in configs: spec name plus identity
/// parameter values. The producer is resolved from context later.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId {
    pub spec: String,
    pub params: BTreeMap<String, String>,
}

impl FeatureId {
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.spec)?;
        fmt_params(f, &self.params)
    }
}

/// Identity of a feature spec within the resolved layout
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecId {
    pub producer: String,
    pub name: String,
}

impl SpecId {
    pub fn new(producer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.producer, self.name)
    }
}

/// Fully-resolved feature identity: producing feature-pack, spec name, and
/// identity parameter values. No two resolved features may share one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResolvedFeatureId {
    pub spec: SpecId,
    pub params: BTreeMap<String, String>,
}

impl ResolvedFeatureId {
    pub fn new(spec: SpecId, params: BTreeMap<String, String>) -> Self {
        Self { spec, params }
    }

    /// The unresolved form, as it would appear in a config
    pub fn unresolved(&self) -> FeatureId {
        FeatureId {
            spec: self.spec.name.clone(),
            params: self.params.clone(),
        }
    }
}

impl fmt::Display for ResolvedFeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.spec)?;
        fmt_params(f, &self.params)
    }
}

fn fmt_params(f: &mut fmt::Formatter<'_>, params: &BTreeMap<String, String>) -> fmt::Result {
    let mut first = true;
    for (k, v) in params {
        if !first {
            write!(f, ",")?;
        }
        write!(f, "{}={}", k, v)?;
        first = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_type_accepts() {
        assert!(ParameterType::String.accepts("anything"));
        assert!(ParameterType::Boolean.accepts("true"));
        assert!(!ParameterType::Boolean.accepts("yes"));
        assert!(ParameterType::Integer.accepts("-42"));
        assert!(!ParameterType::Integer.accepts("42x"));
        assert!(ParameterType::List.accepts("[a,b]"));
        assert!(ParameterType::List.accepts("[]"));
        assert!(!ParameterType::List.accepts("a,b"));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            ParameterType::parse_list("[a, b,c]").unwrap(),
            vec!["a", "b", "c"]
        );
        assert_eq!(ParameterType::parse_list("[]").unwrap(), Vec::<String>::new());
        assert!(ParameterType::parse_list("a,b").is_none());
    }

    #[test]
    fn test_spec_lookup() {
        let spec = FeatureSpec::new("unit")
            .with_param(FeatureParameter::identity("name"))
            .with_param(FeatureParameter::new("value").with_default("0"));

        assert!(spec.param("name").unwrap().identity);
        assert_eq!(spec.param("value").unwrap().default.as_deref(), Some("0"));
        assert!(spec.param("missing").is_none());
        assert_eq!(spec.identity_params().count(), 1);
    }

    #[test]
    fn test_feature_id_display() {
        let id = FeatureId::new("unit")
            .with_param("name", "a")
            .with_param("group", "g");
        // BTreeMap keeps params in name order
        assert_eq!(id.to_string(), "unit:group=g,name=a");
    }

    #[test]
    fn test_resolved_id_display_and_unresolved() {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), "a".to_string());
        let id = ResolvedFeatureId::new(SpecId::new("core", "unit"), params);
        assert_eq!(id.to_string(), "core/unit:name=a");
        assert_eq!(id.unresolved(), FeatureId::new("unit").with_param("name", "a"));
    }

    #[test]
    fn test_reference_display_name() {
        let r = FeatureReference::new("unit");
        assert_eq!(r.display_name(), "unit");
        let r = FeatureReference::new("unit").with_alias("parent");
        assert_eq!(r.display_name(), "parent");
    }
}
