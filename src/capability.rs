// src/capability.rs

//! Capability name substitution and the provider index.
//!
//! Capabilities are named contracts features provide and require without a
//! direct feature-id reference. Names are templates: `$param` tokens are
//! replaced with an instance's parameter values, so `net.binding.$name`
//! with `name = http` resolves to `net.binding.http`. A list-typed
//! parameter multiplies the capability per element.
//!
//! The [`CapabilityIndex`] accumulates provisions while the feature graph
//! builder walks features in declaration order, then is frozen before the
//! batch scheduler reads it. One index belongs to exactly one resolution
//! pass.

use crate::spec::feature::{FeatureSpec, ParameterType, ResolvedFeatureId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors from substituting one capability name template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    #[error("capability '{template}' refers to undeclared parameter '{param}'")]
    UnknownParameter { template: String, param: String },

    #[error("capability '{template}' refers to unset parameter '{param}'")]
    UnsetParameter { template: String, param: String },

    #[error("capability '{template}' multiplied over empty list parameter '{param}'")]
    EmptyList { template: String, param: String },
}

/// Substitute `$param` tokens in a capability name template.
///
/// Returns one resolved name per combination of list elements; a template
/// without tokens resolves to itself. A list-typed parameter with elements
/// `[a,b]` multiplies the result per element; an empty list yields
/// [`SubstitutionError::EmptyList`], which the caller maps to vacuous
/// success or failure depending on the requirement's optionality.
pub fn substitute(
    template: &str,
    params: &BTreeMap<String, String>,
    spec: &FeatureSpec,
) -> Result<Vec<String>, SubstitutionError> {
    let mut resolved = vec![String::new()];
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        let (literal, token_start) = rest.split_at(pos);
        for r in &mut resolved {
            r.push_str(literal);
        }

        let token_body = &token_start[1..];
        let end = token_body
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(token_body.len());
        let param = &token_body[..end];
        rest = &token_body[end..];

        let declared = spec
            .param(param)
            .ok_or_else(|| SubstitutionError::UnknownParameter {
                template: template.to_string(),
                param: param.to_string(),
            })?;
        let value = params
            .get(param)
            .ok_or_else(|| SubstitutionError::UnsetParameter {
                template: template.to_string(),
                param: param.to_string(),
            })?;

        if declared.ptype == ParameterType::List {
            let elements = ParameterType::parse_list(value).unwrap_or_default();
            if elements.is_empty() {
                return Err(SubstitutionError::EmptyList {
                    template: template.to_string(),
                    param: param.to_string(),
                });
            }
            let mut multiplied = Vec::with_capacity(resolved.len() * elements.len());
            for r in &resolved {
                for e in &elements {
                    let mut expanded = r.clone();
                    expanded.push_str(e);
                    multiplied.push(expanded);
                }
            }
            resolved = multiplied;
        } else {
            for r in &mut resolved {
                r.push_str(value);
            }
        }
    }

    for r in &mut resolved {
        r.push_str(rest);
    }
    Ok(resolved)
}

/// Accumulate-then-freeze map from resolved capability names to the
/// features providing them.
#[derive(Debug, Default)]
pub struct CapabilityIndex {
    providers: HashMap<String, Vec<ResolvedFeatureId>>,
    frozen: bool,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a feature as a provider of a resolved capability name.
    ///
    /// Fails once the index has been frozen for scheduling.
    pub fn register(
        &mut self,
        capability: impl Into<String>,
        provider: ResolvedFeatureId,
    ) -> Result<(), crate::error::Error> {
        let capability = capability.into();
        if self.frozen {
            return Err(crate::error::Error::FrozenIndex(capability));
        }
        let entry = self.providers.entry(capability).or_default();
        if !entry.contains(&provider) {
            entry.push(provider);
        }
        Ok(())
    }

    /// Freeze the index; all later registration attempts fail
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// All providers of a resolved capability name, in registration order
    pub fn providers(&self, capability: &str) -> &[ResolvedFeatureId] {
        self.providers
            .get(capability)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    pub fn has_provider(&self, capability: &str) -> bool {
        !self.providers(capability).is_empty()
    }
}
