//! Capability Gate — per-call-site permission checks.
//!
//! Before any network I/O, a gated call asks the gate whether the endpoint is
//! allowed under the negotiated protocol version and the deployment mode.
//! The lookup table is built exactly once per process from the orchestrating
//! client's own endpoint table plus every registered sub-client's table. The
//! build is deterministic, so the lazy one-time initialization tolerates a
//! construction race: whichever thread wins produces the identical table.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::client::registry::{ClientRegistry, EndpointSpec, SubClientEntry};
use crate::error::ClientError;
use crate::version::ApiVersion;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EndpointRule {
    min_version: Option<ApiVersion>,
    on_premise_only: bool,
}

/// Immutable endpoint-descriptor table: `"namespace.method"` (or bare
/// `"method"` for un-namespaced endpoints) to its gating rule.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CapabilityGate {
    rules: HashMap<String, EndpointRule>,
}

impl CapabilityGate {
    /// Build the table from the client's own endpoints and a registry
    /// snapshot. Only endpoints carrying a gating marker are recorded;
    /// unknown keys pass every check.
    pub fn build(own: Vec<EndpointSpec>, subclients: &HashMap<String, SubClientEntry>) -> Self {
        let mut gate = Self::default();
        for spec in &own {
            gate.insert(spec.name.to_string(), spec);
        }
        for (namespace, entry) in subclients {
            for spec in (entry.endpoints)() {
                gate.insert(format!("{namespace}.{}", spec.name), &spec);
            }
        }
        gate
    }

    fn insert(&mut self, key: String, spec: &EndpointSpec) {
        if !spec.is_gated() {
            return;
        }
        let rule = EndpointRule {
            min_version: spec.min_version,
            on_premise_only: spec.on_premise_only,
        };
        if self.rules.insert(key.clone(), rule).is_some() {
            log::warn!("duplicate endpoint descriptor '{key}'; keeping the later one");
        }
    }

    /// Number of gated endpoints in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether `method` (scoped by `namespace` when the caller is a
    /// sub-client) may run under `negotiated` against a deployment that is
    /// `hosted` or not. Passing `namespace = None` degrades to an unscoped
    /// check and is never fatal.
    pub fn check(
        &self,
        namespace: Option<&str>,
        method: &str,
        negotiated: ApiVersion,
        hosted: bool,
    ) -> Result<(), ClientError> {
        let key = match namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{method}"),
            _ => method.to_string(),
        };
        let Some(rule) = self.rules.get(&key) else {
            return Ok(());
        };
        if let Some(required) = rule.min_version {
            if negotiated < required {
                log::warn!(
                    "blocked '{key}': requires API version {required}, negotiated {negotiated}"
                );
                return Err(ClientError::VersionTooOld {
                    endpoint: key,
                    required,
                    negotiated,
                });
            }
        }
        if rule.on_premise_only && hosted {
            log::warn!("blocked '{key}': not available on hosted deployments");
            return Err(ClientError::DeploymentNotSupported { endpoint: key });
        }
        Ok(())
    }
}

static SHARED: OnceCell<CapabilityGate> = OnceCell::new();

/// The process-wide gate, built on first use and immutable afterwards.
/// Subsequent calls are no-ops returning the same table.
pub fn shared() -> &'static CapabilityGate {
    SHARED.get_or_init(|| {
        let gate = CapabilityGate::build(
            crate::client::own_endpoints(),
            &ClientRegistry::snapshot(),
        );
        log::debug!("capability gate initialized with {} gated endpoints", gate.len());
        gate
    })
}
