//! Capability Registry — process-wide table of sub-client identities.
//!
//! Feature-area sub-clients (auth, permissions, datasources, ...) register a
//! name, a factory, and their endpoint table at load time, before any client
//! is constructed. The orchestrating client iterates a snapshot at
//! construction and instantiates every entry. There is no unregister: the
//! table is read-only once clients start being built.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::client::ClientCore;
use crate::error::ClientError;
use crate::version::ApiVersion;

/// Declarative gating metadata for one endpoint: its method name plus the
/// optional minimum-version and on-premise-only markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub min_version: Option<ApiVersion>,
    pub on_premise_only: bool,
}

impl EndpointSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            min_version: None,
            on_premise_only: false,
        }
    }

    pub const fn min_version(mut self, version: ApiVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    pub const fn on_premise_only(mut self) -> Self {
        self.on_premise_only = true;
        self
    }

    /// True when the endpoint carries at least one gating marker.
    pub fn is_gated(&self) -> bool {
        self.min_version.is_some() || self.on_premise_only
    }
}

/// A feature-area sub-client instance. Concrete sub-clients live in their own
/// crates; the core only needs the namespace they gate their calls under.
pub trait SubClient: Send + Sync {
    /// The registration name this sub-client passes into every gated call.
    fn namespace(&self) -> &'static str;
}

/// Builds a sub-client against a shared client core. Failures are logged and
/// the entry skipped; construction of the orchestrating client proceeds.
pub type SubClientFactory = fn(Arc<ClientCore>) -> Result<Box<dyn SubClient>, ClientError>;

/// One registration: how to build the sub-client, and the endpoint table the
/// capability gate folds in under the registration name.
#[derive(Clone)]
pub struct SubClientEntry {
    pub factory: SubClientFactory,
    pub endpoints: fn() -> Vec<EndpointSpec>,
}

impl std::fmt::Debug for SubClientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubClientEntry").finish_non_exhaustive()
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, SubClientEntry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The process-wide registry. Populate at load time, read afterwards.
pub struct ClientRegistry;

impl ClientRegistry {
    /// Associate a sub-client name with its entry. Registering the same name
    /// twice keeps the later entry and logs the collision.
    pub fn register(name: &str, entry: SubClientEntry) {
        let mut table = REGISTRY.write();
        if table.insert(name.to_string(), entry).is_some() {
            log::warn!("sub-client '{name}' registered twice; keeping the later registration");
        }
    }

    /// An immutable copy of the table as of now.
    pub fn snapshot() -> HashMap<String, SubClientEntry> {
        REGISTRY.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture;

    impl SubClient for Fixture {
        fn namespace(&self) -> &'static str {
            "fixture"
        }
    }

    fn fixture_factory(_core: Arc<ClientCore>) -> Result<Box<dyn SubClient>, ClientError> {
        Ok(Box::new(Fixture))
    }

    fn fixture_endpoints() -> Vec<EndpointSpec> {
        vec![EndpointSpec::new("get_thing").min_version(ApiVersion::new(3, 1))]
    }

    #[test]
    fn snapshot_contains_registered_entries() {
        ClientRegistry::register(
            "registry_test_fixture",
            SubClientEntry {
                factory: fixture_factory,
                endpoints: fixture_endpoints,
            },
        );
        let snapshot = ClientRegistry::snapshot();
        let entry = snapshot.get("registry_test_fixture").unwrap();
        assert_eq!((entry.endpoints)()[0].name, "get_thing");
    }

    #[test]
    fn snapshot_is_isolated_from_later_registrations() {
        let before = ClientRegistry::snapshot();
        ClientRegistry::register(
            "registry_test_late",
            SubClientEntry {
                factory: fixture_factory,
                endpoints: fixture_endpoints,
            },
        );
        assert!(!before.contains_key("registry_test_late"));
        assert!(ClientRegistry::snapshot().contains_key("registry_test_late"));
    }

    #[test]
    fn gating_markers_are_declarative() {
        let spec = EndpointSpec::new("delete_everything")
            .min_version(ApiVersion::new(3, 0))
            .on_premise_only();
        assert!(spec.is_gated());
        assert!(!EndpointSpec::new("ping").is_gated());
    }
}
