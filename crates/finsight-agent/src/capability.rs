use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::traits::AgentCapability;

/// Introspection record for a registered capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// The capability's own name.
    pub name: String,
    pub description: String,
    pub available: bool,
}

/// Registered capabilities keyed by the name workflow steps refer to them by.
///
/// The registration name usually equals `AgentCapability::name()`, but
/// `register_as` lets one implementation serve under another key.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    capabilities: BTreeMap<String, Arc<dyn AgentCapability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from capabilities registered under their own names.
    pub fn from_agents(agents: impl IntoIterator<Item = Arc<dyn AgentCapability>>) -> Self {
        let mut set = Self::new();
        for agent in agents {
            set.register(agent);
        }
        set
    }

    /// Register a capability under its own name.
    pub fn register(&mut self, capability: Arc<dyn AgentCapability>) {
        let name = capability.name().to_string();
        self.register_as(name, capability);
    }

    /// Register a capability under an explicit name (replaces any previous entry).
    pub fn register_as(&mut self, name: impl Into<String>, capability: Arc<dyn AgentCapability>) {
        let name = name.into();
        debug!(capability = %name, "Capability registered");
        self.capabilities.insert(name, capability);
    }

    /// Remove a capability.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn AgentCapability>> {
        self.capabilities.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentCapability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }

    /// Iterate `(registration name, capability)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AgentCapability>)> {
        self.capabilities.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Describe every registered capability, keyed by registration name.
    pub fn info(&self) -> BTreeMap<String, CapabilityInfo> {
        self.capabilities
            .iter()
            .map(|(key, cap)| {
                (
                    key.clone(),
                    CapabilityInfo {
                        name: cap.name().to_string(),
                        description: cap.description().to_string(),
                        available: cap.is_available(),
                    },
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("capabilities", &self.names())
            .finish()
    }
}
