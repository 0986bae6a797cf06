//! Load-once, read-many registry of backend capabilities.

use alembic_backends::Backend;
use alembic_common::{BackendFamily, Capability, FormatToken};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Static map of which backend can transform which format pairs.
///
/// Populated once at startup and read-only afterwards (shared behind `Arc`).
/// Registration order is the resolver's fixed priority order.
#[derive(Default)]
pub struct CapabilityRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend during startup.
    ///
    /// An empty capability set is a legitimate degraded state (the backend's
    /// underlying tool is missing), not a startup failure.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let caps = backend.capabilities();
        if caps.is_empty() {
            tracing::warn!(
                family = %backend.family(),
                "Backend registered with empty capability set (degraded)"
            );
        }
        self.backends.push(backend);
    }

    pub fn from_backends(backends: Vec<Arc<dyn Backend>>) -> Self {
        let mut registry = Self::new();
        for backend in backends {
            registry.register(backend);
        }
        registry
    }

    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    pub fn backend(&self, family: BackendFamily) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.family() == family)
    }

    /// Families able to read the given input format.
    pub fn capabilities_of(&self, input: &FormatToken) -> BTreeSet<BackendFamily> {
        self.backends
            .iter()
            .filter(|b| b.capabilities().inputs.contains(input))
            .map(|b| b.family())
            .collect()
    }

    pub fn all_input_formats(&self) -> BTreeSet<FormatToken> {
        self.backends
            .iter()
            .flat_map(|b| b.capabilities().inputs.iter().cloned())
            .collect()
    }

    pub fn all_output_formats(&self) -> BTreeSet<FormatToken> {
        self.backends
            .iter()
            .flat_map(|b| b.capabilities().outputs.iter().cloned())
            .collect()
    }

    /// Family -> capability listing for diagnostics and the formats API.
    pub fn list(&self) -> BTreeMap<BackendFamily, Capability> {
        self.backends
            .iter()
            .map(|b| (b.family(), b.capabilities().clone()))
            .collect()
    }
}
