//! Shared test helpers for unit tests.

use alembic_backends::{Backend, BackendError, ConvertTask};
use alembic_common::{BackendFamily, Capability};

/// A backend with a declared capability set that just copies its input.
pub(crate) struct StubBackend {
    caps: Capability,
}

impl StubBackend {
    pub fn new(family: BackendFamily, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            caps: Capability::of(family, inputs, outputs),
        }
    }
}

impl Backend for StubBackend {
    fn family(&self) -> BackendFamily {
        self.caps.family
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        std::fs::copy(task.input, task.output)
            .map_err(|e| BackendError::new(format!("stub copy failed: {e}")))?;
        Ok(())
    }
}
