//! Alembic-Backends: format-family conversion adapters.
//!
//! Each backend probes its underlying libraries and external tools at startup
//! and self-reports a capability set. A backend whose tool is missing reports
//! an empty (or reduced) set: degraded, not absent, so the registry and
//! diagnostics can distinguish "not compiled in" from "present but broken".
//!
//! Adapters never raise across the trait boundary and never leave a partial
//! artifact at the output path; every internal failure is returned as a
//! structured [`BackendError`].

pub mod archive;
pub mod backend;
pub mod data;
pub mod document;
pub mod media;
pub mod raster;
pub mod speech;
pub mod tools;

pub use backend::{Backend, BackendError, ConvertTask};
pub use tools::{ToolPaths, ToolRegistry};

use std::sync::Arc;

/// Probe every backend family in its fixed registration order.
///
/// The order here is the resolver's priority order, so it must stay stable.
pub fn probe_backends(tools: &ToolRegistry) -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(raster::ImageBackend::probe()),
        Arc::new(document::DocumentBackend::probe(tools)),
        Arc::new(media::MediaBackend::probe(tools)),
        Arc::new(archive::ArchiveBackend::probe(tools)),
        Arc::new(data::DataBackend::probe()),
        Arc::new(speech::SpeechBackend::probe(tools)),
    ]
}
