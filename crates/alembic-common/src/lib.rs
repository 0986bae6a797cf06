//! Alembic-Common: shared types, IDs, and errors.
//!
//! This crate is the foundational dependency for the alembic workspace:
//!
//! - **Typed IDs**: type-safe UUID wrapper for conversion jobs
//! - **Format tokens**: normalized, case-insensitive file format identifiers
//! - **Core types**: backend families, capability sets, conversion
//!   requests/outcomes and their option bag
//! - **Error handling**: the unified error type and result alias

pub mod error;
pub mod format;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use format::FormatToken;
pub use ids::JobId;
pub use types::*;
