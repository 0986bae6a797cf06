//! Unified error type for the alembic application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`]. Feasibility errors (the submission-time refusals)
//! are first-class variants so callers can distinguish input-, output-, and
//! pair-level blame.

use crate::format::FormatToken;

/// Unified error type covering all failure modes in alembic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "job", "artifact").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// No backend lists the source format as an input at all.
    #[error("Input format '{0}' is not supported")]
    InputUnsupported(FormatToken),

    /// No backend lists the target format as an output at all.
    #[error("Output format '{0}' is not supported")]
    OutputUnsupported(FormatToken),

    /// Both formats are known but no single backend services the pair.
    #[error("Conversion from '{input}' to '{output}' is not supported")]
    PairUnsupported {
        input: FormatToken,
        output: FormatToken,
    },

    /// The target format is refused categorically, independent of backends.
    #[error("Conversion to '{format}' is refused: {reason}")]
    RefusedTarget {
        format: FormatToken,
        reason: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, pdftoppm, etc.) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::InputUnsupported(_)
            | Error::OutputUnsupported(_)
            | Error::PairUnsupported { .. }
            | Error::RefusedTarget { .. }
            | Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Whether this is a submission-time feasibility refusal.
    pub fn is_feasibility(&self) -> bool {
        matches!(
            self,
            Error::InputUnsupported(_)
                | Error::OutputUnsupported(_)
                | Error::PairUnsupported { .. }
                | Error::RefusedTarget { .. }
        )
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the unified [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
