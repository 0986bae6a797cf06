//! The backend adapter contract.

use alembic_common::{BackendFamily, Capability, ConvertOptions, FormatToken, OutputShape};
use std::path::Path;

/// Everything a backend needs to perform one conversion.
///
/// `target_format` is the format the caller asked for, even when the artifact
/// written to `output` is an archive packaging many derived files (the
/// pdf-to-image fan-out).
#[derive(Debug)]
pub struct ConvertTask<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub source_format: &'a FormatToken,
    pub target_format: &'a FormatToken,
    pub shape: OutputShape,
    pub options: &'a ConvertOptions,
}

/// Structured failure from a backend adapter.
///
/// Carries only a human-readable reason: the scheduler records it verbatim in
/// the conversion outcome and needs no family-specific handling.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self(format!("io error: {e}"))
    }
}

impl From<image::ImageError> for BackendError {
    fn from(e: image::ImageError) -> Self {
        Self(format!("image error: {e}"))
    }
}

impl From<zip::result::ZipError> for BackendError {
    fn from(e: zip::result::ZipError) -> Self {
        Self(format!("zip error: {e}"))
    }
}

impl From<csv::Error> for BackendError {
    fn from(e: csv::Error) -> Self {
        Self(format!("csv error: {e}"))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self(format!("json error: {e}"))
    }
}

impl From<quick_xml::Error> for BackendError {
    fn from(e: quick_xml::Error) -> Self {
        Self(format!("xml error: {e}"))
    }
}

impl From<calamine::Error> for BackendError {
    fn from(e: calamine::Error) -> Self {
        Self(format!("spreadsheet error: {e}"))
    }
}

/// One conversion backend, servicing a single format family.
pub trait Backend: Send + Sync {
    fn family(&self) -> BackendFamily;

    /// The capability set probed at startup; immutable afterwards.
    fn capabilities(&self) -> &Capability;

    /// Perform one conversion.
    ///
    /// On failure the output path must be left absent and scratch files
    /// removed; callers rely on "output exists and has nonzero size" as the
    /// success signal. A retry with the same task produces an equivalent
    /// artifact.
    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError>;
}

/// Run `f`, removing any partial artifact at `output` if it fails.
pub(crate) fn write_cleanly(
    output: &Path,
    f: impl FnOnce() -> Result<(), BackendError>,
) -> Result<(), BackendError> {
    let result = f();
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

/// Reject missing inputs up front with a readable reason.
pub(crate) fn require_input(input: &Path) -> Result<(), BackendError> {
    if !input.is_file() {
        return Err(BackendError::new(format!(
            "input file does not exist: {}",
            input.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn write_cleanly_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("partial.out");

        let err = write_cleanly(&output, || {
            fs::write(&output, b"half written").unwrap();
            Err(BackendError::new("simulated failure"))
        });

        assert!(err.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn require_input_rejects_missing_file() {
        let err = require_input(Path::new("/nonexistent/input.bin")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
