//! Core type definitions for conversion requests, outcomes, and capabilities.

use crate::format::FormatToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Family of conversion backend.
///
/// A closed set: new backends are added by implementing the backend trait and
/// registering the implementation, not by extending a conditional chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    /// Raster image conversions (png, jpeg, ...).
    Image,
    /// Document conversions (pdf, docx, txt, html).
    Document,
    /// Time-based media conversions (video and audio containers/codecs).
    Media,
    /// Archive repackaging (zip, tar, ...).
    Archive,
    /// Tabular/structured data conversions (csv, json, xml, xlsx).
    Data,
    /// Speech synthesis (text to audio).
    Speech,
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Document => write!(f, "document"),
            Self::Media => write!(f, "media"),
            Self::Archive => write!(f, "archive"),
            Self::Data => write!(f, "data"),
            Self::Speech => write!(f, "speech"),
        }
    }
}

/// Declaration of which (input, output) format pairs a backend can service.
///
/// Loaded once at startup from the backend's runtime probe; never mutated
/// afterwards. Ordered sets keep listings and resolution scans deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub family: BackendFamily,
    pub inputs: BTreeSet<FormatToken>,
    pub outputs: BTreeSet<FormatToken>,
}

impl Capability {
    /// An empty capability set for the given family (degraded, not absent).
    pub fn empty(family: BackendFamily) -> Self {
        Self {
            family,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
        }
    }

    /// Build a capability set from format name slices.
    pub fn of(family: BackendFamily, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            family,
            inputs: inputs.iter().map(|s| FormatToken::new(s)).collect(),
            outputs: outputs.iter().map(|s| FormatToken::new(s)).collect(),
        }
    }

    pub fn add_inputs(&mut self, formats: &[&str]) {
        self.inputs.extend(formats.iter().map(|s| FormatToken::new(s)));
    }

    pub fn add_outputs(&mut self, formats: &[&str]) {
        self.outputs.extend(formats.iter().map(|s| FormatToken::new(s)));
    }

    /// Whether this backend claims the (input, output) pair.
    pub fn supports(&self, input: &FormatToken, output: &FormatToken) -> bool {
        self.inputs.contains(input) && self.outputs.contains(output)
    }

    /// True when the backend reported no usable formats at all.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Shape of the artifact a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// One output file in the target format.
    Single,
    /// One archive containing a derived file per source page
    /// (the pdf-to-image fan-out).
    PageArchive,
}

/// Option bag for a conversion, interpreted only by the chosen backend.
///
/// Every field is optional; backends read the fields they understand and
/// ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Rasterization resolution for document-to-image conversions.
    pub dpi: Option<u32>,
    /// Video quality (CRF) for media conversions.
    pub quality: Option<u32>,
    /// Video bitrate, e.g. "5M".
    pub bitrate: Option<String>,
    /// Audio bitrate, e.g. "256k".
    pub audio_bitrate: Option<String>,
    /// Frame rate for gif/video conversions.
    pub fps: Option<u32>,
    /// Scale filter expression for gif conversions, e.g. "320:-1".
    pub scale: Option<String>,
    /// Speech rate in words per minute.
    pub rate: Option<u32>,
    /// Speech volume, 0.0 to 1.0.
    pub volume: Option<f32>,
    /// Speech voice identifier.
    pub voice: Option<String>,
}

/// One desired transformation within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Opaque handle to the readable input bytes (a stored upload).
    pub source: PathBuf,
    /// The caller's original file name, kept for output naming.
    pub original_filename: String,
    pub source_format: FormatToken,
    pub target_format: FormatToken,
    #[serde(default)]
    pub options: ConvertOptions,
}

/// Result of one conversion request, appended to the job as it finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub original_filename: String,
    pub succeeded: bool,
    /// Caller-facing name of the produced artifact; absent on failure.
    pub output_filename: Option<String>,
    /// Opaque handle to the produced artifact; absent on failure.
    pub output: Option<PathBuf>,
    pub size_bytes: u64,
    /// Human-readable reason; present on failure.
    pub error: Option<String>,
}

impl ConversionOutcome {
    pub fn success(
        original_filename: impl Into<String>,
        output_filename: impl Into<String>,
        output: PathBuf,
        size_bytes: u64,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            succeeded: true,
            output_filename: Some(output_filename.into()),
            output: Some(output),
            size_bytes,
            error: None,
        }
    }

    pub fn failure(original_filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            succeeded: false,
            output_filename: None,
            output: None,
            size_bytes: 0,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_supports_pair() {
        let cap = Capability::of(BackendFamily::Image, &["png", "jpg"], &["png", "webp"]);
        assert!(cap.supports(&FormatToken::new("PNG"), &FormatToken::new("webp")));
        assert!(!cap.supports(&FormatToken::new("png"), &FormatToken::new("jpg")));
        assert!(!cap.is_empty());
        assert!(Capability::empty(BackendFamily::Speech).is_empty());
    }

    #[test]
    fn outcome_constructors() {
        let ok = ConversionOutcome::success("a.txt", "a.html", PathBuf::from("/out/a.html"), 42);
        assert!(ok.succeeded);
        assert_eq!(ok.size_bytes, 42);
        assert!(ok.error.is_none());

        let bad = ConversionOutcome::failure("b.txt", "boom");
        assert!(!bad.succeeded);
        assert!(bad.output.is_none());
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }
}
