//! Converter dispatch: resolve a (source, target) format pair to a backend.

use crate::registry::CapabilityRegistry;
use alembic_common::{BackendFamily, Error, FormatToken, OutputShape, Result};

/// Targets of the pdf page fan-out special case.
const PAGE_ARCHIVE_TARGETS: &[&str] = &["jpg", "jpeg", "png"];

/// Output formats refused regardless of backend availability.
const REFUSED_TARGETS: &[(&str, &str)] = &[(
    "rar",
    "creating RAR archives requires proprietary WinRAR software and is not supported",
)];

/// The backend choice for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub family: BackendFamily,
    pub shape: OutputShape,
}

/// Pick exactly one backend for a format pair.
///
/// A pure function of the registry state. The order is fixed:
///
/// 1. Categorical refusals (licensing, not capability).
/// 2. Special-case pairs that cross category boundaries: pdf to an image
///    format fans out into one image per page, packaged as a single archive.
///    These win over generic set membership.
/// 3. Backends in registration order; the first whose input set contains the
///    source and whose output set contains the target wins, so overlapping
///    capability sets resolve by fixed priority rather than map iteration
///    order.
///
/// Failures attribute blame: input-unsupported when no backend lists the
/// source format at all, output-unsupported when no backend lists the target,
/// pair-unsupported otherwise.
pub fn resolve(
    registry: &CapabilityRegistry,
    input: &FormatToken,
    output: &FormatToken,
) -> Result<Resolution> {
    if let Some((_, reason)) = REFUSED_TARGETS
        .iter()
        .find(|(format, _)| output.as_str() == *format)
    {
        return Err(Error::RefusedTarget {
            format: output.clone(),
            reason: (*reason).to_string(),
        });
    }

    if input.as_str() == "pdf" && PAGE_ARCHIVE_TARGETS.contains(&output.as_str()) {
        if let Some(backend) = registry.backend(BackendFamily::Document) {
            if backend.capabilities().supports(input, output) {
                return Ok(Resolution {
                    family: BackendFamily::Document,
                    shape: OutputShape::PageArchive,
                });
            }
        }
    }

    for backend in registry.backends() {
        if backend.capabilities().supports(input, output) {
            return Ok(Resolution {
                family: backend.family(),
                shape: OutputShape::Single,
            });
        }
    }

    let input_known = registry
        .backends()
        .iter()
        .any(|b| b.capabilities().inputs.contains(input));
    let output_known = registry
        .backends()
        .iter()
        .any(|b| b.capabilities().outputs.contains(output));

    if !input_known {
        Err(Error::InputUnsupported(input.clone()))
    } else if !output_known {
        Err(Error::OutputUnsupported(output.clone()))
    } else {
        Err(Error::PairUnsupported {
            input: input.clone(),
            output: output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubBackend;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    /// A registry mirroring the full production capability matrix.
    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Image,
            &["jpg", "jpeg", "png", "bmp", "tiff", "gif", "webp", "ico"],
            &["jpg", "jpeg", "png", "bmp", "tiff", "gif", "webp", "ico"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Document,
            &["pdf", "docx", "txt", "html"],
            &["pdf", "docx", "txt", "html", "jpg", "jpeg", "png"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Media,
            &["mp4", "avi", "mkv", "gif", "mp3", "wav"],
            &["mp4", "avi", "mkv", "gif", "mp3", "wav"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Archive,
            &["zip", "tar", "gz", "7z", "rar"],
            &["zip", "tar", "gz", "7z"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Data,
            &["csv", "json", "xml", "xlsx"],
            &["csv", "json", "txt"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Speech,
            &["txt"],
            &["wav"],
        )));
        registry
    }

    fn resolve_pair(input: &str, output: &str) -> Result<Resolution> {
        resolve(
            &registry(),
            &FormatToken::new(input),
            &FormatToken::new(output),
        )
    }

    #[test]
    fn declared_pairs_resolve_to_their_backend() {
        assert_eq!(
            resolve_pair("pdf", "docx").unwrap().family,
            BackendFamily::Document
        );
        assert_eq!(
            resolve_pair("txt", "html").unwrap().family,
            BackendFamily::Document
        );
        assert_eq!(
            resolve_pair("png", "webp").unwrap().family,
            BackendFamily::Image
        );
        assert_eq!(
            resolve_pair("csv", "json").unwrap().family,
            BackendFamily::Data
        );
    }

    #[test]
    fn pdf_to_image_takes_the_page_archive_path() {
        for target in ["jpg", "jpeg", "png"] {
            let resolution = resolve_pair("pdf", target).unwrap();
            assert_eq!(resolution.family, BackendFamily::Document);
            assert_eq!(resolution.shape, OutputShape::PageArchive);
        }
        // Ordinary document conversions keep the single shape.
        assert_eq!(
            resolve_pair("pdf", "txt").unwrap().shape,
            OutputShape::Single
        );
    }

    #[test]
    fn rar_output_is_refused_categorically() {
        let err = resolve_pair("csv", "rar").unwrap_err();
        assert_matches!(err, Error::RefusedTarget { .. });
        assert!(err.to_string().contains("proprietary"));

        // Even an archive input, whose backend reads rar, cannot produce it.
        let err = resolve_pair("zip", "rar").unwrap_err();
        assert_matches!(err, Error::RefusedTarget { .. });
    }

    #[test]
    fn failures_attribute_blame_correctly() {
        assert_matches!(
            resolve_pair("xyzzy", "png").unwrap_err(),
            Error::InputUnsupported(format) if format.as_str() == "xyzzy"
        );
        assert_matches!(
            resolve_pair("txt", "xyzzy").unwrap_err(),
            Error::OutputUnsupported(format) if format.as_str() == "xyzzy"
        );
        assert_matches!(
            resolve_pair("png", "csv").unwrap_err(),
            Error::PairUnsupported { .. }
        );
    }

    #[test]
    fn case_and_dots_do_not_matter() {
        let resolution = resolve(
            &registry(),
            &FormatToken::new(".PDF"),
            &FormatToken::new("Docx"),
        )
        .unwrap();
        assert_eq!(resolution.family, BackendFamily::Document);
    }

    #[test]
    fn overlapping_claims_resolve_by_registration_order() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Data,
            &["foo"],
            &["bar"],
        )));
        registry.register(Arc::new(StubBackend::new(
            BackendFamily::Archive,
            &["foo"],
            &["bar"],
        )));

        let input = FormatToken::new("foo");
        let output = FormatToken::new("bar");
        for _ in 0..10 {
            let resolution = resolve(&registry, &input, &output).unwrap();
            assert_eq!(resolution.family, BackendFamily::Data);
        }
    }
}
