//! Capability registry and format listing tests against the real backends.
//!
//! Only tool-independent capabilities are asserted unconditionally; families
//! backed by external tools are checked for consistent degradation instead.

mod common;

use common::TestHarness;

use alembic_common::{BackendFamily, FormatToken};

#[tokio::test]
async fn always_available_families_report_their_formats() {
    let harness = TestHarness::new();
    let listing = harness.registry.list();

    // Raster images are compiled in.
    let image = &listing[&BackendFamily::Image];
    assert!(image.supports(&FormatToken::new("png"), &FormatToken::new("jpeg")));
    assert!(!image.supports(&FormatToken::new("heic"), &FormatToken::new("png")));

    // Text/html document handling has no external dependencies.
    let document = &listing[&BackendFamily::Document];
    assert!(document.supports(&FormatToken::new("txt"), &FormatToken::new("html")));

    // Data and archive codecs are compiled in.
    let data = &listing[&BackendFamily::Data];
    assert!(data.supports(&FormatToken::new("csv"), &FormatToken::new("json")));
    let archive = &listing[&BackendFamily::Archive];
    assert!(archive.supports(&FormatToken::new("zip"), &FormatToken::new("tar")));
}

#[tokio::test]
async fn every_family_is_listed_even_when_degraded() {
    let harness = TestHarness::new();
    let listing = harness.registry.list();

    for family in [
        BackendFamily::Image,
        BackendFamily::Document,
        BackendFamily::Media,
        BackendFamily::Archive,
        BackendFamily::Data,
        BackendFamily::Speech,
    ] {
        assert!(listing.contains_key(&family), "{family} missing from listing");
    }
}

#[tokio::test]
async fn capability_lookups_are_case_insensitive() {
    let harness = TestHarness::new();

    let families = harness.registry.capabilities_of(&FormatToken::new(".TXT"));
    assert!(families.contains(&BackendFamily::Document));

    assert!(harness
        .registry
        .all_input_formats()
        .contains(&FormatToken::new("CSV")));
}

#[tokio::test]
async fn format_unions_are_consistent_with_the_listing() {
    let harness = TestHarness::new();

    let inputs = harness.registry.all_input_formats();
    let outputs = harness.registry.all_output_formats();

    for (_, caps) in harness.registry.list() {
        for input in &caps.inputs {
            assert!(inputs.contains(input));
        }
        for output in &caps.outputs {
            assert!(outputs.contains(output));
        }
    }

    // rar is never offered as an output by any backend.
    assert!(!outputs.contains(&FormatToken::new("rar")));
}
