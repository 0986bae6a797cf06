//! Submission-time feasibility tests.
//!
//! Every request in a batch is validated before any job is created: one
//! infeasible request rejects the whole batch, and the reason attributes
//! blame to the input format, the output format, the pair, or a categorical
//! refusal.

mod common;

use common::TestHarness;

use alembic::store::JobStore;
use alembic_common::{ConversionRequest, ConvertOptions, Error, FormatToken};
use assert_matches::assert_matches;

fn csv_request(harness: &TestHarness, target: &str) -> ConversionRequest {
    let source = harness
        .storage
        .store_upload("x.csv", b"a,b\n1,2\n")
        .unwrap();
    ConversionRequest {
        source,
        original_filename: "x.csv".to_string(),
        source_format: FormatToken::new("csv"),
        target_format: FormatToken::new(target),
        options: ConvertOptions::default(),
    }
}

#[tokio::test]
async fn rar_target_is_refused_with_licensing_reason() {
    let harness = TestHarness::new();

    let err = harness
        .scheduler
        .submit(vec![csv_request(&harness, "rar")])
        .unwrap_err();

    // Not a generic "pair unsupported": the refusal names the real reason.
    assert_matches!(err, Error::RefusedTarget { .. });
    assert!(err.to_string().contains("proprietary"));
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn unknown_input_format_attributes_blame() {
    let harness = TestHarness::new();

    let source = harness.storage.store_upload("data.xyzzy", b"?").unwrap();
    let request = ConversionRequest {
        source,
        original_filename: "data.xyzzy".to_string(),
        source_format: FormatToken::new("xyzzy"),
        target_format: FormatToken::new("html"),
        options: ConvertOptions::default(),
    };

    let err = harness.scheduler.submit(vec![request]).unwrap_err();
    assert_matches!(err, Error::InputUnsupported(f) if f.as_str() == "xyzzy");
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn unknown_output_format_attributes_blame() {
    let harness = TestHarness::new();

    let err = harness
        .scheduler
        .submit(vec![harness.text_request("a.txt", "hi", "xyzzy")])
        .unwrap_err();
    assert_matches!(err, Error::OutputUnsupported(f) if f.as_str() == "xyzzy");
}

#[tokio::test]
async fn known_formats_with_no_common_backend_are_a_pair_error() {
    let harness = TestHarness::new();

    // png is a known input (image), csv a known output (data), but no single
    // backend services the pair.
    let source = harness.storage.store_upload("pic.png", b"png").unwrap();
    let request = ConversionRequest {
        source,
        original_filename: "pic.png".to_string(),
        source_format: FormatToken::new("png"),
        target_format: FormatToken::new("csv"),
        options: ConvertOptions::default(),
    };

    let err = harness.scheduler.submit(vec![request]).unwrap_err();
    assert_matches!(err, Error::PairUnsupported { .. });
}

#[tokio::test]
async fn one_infeasible_request_rejects_the_whole_batch() {
    let harness = TestHarness::new();

    let requests = vec![
        harness.text_request("fine.txt", "ok", "html"),
        harness.text_request("doomed.txt", "nope", "xyzzy"),
    ];

    let err = harness.scheduler.submit(requests).unwrap_err();
    assert!(err.is_feasibility());

    // No partial job was created for the feasible sibling.
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn empty_batches_are_rejected() {
    let harness = TestHarness::new();
    let err = harness.scheduler.submit(Vec::new()).unwrap_err();
    assert_matches!(err, Error::Validation(_));
}
