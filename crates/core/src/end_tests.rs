// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn ok_end_carries_result() {
    let end = End::ok(json!(5));
    assert!(end.is_ok());
    assert_eq!(end.result(), Some(&json!(5)));
    assert_eq!(end.status_name(), "ok");
}

#[test]
fn bad_request_has_no_result() {
    let end = End::bad_request("bad shape");
    assert!(!end.is_ok());
    assert_eq!(end.result(), None);
    assert_eq!(end.status_name(), "bad_request");
}

#[test]
fn invalid_argument_folds_to_bad_request() {
    let end = End::from_error(&WorkError::invalid_argument("shape mismatch"), "");
    assert_eq!(
        end,
        End::BadRequest {
            message: "invalid argument: shape mismatch".into()
        }
    );
}

#[test]
fn other_errors_fold_to_error_end() {
    let end = End::from_error(&WorkError::failed("divide-by-zero", "b is zero"), "at unit 'div'");
    match end {
        End::Error { kind, message, trace } => {
            assert_eq!(kind, "divide-by-zero");
            assert_eq!(message, "divide-by-zero: b is zero");
            assert_eq!(trace, "at unit 'div'");
        }
        other => panic!("expected error end, got {other:?}"),
    }
}

#[test]
fn serde_tags_by_status() {
    let end = End::ok(json!([1, 2]));
    let text = serde_json::to_string(&end).unwrap();
    assert!(text.contains("\"status\":\"ok\""));
    let parsed: End = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, end);

    let end = End::error("not-found", "plugin not found: x", "");
    let text = serde_json::to_string(&end).unwrap();
    assert!(text.contains("\"status\":\"error\""));
    let parsed: End = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, end);
}
