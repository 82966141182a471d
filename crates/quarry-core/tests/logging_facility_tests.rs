#![allow(clippy::unwrap_used, clippy::expect_used)]

use quarry_core::errors::{ExError, ExErrorKind, QuarryError};
use quarry_core::logging_facility::test_capture::init_test_capture;
use quarry_core::{log_op_end, log_op_error, log_op_start};
use quarry_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, table = "items");

    let events = capture.events_for_op(op_name);
    let start = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_START))
        .expect("start event captured");
    assert_eq!(start.table.as_deref(), Some("items"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_accepts_domain_error() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = QuarryError::EmptyInList {
        column: "id".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event captured");
    assert_eq!(error_event.field("err_code"), Some("ERR_INVALID_OPERATION"));
    assert_eq!(error_event.field("err_kind"), Some("InvalidOperation"));
}

#[test]
fn test_log_op_error_does_not_consume_error() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_4";

    let err = ExError::new(ExErrorKind::NotFound).with_table("items");
    log_op_error!(op_name, err, duration_ms = 1, table = "items");

    // still usable afterwards
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    capture.assert_event_exists(op_name, EVENT_END_ERROR);
}
