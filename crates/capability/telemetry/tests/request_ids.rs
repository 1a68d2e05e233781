use iot_telemetry::{metrics, new_request_ids, record_decode_failure, record_uplink_received};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn counters_increase() {
    let before = metrics().snapshot();
    record_uplink_received();
    record_decode_failure();
    let after = metrics().snapshot();

    assert!(after.uplinks_received > before.uplinks_received);
    assert!(after.decode_failures > before.decode_failures);
}
