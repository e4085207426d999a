use std::sync::Arc;
use std::thread;

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::types::NodeId;

#[test]
fn test_audit_log_adds_and_retrieves() {
    let tracker = AuditTracker::new(10);

    tracker.log(AuditRecord::new(AuditEventType::Signing, "req_1", "Requesting signatures from 3 signers"));

    let recent = tracker.recent(1);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].request_id, "req_1");
    assert_eq!(recent[0].message, "Requesting signatures from 3 signers");
    assert!(chrono::DateTime::parse_from_rfc3339(&recent[0].timestamp).is_ok());
}

#[test]
fn test_audit_log_eviction() {
    let tracker = AuditTracker::new(3);

    for i in 0..5u16 {
        tracker.log(
            AuditRecord::new(AuditEventType::Malicious, &format!("req_{i}"), "Aggregated nonce mismatch")
                .for_node(&NodeId::from(i)),
        );
    }

    let recent = tracker.recent(5);
    assert_eq!(recent.len(), 3); // oldest two evicted
    assert_eq!(recent[0].request_id, "req_4");
    assert_eq!(recent[2].request_id, "req_2");
    assert_eq!(recent[0].node_id, Some(NodeId::from("4")));
}

#[test]
fn test_audit_log_filters_by_request() {
    let tracker = AuditTracker::new(10);
    tracker.log(AuditRecord::new(AuditEventType::Signing, "a", "start"));
    tracker.log(AuditRecord::new(AuditEventType::Signing, "b", "start"));
    tracker.log(AuditRecord::new(AuditEventType::Error, "a", "no hash"));

    let events: Vec<&str> = tracker.for_request("a").iter().map(|r| r.event_type_label()).collect();
    assert_eq!(events, vec!["SIGNING", "ERROR"]);
}

#[test]
fn test_zero_capacity_keeps_nothing() {
    let tracker = AuditTracker::new(0);
    tracker.log(AuditRecord::new(AuditEventType::Verification, "a", "ok"));
    assert!(tracker.is_empty());
}

#[test]
fn test_audit_log_thread_safety() {
    let tracker = Arc::new(AuditTracker::new(100));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                tracker.log(AuditRecord::new(
                    AuditEventType::Aggregation,
                    &format!("thread_{i}"),
                    format!("Thread aggregate event {i}"),
                ));
            })
        })
        .collect();

    for h in handles {
        h.join().expect("Thread failed");
    }

    assert_eq!(tracker.len(), 10);
    assert_eq!(tracker.recent(10).len(), 10);
}
