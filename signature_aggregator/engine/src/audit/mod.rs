
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::types::NodeId;

/// Type of ceremony event being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    Signing,
    Malicious,
    Aggregation,
    Verification,
    Error,
}

/// Record of a ceremony event, correlated by request id
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub event_type: AuditEventType,
    pub request_id: String,
    pub node_id: Option<NodeId>,
    pub message: String,
    pub timestamp: String, // RFC3339
}

impl AuditRecord {
    pub fn new(event_type: AuditEventType, request_id: &str, message: impl Into<String>) -> Self {
        Self {
            event_type,
            request_id: request_id.to_string(),
            node_id: None,
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn for_node(mut self, node_id: &NodeId) -> Self {
        self.node_id = Some(node_id.clone());
        self
    }

    pub fn event_type_label(&self) -> &'static str {
        match self.event_type {
            AuditEventType::Signing => "SIGNING",
            AuditEventType::Malicious => "MALICIOUS",
            AuditEventType::Aggregation => "AGGREGATE",
            AuditEventType::Verification => "VERIFY",
            AuditEventType::Error => "ERROR",
        }
    }
}

/// In-memory bounded audit trail, oldest entries evicted first
#[derive(Debug)]
pub struct AuditTracker {
    records: Mutex<VecDeque<AuditRecord>>,
    max_entries: usize,
}

impl AuditTracker {
    pub fn new(max_entries: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<AuditRecord>> {
        // a panicked writer cannot leave a half-pushed record behind
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new event in the audit log
    pub fn log(&self, record: AuditRecord) {
        if self.max_entries == 0 {
            return;
        }
        tracing::debug!(
            event = record.event_type_label(),
            request_id = %record.request_id,
            node = ?record.node_id,
            "{}",
            record.message
        );
        let mut records = self.records();
        if records.len() == self.max_entries {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Newest first
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        self.records().iter().rev().take(count).cloned().collect()
    }

    /// All records for one ceremony, oldest first
    pub fn for_request(&self, request_id: &str) -> Vec<AuditRecord> {
        self.records()
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Helper to get current timestamp as RFC3339 string
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
