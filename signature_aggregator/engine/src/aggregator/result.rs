//! Values returned by the aggregator's public operations.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::crypto::AggregateSignature;
use crate::transport::PeerReply;
use crate::types::{NodeId, SignerShare};

/// Per-peer replies keyed by node id, in the order the party listed them.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerReplies<T> {
    entries: Vec<(NodeId, PeerReply<T>)>,
}

impl<T> PeerReplies<T> {
    pub fn new(entries: Vec<(NodeId, PeerReply<T>)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&PeerReply<T>> {
        self.entries.iter().find(|(node, _)| node == id).map(|(_, reply)| reply)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.iter().map(|(node, _)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &PeerReply<T>)> {
        self.entries.iter().map(|(node, reply)| (node, reply))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&NodeId, &mut PeerReply<T>)> {
        self.entries.iter_mut().map(|(node, reply)| (&*node, reply))
    }
}

impl<T: Serialize> Serialize for PeerReplies<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (node, reply) in &self.entries {
            map.serialize_entry(node, reply)?;
        }
        map.end()
    }
}

/// Output of the nonce phase: one raw reply (or sentinel) per requested node.
pub type NonceCeremonyResult = PeerReplies<Value>;

/// Signing-phase replies, kept as forensic evidence on failure.
pub type SignerReplies = PeerReplies<SignerShare>;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The signing subset is not part of the party that generated the key.
    UnauthorizedParty,
    /// At least one signer reported a wrong aggregated nonce or flagged itself.
    MaliciousSigners { nodes: Vec<NodeId> },
    /// No signer returned signature data under an agreed aggregated nonce.
    NoSignatureShares,
    /// The crypto provider refused to combine the collected shares.
    AggregationFailed { error: String },
    /// The combined signature does not verify against the group key.
    VerificationFailed,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SignedOutcome {
    pub request_id: String,
    /// Hex of the signed digest.
    pub message_hash: String,
    pub signature: AggregateSignature,
    /// Representative sample: the share that supplied the canonical digest.
    pub signature_data: Vec<SignerShare>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FailedOutcome {
    pub reason: FailureReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Raw per-signer replies; `None` when no signer was contacted.
    pub signatures: Option<SignerReplies>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateSignature>,
}

/// Terminal state of a signing ceremony, discriminated by `result`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationResult {
    Successful(SignedOutcome),
    Failed(FailedOutcome),
}

impl AggregationResult {
    pub(crate) fn unauthorized() -> Self {
        AggregationResult::Failed(FailedOutcome {
            reason: FailureReason::UnauthorizedParty,
            request_id: None,
            signatures: None,
            aggregate: None,
        })
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, AggregationResult::Successful(_))
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            AggregationResult::Successful(outcome) => Some(&outcome.request_id),
            AggregationResult::Failed(outcome) => outcome.request_id.as_deref(),
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            AggregationResult::Successful(_) => None,
            AggregationResult::Failed(outcome) => Some(&outcome.reason),
        }
    }

    pub fn signatures(&self) -> Option<&SignerReplies> {
        match self {
            AggregationResult::Successful(_) => None,
            AggregationResult::Failed(outcome) => outcome.signatures.as_ref(),
        }
    }
}
