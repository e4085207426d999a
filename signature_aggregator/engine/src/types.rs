//! Shared data types for the signature aggregator: node ids, parties, DKG keys and the
//! request/response bodies exchanged with signer nodes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier of a signer node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        NodeId(id.to_string())
    }
}

/// Network location of a signer node, as held by the node directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl NodeIdentity {
    /// Builds the endpoint URL for `path` on this node.
    pub fn endpoint(&self, scheme: &str, path: &str) -> String {
        format!("{scheme}://{}:{}{path}", self.host, self.port)
    }
}

/// Ordered set of nodes that jointly hold shares of one group key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Party(pub Vec<NodeId>);

impl Party {
    pub fn new<I, N>(members: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Party(members.into_iter().map(Into::into).collect())
    }

    pub fn members(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains(id)
    }

    /// Set inclusion; member order and duplicates are ignored.
    pub fn is_subset_of(&self, other: &Party) -> bool {
        let allowed: HashSet<&NodeId> = other.0.iter().collect();
        self.0.iter().all(|id| allowed.contains(id))
    }
}

/// Result of a prior distributed key generation: group key plus the party that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DkgKey {
    pub public_key: Value,
    pub party: Party,
}

/// Body of `/v1/generate-nonces`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceRequest {
    pub number_of_nonces: u32,
}

/// Body of `/v1/sign`, sent identically to every member of the signing subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    pub request_id: String,
    pub dkg_public_key: Value,
    pub nonces_list: Value,
    pub data: Value,
}

/// Compact string form of an aggregated public nonce as reported on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NonceCode(pub String);

impl NonceCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NonceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider-defined binary form of an aggregated public nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicNonce(pub Vec<u8>);

/// Status a signer attaches to its share; the aggregator rewrites it on detection.
///
/// Unrecognised values are kept verbatim so the share is still judged and reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShareStatus {
    #[default]
    Successful,
    Malicious,
    Other(String),
}

impl From<String> for ShareStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SUCCESSFUL" => ShareStatus::Successful,
            "MALICIOUS" => ShareStatus::Malicious,
            _ => ShareStatus::Other(raw),
        }
    }
}

impl From<ShareStatus> for String {
    fn from(status: ShareStatus) -> Self {
        match status {
            ShareStatus::Successful => "SUCCESSFUL".to_string(),
            ShareStatus::Malicious => "MALICIOUS".to_string(),
            ShareStatus::Other(raw) => raw,
        }
    }
}

/// Signer-side signing artifacts. Only the aggregated nonce is interpreted by the
/// coordinator; everything else is passed through to the crypto provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_public_nonce: Option<NonceCode>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SignatureData {
    pub fn is_empty(&self) -> bool {
        self.aggregated_public_nonce.is_none() && self.fields.is_empty()
    }

    /// The reported aggregated nonce, ignoring empty codes.
    pub fn reported_nonce(&self) -> Option<&NonceCode> {
        self.aggregated_public_nonce.as_ref().filter(|code| !code.is_empty())
    }
}

/// One signer's answer to `/v1/sign`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignerShare {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<SignatureData>,
    #[serde(default)]
    pub status: ShareStatus,
    /// Any other top-level fields, kept for the forensic record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignerShare {
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|h| !h.is_empty())
    }

    pub fn reported_nonce(&self) -> Option<&NonceCode> {
        self.signature_data.as_ref().and_then(SignatureData::reported_nonce)
    }

    pub fn is_malicious(&self) -> bool {
        self.status == ShareStatus::Malicious
    }
}
