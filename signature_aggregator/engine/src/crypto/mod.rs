//! Threshold-crypto seam used by the aggregator to finalize a ceremony.

pub mod frost;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{NonceCode, PublicNonce, SignatureData};

pub use frost::FrostEd25519Provider;

/// Combined signature over the canonical digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSignature {
    #[serde(with = "hex")]
    pub message_hash: Vec<u8>,
    pub group_public_key: Value,
    pub nonce: NonceCode,
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
}

/// Nonce aggregation, signature aggregation and group-signature verification.
///
/// The aggregator only ever hands over the canonical digest (as reported by the first
/// signer), the caller's nonce commitments, the collected signature data and the group
/// public key; it never interprets them itself.
pub trait CryptoProvider: Send + Sync {
    /// Recomputes the aggregated public nonce from the caller's commitments.
    fn aggregate_nonce(
        &self,
        message: &str,
        nonces_list: &Value,
        group_public_key: &Value,
    ) -> Result<PublicNonce>;

    fn nonce_to_code(&self, nonce: &PublicNonce) -> NonceCode;

    fn code_to_nonce(&self, code: &NonceCode) -> Result<PublicNonce>;

    fn aggregate_signatures(
        &self,
        message: &str,
        shares: &[SignatureData],
        aggregated_nonce: &PublicNonce,
        group_public_key: &Value,
    ) -> Result<AggregateSignature>;

    fn verify_group_signature(&self, signature: &AggregateSignature) -> bool;
}
