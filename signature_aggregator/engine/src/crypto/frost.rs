//! FROST(Ed25519, SHA-512) provider built on the `frost-ed25519` crate.
//!
//! Wire conventions shared with the signer nodes:
//! - message: hex of the bytes being signed
//! - group public key: hex of the serialized group `VerifyingKey`
//! - nonces list: `{"<u16 id>": "<hex SigningCommitments>", ...}`
//! - signature data: `id`, `signature` (hex `SignatureShare`), `public_nonce`
//!   (hex `SigningCommitments`), `public_key` (hex `VerifyingShare`)
//!
//! The aggregated public nonce is not the FROST group commitment `R`. It is a stand-in
//! for `R`: a SHA-256 fingerprint binding the message, the group key and the id-ordered
//! commitment set. `frost_ed25519::aggregate` derives the real `R` internally from the
//! same commitments. Every honest signer derives the same value
//! from the same inputs, so a differing report means the signer saw (or claims to have
//! seen) a different commitment set.

use std::collections::BTreeMap;

use frost_ed25519 as frost;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::crypto::{AggregateSignature, CryptoProvider};
use crate::error::{AggregatorError, Result};
use crate::types::{NonceCode, PublicNonce, SignatureData};

const NONCE_DOMAIN: &[u8] = b"sa-frost-ed25519/aggregated-nonce/v1";
const NONCE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrostEd25519Provider;

impl FrostEd25519Provider {
    pub fn new() -> Self {
        FrostEd25519Provider
    }
}

fn crypto_err(context: &str, e: impl std::fmt::Display) -> AggregatorError {
    AggregatorError::CryptoError(format!("{context}: {e}"))
}

fn decode_hex(context: &str, raw: &str) -> Result<Vec<u8>> {
    hex::decode(raw).map_err(|e| crypto_err(context, e))
}

fn group_key_bytes(group_public_key: &Value) -> Result<Vec<u8>> {
    let raw = group_public_key
        .as_str()
        .ok_or_else(|| AggregatorError::CryptoError("Group public key must be a hex string".into()))?;
    decode_hex("Invalid group public key hex", raw)
}

fn parse_id(raw: &Value) -> Result<u16> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse::<u16>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AggregatorError::CryptoError(format!("Invalid participant id {raw}")))
}

fn identifier(id: u16) -> Result<frost::Identifier> {
    frost::Identifier::try_from(id).map_err(|e| crypto_err(&format!("Invalid identifier {id}"), e))
}

fn hex_field(fields: &Map<String, Value>, id: u16, name: &str) -> Result<Vec<u8>> {
    let raw = fields.get(name).and_then(Value::as_str).ok_or_else(|| {
        AggregatorError::CryptoError(format!("Signature data for {id} has no `{name}`"))
    })?;
    decode_hex(&format!("Invalid `{name}` hex for {id}"), raw)
}

fn parse_commitments(nonces_list: &Value) -> Result<BTreeMap<u16, Vec<u8>>> {
    let entries = nonces_list
        .as_object()
        .ok_or_else(|| AggregatorError::CryptoError("Nonces list must be a JSON object".into()))?;

    let mut commitments = BTreeMap::new();
    for (raw_id, raw_commitment) in entries {
        let id = parse_id(&Value::String(raw_id.clone()))?;
        let hex_commitment = raw_commitment.as_str().ok_or_else(|| {
            AggregatorError::CryptoError(format!("Commitment for {id} must be a hex string"))
        })?;
        let bytes = decode_hex(&format!("Invalid commitment hex for {id}"), hex_commitment)?;
        frost::round1::SigningCommitments::deserialize(&bytes)
            .map_err(|e| crypto_err(&format!("Invalid commitment for {id}"), e))?;
        commitments.insert(id, bytes);
    }
    Ok(commitments)
}

/// Fingerprint of (message, group key, commitments ordered by id).
fn fingerprint(message: &[u8], group_key: &[u8], commitments: &BTreeMap<u16, Vec<u8>>) -> PublicNonce {
    let mut hasher = Sha256::new();
    hasher.update(NONCE_DOMAIN);
    hasher.update((message.len() as u32).to_be_bytes());
    hasher.update(message);
    hasher.update((group_key.len() as u32).to_be_bytes());
    hasher.update(group_key);
    for (id, commitment) in commitments {
        hasher.update(id.to_be_bytes());
        hasher.update((commitment.len() as u32).to_be_bytes());
        hasher.update(commitment);
    }
    PublicNonce(hasher.finalize().to_vec())
}

fn verify(signature: &AggregateSignature) -> Result<()> {
    let key_bytes = group_key_bytes(&signature.group_public_key)?;
    let verifying_key = frost::VerifyingKey::deserialize(&key_bytes)
        .map_err(|e| crypto_err("Invalid group public key", e))?;
    let sig = frost::Signature::deserialize(&signature.signature)
        .map_err(|e| crypto_err("Invalid signature encoding", e))?;
    verifying_key
        .verify(&signature.message_hash, &sig)
        .map_err(|e| crypto_err("Signature verification failed", e))
}

impl CryptoProvider for FrostEd25519Provider {
    fn aggregate_nonce(
        &self,
        message: &str,
        nonces_list: &Value,
        group_public_key: &Value,
    ) -> Result<PublicNonce> {
        let message = decode_hex("Invalid message hash hex", message)?;
        let key = group_key_bytes(group_public_key)?;
        let commitments = parse_commitments(nonces_list)?;
        Ok(fingerprint(&message, &key, &commitments))
    }

    fn nonce_to_code(&self, nonce: &PublicNonce) -> NonceCode {
        NonceCode(hex::encode(&nonce.0))
    }

    fn code_to_nonce(&self, code: &NonceCode) -> Result<PublicNonce> {
        let bytes = decode_hex("Invalid nonce code", code.as_str())?;
        if bytes.len() != NONCE_LEN {
            return Err(AggregatorError::CryptoError(format!(
                "Nonce code must encode {NONCE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(PublicNonce(bytes))
    }

    fn aggregate_signatures(
        &self,
        message: &str,
        shares: &[SignatureData],
        aggregated_nonce: &PublicNonce,
        group_public_key: &Value,
    ) -> Result<AggregateSignature> {
        let message_bytes = decode_hex("Invalid message hash hex", message)?;
        let key_bytes = group_key_bytes(group_public_key)?;
        let verifying_key = frost::VerifyingKey::deserialize(&key_bytes)
            .map_err(|e| crypto_err("Invalid group public key", e))?;

        let mut raw_commitments = BTreeMap::new();
        let mut commitments = BTreeMap::new();
        let mut signature_shares = BTreeMap::new();
        let mut verifying_shares = BTreeMap::new();

        for data in shares {
            let raw_id = data.fields.get("id").ok_or_else(|| {
                AggregatorError::CryptoError("Signature data has no `id`".into())
            })?;
            let id = parse_id(raw_id)?;
            if raw_commitments.contains_key(&id) {
                return Err(AggregatorError::CryptoError(format!("Duplicate share for {id}")));
            }
            let participant = identifier(id)?;

            let commitment_bytes = hex_field(&data.fields, id, "public_nonce")?;
            let commitment = frost::round1::SigningCommitments::deserialize(&commitment_bytes)
                .map_err(|e| crypto_err(&format!("Invalid commitment for {id}"), e))?;
            let share_bytes = hex_field(&data.fields, id, "signature")?;
            let share = frost::round2::SignatureShare::deserialize(&share_bytes)
                .map_err(|e| crypto_err(&format!("Invalid signature share for {id}"), e))?;
            let public_share_bytes = hex_field(&data.fields, id, "public_key")?;
            let public_share = frost::keys::VerifyingShare::deserialize(&public_share_bytes)
                .map_err(|e| crypto_err(&format!("Invalid verifying share for {id}"), e))?;

            raw_commitments.insert(id, commitment_bytes);
            commitments.insert(participant, commitment);
            signature_shares.insert(participant, share);
            verifying_shares.insert(participant, public_share);
        }

        if fingerprint(&message_bytes, &key_bytes, &raw_commitments) != *aggregated_nonce {
            return Err(AggregatorError::CryptoError(
                "Signer commitments do not reproduce the aggregated nonce".into(),
            ));
        }

        let signing_package = frost::SigningPackage::new(commitments, &message_bytes);
        let pubkeys = frost::keys::PublicKeyPackage::new(verifying_shares, verifying_key);
        let signature = frost::aggregate(&signing_package, &signature_shares, &pubkeys)
            .map_err(|e| crypto_err("Aggregation failed", e))?;
        let signature = signature
            .serialize()
            .map_err(|e| crypto_err("Failed to serialize signature", e))?;

        Ok(AggregateSignature {
            message_hash: message_bytes,
            group_public_key: group_public_key.clone(),
            nonce: self.nonce_to_code(aggregated_nonce),
            signature,
        })
    }

    fn verify_group_signature(&self, signature: &AggregateSignature) -> bool {
        match verify(signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Group signature rejected");
                false
            }
        }
    }
}
