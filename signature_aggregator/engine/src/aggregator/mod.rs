//! Signature aggregator: drives the nonce and signing phases across a signer party.
//!
//! The aggregator keeps no ceremony state between calls. Each call resolves the peers,
//! fans out concurrently, waits for the whole batch and judges the replies on its own
//! scratch data, so one instance can run several ceremonies at once.

mod ceremony;
pub mod result;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::config::{AggregatorConfig, DEFAULT_TIMEOUT_SECS};
use crate::crypto::CryptoProvider;
use crate::directory::NodeDirectory;
use crate::error::{AggregatorError, Result};
use crate::transport::{HttpTransport, PeerReply, Transport, TransportExt};
use crate::types::{DkgKey, NodeIdentity, NonceRequest, Party, ShareStatus, SignRequest, SignerShare};

pub use result::{
    AggregationResult, FailedOutcome, FailureReason, NonceCeremonyResult, PeerReplies, SignedOutcome,
    SignerReplies,
};

pub const GENERATE_NONCES_PATH: &str = "/v1/generate-nonces";
pub const SIGN_PATH: &str = "/v1/sign";
pub const DEFAULT_NUMBER_OF_NONCES: u32 = 10;

pub struct SignatureAggregator {
    directory: Arc<dyn NodeDirectory>,
    transport: Arc<dyn Transport>,
    crypto: Arc<dyn CryptoProvider>,
    default_timeout: Duration,
    scheme: String,
    audit: Option<Arc<AuditTracker>>,
}

impl SignatureAggregator {
    pub fn new(
        directory: Arc<dyn NodeDirectory>,
        transport: Arc<dyn Transport>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Self {
        Self {
            directory,
            transport,
            crypto,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            scheme: "http".to_string(),
            audit: None,
        }
    }

    /// Builds an aggregator over a pooled HTTP transport configured from `config`.
    pub fn from_config(
        config: &AggregatorConfig,
        directory: Arc<dyn NodeDirectory>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::from_config(config)?);
        Ok(Self::new(directory, transport, crypto)
            .with_default_timeout(config.default_timeout())
            .with_scheme(&config.scheme))
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTracker>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn audit(&self, record: AuditRecord) {
        if let Some(audit) = &self.audit {
            audit.log(record);
        }
    }

    /// Resolves every member up front so an unknown id fails before any traffic.
    fn resolve(&self, party: &Party) -> Result<Vec<NodeIdentity>> {
        party.members().iter().map(|id| self.directory.lookup(id)).collect()
    }

    /// Sends `body` to `path` on every member concurrently and waits for all of them.
    async fn fan_out<T>(&self, party: &Party, path: &str, body: &Value) -> Result<PeerReplies<T>>
    where
        T: DeserializeOwned + Send,
    {
        let nodes = self.resolve(party)?;
        let calls = nodes.iter().map(|node| {
            let url = node.endpoint(&self.scheme, path);
            async move { self.transport.post_as::<T>(&url, body, self.default_timeout).await }
        });
        let replies = join_all(calls).await;

        Ok(PeerReplies::new(party.members().iter().cloned().zip(replies).collect()))
    }

    /// Phase one: asks every party member for `number_of_nonces` fresh nonces.
    ///
    /// Returns one reply or sentinel per member, keyed in party order. No validation
    /// happens here; the signing phase judges what the peers produced.
    pub async fn request_nonces(&self, party: &Party, number_of_nonces: u32) -> Result<NonceCeremonyResult> {
        let body = serde_json::to_value(NonceRequest { number_of_nonces })?;
        let replies: NonceCeremonyResult = self.fan_out(party, GENERATE_NONCES_PATH, &body).await?;

        let failed = replies.iter().filter(|(_, reply)| !reply.is_ok()).count();
        debug!(
            nonces = %serde_json::to_string_pretty(&replies)?,
            "Nonces dictionary response"
        );
        info!(peers = replies.len(), failed, number_of_nonces, "Nonce collection finished");
        Ok(replies)
    }

    /// Phase two: collects signature shares from `sign_party`, checks them for
    /// tampering and combines them into one group signature.
    ///
    /// Ceremony failures (unauthorized subset, malicious signers, a signature that does
    /// not verify) come back as [`AggregationResult::Failed`]. `Err` is reserved for bad
    /// caller input: unknown nodes, malformed nonce commitments, or a batch in which no
    /// signer reported a message hash.
    pub async fn request_signature(
        &self,
        dkg_key: &DkgKey,
        nonces_list: &Value,
        sa_data: &Value,
        sign_party: &Party,
    ) -> Result<AggregationResult> {
        if !sign_party.is_subset_of(&dkg_key.party) {
            warn!(
                sign_party = ?sign_party.members(),
                dkg_party = ?dkg_key.party.members(),
                "Signing party is not a subset of the key's party"
            );
            return Ok(AggregationResult::unauthorized());
        }

        let request_id = Uuid::new_v4().to_string();
        let request = SignRequest {
            request_id: request_id.clone(),
            dkg_public_key: dkg_key.public_key.clone(),
            nonces_list: nonces_list.clone(),
            data: sa_data.clone(),
        };
        let body = serde_json::to_value(&request)?;
        self.audit(AuditRecord::new(
            AuditEventType::Signing,
            &request_id,
            format!("Requesting signatures from {} signers", sign_party.len()),
        ));

        let mut replies: SignerReplies = self.fan_out(sign_party, SIGN_PATH, &body).await?;
        debug!(
            request_id = %request_id,
            signatures = %serde_json::to_string_pretty(&replies)?,
            "Signatures dictionary response"
        );
        for (node, reply) in replies.iter() {
            match reply {
                PeerReply::Err(sentinel) => {
                    warn!(request_id = %request_id, node = %node, error = %sentinel.error, "Signer did not answer");
                }
                PeerReply::Ok(SignerShare { status: ShareStatus::Other(status), .. }) => {
                    warn!(request_id = %request_id, node = %node, status = %status, "Signer reported an unknown status");
                }
                PeerReply::Ok(_) => {}
            }
        }

        let collected = ceremony::collect(&replies);
        let Some(message_hash) = collected.message_hash.clone() else {
            self.audit(AuditRecord::new(AuditEventType::Error, &request_id, "No signer returned a message hash"));
            return Err(AggregatorError::MissingMessageHash { request_id });
        };
        if !collected.hash_mismatches.is_empty() {
            warn!(
                request_id = %request_id,
                nodes = ?collected.hash_mismatches,
                canonical = %message_hash,
                "Signers reported a different message hash"
            );
        }

        let agreed_nonce = match collected.unanimous_nonce() {
            Some(code) => Some(code.clone()),
            None => {
                let recomputed =
                    self.crypto.aggregate_nonce(&message_hash, nonces_list, &dkg_key.public_key)?;
                let expected = self.crypto.nonce_to_code(&recomputed);
                let flagged = ceremony::flag_disagreeing(&mut replies, &expected);
                debug!(
                    request_id = %request_id,
                    expected = %expected,
                    flagged = ?flagged,
                    "Reported nonces disagree, recomputed aggregated nonce"
                );
                None
            }
        };

        let malicious = ceremony::malicious_nodes(&replies);
        if !malicious.is_empty() {
            for node in &malicious {
                warn!(request_id = %request_id, node = %node, "Signer flagged as malicious");
                self.audit(
                    AuditRecord::new(AuditEventType::Malicious, &request_id, "Aggregated nonce mismatch")
                        .for_node(node),
                );
            }
            info!(request_id = %request_id, result = "FAILED", "Signature response");
            return Ok(failed(FailureReason::MaliciousSigners { nodes: malicious }, request_id, replies));
        }

        let Some(agreed_nonce) = agreed_nonce.filter(|_| !collected.signature_data.is_empty()) else {
            warn!(request_id = %request_id, "No signature shares to aggregate");
            self.audit(AuditRecord::new(AuditEventType::Error, &request_id, "No signature shares to aggregate"));
            return Ok(failed(FailureReason::NoSignatureShares, request_id, replies));
        };

        let aggregate = match self.crypto.code_to_nonce(&agreed_nonce).and_then(|nonce| {
            self.crypto.aggregate_signatures(
                &message_hash,
                &collected.signature_data,
                &nonce,
                &dkg_key.public_key,
            )
        }) {
            Ok(aggregate) => aggregate,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Signature aggregation failed");
                self.audit(AuditRecord::new(AuditEventType::Aggregation, &request_id, e.to_string()));
                return Ok(failed(FailureReason::AggregationFailed { error: e.to_string() }, request_id, replies));
            }
        };
        self.audit(AuditRecord::new(
            AuditEventType::Aggregation,
            &request_id,
            format!("Aggregated {} signature shares", collected.signature_data.len()),
        ));

        if !self.crypto.verify_group_signature(&aggregate) {
            warn!(request_id = %request_id, "Aggregated signature failed verification");
            self.audit(AuditRecord::new(AuditEventType::Verification, &request_id, "Verification failed"));
            return Ok(AggregationResult::Failed(FailedOutcome {
                reason: FailureReason::VerificationFailed,
                request_id: Some(request_id),
                signatures: Some(replies),
                aggregate: Some(aggregate),
            }));
        }

        self.audit(AuditRecord::new(AuditEventType::Verification, &request_id, "Group signature verified"));
        info!(request_id = %request_id, result = "SUCCESSFUL", "Aggregated sign result");
        Ok(AggregationResult::Successful(SignedOutcome {
            request_id,
            message_hash: hex::encode(&aggregate.message_hash),
            signature: aggregate,
            signature_data: collected.sample,
        }))
    }
}

fn failed(reason: FailureReason, request_id: String, replies: SignerReplies) -> AggregationResult {
    AggregationResult::Failed(FailedOutcome {
        reason,
        request_id: Some(request_id),
        signatures: Some(replies),
        aggregate: None,
    })
}
