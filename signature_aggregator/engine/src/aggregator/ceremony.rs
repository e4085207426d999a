//! Signing-phase bookkeeping over a joined batch of signer replies.

use std::collections::BTreeSet;

use crate::aggregator::result::SignerReplies;
use crate::types::{NodeId, NonceCode, ShareStatus, SignatureData, SignerShare};

/// What the aggregator pulls out of the replies before judging them.
#[derive(Debug, Default)]
pub(crate) struct CollectedShares {
    /// First hash seen in party order.
    pub message_hash: Option<String>,
    /// The reply that supplied `message_hash`.
    pub sample: Vec<SignerShare>,
    pub signature_data: Vec<SignatureData>,
    pub reported_nonces: Vec<NonceCode>,
    /// Nodes whose hash differs from the canonical one.
    pub hash_mismatches: Vec<NodeId>,
}

impl CollectedShares {
    /// Returns the agreed nonce code when every reporting signer gave the same one.
    pub fn unanimous_nonce(&self) -> Option<&NonceCode> {
        let distinct: BTreeSet<&NonceCode> = self.reported_nonces.iter().collect();
        if distinct.len() == 1 { distinct.into_iter().next() } else { None }
    }
}

pub(crate) fn collect(replies: &SignerReplies) -> CollectedShares {
    let mut collected = CollectedShares::default();

    for (node, reply) in replies.iter() {
        let Some(share) = reply.ok() else { continue };

        if let Some(hash) = share.hash() {
            match &collected.message_hash {
                None => {
                    collected.message_hash = Some(hash.to_string());
                    collected.sample.push(share.clone());
                }
                Some(canonical) if canonical != hash => collected.hash_mismatches.push(node.clone()),
                Some(_) => {}
            }
        }
        if let Some(data) = share.signature_data.as_ref().filter(|d| !d.is_empty()) {
            collected.signature_data.push(data.clone());
        }
        if let Some(code) = share.reported_nonce() {
            collected.reported_nonces.push(code.clone());
        }
    }

    collected
}

/// Marks every signer whose reported nonce differs from `expected` as malicious and
/// returns their ids. Signers that reported no nonce are left alone.
pub(crate) fn flag_disagreeing(replies: &mut SignerReplies, expected: &NonceCode) -> Vec<NodeId> {
    let mut flagged = Vec::new();
    for (node, reply) in replies.iter_mut() {
        let Some(share) = reply.ok_mut() else { continue };
        if share.reported_nonce().is_some_and(|code| code != expected) {
            share.status = ShareStatus::Malicious;
            flagged.push(node.clone());
        }
    }
    flagged
}

/// Ids of every signer currently carrying the malicious status.
pub(crate) fn malicious_nodes(replies: &SignerReplies) -> Vec<NodeId> {
    replies
        .iter()
        .filter(|(_, reply)| reply.ok().is_some_and(SignerShare::is_malicious))
        .map(|(node, _)| node.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::result::PeerReplies;
    use crate::transport::{PeerReply, Sentinel};
    use serde_json::json;

    fn share(hash: &str, nonce: &str) -> PeerReply<SignerShare> {
        PeerReply::Ok(
            serde_json::from_value(json!({
                "hash": hash,
                "signature_data": { "aggregated_public_nonce": nonce, "signature": "aa" },
                "status": "SUCCESSFUL"
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_first_hash_wins_and_sentinels_are_skipped() {
        let replies = PeerReplies::new(vec![
            (NodeId::from("1"), PeerReply::Err(Sentinel::timeout())),
            (NodeId::from("2"), share("h2", "n")),
            (NodeId::from("3"), share("h3", "n")),
        ]);
        let collected = collect(&replies);

        assert_eq!(collected.message_hash.as_deref(), Some("h2"));
        assert_eq!(collected.sample.len(), 1);
        assert_eq!(collected.signature_data.len(), 2);
        assert_eq!(collected.hash_mismatches, vec![NodeId::from("3")]);
        assert_eq!(collected.unanimous_nonce().unwrap().as_str(), "n");
    }

    #[test]
    fn test_disagreement_flags_only_the_outlier() {
        let mut replies = PeerReplies::new(vec![
            (NodeId::from("1"), share("h", "good")),
            (NodeId::from("2"), share("h", "forged")),
            (NodeId::from("3"), share("h", "good")),
            (NodeId::from("4"), PeerReply::Err(Sentinel::timeout())),
        ]);
        assert!(collect(&replies).unanimous_nonce().is_none());

        let flagged = flag_disagreeing(&mut replies, &NonceCode("good".into()));
        assert_eq!(flagged, vec![NodeId::from("2")]);
        assert_eq!(malicious_nodes(&replies), vec![NodeId::from("2")]);
    }

    #[test]
    fn test_no_nonces_is_not_unanimous() {
        let replies: SignerReplies = PeerReplies::new(vec![(NodeId::from("1"), PeerReply::Err(Sentinel::timeout()))]);
        let collected = collect(&replies);
        assert!(collected.message_hash.is_none());
        assert!(collected.unanimous_nonce().is_none());
    }
}
