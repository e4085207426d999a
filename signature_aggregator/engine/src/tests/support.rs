//! Shared fixtures: in-memory transport, scripted crypto provider, FROST dealer set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use frost_ed25519 as frost;
use serde_json::{Value, json};

use crate::crypto::{AggregateSignature, CryptoProvider, FrostEd25519Provider};
use crate::directory::StaticNodeDirectory;
use crate::error::{AggregatorError, Result};
use crate::transport::{PeerReply, Sentinel, Transport};
use crate::types::{NonceCode, PublicNonce, SignatureData};

pub const GOOD_NONCE: &[u8] = b"agreed-nonce";

pub fn url(node: u16, path: &str) -> String {
    format!("http://node{node}:{}{path}", 5000 + node)
}

/// Directory with nodes `1..=count` at `node<i>:500<i>`.
pub fn directory(count: u16) -> StaticNodeDirectory {
    (1..=count).fold(StaticNodeDirectory::new(), |dir, i| {
        dir.with_node(i, format!("node{i}"), 5000 + i)
    })
}

#[derive(Debug, Clone)]
pub enum Behaviour {
    Reply(Value),
    Delay(Duration, Value),
    Fail(Sentinel),
}

/// Scripted transport keyed by URL. Records every call it sees.
#[derive(Default)]
pub struct MockTransport {
    behaviours: HashMap<String, Behaviour>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: String, behaviour: Behaviour) -> Self {
        self.behaviours.insert(url, behaviour);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, url: &str, body: &Value, timeout: Duration) -> PeerReply<Value> {
        self.calls.lock().unwrap().push((url.to_string(), body.clone()));
        match self.behaviours.get(url).cloned() {
            None => PeerReply::Err(Sentinel::error("ConnectError", format!("no route to {url}"))),
            Some(Behaviour::Reply(reply)) => PeerReply::Ok(reply),
            Some(Behaviour::Fail(sentinel)) => PeerReply::Err(sentinel),
            Some(Behaviour::Delay(delay, reply)) => {
                match tokio::time::timeout(timeout, tokio::time::sleep(delay)).await {
                    Ok(()) => PeerReply::Ok(reply),
                    Err(_) => PeerReply::Err(Sentinel::timeout()),
                }
            }
        }
    }
}

/// Crypto provider with a fixed aggregated nonce and a scripted verification outcome.
pub struct MockCrypto {
    pub nonce: PublicNonce,
    pub verifies: bool,
    pub fails_aggregation: bool,
    pub nonce_calls: AtomicUsize,
    pub aggregate_calls: AtomicUsize,
}

impl MockCrypto {
    pub fn new(verifies: bool) -> Self {
        Self {
            nonce: PublicNonce(GOOD_NONCE.to_vec()),
            verifies,
            fails_aggregation: false,
            nonce_calls: AtomicUsize::new(0),
            aggregate_calls: AtomicUsize::new(0),
        }
    }

    /// Provider that refuses every share set it is handed.
    pub fn rejecting_shares() -> Self {
        Self { fails_aggregation: true, ..Self::new(true) }
    }

    pub fn good_code() -> NonceCode {
        NonceCode(hex::encode(GOOD_NONCE))
    }
}

impl CryptoProvider for MockCrypto {
    fn aggregate_nonce(&self, _message: &str, _nonces_list: &Value, _group_public_key: &Value) -> Result<PublicNonce> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonce.clone())
    }

    fn nonce_to_code(&self, nonce: &PublicNonce) -> NonceCode {
        NonceCode(hex::encode(&nonce.0))
    }

    fn code_to_nonce(&self, code: &NonceCode) -> Result<PublicNonce> {
        hex::decode(code.as_str())
            .map(PublicNonce)
            .map_err(|e| AggregatorError::CryptoError(e.to_string()))
    }

    fn aggregate_signatures(
        &self,
        message: &str,
        shares: &[SignatureData],
        aggregated_nonce: &PublicNonce,
        group_public_key: &Value,
    ) -> Result<AggregateSignature> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fails_aggregation {
            return Err(AggregatorError::CryptoError("share set rejected".into()));
        }
        let signature = shares
            .iter()
            .filter_map(|s| s.fields.get("signature").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        Ok(AggregateSignature {
            message_hash: hex::decode(message).map_err(|e| AggregatorError::CryptoError(e.to_string()))?,
            group_public_key: group_public_key.clone(),
            nonce: self.nonce_to_code(aggregated_nonce),
            signature: signature.into_bytes(),
        })
    }

    fn verify_group_signature(&self, _signature: &AggregateSignature) -> bool {
        self.verifies
    }
}

pub fn sign_reply(hash: &str, nonce: &NonceCode, id: u16) -> Value {
    json!({
        "hash": hash,
        "signature_data": {
            "id": id,
            "signature": format!("s{id}"),
            "aggregated_public_nonce": nonce,
        },
        "status": "SUCCESSFUL"
    })
}

/// A real FROST signing round, computed locally, shaped as signer replies.
pub struct FrostFixture {
    pub group_public_key: Value,
    pub nonces_list: Value,
    pub message_hex: String,
    pub replies: BTreeMap<u16, Value>,
}

/// Dealer-generated 2-of-3 key; `signers` run both rounds over `message`.
pub fn frost_fixture(signers: &[u16], message: &[u8]) -> FrostFixture {
    let mut rng = rand::thread_rng();
    let (secret_shares, pubkey_package) =
        frost::keys::generate_with_dealer(3, 2, frost::keys::IdentifierList::Default, &mut rng).unwrap();
    let group_public_key = json!(hex::encode(pubkey_package.verifying_key().serialize().unwrap()));

    let mut key_packages = BTreeMap::new();
    let mut signing_nonces = BTreeMap::new();
    let mut commitments = BTreeMap::new();
    let mut nonces_list = serde_json::Map::new();
    for &id in signers {
        let identifier = frost::Identifier::try_from(id).unwrap();
        let key_package = frost::keys::KeyPackage::try_from(secret_shares[&identifier].clone()).unwrap();
        let (nonces, commitment) = frost::round1::commit(key_package.signing_share(), &mut rng);
        nonces_list.insert(id.to_string(), json!(hex::encode(commitment.serialize().unwrap())));
        key_packages.insert(id, key_package);
        signing_nonces.insert(id, nonces);
        commitments.insert(identifier, commitment);
    }
    let nonces_list = Value::Object(nonces_list);
    let message_hex = hex::encode(message);

    let provider = FrostEd25519Provider::new();
    let nonce = provider.aggregate_nonce(&message_hex, &nonces_list, &group_public_key).unwrap();
    let code = provider.nonce_to_code(&nonce);

    let signing_package = frost::SigningPackage::new(commitments.clone(), message);
    let mut replies = BTreeMap::new();
    for &id in signers {
        let identifier = frost::Identifier::try_from(id).unwrap();
        let key_package = &key_packages[&id];
        let share = frost::round2::sign(&signing_package, &signing_nonces[&id], key_package).unwrap();
        replies.insert(
            id,
            json!({
                "hash": message_hex,
                "signature_data": {
                    "id": id,
                    "signature": hex::encode(share.serialize()),
                    "public_nonce": hex::encode(commitments[&identifier].serialize().unwrap()),
                    "public_key": hex::encode(key_package.verifying_share().serialize().unwrap()),
                    "aggregated_public_nonce": code,
                },
                "status": "SUCCESSFUL"
            }),
        );
    }

    FrostFixture { group_public_key, nonces_list, message_hex, replies }
}
