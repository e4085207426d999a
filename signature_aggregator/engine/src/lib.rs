//! Signature Aggregator Core Library
//!
//! Coordinates a two-phase threshold-signing ceremony across signer nodes: nonce
//! collection, then signature collection, tamper detection and aggregation.

pub mod aggregator;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod logging;
pub mod transport;
pub mod types;

pub use aggregator::{
    AggregationResult, DEFAULT_NUMBER_OF_NONCES, FailureReason, NonceCeremonyResult, SignatureAggregator,
};
pub use config::AggregatorConfig;
pub use crypto::{AggregateSignature, CryptoProvider, FrostEd25519Provider};
pub use directory::{NodeDirectory, StaticNodeDirectory};
pub use error::{AggregatorError, Result};
pub use transport::{HttpTransport, PeerReply, Sentinel, SentinelStatus, Transport};
pub use types::{DkgKey, NodeId, NodeIdentity, Party};

#[cfg(test)]
mod tests;
