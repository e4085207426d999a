//! Centralized signature aggregator error types.
//!
//! Peer failures never show up here: they are folded into sentinel values by the
//! transport and into `FAILED` results by the coordinator. These variants cover the
//! caller's inputs and the local environment.

use thiserror::Error;

use crate::types::NodeId;

#[derive(Error, Debug)]
pub enum AggregatorError {
    /// The node directory has no entry for this id.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    /// The node directory could not be built or loaded.
    #[error("Directory error: {0}")]
    DirectoryError(String),
    /// The HTTP client backing the transport could not be constructed.
    #[error("Transport error: {0}")]
    TransportError(String),
    /// No signer answered with a message hash, so there is no canonical digest.
    #[error("No signer returned a message hash for request {request_id}")]
    MissingMessageHash { request_id: String },
    /// Malformed cryptographic input (keys, commitments, shares, nonce codes).
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
