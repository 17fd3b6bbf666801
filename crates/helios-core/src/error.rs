//! Error types for the Helios oracle.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")] Empty,
    #[error("address too long: {0} hex digits")] TooLong(usize),
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

/// Failures talking to the ledger node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport: {0}")] Transport(String),
    #[error("http status {status}: {body}")] Status { status: u16, body: String },
    #[error("decode: {0}")] Decode(String),
    #[error("timeout")] Timeout,
    #[error("transaction {tx_ref} failed: {vm_status}")] Rejected { tx_ref: String, vm_status: String },
}

/// Failures talking to the event indexer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("transport: {0}")] Transport(String),
    #[error("http status {status}")] Status { status: u16 },
    #[error("decode: {0}")] Decode(String),
    #[error("timeout")] Timeout,
}

/// A single data source could not produce its fragment.
///
/// Always recovered inside the aggregator by substituting the source's fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("source unavailable: {0}")] Unavailable(String),
    #[error("source timed out after {0} ms")] Timeout(u64),
    #[error("malformed response: {0}")] Malformed(String),
    #[error("not found: {0}")] NotFound(String),
}

impl From<ChainError> for SourceError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Decode(msg) => SourceError::Malformed(msg),
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

impl From<IndexError> for SourceError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Decode(msg) => SourceError::Malformed(msg),
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

/// A snapshot fragment had a shape the scoring engine cannot use.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("malformed {field}: {reason}")] MalformedFragment { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("invalid private key: {0}")] InvalidKey(String),
}

/// Live-mode publication failed while building, submitting or confirming.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("invalid vault owner: {0}")] InvalidOwner(#[from] AddressError),
    #[error("encode: {0}")] Encode(String),
    #[error("account lookup: {0}")] Account(ChainError),
    #[error("submit: {0}")] Submit(ChainError),
    #[error("confirm: {0}")] Confirm(ChainError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("backend: {0}")] Backend(String),
    #[error("corrupt record for vault {vault_id}: {reason}")] Corrupt { vault_id: u64, reason: String },
}

#[derive(Error, Debug)]
pub enum HeliosError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Chain(#[from] ChainError),
    #[error(transparent)] Index(#[from] IndexError),
    #[error(transparent)] Source(#[from] SourceError),
    #[error(transparent)] Scoring(#[from] ScoringError),
    #[error(transparent)] Signer(#[from] SignerError),
    #[error(transparent)] Publish(#[from] PublishError),
    #[error(transparent)] Storage(#[from] StorageError),
    #[error("config: {0}")] Config(String),
}
