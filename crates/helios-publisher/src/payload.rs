//! `risk_oracle` entry-function payloads.
//!
//! Three entry functions are called:
//! - `update_health_score(owner: address, score: u64)`
//! - `update_health_score_with_factors(owner, score, diversity, ltv, reputation, market)`
//! - `init(vault_id: u64, initial_score: u64, updater: address)`
//!
//! Transactions are encoded with bincode's standard config. The bytes that
//! get signed are the BLAKE3 hash of [`SIGNING_DOMAIN`] followed by the
//! encoded transaction, so a signature can never be replayed as some other
//! message type.

use bincode::{Decode, Encode};

use helios_core::address::AccountAddress;
use helios_core::constants::{FN_INIT, FN_UPDATE_SCORE, FN_UPDATE_SCORE_WITH_FACTORS, ORACLE_MODULE};
use helios_core::error::PublishError;
use helios_core::types::{RiskFactors, VaultId};

pub const SIGNING_DOMAIN: &[u8] = b"HELIOS::RawTransaction";

/// A single entry-function argument.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum MoveArg {
    Address(AccountAddress),
    U64(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EntryFunction {
    pub module_address: AccountAddress,
    pub module_name: String,
    pub function: String,
    pub args: Vec<MoveArg>,
}

impl EntryFunction {
    fn oracle(module_address: AccountAddress, function: &str, args: Vec<MoveArg>) -> Self {
        Self {
            module_address,
            module_name: ORACLE_MODULE.to_string(),
            function: function.to_string(),
            args,
        }
    }

    /// `address::module::function`
    pub fn qualified_name(&self) -> String {
        format!("{}::{}::{}", self.module_address, self.module_name, self.function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: EntryFunction,
    pub expiration_timestamp_secs: u64,
}

impl RawTransaction {
    pub fn encode(&self) -> Result<Vec<u8>, PublishError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PublishError::Encode(e.to_string()))
    }
}

/// Bytes passed to the signer for an encoded transaction.
pub fn signing_message(raw_txn: &[u8]) -> Vec<u8> {
    let prefix = blake3::hash(SIGNING_DOMAIN);
    let mut message = Vec::with_capacity(32 + raw_txn.len());
    message.extend_from_slice(prefix.as_bytes());
    message.extend_from_slice(raw_txn);
    message
}

pub fn update_health_score(module: AccountAddress, owner: AccountAddress, score: u8) -> EntryFunction {
    EntryFunction::oracle(
        module,
        FN_UPDATE_SCORE,
        vec![MoveArg::Address(owner), MoveArg::U64(u64::from(score))],
    )
}

pub fn update_health_score_with_factors(
    module: AccountAddress,
    owner: AccountAddress,
    score: u8,
    factors: &RiskFactors,
) -> EntryFunction {
    let mut args = vec![MoveArg::Address(owner), MoveArg::U64(u64::from(score))];
    args.extend(factors.as_array().iter().map(|f| MoveArg::U64(u64::from(*f))));
    EntryFunction::oracle(module, FN_UPDATE_SCORE_WITH_FACTORS, args)
}

/// `init` registers `updater` as the only account allowed to post scores
/// for `vault_id`.
pub fn init(
    module: AccountAddress,
    vault_id: VaultId,
    initial_score: u8,
    updater: AccountAddress,
) -> EntryFunction {
    EntryFunction::oracle(
        module,
        FN_INIT,
        vec![
            MoveArg::U64(vault_id),
            MoveArg::U64(u64::from(initial_score)),
            MoveArg::Address(updater),
        ],
    )
}
