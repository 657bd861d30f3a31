//! Account state and log records.

use ethereum_types::{H256, U256};

use crate::constants::EMPTY_CODE_HASH;

pub type Address = ethereum_types::Address;

/// The world-state record for one address: balance, nonce and a pointer to
/// its code (by hash, so identical code is stored once).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountState {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl AccountState {
    pub fn new(balance: U256, nonce: u64, code_hash: H256) -> Self {
        Self {
            balance,
            nonce,
            code_hash,
        }
    }

    /// An account with no balance, no nonce and no code is "empty" per
    /// EIP-161: touching but not modifying it causes it to be pruned.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code_hash == EMPTY_CODE_HASH
    }

    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}

/// A LOG0-LOG4 record emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: bytes::Bytes,
}
