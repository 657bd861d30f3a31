//! Transaction- and block-level context visible to every call frame.

use ethereum_types::{H256, U256};

use crate::account::Address;
use crate::fork::{ChainType, Fork};

/// Protocol configuration for the execution: which hardfork's rules apply
/// and whether this is a mainnet or L2 dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub fork: Fork,
    pub chain_type: ChainType,
}

impl Config {
    pub fn new(fork: Fork, chain_type: ChainType) -> Self {
        Self { fork, chain_type }
    }
}

/// Block header fields an executing contract can observe (COINBASE, TIMESTAMP,
/// NUMBER, PREVRANDAO/DIFFICULTY, GASLIMIT, BASEFEE, BLOBHASH, BLOBBASEFEE,
/// CHAINID, and the historical-hash lookup used by BLOCKHASH).
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub number: U256,
    pub timestamp: U256,
    pub coinbase: Address,
    pub prevrandao: H256,
    pub gas_limit: u64,
    pub base_fee_per_gas: U256,
    pub chain_id: U256,
    pub blob_base_fee: U256,
    pub blob_versioned_hashes: Vec<H256>,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: U256::zero(),
            timestamp: U256::zero(),
            coinbase: Address::zero(),
            prevrandao: H256::zero(),
            gas_limit: 30_000_000,
            base_fee_per_gas: U256::zero(),
            chain_id: U256::one(),
            blob_base_fee: U256::zero(),
            blob_versioned_hashes: Vec::new(),
        }
    }
}

/// Transaction-level context: the fields a CALL-family opcode cannot see
/// change mid-execution (ORIGIN, GASPRICE) plus the root call's own args.
#[derive(Debug, Clone)]
pub struct Environment {
    pub origin: Address,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub block: BlockContext,
    pub config: Config,
}

impl Environment {
    pub fn new(
        origin: Address,
        gas_price: U256,
        gas_limit: u64,
        block: BlockContext,
        config: Config,
    ) -> Self {
        Self {
            origin,
            gas_price,
            gas_limit,
            block,
            config,
        }
    }

    pub fn fork(&self) -> Fork {
        self.config.fork
    }
}
