//! Fixed numeric constants shared across the gas model and opcode handlers.

use ethereum_types::{H256, U256};

pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;

pub const SUCCESS: U256 = U256([1, 0, 0, 0]);
pub const FAIL: U256 = U256([0, 0, 0, 0]);
pub const WORD_SIZE: usize = 32;

pub const STACK_LIMIT: usize = 1024;

/// keccak256("")
pub const EMPTY_CODE_HASH: H256 = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

pub const TX_BASE_COST: u64 = 21000;
pub const TX_CREATE_COST: u64 = 53000;

pub const MAX_CODE_SIZE: usize = 0x6000;
pub const INIT_CODE_MAX_SIZE: usize = 49152;

/// [EIP-3541] deployed code may not start with this byte.
pub const EOF_PREFIX: u8 = 0xef;

pub const MAX_STACK_DEPTH: usize = 1024;
pub const MAX_CALL_DEPTH: usize = 1024;

/// [EIP-2935] / historical BLOCKHASH window.
pub const LAST_AVAILABLE_BLOCK_LIMIT: u64 = 256;

pub mod create_opcode {
    pub const INIT_CODE_WORD_COST: u64 = 2;
    pub const CODE_DEPOSIT_COST: u64 = 200;
    pub const CREATE_BASE_COST: u64 = 32000;
}

/// Calldata byte costs, used both for intrinsic gas and for any opcode that
/// re-derives calldata pricing.
pub const CALLDATA_COST_ZERO_BYTE: u64 = 4;
pub const CALLDATA_COST_NON_ZERO_BYTE: u64 = 16;

/// [EIP-2930] cost to prewarm one access-list address / storage key.
pub const ACCESS_LIST_ADDRESS_COST: u64 = 2400;
pub const ACCESS_LIST_STORAGE_KEY_COST: u64 = 1900;

/// [EIP-3529] final refund cap: refund <= gas_used / N.
pub const REFUND_QUOTIENT: u64 = 5;
