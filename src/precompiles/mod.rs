//! Dispatcher for the fixed-address precompiled contracts (Yellow Paper
//! Appendix E). Each precompile lives in its own submodule and exposes an
//! `execute(calldata, gas_remaining) -> Result<Bytes, VMError>` function that
//! charges its own gas before doing any work, mirroring how opcode handlers
//! charge gas before mutating state.

use bytes::Bytes;

use crate::account::Address;
use crate::errors::{PrecompileError, VMError};
use crate::fork::Fork;

pub mod blake2f;
pub mod bn128;
pub mod ecrecover;
pub mod identity;
pub mod kzg;
pub mod modexp;
pub mod ripemd160;
pub mod sha256;

fn address_at(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// How many of the ten mainnet precompile addresses are live under a given
/// fork. Addresses 1-4 have existed since Frontier; 5-8 (ModExp, the bn128
/// trio) were added at Byzantium; 9 (Blake2F) at Istanbul; 10 (point
/// evaluation) at Cancun.
const fn active_count(fork: Fork) -> u64 {
    if fork.is_cancun() {
        10
    } else if fork.is_istanbul() {
        9
    } else if fork.is_byzantium() {
        8
    } else {
        4
    }
}

/// The addresses warm from the start of a transaction under the active
/// fork, per [EIP-2929].
pub fn active_addresses(fork: Fork) -> impl Iterator<Item = Address> {
    (1..=active_count(fork)).map(address_at)
}

pub fn is_precompile(address: Address, fork: Fork) -> bool {
    active_addresses(fork).any(|a| a == address)
}

/// Dispatches to the precompile at `address`. Callers must check
/// [`is_precompile`] first; an address outside the active set is a logic
/// error in the caller, not an EVM-level failure.
pub fn execute(
    address: Address,
    calldata: &Bytes,
    gas_remaining: &mut u64,
    fork: Fork,
) -> Result<Bytes, VMError> {
    match address.to_low_u64_be() {
        1 => ecrecover::execute(calldata, gas_remaining),
        2 => sha256::execute(calldata, gas_remaining),
        3 => ripemd160::execute(calldata, gas_remaining),
        4 => identity::execute(calldata, gas_remaining),
        5 => modexp::execute(calldata, gas_remaining),
        6 => bn128::ecadd(calldata, gas_remaining),
        7 => bn128::ecmul(calldata, gas_remaining),
        8 => bn128::ecpairing(calldata, gas_remaining),
        9 => blake2f::execute(calldata, gas_remaining),
        10 => kzg::execute(calldata, gas_remaining),
        _ => unreachable!("execute called on a non-precompile address"),
    }
}

/// Charges a precompile's own gas cost, distinct from [`crate::call_frame::CallFrame::increase_consumed_gas`]
/// since precompiles run outside a call frame's bytecode and bill directly
/// against the gas handed to the subcall.
pub fn increase_precompile_consumed_gas(cost: u64, gas_remaining: &mut u64) -> Result<(), VMError> {
    *gas_remaining = gas_remaining
        .checked_sub(cost)
        .ok_or(PrecompileError::NotEnoughGas)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_has_four_precompiles() {
        assert_eq!(active_addresses(Fork::Frontier).count(), 4);
        assert!(is_precompile(address_at(1), Fork::Frontier));
        assert!(!is_precompile(address_at(5), Fork::Frontier));
    }

    #[test]
    fn cancun_has_all_ten_precompiles() {
        assert_eq!(active_addresses(Fork::Cancun).count(), 10);
        assert!(is_precompile(address_at(10), Fork::Cancun));
    }

    #[test]
    fn istanbul_adds_blake2f_but_not_point_evaluation() {
        assert!(is_precompile(address_at(9), Fork::Istanbul));
        assert!(!is_precompile(address_at(10), Fork::Istanbul));
    }
}
