//! RIPEMD-160 (address 0x03). The 20-byte digest is right-aligned in a
//! zero-padded 32-byte word, same as every other hash/address result.

use bytes::Bytes;
use ripemd::Ripemd160;
use ripemd::Digest;

use crate::errors::{InternalError, VMError};
use crate::gas;

use super::increase_precompile_consumed_gas;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = gas::precompile_linear(gas::RIPEMD_160_STATIC_COST, gas::RIPEMD_160_DYNAMIC_COST, calldata.len())?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    let digest = Ripemd160::digest(calldata);
    let mut out = [0u8; 32];
    out.get_mut(12..)
        .ok_or(InternalError::Slicing)?
        .copy_from_slice(&digest);

    Ok(Bytes::copy_from_slice(&out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_left_padded_to_32_bytes() {
        let mut gas_remaining = gas::RIPEMD_160_STATIC_COST;
        let result = execute(&Bytes::new(), &mut gas_remaining).unwrap();
        assert_eq!(result.len(), 32);
        assert!(result.iter().take(12).all(|&b| b == 0));
    }
}
