//! BLAKE2F (address 0x09), [EIP-152]: exposes the BLAKE2b compression
//! function `F` directly so rollup bridges and other protocols using
//! BLAKE2b can verify proofs cheaply on-chain.

use bytes::Bytes;
use blake2::eip152::compress;

use crate::errors::{InternalError, PrecompileError, VMError};
use crate::gas;

use super::increase_precompile_consumed_gas;

const INPUT_LEN: usize = 213;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    if calldata.len() != INPUT_LEN {
        return Err(PrecompileError::ParsingInputError.into());
    }

    let rounds_bytes: [u8; 4] = calldata
        .get(0..4)
        .ok_or(InternalError::Slicing)?
        .try_into()
        .map_err(|_| InternalError::Slicing)?;
    let rounds = u32::from_be_bytes(rounds_bytes);

    increase_precompile_consumed_gas(gas::blake2f(rounds), gas_remaining)?;

    let mut h = [0u64; 8];
    for (i, chunk) in calldata.get(4..68).ok_or(InternalError::Slicing)?.chunks(8).enumerate() {
        let bytes: [u8; 8] = chunk.try_into().map_err(|_| InternalError::Slicing)?;
        if let Some(slot) = h.get_mut(i) {
            *slot = u64::from_le_bytes(bytes);
        }
    }

    let mut m = [0u64; 16];
    for (i, chunk) in calldata.get(68..196).ok_or(InternalError::Slicing)?.chunks(8).enumerate() {
        let bytes: [u8; 8] = chunk.try_into().map_err(|_| InternalError::Slicing)?;
        if let Some(slot) = m.get_mut(i) {
            *slot = u64::from_le_bytes(bytes);
        }
    }

    let t0: [u8; 8] = calldata
        .get(196..204)
        .ok_or(InternalError::Slicing)?
        .try_into()
        .map_err(|_| InternalError::Slicing)?;
    let t1: [u8; 8] = calldata
        .get(204..212)
        .ok_or(InternalError::Slicing)?
        .try_into()
        .map_err(|_| InternalError::Slicing)?;
    let t = [u64::from_le_bytes(t0), u64::from_le_bytes(t1)];

    let f = match *calldata.get(212).ok_or(InternalError::Slicing)? {
        0 => false,
        1 => true,
        _ => return Err(PrecompileError::ParsingInputError.into()),
    };

    let rounds = usize::try_from(rounds).map_err(|_| InternalError::TypeConversion)?;
    compress(rounds, &mut h, m, t, f);

    let mut out = Vec::with_capacity(64);
    for word in h {
        out.extend_from_slice(&word.to_le_bytes());
    }
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_length_input_is_rejected() {
        let mut gas_remaining = u64::MAX;
        assert!(execute(&Bytes::from_static(&[0u8; 10]), &mut gas_remaining).is_err());
    }

    #[test]
    fn bad_final_block_flag_is_rejected() {
        let mut input = [0u8; INPUT_LEN];
        input[212] = 2;
        let mut gas_remaining = u64::MAX;
        assert!(execute(&Bytes::copy_from_slice(&input), &mut gas_remaining).is_err());
    }

    #[test]
    fn zero_rounds_is_free_and_returns_the_untouched_state() {
        let input = [0u8; INPUT_LEN];
        let mut gas_remaining = 0u64;
        let result = execute(&Bytes::copy_from_slice(&input), &mut gas_remaining).unwrap();
        assert_eq!(result.len(), 64);
    }
}
