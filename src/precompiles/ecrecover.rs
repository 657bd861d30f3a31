//! ECRECOVER (address 0x01): recovers the signing address from a secp256k1
//! signature and message hash. Malformed input or a bad signature is not an
//! EVM-level failure — the precompile simply returns no data.

use bytes::Bytes;
use ethereum_types::U256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::errors::VMError;
use crate::gas;

use super::increase_precompile_consumed_gas;

const INPUT_LEN: usize = 128;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(gas::ECRECOVER_COST, gas_remaining)?;

    let mut input = [0u8; INPUT_LEN];
    let copy_len = calldata.len().min(INPUT_LEN);
    if let (Some(src), Some(dst)) = (calldata.get(..copy_len), input.get_mut(..copy_len)) {
        dst.copy_from_slice(src);
    }

    Ok(recover(&input).unwrap_or_default())
}

fn recover(input: &[u8; INPUT_LEN]) -> Option<Bytes> {
    let hash = input.get(0..32)?;
    let v = U256::from_big_endian(input.get(32..64)?);
    let r = input.get(64..96)?;
    let s = input.get(96..128)?;

    let recovery_byte = if v == U256::from(27) {
        0
    } else if v == U256::from(28) {
        1
    } else {
        return None;
    };
    let recovery_id = RecoveryId::from_byte(recovery_byte)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes.get_mut(..32)?.copy_from_slice(r);
    sig_bytes.get_mut(32..)?.copy_from_slice(s);
    let signature = Signature::from_slice(&sig_bytes).ok()?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).ok()?;
    let encoded = verifying_key.to_encoded_point(false);
    let uncompressed = encoded.as_bytes();
    let digest = Keccak256::digest(uncompressed.get(1..)?);

    let mut out = [0u8; 32];
    out.get_mut(12..)?.copy_from_slice(digest.get(12..)?);
    Some(Bytes::copy_from_slice(&out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_returns_empty_not_an_error() {
        let mut gas_remaining = gas::ECRECOVER_COST;
        let result = execute(&Bytes::new(), &mut gas_remaining).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn out_of_gas_is_an_error() {
        let mut gas_remaining = gas::ECRECOVER_COST.saturating_sub(1);
        assert!(execute(&Bytes::new(), &mut gas_remaining).is_err());
    }

    #[test]
    fn bad_recovery_id_returns_empty() {
        let mut input = [0u8; INPUT_LEN];
        input[63] = 29; // invalid v
        let mut gas_remaining = gas::ECRECOVER_COST;
        let result = execute(&Bytes::copy_from_slice(&input), &mut gas_remaining).unwrap();
        assert!(result.is_empty());
    }
}
