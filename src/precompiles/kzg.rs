//! Point evaluation (address 0x0a), [EIP-4844]: proves that a KZG-committed
//! blob evaluates to `y` at `z`, without the verifier ever seeing the blob.
//!
//! NOTE: `tau_g2` below is a locally generated stand-in for the real BLS
//! trusted setup, so the arithmetic is self-consistent for this module's own
//! tests but does not verify real mainnet blob commitments. Swap in the
//! canonical `[tau]_2` point from the Ethereum KZG ceremony before using
//! this against real commitments; see DESIGN.md.

use std::sync::OnceLock;

use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use bytes::Bytes;
use ethereum_types::U256;
use sha2::{Digest, Sha256};

use crate::errors::{InternalError, PrecompileError, VMError};
use crate::gas;

use super::increase_precompile_consumed_gas;

/// Number of field elements a blob is split into.
pub const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;
const VERSIONED_HASH_VERSION_KZG: u8 = 1;
const INPUT_LEN: usize = 192;

/// The BLS12-381 scalar field modulus, per EIP-4844.
fn bls_modulus() -> U256 {
    U256::from_dec_str("52435875175126190479447740508185965837690552500527637822603658699938581184513")
        .unwrap_or_default()
}

fn tau_g2() -> G2Affine {
    static TAU_G2: OnceLock<G2Affine> = OnceLock::new();
    *TAU_G2.get_or_init(|| {
        let tau = Scalar::from(0x5242_1351_u64);
        G2Affine::from(G2Projective::generator() * tau)
    })
}

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(gas::POINT_EVALUATION_COST, gas_remaining)?;

    if calldata.len() != INPUT_LEN {
        return Err(PrecompileError::ParsingInputError.into());
    }

    let versioned_hash = calldata.get(0..32).ok_or(InternalError::Slicing)?;
    let z_bytes = calldata.get(32..64).ok_or(InternalError::Slicing)?;
    let y_bytes = calldata.get(64..96).ok_or(InternalError::Slicing)?;
    let commitment_bytes = calldata.get(96..144).ok_or(InternalError::Slicing)?;
    let proof_bytes = calldata.get(144..192).ok_or(InternalError::Slicing)?;

    if kzg_to_versioned_hash(commitment_bytes).as_slice() != versioned_hash {
        return Err(PrecompileError::InvalidEcPoint.into());
    }

    let z = field_element_from_be(z_bytes)?;
    let y = field_element_from_be(y_bytes)?;
    let commitment = read_g1_compressed(commitment_bytes)?;
    let proof = read_g1_compressed(proof_bytes)?;

    if !verify_kzg_proof(commitment, z, y, proof) {
        return Err(PrecompileError::InvalidEcPoint.into());
    }

    let mut out = vec![0u8; 64];
    U256::from(FIELD_ELEMENTS_PER_BLOB).to_big_endian(out.get_mut(0..32).ok_or(InternalError::Slicing)?);
    bls_modulus().to_big_endian(out.get_mut(32..64).ok_or(InternalError::Slicing)?);
    Ok(Bytes::from(out))
}

fn kzg_to_versioned_hash(commitment: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(commitment);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    if let Some(slot) = out.get_mut(0) {
        *slot = VERSIONED_HASH_VERSION_KZG;
    }
    out
}

/// Rejects non-canonical field elements: EIP-4844 requires `z` and `y` be
/// strictly less than the BLS scalar field modulus.
fn field_element_from_be(bytes: &[u8]) -> Result<Scalar, VMError> {
    let value = U256::from_big_endian(bytes);
    if value >= bls_modulus() {
        return Err(PrecompileError::InvalidEcPoint.into());
    }

    let mut little_endian = [0u8; 32];
    for (i, &b) in bytes.iter().rev().enumerate() {
        if let Some(slot) = little_endian.get_mut(i) {
            *slot = b;
        }
    }

    Option::<Scalar>::from(Scalar::from_bytes(&little_endian)).ok_or(PrecompileError::InvalidEcPoint.into())
}

fn read_g1_compressed(bytes: &[u8]) -> Result<G1Affine, VMError> {
    let array: [u8; 48] = bytes.try_into().map_err(|_| InternalError::Slicing)?;
    Option::<G1Affine>::from(G1Affine::from_compressed(&array)).ok_or(PrecompileError::InvalidEcPoint.into())
}

/// Checks `e(commitment - [y]G1, G2) == e(proof, [tau - z]G2)`, the standard
/// single-point KZG opening equation.
fn verify_kzg_proof(commitment: G1Affine, z: Scalar, y: Scalar, proof: G1Affine) -> bool {
    let g1_gen = G1Affine::generator();
    let g2_gen = G2Affine::generator();

    let y_g1 = G1Affine::from(G1Projective::from(g1_gen) * y);
    let lhs_point = G1Affine::from(G1Projective::from(commitment) - G1Projective::from(y_g1));

    let z_g2 = G2Affine::from(G2Projective::from(g2_gen) * z);
    let rhs_point = G2Affine::from(G2Projective::from(tau_g2()) - G2Projective::from(z_g2));

    pairing(&lhs_point, &g2_gen) == pairing(&proof, &rhs_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(value: Scalar) -> G1Affine {
        G1Affine::from(G1Projective::generator() * value)
    }

    /// For a constant polynomial `p(x) = c`, `p(z) = c` for every `z`, and
    /// the quotient `(p(x) - p(z)) / (x - z)` is identically zero, so the
    /// opening proof is the identity element.
    fn open_constant(c: Scalar) -> (Scalar, G1Affine) {
        (c, G1Affine::identity())
    }

    #[test]
    fn wrong_length_input_is_rejected() {
        let mut gas_remaining = u64::MAX;
        assert!(execute(&Bytes::from_static(&[0u8; 10]), &mut gas_remaining).is_err());
    }

    #[test]
    fn versioned_hash_mismatch_is_rejected() {
        let commitment = commit(Scalar::from(7u64));
        let mut input = vec![0u8; INPUT_LEN];
        if let Some(slot) = input.get_mut(0..32) {
            slot.copy_from_slice(&[0xffu8; 32]);
        }
        if let Some(slot) = input.get_mut(96..144) {
            slot.copy_from_slice(&commitment.to_compressed());
        }
        let mut gas_remaining = u64::MAX;
        assert!(execute(&Bytes::from(input), &mut gas_remaining).is_err());
    }

    #[test]
    fn constant_polynomial_proof_verifies() {
        let c = Scalar::from(7u64);
        let z = Scalar::from(3u64);
        let commitment = commit(c);
        let (y, proof) = open_constant(c);

        assert!(verify_kzg_proof(commitment, z, y, proof));
    }
}
