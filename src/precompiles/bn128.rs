//! The alt_bn128 (bn254) precompiles: ECADD (0x06), ECMUL (0x07) from
//! [EIP-196], and ECPAIRING (0x08) from [EIP-197].

use bytes::Bytes;

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInt, Field, PrimeField, Zero};

use crate::errors::{InternalError, PrecompileError, VMError};
use crate::gas;

use super::increase_precompile_consumed_gas;

fn limbs_from_be(bytes: &[u8]) -> [u64; 4] {
    let mut limbs = [0u64; 4];
    for (i, chunk) in bytes.chunks(8).enumerate() {
        let Some(idx) = 3usize.checked_sub(i) else {
            continue;
        };
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        if let Some(slot) = limbs.get_mut(idx) {
            *slot = u64::from_be_bytes(buf);
        }
    }
    limbs
}

fn fq_from_be_bytes(bytes: &[u8]) -> Option<Fq> {
    Fq::from_bigint(BigInt::new(limbs_from_be(bytes)))
}

fn fq_to_be_bytes(value: Fq) -> [u8; 32] {
    let repr = value.into_bigint();
    let mut out = [0u8; 32];
    for (i, limb) in repr.0.iter().enumerate() {
        let Some(idx) = 3usize.checked_sub(i) else {
            continue;
        };
        let start = idx.saturating_mul(8);
        if let Some(slot) = out.get_mut(start..start.saturating_add(8)) {
            slot.copy_from_slice(&limb.to_be_bytes());
        }
    }
    out
}

fn read_g1(bytes: &[u8]) -> Result<G1Affine, VMError> {
    let x = fq_from_be_bytes(bytes.get(0..32).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;
    let y = fq_from_be_bytes(bytes.get(32..64).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;

    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }

    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::InvalidEcPoint.into());
    }
    Ok(point)
}

/// G2 coordinates are encoded imaginary-part-first: `x_c1, x_c0, y_c1, y_c0`.
fn read_g2(bytes: &[u8]) -> Result<G2Affine, VMError> {
    let x_c1 = fq_from_be_bytes(bytes.get(0..32).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;
    let x_c0 = fq_from_be_bytes(bytes.get(32..64).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;
    let y_c1 = fq_from_be_bytes(bytes.get(64..96).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;
    let y_c0 = fq_from_be_bytes(bytes.get(96..128).ok_or(InternalError::Slicing)?).ok_or(PrecompileError::InvalidEcPoint)?;

    let x = Fq2::new(x_c0, x_c1);
    let y = Fq2::new(y_c0, y_c1);

    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }

    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::InvalidEcPoint.into());
    }
    Ok(point)
}

fn padded(calldata: &Bytes, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let copy_len = calldata.len().min(len);
    if let (Some(src), Some(dst)) = (calldata.get(..copy_len), out.get_mut(..copy_len)) {
        dst.copy_from_slice(src);
    }
    out
}

fn g1_to_bytes(point: G1Affine) -> Bytes {
    let (x, y) = point.xy().unwrap_or((Fq::zero(), Fq::zero()));
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&fq_to_be_bytes(x));
    out.extend_from_slice(&fq_to_be_bytes(y));
    Bytes::from(out)
}

pub fn ecadd(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(gas::ECADD_COST, gas_remaining)?;

    let input = padded(calldata, 128);
    let p1 = read_g1(input.get(0..64).ok_or(InternalError::Slicing)?)?;
    let p2 = read_g1(input.get(64..128).ok_or(InternalError::Slicing)?)?;

    let sum = (p1.into_group() + p2.into_group()).into_affine();
    Ok(g1_to_bytes(sum))
}

pub fn ecmul(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(gas::ECMUL_COST, gas_remaining)?;

    let input = padded(calldata, 96);
    let p = read_g1(input.get(0..64).ok_or(InternalError::Slicing)?)?;
    let scalar = BigInt::new(limbs_from_be(input.get(64..96).ok_or(InternalError::Slicing)?));

    let product = p.into_group().mul_bigint(scalar).into_affine();
    Ok(g1_to_bytes(product))
}

const GROUP_SIZE: usize = 192;

pub fn ecpairing(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    if !calldata.len().is_multiple_of(GROUP_SIZE) {
        return Err(PrecompileError::ParsingInputError.into());
    }
    let groups = calldata.len() / GROUP_SIZE;

    let cost = gas::ecpairing(groups)?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    let mut g1_points = Vec::with_capacity(groups);
    let mut g2_points = Vec::with_capacity(groups);
    for i in 0..groups {
        let start = i.saturating_mul(GROUP_SIZE);
        let group = calldata
            .get(start..start.saturating_add(GROUP_SIZE))
            .ok_or(InternalError::Slicing)?;
        g1_points.push(read_g1(group.get(0..64).ok_or(InternalError::Slicing)?)?);
        g2_points.push(read_g2(group.get(64..192).ok_or(InternalError::Slicing)?)?);
    }

    let result = Bn254::multi_pairing(g1_points, g2_points);
    let success = result.0.is_one();

    let mut out = vec![0u8; 32];
    if success {
        if let Some(slot) = out.get_mut(31) {
            *slot = 1;
        }
    }
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecadd_with_two_infinities_is_infinity() {
        let mut gas_remaining = gas::ECADD_COST;
        let result = ecadd(&Bytes::new(), &mut gas_remaining).unwrap();
        assert_eq!(result.as_ref(), [0u8; 64].as_slice());
    }

    #[test]
    fn ecpairing_empty_input_is_trivially_true() {
        let mut gas_remaining = gas::ECPAIRING_BASE_COST;
        let result = ecpairing(&Bytes::new(), &mut gas_remaining).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(result.as_ref(), expected.as_slice());
    }

    #[test]
    fn ecpairing_input_not_a_multiple_of_group_size_is_rejected() {
        let mut gas_remaining = u64::MAX;
        assert!(ecpairing(&Bytes::from_static(&[0u8; 10]), &mut gas_remaining).is_err());
    }
}
