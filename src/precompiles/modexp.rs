//! ModExp (address 0x05), [EIP-198]/[EIP-2565]: arbitrary-precision modular
//! exponentiation. Operand lengths are unbounded 256-bit values in the
//! calldata header, so the arithmetic itself runs on `malachite::Natural`
//! rather than `U256`.

use bytes::Bytes;
use ethereum_types::U256;
use malachite::Natural;

use crate::errors::{InternalError, VMError};
use crate::gas;
use crate::utils::u256_to_usize;

use super::increase_precompile_consumed_gas;

const HEADER_LEN: usize = 96;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let base_len = read_len(calldata, 0)?;
    let exponent_len = read_len(calldata, 32)?;
    let modulus_len = read_len(calldata, 64)?;

    let exponent_head = read_exponent_head(calldata, base_len, exponent_len);
    let cost = gas::modexp(base_len, exponent_len, modulus_len, exponent_head)?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    if modulus_len == 0 {
        return Ok(Bytes::new());
    }

    let base_start = HEADER_LEN;
    let exponent_start = base_start.checked_add(base_len).ok_or(InternalError::Overflow)?;
    let modulus_start = exponent_start.checked_add(exponent_len).ok_or(InternalError::Overflow)?;

    let base = bytes_to_natural(&read_padded(calldata, base_start, base_len));
    let exponent = bytes_to_natural(&read_padded(calldata, exponent_start, exponent_len));
    let modulus = bytes_to_natural(&read_padded(calldata, modulus_start, modulus_len));

    let zero = Natural::from(0u32);
    if modulus == zero {
        return Ok(Bytes::from(vec![0u8; modulus_len]));
    }

    let result = mod_pow(base, exponent, &modulus);
    Ok(Bytes::from(natural_to_bytes(&result, modulus_len)))
}

fn read_len(calldata: &[u8], offset: usize) -> Result<usize, VMError> {
    let word = read_padded(calldata, offset, 32);
    u256_to_usize(U256::from_big_endian(&word))
}

/// Reads `len` bytes starting at `offset`, zero-extending past the end of
/// `calldata` (EIP-198 treats missing bytes as implicitly zero).
fn read_padded(calldata: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset >= calldata.len() {
        return out;
    }
    let available = calldata.len().saturating_sub(offset);
    let copy_len = available.min(len);
    if let (Some(src), Some(dst)) = (
        calldata.get(offset..offset.saturating_add(copy_len)),
        out.get_mut(..copy_len),
    ) {
        dst.copy_from_slice(src);
    }
    out
}

/// The leading 32 bytes of the exponent, used by the gas formula when the
/// exponent is wider than a single word.
fn read_exponent_head(calldata: &[u8], base_len: usize, exponent_len: usize) -> U256 {
    let head_len = exponent_len.min(32);
    let bytes = read_padded(calldata, HEADER_LEN.saturating_add(base_len), head_len);
    let mut padded = [0u8; 32];
    let pad_from = 32usize.saturating_sub(head_len);
    if let Some(dst) = padded.get_mut(pad_from..) {
        dst.copy_from_slice(&bytes);
    }
    U256::from_big_endian(&padded)
}

fn bytes_to_natural(bytes: &[u8]) -> Natural {
    bytes
        .iter()
        .fold(Natural::from(0u32), |acc, &b| (acc << 8u64) + Natural::from(u32::from(b)))
}

fn natural_to_bytes(value: &Natural, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let mut remaining = value.clone();
    let byte_base = Natural::from(256u32);
    for i in (0..len).rev() {
        let digit = &remaining % &byte_base;
        remaining /= &byte_base;
        let digit_u64 = u64::try_from(&digit).unwrap_or(0);
        let digit_u8 = u8::try_from(digit_u64).unwrap_or(0);
        if let Some(slot) = out.get_mut(i) {
            *slot = digit_u8;
        }
    }
    out
}

/// Square-and-multiply modular exponentiation over arbitrary-precision
/// naturals; the EVM places no bound on operand width beyond gas.
fn mod_pow(base: Natural, exponent: Natural, modulus: &Natural) -> Natural {
    let zero = Natural::from(0u32);
    let one = Natural::from(1u32);
    if modulus == &one {
        return zero;
    }

    let mut result = one.clone();
    let mut base = base % modulus;
    let mut exponent = exponent;
    let two = Natural::from(2u32);

    while exponent > zero {
        if &exponent % &two == one {
            result = (result * &base) % modulus;
        }
        exponent /= &two;
        base = (&base * &base) % modulus;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len_word(len: usize) -> [u8; 32] {
        let mut out = [0u8; 32];
        U256::from(len).to_big_endian(&mut out);
        out
    }

    fn build_input(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Bytes {
        let mut out = Vec::new();
        out.extend_from_slice(&len_word(base.len()));
        out.extend_from_slice(&len_word(exponent.len()));
        out.extend_from_slice(&len_word(modulus.len()));
        out.extend_from_slice(base);
        out.extend_from_slice(exponent);
        out.extend_from_slice(modulus);
        Bytes::from(out)
    }

    #[test]
    fn three_pow_two_mod_five_is_four() {
        let input = build_input(&[3], &[2], &[5]);
        let mut gas_remaining = u64::MAX;
        let result = execute(&input, &mut gas_remaining).unwrap();
        assert_eq!(result.as_ref(), &[4]);
    }

    #[test]
    fn zero_length_modulus_returns_empty() {
        let input = build_input(&[3], &[2], &[]);
        let mut gas_remaining = u64::MAX;
        let result = execute(&input, &mut gas_remaining).unwrap();
        assert!(result.is_empty());
    }
}
