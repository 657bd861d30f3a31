//! SHA2-256 (address 0x02).

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::errors::VMError;
use crate::gas;

use super::increase_precompile_consumed_gas;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = gas::precompile_linear(gas::SHA2_256_STATIC_COST, gas::SHA2_256_DYNAMIC_COST, calldata.len())?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    Ok(Bytes::copy_from_slice(&Sha256::digest(calldata)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_the_empty_string_digest() {
        let mut gas_remaining = gas::SHA2_256_STATIC_COST;
        let result = execute(&Bytes::new(), &mut gas_remaining).unwrap();
        assert_eq!(
            hex::encode(result),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
