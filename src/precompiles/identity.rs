//! Identity (address 0x04): returns its input unchanged.

use bytes::Bytes;

use crate::errors::VMError;
use crate::gas;

use super::increase_precompile_consumed_gas;

pub fn execute(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = gas::precompile_linear(gas::IDENTITY_STATIC_COST, gas::IDENTITY_DYNAMIC_COST, calldata.len())?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    Ok(calldata.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_input_verbatim() {
        let input = Bytes::from_static(b"hello");
        let mut gas_remaining = gas::IDENTITY_STATIC_COST + gas::IDENTITY_DYNAMIC_COST;
        let result = execute(&input, &mut gas_remaining).unwrap();
        assert_eq!(result, input);
    }
}
