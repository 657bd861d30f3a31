use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    gas,
    vm::VM,
};
use ethereum_types::{U256, U512};

// Arithmetic Operations (11)
// Opcodes: ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND

impl<'a> VM<'a> {
    #[inline]
    pub fn op_add(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::ADD)?;

        let [augend, addend] = current_call_frame.stack.pop()?;
        let sum = augend.overflowing_add(addend).0;
        current_call_frame.stack.push(sum)?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_sub(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SUB)?;

        let [minuend, subtrahend] = current_call_frame.stack.pop()?;
        let difference = minuend.overflowing_sub(subtrahend).0;
        current_call_frame.stack.push(difference)?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_mul(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::MUL)?;

        let [multiplicand, multiplier] = current_call_frame.stack.pop()?;
        let product = multiplicand.overflowing_mul(multiplier).0;
        current_call_frame.stack.push(product)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_div(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::DIV)?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        let Some(quotient) = dividend.checked_div(divisor) else {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        };
        current_call_frame.stack.push(quotient)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SDIV)?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        if divisor.is_zero() || dividend.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let abs_dividend = abs(dividend);
        let abs_divisor = abs(divisor);

        let quotient = match abs_dividend.checked_div(abs_divisor) {
            Some(quot) => {
                let quotient_is_negative = is_negative(dividend) ^ is_negative(divisor);
                if quotient_is_negative {
                    negate(quot)
                } else {
                    quot
                }
            }
            None => U256::zero(),
        };

        current_call_frame.stack.push(quotient)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_mod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::MOD)?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        let remainder = dividend.checked_rem(divisor).unwrap_or_default();
        current_call_frame.stack.push(remainder)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_smod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SMOD)?;

        let [unchecked_dividend, unchecked_divisor] = current_call_frame.stack.pop()?;

        if unchecked_divisor.is_zero() || unchecked_dividend.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let divisor = abs(unchecked_divisor);
        let dividend = abs(unchecked_dividend);

        let Some(unchecked_remainder) = dividend.checked_rem(divisor) else {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        };

        let remainder = if is_negative(unchecked_dividend) {
            negate(unchecked_remainder)
        } else {
            unchecked_remainder
        };

        current_call_frame.stack.push(remainder)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::ADDMOD)?;

        let [augend, addend, modulus] = current_call_frame.stack.pop()?;

        if modulus.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let wide_augend: U512 = augend.into();
        let wide_addend: U512 = addend.into();
        let wide_modulus: U512 = modulus.into();

        let sum = wide_augend.checked_add(wide_addend).ok_or(InternalError::Overflow)?;
        let sum_mod = sum % wide_modulus;

        let sum_mod: U256 = sum_mod.try_into().map_err(|_| InternalError::TypeConversion)?;
        current_call_frame.stack.push(sum_mod)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::MULMOD)?;

        let [multiplicand, multiplier, modulus] = current_call_frame.stack.pop()?;

        if modulus.is_zero() || multiplicand.is_zero() || multiplier.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let product = multiplicand.full_mul(multiplier);
        let product_mod = product % modulus.into();

        let product_mod: U256 = product_mod.try_into().map_err(|_| InternalError::TypeConversion)?;
        current_call_frame.stack.push(product_mod)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_exp(&mut self) -> Result<OpcodeResult, VMError> {
        let fork = self.env.fork();
        let current_call_frame = &mut self.current_call_frame;
        let [base, exponent] = current_call_frame.stack.pop()?;

        let gas_cost = gas::exp(exponent, fork)?;
        current_call_frame.increase_consumed_gas(gas_cost)?;

        let power = base.overflowing_pow(exponent).0;
        current_call_frame.stack.push(power)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SIGNEXTEND)?;

        let [byte_size_minus_one, value_to_extend] = current_call_frame.stack.pop()?;

        if byte_size_minus_one > U256::from(31) {
            current_call_frame.stack.push(value_to_extend)?;
            return Ok(OpcodeResult::Continue);
        }

        let sign_bit_index = byte_size_minus_one
            .checked_mul(U256::from(8))
            .and_then(|b| b.checked_add(U256::from(7)))
            .ok_or(InternalError::Overflow)?;
        let sign_bit_index: usize = sign_bit_index.try_into().map_err(|_| InternalError::TypeConversion)?;

        let sign_bit = (value_to_extend >> sign_bit_index) & U256::one();
        let mask = (U256::one() << sign_bit_index) - U256::one();

        let result = if sign_bit.is_zero() {
            value_to_extend & mask
        } else {
            value_to_extend | !mask
        };

        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }
}

/// Shifts the value to the right by 255 bits and checks the most significant bit is a 1.
fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Negates a number in two's complement.
fn negate(value: U256) -> U256 {
    let (negated, _overflowed) = (!value).overflowing_add(U256::one());
    negated
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;

    #[test]
    fn add_wraps_on_overflow() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::MAX).unwrap();
        vm.current_call_frame.stack.push(U256::one()).unwrap();
        vm.op_add().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
        assert_eq!(vm.current_call_frame.gas_used, gas::ADD);
    }

    #[test]
    fn div_by_zero_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::from(10)).unwrap();
        vm.op_div().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn sdiv_negative_by_negative_is_positive() {
        let mut vm = vm_with_bytecode(Bytes::new());
        let minus_one = negate(U256::one());
        let minus_two = negate(U256::from(2));
        vm.current_call_frame.stack.push(minus_two).unwrap();
        vm.current_call_frame.stack.push(minus_one).unwrap();
        vm.op_sdiv().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(2));
    }

    #[test]
    fn mulmod_reduces_through_wide_intermediate() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(8)).unwrap();
        vm.current_call_frame.stack.push(U256::MAX).unwrap();
        vm.current_call_frame.stack.push(U256::MAX).unwrap();
        vm.op_mulmod().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        // (MAX * MAX) % 8 == 4, the Yellow Paper's MULMOD overflow example.
        assert_eq!(result, U256::from(4));
    }

    #[test]
    fn signextend_large_byte_size_is_identity() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(0x42)).unwrap();
        vm.current_call_frame.stack.push(U256::from(31)).unwrap();
        vm.op_signextend().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(0x42));
    }
}
