use crate::{
    constants::WORD_SIZE,
    errors::{InternalError, OpcodeResult, VMError},
    gas,
    vm::VM,
};
use ethereum_types::U256;

// Comparison and Bitwise Logic Operations (14)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR

impl<'a> VM<'a> {
    #[inline]
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::LT)?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(u256_from_bool(lho < rho))?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_gt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::GT)?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(u256_from_bool(lho > rho))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_slt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SLT)?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            u256_from_bool(lho < rho)
        } else {
            u256_from_bool(lho_is_negative)
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SGT)?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            u256_from_bool(lho > rho)
        } else {
            u256_from_bool(rho_is_negative)
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_eq(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::EQ)?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(u256_from_bool(lho == rho))?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::ISZERO)?;
        let [operand] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(u256_from_bool(operand.is_zero()))?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_and(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::AND)?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a & b)?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_or(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::OR)?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a | b)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_xor(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::XOR)?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(a ^ b)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_not(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::NOT)?;
        let [a] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(!a)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_byte(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::BYTE)?;
        let [op1, op2] = current_call_frame.stack.pop()?;
        let byte_index: usize = match op1.try_into() {
            Ok(byte_index) => byte_index,
            Err(_) => {
                current_call_frame.stack.push_zero()?;
                return Ok(OpcodeResult::Continue);
            }
        };

        if byte_index < WORD_SIZE {
            let byte_to_push = WORD_SIZE
                .checked_sub(byte_index)
                .ok_or(InternalError::Underflow)?
                .checked_sub(1)
                .ok_or(InternalError::Underflow)?;
            current_call_frame
                .stack
                .push(U256::from(op2.byte(byte_to_push)))?;
        } else {
            current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }

    #[expect(clippy::arithmetic_side_effects)]
    #[inline]
    pub fn op_shl(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SHL)?;
        let [shift, value] = current_call_frame.stack.pop()?;

        if shift < U256::from(256) {
            current_call_frame.stack.push(value << shift)?;
        } else {
            current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }

    #[expect(clippy::arithmetic_side_effects)]
    #[inline]
    pub fn op_shr(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SHR)?;
        let [shift, value] = current_call_frame.stack.pop()?;

        if shift < U256::from(256) {
            current_call_frame.stack.push(value >> shift)?;
        } else {
            current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }

    #[allow(clippy::arithmetic_side_effects)]
    pub fn op_sar(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SAR)?;
        let [shift, value] = current_call_frame.stack.pop()?;

        let is_negative = value.bit(255);

        let res = if shift < U256::from(256) {
            if !is_negative {
                value >> shift
            } else {
                (value >> shift) | ((U256::MAX) << (U256::from(256) - shift))
            }
        } else if is_negative {
            U256::MAX
        } else {
            U256::zero()
        };
        current_call_frame.stack.push(res)?;

        Ok(OpcodeResult::Continue)
    }
}

const fn u256_from_bool(value: bool) -> U256 {
    if value { U256::one() } else { U256::zero() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;

    #[test]
    fn slt_compares_signed_magnitudes() {
        let mut vm = vm_with_bytecode(Bytes::new());
        let minus_one = !U256::zero(); // all-ones, i.e. -1 in two's complement
        vm.current_call_frame.stack.push(U256::one()).unwrap();
        vm.current_call_frame.stack.push(minus_one).unwrap();
        vm.op_slt().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::one());
    }

    #[test]
    fn shift_by_256_or_more_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::one()).unwrap();
        vm.current_call_frame.stack.push(U256::from(256)).unwrap();
        vm.op_shl().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn sar_of_negative_fills_with_ones() {
        let mut vm = vm_with_bytecode(Bytes::new());
        let minus_one = !U256::zero();
        vm.current_call_frame.stack.push(minus_one).unwrap();
        vm.current_call_frame.stack.push(U256::from(4)).unwrap();
        vm.op_sar().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::MAX);
    }

    #[test]
    fn byte_out_of_range_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::MAX).unwrap();
        vm.current_call_frame.stack.push(U256::from(32)).unwrap();
        vm.op_byte().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }
}
