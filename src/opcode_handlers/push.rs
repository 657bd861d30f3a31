use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    gas,
    vm::VM,
};
use ethereum_types::U256;

// Push Operations
// Opcodes: PUSH0, PUSH1 ... PUSH32

impl<'a> VM<'a> {
    /// Generic PUSH operation, monomorphized at compile time for the given N.
    #[inline]
    pub fn op_push<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        call_frame.increase_consumed_gas(gas::PUSHN)?;

        let Some(new_pc) = call_frame.pc.checked_add(N) else {
            return Err(InternalError::Overflow.into());
        };

        let value = if let Some(slice) = call_frame.bytecode.get(call_frame.pc..new_pc) {
            U256::from_big_endian(slice)
        } else {
            // Not exactly correct, since a PUSHN with insufficient bytes should
            // pad with zeros, but if we're out of bytes the next instruction
            // will halt anyway, discarding the stack.
            U256::zero()
        };

        call_frame.stack.push(value)?;
        call_frame.pc = new_pc;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_push0(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.increase_consumed_gas(gas::PUSH0)?;
        self.current_call_frame.stack.push_zero()?;
        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;

    #[test]
    fn push1_reads_one_byte_and_advances_pc() {
        let mut vm = vm_with_bytecode(Bytes::from_static(&[0x60, 0x2a]));
        vm.current_call_frame.pc = 1;
        vm.op_push::<1>().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(0x2a));
        assert_eq!(vm.current_call_frame.pc, 2);
    }

    #[test]
    fn push_past_end_of_code_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::from_static(&[0x7f]));
        vm.current_call_frame.pc = 1;
        vm.op_push::<32>().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn push0_pushes_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.op_push0().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }
}
