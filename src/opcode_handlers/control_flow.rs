use ethereum_types::U256;

use crate::{
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas,
    utils::u256_to_usize,
    vm::VM,
};

// Flow Control Operations
// Opcodes: JUMP, JUMPI, PC, JUMPDEST, GAS

impl<'a> VM<'a> {
    pub fn op_jump(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::JUMP)?;
        let [destination] = current_call_frame.stack.pop()?;
        let destination = u256_to_usize(destination)?;

        if !current_call_frame.is_valid_jump_destination(destination) {
            return Err(ExceptionalHalt::InvalidJump.into());
        }
        current_call_frame.pc = destination;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::JUMPI)?;
        let [destination, condition] = current_call_frame.stack.pop()?;

        if condition.is_zero() {
            return Ok(OpcodeResult::Continue);
        }

        let destination = u256_to_usize(destination)?;
        if !current_call_frame.is_valid_jump_destination(destination) {
            return Err(ExceptionalHalt::InvalidJump.into());
        }
        current_call_frame.pc = destination;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_pc(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::PC)?;
        // The dispatcher advances `pc` past this opcode's own byte before
        // calling the handler, so PC's own offset is one behind.
        let pc = u64::try_from(current_call_frame.pc.saturating_sub(1))
            .map_err(|_| InternalError::TypeConversion)?;
        current_call_frame.stack.push(U256::from(pc))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.increase_consumed_gas(gas::JUMPDEST)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_gas(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::GAS)?;
        // Remaining gas is reported *after* this opcode's own cost.
        let remaining = current_call_frame.gas_remaining();
        current_call_frame.stack.push(U256::from(remaining))?;

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;
    use ethereum_types::U256;

    #[test]
    fn jump_to_valid_destination_moves_pc() {
        // PUSH1 2, JUMP, STOP, JUMPDEST
        let mut vm = vm_with_bytecode(Bytes::from_static(&[0x60, 0x02, 0x56, 0x00, 0x5b]));
        vm.current_call_frame.stack.push(U256::from(4)).unwrap();
        vm.op_jump().unwrap();
        assert_eq!(vm.current_call_frame.pc, 4);
    }

    #[test]
    fn jump_to_invalid_destination_errors() {
        let mut vm = vm_with_bytecode(Bytes::from_static(&[0x00]));
        vm.current_call_frame.stack.push(U256::from(0)).unwrap();
        assert!(vm.op_jump().is_err());
    }

    #[test]
    fn jumpi_with_zero_condition_does_not_jump() {
        let mut vm = vm_with_bytecode(Bytes::from_static(&[0x5b]));
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::from(0)).unwrap();
        vm.op_jumpi().unwrap();
        assert_eq!(vm.current_call_frame.pc, 0);
    }

    #[test]
    fn gas_reports_remaining_after_its_own_cost() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.gas_limit = 100;
        vm.op_gas().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(100 - crate::gas::GAS));
    }
}
