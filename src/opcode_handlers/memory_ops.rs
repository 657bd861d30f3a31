use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    gas,
    memory::{calculate_memory_size, expansion_cost},
    utils::u256_to_usize,
    vm::VM,
};
use ethereum_types::U256;

// Memory Operations (5)
// Opcodes: MLOAD, MSTORE, MSTORE8, MSIZE, MCOPY

impl<'a> VM<'a> {
    pub fn op_mload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset] = current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        let current_memory_size = current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(offset, 32)?;
        current_call_frame.increase_consumed_gas(gas::mload(new_memory_size, current_memory_size)?)?;

        let value = current_call_frame.memory.load_word(offset)?;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        let current_memory_size = current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(offset, 32)?;
        current_call_frame.increase_consumed_gas(gas::mstore(new_memory_size, current_memory_size)?)?;

        current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        let current_memory_size = current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(offset, 1)?;
        current_call_frame.increase_consumed_gas(gas::mstore8(new_memory_size, current_memory_size)?)?;

        let byte = value.byte(0);
        current_call_frame.memory.store_data(offset, &[byte])?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_msize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::MSIZE)?;
        let size = u64::try_from(current_call_frame.memory.len()).map_err(|_| InternalError::TypeConversion)?;
        current_call_frame.stack.push(U256::from(size))?;

        Ok(OpcodeResult::Continue)
    }

    /// [EIP-5656]: copies `size` bytes within this frame's own memory,
    /// overlap-safe (like `memmove`).
    pub fn op_mcopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, src_offset, size] = current_call_frame.stack.pop()?;
        let size = u256_to_usize(size)?;
        let dest_offset = u256_to_usize(dest_offset)?;
        let src_offset = u256_to_usize(src_offset)?;

        let current_memory_size = current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(dest_offset.max(src_offset), size)?;
        current_call_frame.increase_consumed_gas(gas::mcopy(new_memory_size, current_memory_size, size)?)?;

        current_call_frame.memory.copy_within(src_offset, dest_offset, size)?;

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;
    use ethereum_types::U256;

    #[test]
    fn mstore_then_mload_roundtrips() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(42)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mstore().unwrap();

        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(42));
    }

    #[test]
    fn mstore8_stores_only_low_byte() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(0x1234)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mstore8().unwrap();

        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(0x34));
    }

    #[test]
    fn mcopy_moves_overlapping_ranges() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(0xaa)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mstore().unwrap();

        vm.current_call_frame.stack.push(U256::from(32)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::from(16)).unwrap();
        vm.op_mcopy().unwrap();

        vm.current_call_frame.stack.push(U256::from(16)).unwrap();
        vm.op_mload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(0xaa) << (8 * 16));
    }

    #[test]
    fn msize_reports_current_memory_length() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mstore().unwrap();

        vm.op_msize().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(32));
    }
}
