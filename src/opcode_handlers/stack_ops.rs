use crate::{
    errors::{OpcodeResult, VMError},
    gas,
    vm::VM,
};

// Stack Operations
// Opcodes: POP, DUP1 ... DUP16, SWAP1 ... SWAP16

impl<'a> VM<'a> {
    #[inline]
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::POP)?;
        let [_] = current_call_frame.stack.pop()?;

        Ok(OpcodeResult::Continue)
    }

    /// Generic DUP_n, monomorphized at compile time for the given N.
    #[inline]
    pub fn op_dup<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::DUPN)?;
        current_call_frame.stack.dup(N)?;

        Ok(OpcodeResult::Continue)
    }

    /// Generic SWAP_n, monomorphized at compile time for the given N.
    #[inline]
    pub fn op_swap<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::SWAPN)?;
        current_call_frame.stack.swap(N)?;

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;
    use ethereum_types::U256;

    #[test]
    fn pop_discards_the_top_value() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(7)).unwrap();
        vm.op_pop().unwrap();
        assert!(vm.current_call_frame.stack.is_empty());
    }

    #[test]
    fn dup1_duplicates_the_top_value() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(9)).unwrap();
        vm.op_dup::<1>().unwrap();
        let [top, second] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(top, U256::from(9));
        assert_eq!(second, U256::from(9));
    }

    #[test]
    fn swap1_exchanges_top_two_values() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.current_call_frame.stack.push(U256::from(2)).unwrap();
        vm.op_swap::<1>().unwrap();
        let [top, second] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(top, U256::from(1));
        assert_eq!(second, U256::from(2));
    }
}
