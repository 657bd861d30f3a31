use ethereum_types::H256;

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas,
    vm::VM,
};

// Storage and Transient Storage Operations (4)
// Opcodes: SLOAD, SSTORE, TLOAD, TSTORE

fn word_to_h256(word: ethereum_types::U256) -> H256 {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    H256::from(bytes)
}

impl<'a> VM<'a> {
    pub fn op_sload(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.current_call_frame.to;
        let [key] = self.current_call_frame.stack.pop()?;
        let key = word_to_h256(key);

        let was_cold = self.substate.add_accessed_slot(address, key);
        self.current_call_frame
            .increase_consumed_gas(gas::sload(was_cold, self.env.fork()))?;

        let value = self.db.get_storage_value(address, key)?;
        self.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    /// Implements the full [EIP-2200]/[EIP-2929]/[EIP-3529] cost and refund
    /// table: the cost (and whether a refund applies) depends on how the
    /// new value compares to both the slot's current value and its value at
    /// the start of the transaction.
    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let fork = self.env.fork();
        if fork.is_istanbul() && self.current_call_frame.gas_remaining() <= gas::sstore_stipend() {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let address = self.current_call_frame.to;
        let [key, new_value] = self.current_call_frame.stack.pop()?;
        let key = word_to_h256(key);

        let was_cold = self.substate.add_accessed_slot(address, key);
        let current_value = self.db.get_storage_value(address, key)?;
        let original_value = *self
            .storage_original_values
            .entry((address, key))
            .or_insert(current_value);

        let (cost, refund_delta) = gas::sstore(original_value, current_value, new_value, was_cold, fork)?;
        self.current_call_frame.increase_consumed_gas(cost)?;
        self.substate.add_refund(refund_delta);

        self.db.set_storage_value(address, key, new_value)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_tload(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.current_call_frame.to;
        self.current_call_frame.increase_consumed_gas(gas::TLOAD)?;
        let [key] = self.current_call_frame.stack.pop()?;
        let key = word_to_h256(key);

        let value = self.substate.get_transient(&address, &key);
        self.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_tstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let address = self.current_call_frame.to;
        self.current_call_frame.increase_consumed_gas(gas::TSTORE)?;
        let [key, value] = self.current_call_frame.stack.pop()?;
        let key = word_to_h256(key);

        self.substate.set_transient(address, key, value);

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;
    use ethereum_types::U256;

    #[test]
    fn sstore_then_sload_roundtrips() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(99)).unwrap();
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.op_sstore().unwrap();

        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.op_sload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(99));
    }

    #[test]
    fn sstore_in_static_context_is_rejected() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.is_static = true;
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        assert!(vm.op_sstore().is_err());
    }

    #[test]
    fn tstore_then_tload_roundtrips_and_does_not_touch_storage() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(55)).unwrap();
        vm.current_call_frame.stack.push(U256::from(2)).unwrap();
        vm.op_tstore().unwrap();

        vm.current_call_frame.stack.push(U256::from(2)).unwrap();
        vm.op_tload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::from(55));

        vm.current_call_frame.stack.push(U256::from(2)).unwrap();
        vm.op_sload().unwrap();
        let [persisted] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(persisted, U256::zero());
    }
}
