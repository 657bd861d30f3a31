use crate::{
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas,
    memory::calculate_memory_size,
    utils::{size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ethereum_types::U256;
use sha3::{Digest, Keccak256};

// Environmental Information (16), plus KECCAK256
// Opcodes: KECCAK256, ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD,
// CALLDATASIZE, CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE,
// EXTCODECOPY, RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH

impl<'a> VM<'a> {
    pub fn op_keccak256(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;
        current_call_frame.increase_consumed_gas(gas::keccak256(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        let data = current_call_frame.memory.load_range(offset, size)?;
        let hash = Keccak256::digest(&data);
        current_call_frame.stack.push(U256::from_big_endian(&hash))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_address(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::ADDRESS)?;

        let addr = current_call_frame.to;
        current_call_frame
            .stack
            .push(U256::from_big_endian(addr.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_balance(&mut self) -> Result<OpcodeResult, VMError> {
        let [address_word] = self.current_call_frame.stack.pop()?;
        let address = word_to_address(address_word);
        let address_was_cold = self.substate.add_accessed_address(address);

        self.current_call_frame
            .increase_consumed_gas(gas::balance(address_was_cold, self.env.fork()))?;

        let account_balance = self.db.get_account_state(address)?.balance;
        self.current_call_frame.stack.push(account_balance)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_origin(&mut self) -> Result<OpcodeResult, VMError> {
        let origin = self.env.origin;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::ORIGIN)?;

        current_call_frame
            .stack
            .push(U256::from_big_endian(origin.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_caller(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::CALLER)?;

        let caller = U256::from_big_endian(current_call_frame.caller.as_bytes());
        current_call_frame.stack.push(caller)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::CALLVALUE)?;

        let value = current_call_frame.value;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::CALLDATALOAD)?;

        let calldata_size = U256::from(current_call_frame.calldata.len());
        let [offset] = current_call_frame.stack.pop()?;

        if offset > calldata_size {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }
        let offset: usize = offset.try_into().map_err(|_| InternalError::TypeConversion)?;

        let mut data = [0u8; 32];
        if offset < current_call_frame.calldata.len() {
            let available = current_call_frame.calldata.len().saturating_sub(offset);
            let copy_size = 32.min(available);
            let end = offset.saturating_add(copy_size);
            data[..copy_size].copy_from_slice(&current_call_frame.calldata[offset..end]);
        }

        current_call_frame.stack.push(U256::from_big_endian(&data))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::CALLDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.calldata.len()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, calldata_offset, size] = current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let calldata_offset = u256_to_usize(calldata_offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        current_call_frame.increase_consumed_gas(gas::calldatacopy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let calldata_len = current_call_frame.calldata.len();
        if calldata_offset >= calldata_len {
            current_call_frame
                .memory
                .store_data_zero_padded(dest_offset, &[], size)?;
            return Ok(OpcodeResult::Continue);
        }

        let available_data = calldata_len.saturating_sub(calldata_offset);
        let copy_size = size.min(available_data);
        let end = calldata_offset.saturating_add(copy_size);
        let src_slice = &current_call_frame.calldata[calldata_offset..end];
        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, src_slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::CODESIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.bytecode.len()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, code_offset, size] = current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = u256_to_usize(code_offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        current_call_frame.increase_consumed_gas(gas::codecopy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let code_len = current_call_frame.bytecode.len();
        let slice: &[u8] = if code_offset < code_len {
            let available_data = code_len.saturating_sub(code_offset);
            let copy_size = size.min(available_data);
            let end = code_offset.saturating_add(copy_size);
            &current_call_frame.bytecode[code_offset..end]
        } else {
            &[]
        };

        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VMError> {
        let gas_price = self.env.gas_price;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::GASPRICE)?;

        current_call_frame.stack.push(gas_price)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VMError> {
        let [address_word] = self.current_call_frame.stack.pop()?;
        let address = word_to_address(address_word);
        let address_was_cold = self.substate.add_accessed_address(address);

        self.current_call_frame
            .increase_consumed_gas(gas::extcodesize(address_was_cold, self.env.fork()))?;

        let account_state = self.db.get_account_state(address)?;
        let code_len = self.db.get_account_code(account_state.code_hash)?.len();

        self.current_call_frame.stack.push(U256::from(code_len))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let [address, dest_offset, offset, size] = self.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let offset = u256_to_usize(offset).unwrap_or(usize::MAX);

        let current_memory_size = self.current_call_frame.memory.len();
        let address_was_cold = self.substate.add_accessed_address(address);
        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        self.current_call_frame.increase_consumed_gas(gas::extcodecopy(
            size,
            new_memory_size,
            current_memory_size,
            address_was_cold,
            self.env.fork(),
        )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let account_state = self.db.get_account_state(address)?;
        let bytecode = self.db.get_account_code(account_state.code_hash)?;

        let code_len = bytecode.len();
        let slice: &[u8] = if offset < code_len {
            let available_data = code_len.saturating_sub(offset);
            let copy_size = size.min(available_data);
            let end = offset.saturating_add(copy_size);
            &bytecode[offset..end]
        } else {
            &[]
        };

        self.current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::RETURNDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.sub_return_data.len()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, returndata_offset, size] = current_call_frame.stack.pop()?;

        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let returndata_offset =
            u256_to_usize(returndata_offset).map_err(|_| ExceptionalHalt::OutOfBounds)?;

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        current_call_frame.increase_consumed_gas(gas::returndatacopy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        if size == 0 && returndata_offset == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let sub_return_data_len = current_call_frame.sub_return_data.len();
        let copy_limit = returndata_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::VeryLargeNumber)?;

        if copy_limit > sub_return_data_len {
            return Err(ExceptionalHalt::OutOfBounds.into());
        }

        let slice = &current_call_frame.sub_return_data[returndata_offset..copy_limit];
        current_call_frame.memory.store_data(dest_offset, slice)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodehash(&mut self) -> Result<OpcodeResult, VMError> {
        let [address_word] = self.current_call_frame.stack.pop()?;
        let address = word_to_address(address_word);
        let address_was_cold = self.substate.add_accessed_address(address);

        self.current_call_frame
            .increase_consumed_gas(gas::extcodehash(address_was_cold, self.env.fork()))?;

        let account_state = self.db.get_account_state(address)?;

        // An account is considered empty when it has no code and zero nonce
        // and zero balance, per [EIP-161].
        if account_state.is_empty() {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let hash = U256::from_big_endian(account_state.code_hash.as_bytes());
        self.current_call_frame.stack.push(hash)?;

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;

    #[test]
    fn calldataload_pads_with_zeros_past_the_end() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.calldata = Bytes::from_static(&[0xaa, 0xbb]);
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_calldataload().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0xaa;
        expected[1] = 0xbb;
        assert_eq!(result, U256::from_big_endian(&expected));
    }

    #[test]
    fn balance_charges_cold_access_once() {
        let mut vm = vm_with_bytecode(Bytes::new());
        let address = crate::account::Address::from_low_u64_be(42);
        vm.current_call_frame
            .stack
            .push(U256::from_big_endian(address.as_bytes()))
            .unwrap();
        vm.op_balance().unwrap();
        assert!(vm.substate.is_address_accessed(&address));
    }
}
