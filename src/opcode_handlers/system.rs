use crate::{
    constants::INIT_CODE_MAX_SIZE,
    errors::{CallSpec, CreateSpec, ExceptionalHalt, InternalError, OpcodeResult, SubCallRequest, VMError},
    gas,
    memory::{calculate_memory_size, expansion_cost},
    utils::{calculate_create2_address, calculate_create_address, size_offset_to_usize, word_to_address},
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::U256;

// System Operations (10)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2, STATICCALL,
// REVERT, INVALID, SELFDESTRUCT

/// Which of the four CALL-family opcodes is being dispatched; they share
/// almost all of their gas accounting and only differ in where value comes
/// from and which addresses `from`/`to`/`code_address` resolve to.
enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

impl<'a> VM<'a> {
    pub fn op_call(&mut self) -> Result<OpcodeResult, VMError> {
        self.call_common(CallKind::Call)
    }

    pub fn op_callcode(&mut self) -> Result<OpcodeResult, VMError> {
        self.call_common(CallKind::CallCode)
    }

    pub fn op_delegatecall(&mut self) -> Result<OpcodeResult, VMError> {
        self.call_common(CallKind::DelegateCall)
    }

    pub fn op_staticcall(&mut self) -> Result<OpcodeResult, VMError> {
        self.call_common(CallKind::StaticCall)
    }

    fn call_common(&mut self, kind: CallKind) -> Result<OpcodeResult, VMError> {
        let takes_value = matches!(kind, CallKind::Call | CallKind::CallCode);

        let (gas_param, callee, value, args_offset, args_size, ret_offset, ret_size) = {
            let current_call_frame = &mut self.current_call_frame;
            if takes_value {
                let [gas_param, callee, value, args_offset, args_size, ret_offset, ret_size] =
                    current_call_frame.stack.pop()?;
                (gas_param, callee, value, args_offset, args_size, ret_offset, ret_size)
            } else {
                let [gas_param, callee, args_offset, args_size, ret_offset, ret_size] =
                    current_call_frame.stack.pop()?;
                (gas_param, callee, U256::zero(), args_offset, args_size, ret_offset, ret_size)
            }
        };

        let callee = word_to_address(callee);
        let (args_size, args_offset) = size_offset_to_usize(args_size, args_offset)?;
        let (ret_size, ret_offset) = size_offset_to_usize(ret_size, ret_offset)?;

        if matches!(kind, CallKind::Call) && self.current_call_frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let fork = self.env.fork();
        let address_was_cold = self.substate.add_accessed_address(callee);
        let account_is_empty = matches!(kind, CallKind::Call)
            && !value.is_zero()
            && self.db.get_account_state(callee)?.is_empty();

        let current_memory_size = self.current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(args_offset, args_size)?
            .max(calculate_memory_size(ret_offset, ret_size)?);

        let static_cost = gas::call_static_cost(address_was_cold, value.is_zero(), account_is_empty, fork)?;
        let mem_cost = expansion_cost(new_memory_size, current_memory_size)?;
        let cost = static_cost.checked_add(mem_cost).ok_or(InternalError::Overflow)?;
        self.current_call_frame.increase_consumed_gas(cost)?;

        let (gas_for_call, stipend) =
            gas::calculate_cost_and_gas_limit_call(gas_param, self.current_call_frame.gas_remaining(), value.is_zero())?;
        let gas_limit = gas_for_call.checked_add(stipend).ok_or(InternalError::Overflow)?;
        self.current_call_frame.increase_consumed_gas(gas_for_call)?;

        self.current_call_frame.memory.resize(new_memory_size)?;
        let calldata = self.current_call_frame.memory.load_range(args_offset, args_size)?;

        let (caller, to, code_address, should_transfer_value, is_static) = match kind {
            CallKind::Call => (
                self.current_call_frame.to,
                callee,
                callee,
                true,
                self.current_call_frame.is_static,
            ),
            CallKind::CallCode => (
                self.current_call_frame.to,
                self.current_call_frame.to,
                callee,
                true,
                self.current_call_frame.is_static,
            ),
            CallKind::DelegateCall => (
                self.current_call_frame.caller,
                self.current_call_frame.to,
                callee,
                false,
                self.current_call_frame.is_static,
            ),
            CallKind::StaticCall => (self.current_call_frame.to, callee, callee, false, true),
        };
        let value = match kind {
            CallKind::DelegateCall => self.current_call_frame.value,
            CallKind::StaticCall => U256::zero(),
            _ => value,
        };

        Ok(OpcodeResult::SubCall(SubCallRequest::Call(CallSpec {
            caller,
            callee: to,
            code_address,
            value,
            calldata,
            is_static,
            gas_limit,
            stipend,
            should_transfer_value,
            ret_offset,
            ret_size,
        })))
    }

    #[inline]
    pub fn op_return(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.pop()?;

        if size.is_zero() {
            current_call_frame.output = Bytes::new();
            return Ok(OpcodeResult::Halt);
        }

        let (size, offset) = size_offset_to_usize(size, offset)?;
        let new_memory_size = calculate_memory_size(offset, size)?;
        let current_memory_size = current_call_frame.memory.len();

        current_call_frame.increase_consumed_gas(gas::exit_opcode(new_memory_size, current_memory_size)?)?;
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;

        Ok(OpcodeResult::Halt)
    }

    pub fn op_revert(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.pop()?;

        let (size, offset) = size_offset_to_usize(size, offset)?;
        let new_memory_size = calculate_memory_size(offset, size)?;
        let current_memory_size = current_call_frame.memory.len();

        current_call_frame.increase_consumed_gas(gas::exit_opcode(new_memory_size, current_memory_size)?)?;
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;

        Err(VMError::RevertOpcode)
    }

    /// Consumes all remaining gas, no return data. Used both for the real
    /// INVALID opcode and for any opcode the active fork does not define.
    pub fn op_invalid(&mut self) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }

    pub fn op_create(&mut self) -> Result<OpcodeResult, VMError> {
        let fork = self.env.fork();
        let [value, code_offset, code_size] = self.current_call_frame.stack.pop()?;
        let (code_size, code_offset) = size_offset_to_usize(code_size, code_offset)?;

        let new_memory_size = calculate_memory_size(code_offset, code_size)?;
        let current_memory_size = self.current_call_frame.memory.len();
        self.current_call_frame
            .increase_consumed_gas(gas::create(new_memory_size, current_memory_size, code_size, fork)?)?;

        self.generic_create(value, code_offset, code_size, None)
    }

    pub fn op_create2(&mut self) -> Result<OpcodeResult, VMError> {
        let fork = self.env.fork();
        let [value, code_offset, code_size, salt] = self.current_call_frame.stack.pop()?;
        let (code_size, code_offset) = size_offset_to_usize(code_size, code_offset)?;

        let new_memory_size = calculate_memory_size(code_offset, code_size)?;
        let current_memory_size = self.current_call_frame.memory.len();
        self.current_call_frame
            .increase_consumed_gas(gas::create_2(new_memory_size, current_memory_size, code_size, fork)?)?;

        self.generic_create(value, code_offset, code_size, Some(salt))
    }

    /// Shared CREATE/CREATE2 body. Performs every state mutation that the
    /// Yellow Paper says happens unconditionally (nonce bump) or only on the
    /// early-failure paths (refunding reserved gas, pushing 0); the actual
    /// child frame is opened by the interpreter from the returned
    /// [`CreateSpec`].
    fn generic_create(
        &mut self,
        value: U256,
        code_offset: usize,
        code_size: usize,
        salt: Option<U256>,
    ) -> Result<OpcodeResult, VMError> {
        let fork = self.env.fork();
        if code_size > INIT_CODE_MAX_SIZE && fork.is_shanghai() {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        self.current_call_frame.sub_return_data = Bytes::new();

        let gas_limit = gas::max_message_call_gas(self.current_call_frame.gas_remaining());
        self.current_call_frame.increase_consumed_gas(gas_limit)?;

        let init_code = self.current_call_frame.memory.load_range(code_offset, code_size)?;

        let deployer = self.current_call_frame.to;
        let deployer_state = self.db.get_account_state(deployer)?;

        let new_address = match salt {
            Some(salt) => calculate_create2_address(deployer, &init_code, salt),
            None => calculate_create_address(deployer, deployer_state.nonce),
        };

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        let fails = deployer_state.balance < value
            || new_depth > crate::constants::MAX_CALL_DEPTH
            || deployer_state.nonce == u64::MAX;
        if fails {
            self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(gas_limit);
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        self.substate.add_accessed_address(new_address);

        let mut new_state = deployer_state.clone();
        new_state.nonce = new_state.nonce.checked_add(1).ok_or(InternalError::Overflow)?;
        self.db.set_account_state(deployer, new_state)?;

        let existing = self.db.get_account_state(new_address)?;
        if existing.nonce != 0 || existing.has_code() {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        Ok(OpcodeResult::SubCall(SubCallRequest::Create(CreateSpec {
            deployer,
            new_address,
            value,
            init_code,
            gas_limit,
        })))
    }

    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        let [beneficiary_word] = self.current_call_frame.stack.pop()?;
        let beneficiary = word_to_address(beneficiary_word);
        let to = self.current_call_frame.to;
        let fork = self.env.fork();

        let beneficiary_was_cold = self.substate.add_accessed_address(beneficiary);
        let beneficiary_state = self.db.get_account_state(beneficiary)?;
        let creates_new_account = beneficiary_state.is_empty();

        let mut source_state = self.db.get_account_state(to)?;
        let balance = source_state.balance;

        self.current_call_frame.increase_consumed_gas(gas::selfdestruct(
            beneficiary_was_cold,
            creates_new_account,
            fork,
        )?)?;

        if !balance.is_zero() {
            let mut beneficiary_state = beneficiary_state;
            beneficiary_state.balance = beneficiary_state
                .balance
                .checked_add(balance)
                .ok_or(InternalError::Overflow)?;
            self.db.set_account_state(beneficiary, beneficiary_state)?;
        }
        source_state.balance = U256::zero();
        self.db.set_account_state(to, source_state)?;

        // [EIP-6780]: only actually destroy the account if it was created in
        // this same transaction; otherwise only the balance moves.
        if fork.is_cancun() {
            if self.substate.is_account_created(&to) {
                self.substate.add_selfdestruct(to);
            }
        } else {
            self.substate.add_selfdestruct(to);
        }

        Ok(OpcodeResult::Halt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;

    #[test]
    fn return_with_zero_size_halts_with_empty_output() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        let result = vm.op_return().unwrap();
        assert!(matches!(result, OpcodeResult::Halt));
        assert!(vm.current_call_frame.output.is_empty());
    }

    #[test]
    fn revert_surfaces_as_revert_opcode_error() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        let err = vm.op_revert().unwrap_err();
        assert!(err.is_revert_opcode());
    }

    #[test]
    fn call_in_static_context_with_value_is_rejected() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.is_static = true;
        vm.current_call_frame.stack.push(U256::zero()).unwrap(); // ret_size
        vm.current_call_frame.stack.push(U256::zero()).unwrap(); // ret_offset
        vm.current_call_frame.stack.push(U256::zero()).unwrap(); // args_size
        vm.current_call_frame.stack.push(U256::zero()).unwrap(); // args_offset
        vm.current_call_frame.stack.push(U256::one()).unwrap(); // value
        vm.current_call_frame.stack.push(U256::zero()).unwrap(); // callee
        vm.current_call_frame.stack.push(U256::from(100_000)).unwrap(); // gas
        let err = vm.op_call().unwrap_err();
        assert_eq!(err, ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
    }
}
