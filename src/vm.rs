//! The interpreter: call-frame stack, the fetch/dispatch loop, and the
//! recursive CALL/CREATE subframe machinery built on top of the tagged
//! [`OpcodeResult`] handlers return (see `errors` module doc comment).
//!
//! Handlers never recurse into the interpreter themselves; a CALL-family or
//! CREATE-family opcode returns a [`SubCallRequest`] describing the subframe
//! it wants, and [`VM::run_current_frame`] is the only place a nested frame
//! is actually opened, run, and folded back into its parent.

use bytes::Bytes;
use ethereum_types::{H256, U256};
use rustc_hash::FxHashMap;
use sha3::{Digest, Keccak256};

use crate::account::Address;
use crate::call_frame::CallFrame;
use crate::constants::{EOF_PREFIX, MAX_CALL_DEPTH, MAX_CODE_SIZE, REFUND_QUOTIENT};
use crate::db::Database;
use crate::environment::Environment;
use crate::errors::{
    CallSpec, ContextResult, CreateSpec, ExceptionalHalt, ExecutionReport, InternalError,
    OpcodeResult, SubCallRequest, TxResult, VMError,
};
use crate::fork::Fork;
use crate::gas;
use crate::memory::Memory;
use crate::opcodes::OpCodeFn;
use crate::precompiles;
use crate::stack::Stack;
use crate::substate::Substate;
use crate::utils::{address_to_word, calculate_create_address};

/// What a top-level execution is: a message call against an existing
/// account, or a contract-creation transaction whose `data` is the init
/// code.
#[derive(Debug, Clone, Copy)]
pub enum TxKind {
    Call(Address),
    Create,
}

/// The interpreter: one call frame "in focus" plus the stack of its
/// ancestors, the state it reads and writes through, and everything accrued
/// across the whole transaction so far.
pub struct VM<'a> {
    pub current_call_frame: CallFrame,
    call_frame_stack: Vec<CallFrame>,
    pub db: &'a mut dyn Database,
    pub env: Environment,
    pub substate: Substate,
    /// The value each touched storage slot held at the *start* of the
    /// transaction, for SSTORE's [EIP-2200] refund table. Kept at the VM
    /// level rather than per-frame: it must survive a nested frame's revert
    /// (the slot's value at the start of the transaction never changes),
    /// and is only ever inserted once per slot via `entry().or_insert`.
    pub storage_original_values: FxHashMap<(Address, H256), U256>,
    pub(crate) opcode_table: [OpCodeFn<'a>; 256],
}

impl<'a> VM<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: &'a mut dyn Database,
        env: Environment,
        sender: Address,
        kind: TxKind,
        value: U256,
        data: Bytes,
        gas_limit: u64,
        is_static: bool,
    ) -> Result<Self, VMError> {
        let fork = env.fork();

        let (to, code_address, bytecode, calldata, is_create) = match kind {
            TxKind::Call(to) => {
                let code_hash = db.get_account_state(to)?.code_hash;
                let bytecode = db.get_account_code(code_hash)?;
                (to, to, bytecode, data, false)
            }
            TxKind::Create => {
                let sender_state = db.get_account_state(sender)?;
                let new_address = calculate_create_address(sender, sender_state.nonce);
                (new_address, new_address, data, Bytes::new(), true)
            }
        };

        let mut warm_addresses: Vec<Address> = vec![sender, to];
        warm_addresses.extend(precompiles::active_addresses(fork));
        if fork.is_shanghai() {
            warm_addresses.push(env.block.coinbase);
        }
        let substate = Substate::new(warm_addresses);

        let current_call_frame = CallFrame::new(
            sender,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            0,
            true,
            is_create,
            0,
            0,
            Stack::new(),
            Memory::new(),
        );

        Ok(Self {
            current_call_frame,
            call_frame_stack: Vec::new(),
            db,
            env,
            substate,
            storage_original_values: FxHashMap::default(),
            opcode_table: Self::build_opcode_table(fork),
        })
    }

    /// Runs the whole transaction to completion: charges intrinsic gas,
    /// executes the root call frame (recursing into nested CALL/CREATE
    /// subframes as the bytecode requests them), deploys the returned code
    /// for a CREATE transaction, and reports the final gas, refund, output
    /// and logs.
    ///
    /// The root frame has no parent to revert through on failure, so
    /// `execute` opens its own top-level snapshot around the whole thing;
    /// every nested subframe instead carries its own snapshot (see
    /// `execute_call_subframe`/`execute_create_subframe`).
    pub fn execute(&mut self) -> ExecutionReport {
        let snapshot = self.db.create_snapshot();

        let result = self.run_root_frame();
        let report = self.finalize_execution(result);

        if report.success {
            let _ = self.db.commit_snapshot(snapshot);
        } else {
            let _ = self.db.revert_to_snapshot(snapshot);
        }

        report
    }

    fn run_root_frame(&mut self) -> ContextResult {
        let fork = self.env.fork();
        let is_create = self.current_call_frame.is_create;

        let intrinsic_input: Bytes = if is_create {
            self.current_call_frame.bytecode.clone()
        } else {
            self.current_call_frame.calldata.clone()
        };
        let intrinsic = match gas::intrinsic_gas(is_create, &intrinsic_input, fork) {
            Ok(cost) => cost,
            Err(e) => return self.frame_exceptional_halt_result(e),
        };
        if let Err(e) = self.current_call_frame.increase_consumed_gas(intrinsic) {
            return self.frame_exceptional_halt_result(e);
        }

        let mut result = self.run_current_frame();

        if is_create && result.is_success() {
            let new_address = self.current_call_frame.to;
            let remaining = self.current_call_frame.gas_remaining();
            match self.deploy_code(new_address, &result.output, remaining, fork) {
                Ok(deposit_cost) => {
                    if let Err(e) = self.current_call_frame.increase_consumed_gas(deposit_cost) {
                        result = self.frame_exceptional_halt_result(e);
                    } else {
                        self.substate.add_created_account(new_address);
                        result.gas_used = self.current_call_frame.gas_used;
                        result.created_address = Some(new_address);
                        result.output = Bytes::new();
                    }
                }
                Err(e) => result = self.frame_exceptional_halt_result(e),
            }
        }

        result
    }

    /// Runs `current_call_frame` until it halts, reverts, or requests a
    /// subframe; a requested subframe is opened, run recursively, and
    /// folded back before this loop resumes.
    fn run_current_frame(&mut self) -> ContextResult {
        loop {
            let Some(opcode) = self.current_call_frame.current_opcode() else {
                return self.frame_success_result();
            };

            // PUSH-family handlers read their immediate bytes starting at
            // `pc`, so `pc` must already point past this opcode's own byte
            // by the time the handler runs.
            self.current_call_frame.pc = self.current_call_frame.pc.wrapping_add(1);

            #[allow(clippy::indexing_slicing)] // opcode is a u8, table has 256 entries
            let handler = self.opcode_table[usize::from(opcode)];

            match handler.call(self) {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => return self.frame_success_result(),
                Ok(OpcodeResult::SubCall(SubCallRequest::Call(spec))) => {
                    if let Err(e) = self.execute_call_subframe(spec) {
                        return self.frame_exceptional_halt_result(e);
                    }
                }
                Ok(OpcodeResult::SubCall(SubCallRequest::Create(spec))) => {
                    if let Err(e) = self.execute_create_subframe(spec) {
                        return self.frame_exceptional_halt_result(e);
                    }
                }
                Err(e) if e.is_revert_opcode() => return self.frame_revert_result(e),
                Err(e) => return self.frame_exceptional_halt_result(e),
            }
        }
    }

    /// Opens and runs a CALL-family subframe. Depth and caller-balance
    /// checks live here rather than in the handler, since only the
    /// interpreter knows whether a frame can actually be opened.
    fn execute_call_subframe(&mut self, spec: CallSpec) -> Result<(), VMError> {
        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        let reserved = spec.gas_limit.saturating_sub(spec.stipend);

        if new_depth > MAX_CALL_DEPTH {
            return self.fail_subcall(reserved);
        }
        if spec.should_transfer_value && !spec.value.is_zero() {
            let caller_balance = self.db.get_account_state(spec.caller)?.balance;
            if caller_balance < spec.value {
                return self.fail_subcall(reserved);
            }
        }

        let fork = self.env.fork();

        if precompiles::is_precompile(spec.code_address, fork) {
            if spec.should_transfer_value && !spec.value.is_zero() {
                self.transfer_value(spec.caller, spec.callee, spec.value)?;
            }
            let mut gas_remaining = spec.gas_limit;
            let result = precompiles::execute(spec.code_address, &spec.calldata, &mut gas_remaining, fork);
            return self.finish_precompile_call(result, gas_remaining, spec);
        }

        if spec.should_transfer_value && !spec.value.is_zero() {
            self.transfer_value(spec.caller, spec.callee, spec.value)?;
        }

        let code_hash = self.db.get_account_state(spec.code_address)?.code_hash;
        let bytecode = self.db.get_account_code(code_hash)?;

        let child_memory = self.current_call_frame.memory.next_memory();
        let child_frame = CallFrame::new(
            spec.caller,
            spec.callee,
            spec.code_address,
            bytecode,
            spec.value,
            spec.calldata.clone(),
            spec.is_static,
            spec.gas_limit,
            new_depth,
            spec.should_transfer_value,
            false,
            spec.ret_offset,
            spec.ret_size,
            Stack::new(),
            child_memory,
        );

        self.substate.push_backup();
        let snapshot = self.db.create_snapshot();
        self.push_frame(child_frame);

        let result = self.run_current_frame();
        self.pop_frame()?;

        self.finish_call_subframe(result, snapshot, spec)
    }

    /// Opens and runs a CREATE-family subframe. Depth, balance, nonce and
    /// address-collision checks already happened in the handler that
    /// produced `spec` (`generic_create`), so this only has to move value,
    /// bump the new account's nonce, and run the init code.
    fn execute_create_subframe(&mut self, spec: CreateSpec) -> Result<(), VMError> {
        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        self.substate.push_backup();
        let snapshot = self.db.create_snapshot();

        self.transfer_value(spec.deployer, spec.new_address, spec.value)?;

        // [EIP-161]: a freshly created contract's nonce starts at 1.
        let mut new_state = self.db.get_account_state(spec.new_address)?;
        new_state.nonce = 1;
        self.db.set_account_state(spec.new_address, new_state)?;

        let child_memory = self.current_call_frame.memory.next_memory();
        let child_frame = CallFrame::new(
            spec.deployer,
            spec.new_address,
            spec.new_address,
            spec.init_code.clone(),
            spec.value,
            Bytes::new(),
            false,
            spec.gas_limit,
            new_depth,
            true,
            true,
            0,
            0,
            Stack::new(),
            child_memory,
        );

        self.push_frame(child_frame);
        let result = self.run_current_frame();
        self.pop_frame()?;

        self.finish_create_subframe(result, snapshot, spec)
    }

    /// Refunds gas reserved for a subcall that was never actually opened
    /// (depth limit or insufficient balance, caught before a frame exists)
    /// and pushes failure. Not a fault: the calling bytecode decides what
    /// to do with a zero result.
    fn fail_subcall(&mut self, reserved_gas: u64) -> Result<(), VMError> {
        self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(reserved_gas);
        self.current_call_frame.sub_return_data = Bytes::new();
        self.current_call_frame.stack.push_zero()?;
        Ok(())
    }

    /// Folds a finished CALL-family subframe back into its parent: commits
    /// or reverts the child's state, refunds whatever of the gas handed to
    /// it (not counting the stipend, which the parent never paid for) the
    /// child did not use, and copies output into the parent's memory.
    fn finish_call_subframe(&mut self, result: ContextResult, snapshot: usize, spec: CallSpec) -> Result<(), VMError> {
        let paid = spec.gas_limit.saturating_sub(spec.stipend);

        match result.result {
            TxResult::Success => {
                self.substate.commit_backup();
                self.db.commit_snapshot(snapshot)?;

                let remaining = spec.gas_limit.saturating_sub(result.gas_used);
                let refund = remaining.min(paid);
                self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(refund);

                self.copy_subcall_output(&result.output, spec.ret_offset, spec.ret_size)?;
                self.current_call_frame.sub_return_data = result.output;
                self.current_call_frame.stack.push(U256::one())?;
            }
            // REVERT keeps the gas accounting and output of a normal
            // success; every other halt burns the gas handed to the child.
            TxResult::Revert(e) if e.is_revert_opcode() => {
                self.substate.revert_backup();
                self.db.revert_to_snapshot(snapshot)?;

                let remaining = spec.gas_limit.saturating_sub(result.gas_used);
                let refund = remaining.min(paid);
                self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(refund);

                self.copy_subcall_output(&result.output, spec.ret_offset, spec.ret_size)?;
                self.current_call_frame.sub_return_data = result.output;
                self.current_call_frame.stack.push_zero()?;
            }
            TxResult::Revert(_) => {
                self.substate.revert_backup();
                self.db.revert_to_snapshot(snapshot)?;
                self.current_call_frame.sub_return_data = Bytes::new();
                self.current_call_frame.stack.push_zero()?;
            }
        }

        Ok(())
    }

    /// Folds a finished CREATE-family subframe back into its parent,
    /// finally attempting to deploy the returned code against what gas is
    /// left.
    fn finish_create_subframe(&mut self, result: ContextResult, snapshot: usize, spec: CreateSpec) -> Result<(), VMError> {
        if !result.is_success() {
            let refund_unused = matches!(&result.result, TxResult::Revert(e) if e.is_revert_opcode());
            self.substate.revert_backup();
            self.db.revert_to_snapshot(snapshot)?;

            if refund_unused {
                let remaining = spec.gas_limit.saturating_sub(result.gas_used);
                self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(remaining);
                self.current_call_frame.sub_return_data = result.output;
            } else {
                self.current_call_frame.sub_return_data = Bytes::new();
            }
            self.current_call_frame.stack.push_zero()?;
            return Ok(());
        }

        let fork = self.env.fork();
        let remaining = spec.gas_limit.saturating_sub(result.gas_used);

        match self.deploy_code(spec.new_address, &result.output, remaining, fork) {
            Ok(deposit_cost) => {
                self.substate.commit_backup();
                self.db.commit_snapshot(snapshot)?;
                self.substate.add_created_account(spec.new_address);

                let total_used = result.gas_used.saturating_add(deposit_cost);
                let refund = spec.gas_limit.saturating_sub(total_used);
                self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(refund);

                self.current_call_frame.sub_return_data = Bytes::new();
                self.current_call_frame.stack.push(address_to_word(spec.new_address))?;
            }
            // Deployment failure (oversized code, EIP-3541 prefix, not
            // enough gas for the deposit) burns all the gas given to the
            // subframe, same as any other non-REVERT halt.
            Err(_) => {
                self.substate.revert_backup();
                self.db.revert_to_snapshot(snapshot)?;
                self.current_call_frame.sub_return_data = Bytes::new();
                self.current_call_frame.stack.push_zero()?;
            }
        }

        Ok(())
    }

    fn finish_precompile_call(&mut self, result: Result<Bytes, VMError>, gas_remaining: u64, spec: CallSpec) -> Result<(), VMError> {
        let paid = spec.gas_limit.saturating_sub(spec.stipend);
        match result {
            Ok(output) => {
                let refund = gas_remaining.min(paid);
                self.current_call_frame.gas_used = self.current_call_frame.gas_used.saturating_sub(refund);
                self.copy_subcall_output(&output, spec.ret_offset, spec.ret_size)?;
                self.current_call_frame.sub_return_data = output;
                self.current_call_frame.stack.push(U256::one())?;
            }
            Err(_) => {
                self.current_call_frame.sub_return_data = Bytes::new();
                self.current_call_frame.stack.push_zero()?;
            }
        }
        Ok(())
    }

    /// Validates and persists a CREATE/CREATE2's returned init-code output
    /// as `address`'s runtime code. Returns the code-deposit gas charged;
    /// any failure here (size, [EIP-3541] prefix, insufficient gas) is the
    /// caller's cue to burn the subframe's remaining gas rather than
    /// refund it.
    fn deploy_code(&mut self, address: Address, code: &Bytes, remaining_gas: u64, fork: Fork) -> Result<u64, VMError> {
        if code.is_empty() {
            return Ok(0);
        }
        if code.len() > MAX_CODE_SIZE {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        if fork.is_london() && code.first() == Some(&EOF_PREFIX) {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let deposit_cost = gas::code_deposit_cost(code.len())?;
        if deposit_cost > remaining_gas {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let hash = H256::from_slice(&Keccak256::digest(code));
        self.db.set_account_code(hash, code.clone())?;

        let mut state = self.db.get_account_state(address)?;
        state.code_hash = hash;
        self.db.set_account_state(address, state)?;

        Ok(deposit_cost)
    }

    fn transfer_value(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        if value.is_zero() {
            return Ok(());
        }

        let mut from_state = self.db.get_account_state(from)?;
        from_state.balance = from_state
            .balance
            .checked_sub(value)
            .ok_or(ExceptionalHalt::InsufficientBalance)?;
        self.db.set_account_state(from, from_state)?;

        let mut to_state = self.db.get_account_state(to)?;
        to_state.balance = to_state.balance.checked_add(value).ok_or(InternalError::Overflow)?;
        self.db.set_account_state(to, to_state)?;

        Ok(())
    }

    /// Copies up to `ret_size` bytes of a subcall's output into the
    /// caller's memory at `ret_offset`. Unlike RETURNDATACOPY, a shorter
    /// output is not zero-padded over the rest of `ret_size`.
    fn copy_subcall_output(&mut self, output: &Bytes, ret_offset: usize, ret_size: usize) -> Result<(), VMError> {
        if ret_size == 0 {
            return Ok(());
        }
        let copy_size = output.len().min(ret_size);
        #[allow(clippy::indexing_slicing)] // copy_size <= output.len()
        self.current_call_frame.memory.store_data(ret_offset, &output[..copy_size])
    }

    fn push_frame(&mut self, frame: CallFrame) {
        let parent = std::mem::replace(&mut self.current_call_frame, frame);
        self.call_frame_stack.push(parent);
    }

    /// Pops back to the parent frame, zeroing the child's slice of the
    /// shared memory buffer before it is dropped.
    fn pop_frame(&mut self) -> Result<(), VMError> {
        let parent = self
            .call_frame_stack
            .pop()
            .ok_or(InternalError::MissingCallFrame)?;
        let child = std::mem::replace(&mut self.current_call_frame, parent);
        child.memory.clean_from_base();
        Ok(())
    }

    fn frame_success_result(&self) -> ContextResult {
        ContextResult {
            result: TxResult::Success,
            gas_used: self.current_call_frame.gas_used,
            gas_refunded: 0,
            output: self.current_call_frame.output.clone(),
            created_address: None,
        }
    }

    fn frame_revert_result(&self, err: VMError) -> ContextResult {
        ContextResult {
            result: TxResult::Revert(err),
            gas_used: self.current_call_frame.gas_used,
            gas_refunded: 0,
            output: self.current_call_frame.output.clone(),
            created_address: None,
        }
    }

    /// Every exceptional halt consumes all of the frame's remaining gas and
    /// discards its output, per the Yellow Paper.
    fn frame_exceptional_halt_result(&self, err: VMError) -> ContextResult {
        ContextResult {
            result: TxResult::Revert(err),
            gas_used: self.current_call_frame.gas_limit,
            gas_refunded: 0,
            output: Bytes::new(),
            created_address: None,
        }
    }

    /// Computes the transaction-level refund: the accrued refund counter is
    /// only ever read here, capped at `gas_used / REFUND_QUOTIENT` per
    /// [EIP-3529], and only honored if the transaction as a whole
    /// succeeded. A successful transaction also applies SELFDESTRUCT's
    /// end-of-transaction account deletion here, the one place the whole
    /// selfdestruct set is known at once.
    fn finalize_execution(&mut self, result: ContextResult) -> ExecutionReport {
        let success = result.is_success();
        let raw_refund = u64::try_from(self.substate.refunded_gas().max(0)).unwrap_or(0);
        let refund_cap = result.gas_used.checked_div(REFUND_QUOTIENT).unwrap_or(0);
        let gas_refunded = if success { raw_refund.min(refund_cap) } else { 0 };
        let logs = if success { self.substate.extract_logs() } else { Vec::new() };

        if success {
            let addresses: Vec<Address> = self.substate.iter_selfdestruct().copied().collect();
            for address in addresses {
                let _ = self.db.remove_account(address);
            }
        }

        ExecutionReport {
            success,
            gas_used: result.gas_used,
            gas_refunded,
            return_data: result.output,
            logs,
            created_address: result.created_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountState;
    use crate::constants::EMPTY_CODE_HASH;
    use crate::db::InMemoryDatabase;
    use crate::environment::{BlockContext, Config};
    use crate::fork::ChainType;

    fn env_for(fork: Fork) -> Environment {
        Environment::new(
            Address::from_low_u64_be(0xaa),
            U256::one(),
            30_000_000,
            BlockContext::default(),
            Config::new(fork, ChainType::Mainnet),
        )
    }

    fn fund(db: &mut InMemoryDatabase, address: Address, balance: U256) {
        db.set_account_state(address, AccountState::new(balance, 0, EMPTY_CODE_HASH))
            .unwrap();
    }

    fn deploy(db: &mut InMemoryDatabase, address: Address, bytecode: &[u8]) {
        let code_hash = H256::from_slice(&Keccak256::digest(bytecode));
        db.set_account_code(code_hash, Bytes::copy_from_slice(bytecode)).unwrap();
        db.set_account_state(address, AccountState::new(U256::zero(), 0, code_hash))
            .unwrap();
    }

    #[test]
    fn stop_halts_successfully_with_no_output() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        fund(&mut db, sender, U256::from(1_000_000u64));
        deploy(&mut db, callee, &[0x00]); // STOP

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(report.success);
        assert!(report.return_data.is_empty());
    }

    #[test]
    fn return_halts_with_the_requested_output() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        fund(&mut db, sender, U256::from(1_000_000u64));
        // PUSH1 0x2a, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
        deploy(&mut db, callee, &[0x60, 0x2a, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(report.success);
        assert_eq!(report.return_data.as_ref(), &[0x2a]);
    }

    #[test]
    fn revert_fails_the_transaction_but_keeps_output() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        fund(&mut db, sender, U256::from(1_000_000u64));
        // PUSH1 0, PUSH1 0, REVERT
        deploy(&mut db, callee, &[0x60, 0x00, 0x60, 0x00, 0xfd]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(!report.success);
    }

    #[test]
    fn revert_inside_a_call_does_not_fail_the_caller() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let caller = Address::from_low_u64_be(2);
        let callee = Address::from_low_u64_be(3);
        fund(&mut db, sender, U256::from(1_000_000u64));

        // callee: PUSH1 0, PUSH1 0, REVERT
        deploy(&mut db, callee, &[0x60, 0x00, 0x60, 0x00, 0xfd]);

        // caller: GAS, PUSH20 callee, value=0, argsOffset=0, argsSize=0,
        // retOffset=0, retSize=0, CALL, then STOP.
        let mut caller_code = vec![0x5a]; // GAS
        caller_code.push(0x73); // PUSH20 callee
        caller_code.extend_from_slice(callee.as_bytes());
        caller_code.extend_from_slice(&[
            0x60, 0x00, // value
            0x60, 0x00, // argsOffset
            0x60, 0x00, // argsSize
            0x60, 0x00, // retOffset
            0x60, 0x00, // retSize
            0xf1, // CALL
            0x00, // STOP
        ]);
        deploy(&mut db, caller, &caller_code);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(caller),
            U256::zero(),
            Bytes::new(),
            1_000_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(report.success, "caller should still succeed even though the callee reverted");
    }

    #[test]
    fn create_deploys_the_returned_runtime_code() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        fund(&mut db, sender, U256::from(1_000_000u64));

        // init code: copy one byte of runtime code (STOP) into memory and
        // return it. PUSH1 0x00, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
        let init_code = Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Create,
            U256::zero(),
            init_code,
            1_000_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(report.success);
        assert!(report.created_address.is_some());
    }

    #[test]
    fn call_depth_limit_refunds_reserved_gas_without_erroring() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        fund(&mut db, sender, U256::from(1_000_000u64));
        deploy(&mut db, callee, &[0x00]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();
        vm.current_call_frame.depth = MAX_CALL_DEPTH;

        let spec = CallSpec {
            caller: sender,
            callee,
            code_address: callee,
            value: U256::zero(),
            calldata: Bytes::new(),
            is_static: false,
            gas_limit: 1000,
            stipend: 0,
            should_transfer_value: true,
            ret_offset: 0,
            ret_size: 0,
        };
        vm.execute_call_subframe(spec).unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn finalize_execution_deletes_every_address_in_the_selfdestruct_set_on_success() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        deploy(&mut db, callee, &[0x00]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        vm.substate.add_selfdestruct(callee);
        let result = ContextResult {
            result: TxResult::Success,
            gas_used: 21_000,
            gas_refunded: 0,
            output: Bytes::new(),
            created_address: None,
        };
        let report = vm.finalize_execution(result);
        assert!(report.success);
        assert!(db.get_account_state(callee).unwrap().is_empty());
    }

    #[test]
    fn finalize_execution_keeps_selfdestructed_accounts_on_a_failed_transaction() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        deploy(&mut db, callee, &[0x00]);

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        vm.substate.add_selfdestruct(callee);
        let result = ContextResult {
            result: TxResult::Revert(ExceptionalHalt::OutOfGas.into()),
            gas_used: 100_000,
            gas_refunded: 0,
            output: Bytes::new(),
            created_address: None,
        };
        let report = vm.finalize_execution(result);
        assert!(!report.success);
        assert!(!db.get_account_state(callee).unwrap().is_empty());
    }

    #[test]
    fn selfdestruct_of_a_preexisting_account_only_moves_the_balance_post_cancun() {
        let mut db = InMemoryDatabase::new();
        let sender = Address::from_low_u64_be(1);
        let callee = Address::from_low_u64_be(2);
        let beneficiary = Address::from_low_u64_be(3);
        fund(&mut db, sender, U256::from(1_000_000u64));
        fund(&mut db, callee, U256::from(777u64));

        // PUSH20 beneficiary, SELFDESTRUCT
        let mut code = vec![0x73];
        code.extend_from_slice(beneficiary.as_bytes());
        code.push(0xff);
        let code_hash = H256::from_slice(&Keccak256::digest(&code));
        db.set_account_code(code_hash, Bytes::copy_from_slice(&code)).unwrap();
        db.set_account_state(callee, AccountState::new(U256::from(777u64), 0, code_hash))
            .unwrap();

        let mut vm = VM::new(
            &mut db,
            env_for(Fork::Cancun),
            sender,
            TxKind::Call(callee),
            U256::zero(),
            Bytes::new(),
            100_000,
            false,
        )
        .unwrap();

        let report = vm.execute();
        assert!(report.success);
        // Per EIP-6780, an account not created this transaction survives
        // SELFDESTRUCT: only its balance moves to the beneficiary.
        let callee_state = db.get_account_state(callee).unwrap();
        assert!(!callee_state.is_empty());
        assert_eq!(callee_state.balance, U256::zero());
        assert_eq!(db.get_account_state(beneficiary).unwrap().balance, U256::from(777u64));
    }
}
