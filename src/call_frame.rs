//! A single execution context: one frame per CALL/CREATE nesting level.

use std::rc::Rc;

use bitvec::vec::BitVec;
use bytes::Bytes;
use ethereum_types::U256;

use crate::account::Address;
use crate::errors::{ExceptionalHalt, VMError};
use crate::jumpdest;
use crate::memory::Memory;
use crate::stack::Stack;

/// Everything that changes when control passes into a nested CALL/CREATE,
/// and is either merged back into the parent on success or thrown away on
/// revert.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub caller: Address,
    /// Address whose storage/balance this frame acts on (`to` for CALL,
    /// the deployer's own address for CALLCODE/DELEGATECALL, the new
    /// account for CREATE/CREATE2).
    pub to: Address,
    /// Address whose code is actually running (differs from `to` under
    /// CALLCODE/DELEGATECALL).
    pub code_address: Address,
    pub bytecode: Bytes,
    pub value: U256,
    pub calldata: Bytes,
    pub is_static: bool,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub depth: usize,
    pub should_transfer_value: bool,
    pub is_create: bool,
    /// Where in the *parent's* memory the return data should land, and how
    /// much of it to copy (CALL-family only; CREATE ignores these).
    pub ret_offset: usize,
    pub ret_size: usize,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub output: Bytes,
    /// The return data made visible to this frame by its *own* last
    /// subcall, for RETURNDATACOPY/RETURNDATASIZE.
    pub sub_return_data: Bytes,
    /// Valid JUMP/JUMPDEST offsets for `bytecode`, computed once at frame
    /// creation rather than re-scanned on every JUMP/JUMPI.
    pub valid_jump_destinations: Rc<BitVec>,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caller: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        should_transfer_value: bool,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
        stack: Stack,
        memory: Memory,
    ) -> Self {
        let valid_jump_destinations = Rc::new(jumpdest::analyze(&bytecode));
        Self {
            caller,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            gas_used: 0,
            depth,
            should_transfer_value,
            is_create,
            ret_offset,
            ret_size,
            pc: 0,
            stack,
            memory,
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            valid_jump_destinations,
        }
    }

    pub fn is_valid_jump_destination(&self, pc: usize) -> bool {
        jumpdest::is_valid_jump_destination(&self.valid_jump_destinations, pc)
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_used)
    }

    pub fn current_opcode(&self) -> Option<u8> {
        self.bytecode.get(self.pc).copied()
    }

    /// Charge `cost` against this frame's gas limit, halting with
    /// `OutOfGas` if it would exceed what remains.
    #[inline(always)]
    pub fn increase_consumed_gas(&mut self, cost: u64) -> Result<(), VMError> {
        let new_gas_used = self
            .gas_used
            .checked_add(cost)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if new_gas_used > self.gas_limit {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        self.gas_used = new_gas_used;
        Ok(())
    }
}
