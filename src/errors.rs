//! Error taxonomy and handler/execution result types.
//!
//! Opcode handlers never panic: every fallible operation returns
//! `Result<_, VMError>`. [`ExceptionalHalt`] variants consume all remaining
//! gas in the frame that raised them (per §7 of the execution model);
//! [`InternalError`] variants mark invariant violations that are bugs, not
//! EVM semantics, and abort the whole execution.

use crate::account::Address;
use ethereum_types::U256;
use thiserror::Error;

/// Errors that halt a frame and consume all of its remaining gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ExceptionalHalt {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("invalid or fork-disallowed opcode")]
    InvalidOpcode,
    #[error("state-modifying opcode in a static context")]
    OpcodeNotAllowedInStaticContext,
    #[error("offset/length argument out of addressable bounds")]
    OutOfBounds,
    #[error("value too large to fit the target integer width")]
    VeryLargeNumber,
    #[error("call depth limit exceeded")]
    DepthExceeded,
    #[error("insufficient balance for value transfer")]
    InsufficientBalance,
}

/// Invariant violations that indicate a bug in this core rather than a
/// property of the executed bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InternalError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("type conversion failed")]
    TypeConversion,
    #[error("slice index out of range")]
    Slicing,
    #[error("call frame stack was unexpectedly empty")]
    MissingCallFrame,
    #[error("account was expected to exist")]
    MissingAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecompileError {
    #[error("malformed precompile input")]
    ParsingInputError,
    #[error("not enough gas for precompile execution")]
    NotEnoughGas,
    #[error("invalid elliptic curve point")]
    InvalidEcPoint,
    #[error("signature recovery failed")]
    InvalidSignature,
    #[error("precompile not available under the active hardfork")]
    NotActive,
}

/// Failure modes of the [`crate::db::Database`] interface (see §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource error: {0}")]
    ResourceError(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Top level error type threaded through the whole interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error(transparent)]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Precompile(#[from] PrecompileError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// Raised by the REVERT opcode. Not a fault: gas already charged is kept,
    /// the rest is returned to the caller, and return data is preserved.
    #[error("execution reverted")]
    RevertOpcode,
}

impl VMError {
    /// Whether this error, propagated out of a call/create subframe, should
    /// still expose the frame's output buffer to the parent (only true for
    /// the REVERT opcode; every other halt discards output).
    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }

    /// Whether this is an [`InternalError`] — a bug, not a property of the
    /// executed program. These are not caught by snapshot/revert handling
    /// local to a subcall; they abort the whole transaction.
    pub fn is_internal(&self) -> bool {
        matches!(self, VMError::Internal(_))
    }
}

/// Specification for a CALL-family subcall, produced by a handler and
/// consumed by the interpreter loop (see the "tagged opcode results" design
/// note: handlers describe the subcall instead of mutating the call stack
/// themselves).
#[derive(Debug, Clone)]
pub struct CallSpec {
    pub caller: Address,
    pub callee: Address,
    pub code_address: Address,
    pub value: U256,
    pub calldata: bytes::Bytes,
    pub is_static: bool,
    pub gas_limit: u64,
    /// The [EIP-2200] stipend folded into `gas_limit`, kept separate so the
    /// interpreter can tell how much of `gas_limit` the caller actually paid
    /// for (the stipend is extra gas granted on top, not charged upfront).
    pub stipend: u64,
    pub should_transfer_value: bool,
    pub ret_offset: usize,
    pub ret_size: usize,
}

/// Specification for a CREATE-family subcall.
#[derive(Debug, Clone)]
pub struct CreateSpec {
    pub deployer: Address,
    pub new_address: Address,
    pub value: U256,
    pub init_code: bytes::Bytes,
    pub gas_limit: u64,
}

/// A subcall requested by a CALL/CALLCODE/DELEGATECALL/STATICCALL/CREATE/CREATE2
/// handler. Carries everything the interpreter needs to open a nested frame.
#[derive(Debug, Clone)]
pub enum SubCallRequest {
    Call(CallSpec),
    Create(CreateSpec),
}

/// The tagged result a handler returns instead of reaching back into the
/// dispatcher: `Continue` to advance normally, `Halt` to end the current
/// frame (STOP/RETURN/SELFDESTRUCT all set their output before returning
/// this), or `SubCall` to ask the interpreter to open a nested frame. Any
/// other outcome (REVERT, exceptional halts) is carried by `Err(VMError)`.
#[derive(Debug, Clone)]
pub enum OpcodeResult {
    Continue,
    Halt,
    SubCall(SubCallRequest),
}

/// Outcome of a single frame's execution, independent of nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TxResult::Success)
    }
}

/// The result of running one call frame to completion: gas used, output
/// bytes, and whether it succeeded or reverted/halted.
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub result: TxResult,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: bytes::Bytes,
    pub created_address: Option<Address>,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Final, transaction-level execution report returned by [`crate::vm::VM::execute`].
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub success: bool,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub return_data: bytes::Bytes,
    pub logs: Vec<crate::account::LogEntry>,
    pub created_address: Option<Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.success
    }
}
