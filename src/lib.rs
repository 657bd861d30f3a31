//! A pure Rust implementation of the Ethereum Virtual Machine execution
//! core: opcode interpreter, gas accounting, state/snapshot layer and
//! precompile dispatcher, parameterized over a [`fork::Fork`] so the same
//! interpreter can execute bytecode under any revision from Frontier
//! through Cancun.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           VM                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │  CallFrame  │  │   Memory    │  │       Stack         │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │  Substate   │  │ Precompiles │  │   Environment       │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Database                              │
//! │              (Account state, storage, code)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key components
//!
//! - [`vm::VM`]: the interpreter loop and call/create subframe handling
//! - [`call_frame::CallFrame`]: execution context for one call
//! - [`memory::Memory`] / [`stack::Stack`]: the machine's working storage
//! - [`substate::Substate`]: accrued-but-not-yet-committed transaction state
//! - [`db::Database`]: the world-state interface the interpreter reads/writes through
//! - [`precompiles`]: native implementations of the fixed-address precompiled contracts
//! - [`gas`]: the full dynamic gas-cost model
//! - [`fork::Fork`]: the hardfork rules gating opcode availability and pricing

pub mod account;
pub mod call_frame;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod fork;
pub mod gas;
pub mod jumpdest;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod substate;
pub mod utils;
pub mod vm;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
