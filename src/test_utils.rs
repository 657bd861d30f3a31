//! Test-only constructors for building a [`VM`] around arbitrary bytecode
//! without wiring up a real transaction.

use bytes::Bytes;
use ethereum_types::{H256, U256};
use sha3::{Digest, Keccak256};

use crate::account::{AccountState, Address};
use crate::constants::EMPTY_CODE_HASH;
use crate::db::{Database, InMemoryDatabase};
use crate::environment::{BlockContext, Config, Environment};
use crate::fork::{ChainType, Fork};
use crate::vm::{TxKind, VM};

fn leaked_db() -> &'static mut InMemoryDatabase {
    Box::leak(Box::new(InMemoryDatabase::new()))
}

/// Builds a `VM` whose root call frame runs `bytecode`, with a generously
/// funded sender and a large gas limit, under the latest fork this core
/// implements.
///
/// Leaks a fresh in-memory database per call so the returned `VM<'static>`
/// needs no lifetime juggling from callers; fine for tests, not meant for
/// anything long-running.
pub fn vm_with_bytecode(bytecode: Bytes) -> VM<'static> {
    let db = leaked_db();

    let sender = Address::from_low_u64_be(0x1000);
    let callee = Address::from_low_u64_be(0x2000);
    let balance = U256::from(10_u64.pow(18)).saturating_mul(U256::from(1_000_000u64));

    db.set_account_state(sender, AccountState::new(balance, 0, EMPTY_CODE_HASH))
        .unwrap();

    let code_hash = H256::from_slice(&Keccak256::digest(&bytecode));
    db.set_account_code(code_hash, bytecode).unwrap();
    db.set_account_state(callee, AccountState::new(U256::zero(), 0, code_hash))
        .unwrap();

    let env = Environment::new(
        sender,
        U256::from(1),
        30_000_000,
        BlockContext::default(),
        Config::new(Fork::LATEST, ChainType::Mainnet),
    );

    VM::new(
        db,
        env,
        sender,
        TxKind::Call(callee),
        U256::zero(),
        Bytes::new(),
        30_000_000,
        false,
    )
    .unwrap()
}

/// Like [`vm_with_bytecode`], but the root frame is a static-context call
/// (`STATICCALL`'s child frame, or a handler test that needs
/// `is_static = true` directly).
pub fn vm_with_bytecode_static(bytecode: Bytes) -> VM<'static> {
    let mut vm = vm_with_bytecode(bytecode);
    vm.current_call_frame.is_static = true;
    vm
}
