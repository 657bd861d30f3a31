//! Journaled, per-transaction execution state: access lists, transient
//! storage, logs, the self-destruct set and pending-refund counter.
//!
//! [`Substate`] snapshots itself on entry to a CALL/CREATE subframe and
//! either folds the child back into the parent on success or discards it on
//! revert, by holding the pre-call copy in a `parent` link (a journal stack
//! expressed as a linked list rather than a flat undo log).

use rustc_hash::{FxHashMap, FxHashSet};

use ethereum_types::{H256, U256};

use crate::account::{Address, LogEntry};

#[derive(Debug, Clone, Default)]
pub struct Substate {
    accessed_addresses: FxHashSet<Address>,
    accessed_storage_slots: FxHashMap<Address, FxHashSet<H256>>,
    selfdestruct_set: FxHashSet<Address>,
    created_accounts: FxHashSet<Address>,
    transient_storage: FxHashMap<(Address, H256), U256>,
    logs: Vec<LogEntry>,
    refunded_gas: i64,
    parent: Option<Box<Substate>>,
}

impl Substate {
    /// Seed a fresh substate with the addresses that are warm from the
    /// start of the transaction: the access list plus, per EIP-2929, the
    /// sender, the immediate recipient and (post-Shanghai, EIP-3651) the
    /// coinbase.
    pub fn new(warm_addresses: impl IntoIterator<Item = Address>) -> Self {
        let mut accessed_addresses = FxHashSet::default();
        accessed_addresses.extend(warm_addresses);
        Self {
            accessed_addresses,
            ..Default::default()
        }
    }

    /// Push a checkpoint: subsequent mutations happen on top of a clone of
    /// the current state, which can be thrown away wholesale on revert.
    pub fn push_backup(&mut self) {
        let snapshot = self.clone();
        self.parent = Some(Box::new(snapshot));
    }

    /// Keep the changes made since the last `push_backup`, discarding only
    /// the backup pointer (the child's accumulated state survives).
    pub fn commit_backup(&mut self) {
        if let Some(parent) = self.parent.take() {
            self.parent = parent.parent;
        }
    }

    /// Discard everything mutated since the last `push_backup`, restoring
    /// the prior snapshot. Logs, the selfdestruct set, created-account set
    /// and refund counter are rolled back; accessed-address/slot warmth is
    /// NOT rolled back (EIP-2929: an access that touched state stays warm
    /// even if the call that caused it reverts).
    pub fn revert_backup(&mut self) {
        let Some(parent) = self.parent.take() else {
            return;
        };
        let accessed_addresses = std::mem::take(&mut self.accessed_addresses);
        let accessed_storage_slots = std::mem::take(&mut self.accessed_storage_slots);
        *self = *parent;
        self.accessed_addresses = accessed_addresses;
        self.accessed_storage_slots = accessed_storage_slots;
    }

    pub fn add_accessed_address(&mut self, address: Address) -> bool {
        self.accessed_addresses.insert(address)
    }

    pub fn is_address_accessed(&self, address: &Address) -> bool {
        self.accessed_addresses.contains(address)
    }

    pub fn add_accessed_slot(&mut self, address: Address, slot: H256) -> bool {
        self.accessed_storage_slots
            .entry(address)
            .or_default()
            .insert(slot)
    }

    pub fn is_slot_accessed(&self, address: &Address, slot: &H256) -> bool {
        self.accessed_storage_slots
            .get(address)
            .is_some_and(|slots| slots.contains(slot))
    }

    pub fn add_selfdestruct(&mut self, address: Address) {
        self.selfdestruct_set.insert(address);
    }

    pub fn is_selfdestructed(&self, address: &Address) -> bool {
        self.selfdestruct_set.contains(address)
    }

    pub fn iter_selfdestruct(&self) -> impl Iterator<Item = &Address> {
        self.selfdestruct_set.iter()
    }

    pub fn add_created_account(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    pub fn is_account_created(&self, address: &Address) -> bool {
        self.created_accounts.contains(address)
    }

    pub fn get_transient(&self, address: &Address, slot: &H256) -> U256 {
        self.transient_storage
            .get(&(*address, *slot))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_transient(&mut self, address: Address, slot: H256, value: U256) {
        self.transient_storage.insert((address, slot), value);
    }

    pub fn add_log(&mut self, log: LogEntry) {
        self.logs.push(log);
    }

    pub fn extract_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }

    pub fn add_refund(&mut self, amount: i64) {
        self.refunded_gas = self.refunded_gas.saturating_add(amount);
    }

    pub fn refunded_gas(&self) -> i64 {
        self.refunded_gas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_keeps_warmth_but_drops_logs() {
        let mut s = Substate::default();
        let addr = Address::from_low_u64_be(1);
        s.push_backup();
        s.add_accessed_address(addr);
        s.add_log(LogEntry {
            address: addr,
            topics: vec![],
            data: bytes::Bytes::new(),
        });
        s.add_refund(100);
        s.revert_backup();
        assert!(s.is_address_accessed(&addr));
        assert!(s.extract_logs().is_empty());
        assert_eq!(s.refunded_gas(), 0);
    }

    #[test]
    fn commit_keeps_everything() {
        let mut s = Substate::default();
        let addr = Address::from_low_u64_be(2);
        s.push_backup();
        s.add_created_account(addr);
        s.commit_backup();
        assert!(s.is_account_created(&addr));
        assert!(s.parent.is_none());
    }
}
