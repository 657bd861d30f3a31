//! The world-state interface the interpreter reads and writes through, plus
//! an in-memory reference implementation used by tests and standalone
//! embedding.

use bytes::Bytes;
use ethereum_types::{H256, U256};
use rustc_hash::FxHashMap;
use sha3::{Digest, Keccak256};

use crate::account::{Address, AccountState};
use crate::errors::DatabaseError;

/// World-state access the interpreter needs: account/storage/code reads and
/// writes, block-hash lookups for BLOCKHASH, and the snapshot/batch
/// machinery CALL/CREATE revert semantics are built on.
///
/// Snapshots and batches are orthogonal: a snapshot is the interpreter's
/// revert point for one call frame, while a batch groups a sequence of
/// snapshots (e.g. one transaction, or a block of them) for a host that
/// wants to commit or discard them as a unit. The interpreter itself only
/// ever drives snapshots; batches exist for callers that need coarser
/// control and are never opened implicitly by the core.
pub trait Database: Send + Sync {
    fn get_account_state(&self, address: Address) -> Result<AccountState, DatabaseError>;
    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError>;
    fn get_account_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError>;

    fn set_account_state(&mut self, address: Address, state: AccountState)
    -> Result<(), DatabaseError>;
    fn set_storage_value(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), DatabaseError>;
    fn set_account_code(&mut self, code_hash: H256, code: Bytes) -> Result<(), DatabaseError>;
    fn remove_account(&mut self, address: Address) -> Result<(), DatabaseError>;

    /// Open a new snapshot and return its id. Every write after this call is
    /// attributed to the snapshot until it is committed or reverted.
    fn create_snapshot(&mut self) -> usize;
    /// Discard every write made since `id` was created.
    fn revert_to_snapshot(&mut self, id: usize) -> Result<(), DatabaseError>;
    /// Fold the writes made since `id` into the enclosing snapshot (or into
    /// committed state, if `id` is the outermost one).
    fn commit_snapshot(&mut self, id: usize) -> Result<(), DatabaseError>;

    fn begin_batch(&mut self) -> Result<(), DatabaseError>;
    fn commit_batch(&mut self) -> Result<(), DatabaseError>;
    fn rollback_batch(&mut self) -> Result<(), DatabaseError>;

    fn get_state_root(&self) -> Result<H256, DatabaseError>;
    /// Flush all committed (non-snapshotted) state to durable storage, if
    /// this implementation has any beyond the in-process copy.
    fn commit_changes(&mut self) -> Result<(), DatabaseError>;
}

#[derive(Debug, Clone, Default)]
struct WorldState {
    accounts: FxHashMap<Address, AccountState>,
    storage: FxHashMap<(Address, H256), U256>,
    code: FxHashMap<H256, Bytes>,
}

/// A plain, non-persistent [`Database`] backed by hash maps, with snapshots
/// implemented as a stack of full-state checkpoints. Adequate for tests and
/// for embedding this core without a real backing store; not intended to
/// scale to mainnet-sized state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: WorldState,
    snapshots: Vec<WorldState>,
    block_hashes: FxHashMap<u64, H256>,
    batch_backup: Option<WorldState>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block_hash(&mut self, number: u64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }
}

impl Database for InMemoryDatabase {
    fn get_account_state(&self, address: Address) -> Result<AccountState, DatabaseError> {
        Ok(self.state.accounts.get(&address).cloned().unwrap_or_default())
    }

    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        Ok(self
            .state
            .storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default())
    }

    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError> {
        self.block_hashes
            .get(&block_number)
            .copied()
            .ok_or_else(|| DatabaseError::NotFound(format!("block hash for {block_number}")))
    }

    fn get_account_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        if code_hash == crate::constants::EMPTY_CODE_HASH {
            return Ok(Bytes::new());
        }
        self.state
            .code
            .get(&code_hash)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("code {code_hash:?}")))
    }

    fn set_account_state(
        &mut self,
        address: Address,
        state: AccountState,
    ) -> Result<(), DatabaseError> {
        self.state.accounts.insert(address, state);
        Ok(())
    }

    fn set_storage_value(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), DatabaseError> {
        if value.is_zero() {
            self.state.storage.remove(&(address, key));
        } else {
            self.state.storage.insert((address, key), value);
        }
        Ok(())
    }

    fn set_account_code(&mut self, code_hash: H256, code: Bytes) -> Result<(), DatabaseError> {
        self.state.code.insert(code_hash, code);
        Ok(())
    }

    fn remove_account(&mut self, address: Address) -> Result<(), DatabaseError> {
        self.state.accounts.remove(&address);
        self.state.storage.retain(|(a, _), _| *a != address);
        Ok(())
    }

    fn create_snapshot(&mut self) -> usize {
        self.snapshots.push(self.state.clone());
        self.snapshots.len() - 1
    }

    fn revert_to_snapshot(&mut self, id: usize) -> Result<(), DatabaseError> {
        if id >= self.snapshots.len() {
            return Err(DatabaseError::NotFound(format!("snapshot {id}")));
        }
        self.state = self.snapshots.split_off(id).remove(0);
        Ok(())
    }

    fn commit_snapshot(&mut self, id: usize) -> Result<(), DatabaseError> {
        if id >= self.snapshots.len() {
            return Err(DatabaseError::NotFound(format!("snapshot {id}")));
        }
        self.snapshots.truncate(id);
        Ok(())
    }

    fn begin_batch(&mut self) -> Result<(), DatabaseError> {
        if self.batch_backup.is_some() {
            return Err(DatabaseError::ResourceError(
                "a batch is already open".into(),
            ));
        }
        self.batch_backup = Some(self.state.clone());
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<(), DatabaseError> {
        self.batch_backup
            .take()
            .map(|_| ())
            .ok_or_else(|| DatabaseError::ResourceError("no batch is open".into()))
    }

    fn rollback_batch(&mut self) -> Result<(), DatabaseError> {
        let backup = self
            .batch_backup
            .take()
            .ok_or_else(|| DatabaseError::ResourceError("no batch is open".into()))?;
        self.state = backup;
        Ok(())
    }

    fn get_state_root(&self) -> Result<H256, DatabaseError> {
        // Not a real Merkle-Patricia root: a content hash of the committed
        // state, sufficient for tests and for detecting divergence, not for
        // interop with a trie-based peer.
        let mut accounts: Vec<_> = self.state.accounts.iter().collect();
        accounts.sort_by_key(|(addr, _)| **addr);
        let mut hasher = Keccak256::new();
        for (address, state) in accounts {
            hasher.update(address.as_bytes());
            hasher.update(state.balance.to_string().as_bytes());
            hasher.update(state.nonce.to_le_bytes());
            hasher.update(state.code_hash.as_bytes());
        }
        Ok(H256::from_slice(&hasher.finalize()))
    }

    fn commit_changes(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_revert_discards_writes() {
        let mut db = InMemoryDatabase::new();
        let addr = Address::from_low_u64_be(1);
        db.set_account_state(addr, AccountState::new(U256::from(100), 0, H256::zero()))
            .unwrap();
        let snap = db.create_snapshot();
        db.set_account_state(addr, AccountState::new(U256::from(999), 0, H256::zero()))
            .unwrap();
        db.revert_to_snapshot(snap).unwrap();
        assert_eq!(db.get_account_state(addr).unwrap().balance, U256::from(100));
    }

    #[test]
    fn snapshot_commit_keeps_writes() {
        let mut db = InMemoryDatabase::new();
        let addr = Address::from_low_u64_be(2);
        let snap = db.create_snapshot();
        db.set_account_state(addr, AccountState::new(U256::from(5), 1, H256::zero()))
            .unwrap();
        db.commit_snapshot(snap).unwrap();
        assert_eq!(db.get_account_state(addr).unwrap().nonce, 1);
    }

    #[test]
    fn batch_without_open_errors() {
        let mut db = InMemoryDatabase::new();
        assert!(db.commit_batch().is_err());
        assert!(db.rollback_batch().is_err());
    }
}
