use crate::{
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    errors::{OpcodeResult, VMError},
    gas,
    utils::{address_to_word, u256_to_usize},
    vm::VM,
};
use ethereum_types::U256;

// Block Information (11)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT,
// CHAINID, SELFBALANCE, BASEFEE, BLOBHASH, BLOBBASEFEE

impl<'a> VM<'a> {
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::BLOCKHASH)?;
        let [block_number] = current_call_frame.stack.pop()?;

        let current_block_number = self.env.block.number;
        let hash = block_hash_in_range(block_number, current_block_number)
            .then(|| {
                let number = block_number.low_u64();
                self.db.get_block_hash(number).ok()
            })
            .flatten()
            .unwrap_or_default();

        self.current_call_frame
            .stack
            .push(U256::from_big_endian(hash.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VMError> {
        let coinbase = self.env.block.coinbase;
        self.current_call_frame.increase_consumed_gas(gas::COINBASE)?;
        self.current_call_frame.stack.push(address_to_word(coinbase))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VMError> {
        let timestamp = self.env.block.timestamp;
        self.current_call_frame.increase_consumed_gas(gas::TIMESTAMP)?;
        self.current_call_frame.stack.push(timestamp)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_number(&mut self) -> Result<OpcodeResult, VMError> {
        let number = self.env.block.number;
        self.current_call_frame.increase_consumed_gas(gas::NUMBER)?;
        self.current_call_frame.stack.push(number)?;

        Ok(OpcodeResult::Continue)
    }

    /// DIFFICULTY pre-Merge, PREVRANDAO from the Merge onward: both read the
    /// same header field, this core only models the post-Merge name.
    pub fn op_prevrandao(&mut self) -> Result<OpcodeResult, VMError> {
        let prevrandao = self.env.block.prevrandao;
        self.current_call_frame.increase_consumed_gas(gas::PREVRANDAO)?;
        self.current_call_frame
            .stack
            .push(U256::from_big_endian(prevrandao.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VMError> {
        let gas_limit = self.env.block.gas_limit;
        self.current_call_frame.increase_consumed_gas(gas::GASLIMIT)?;
        self.current_call_frame.stack.push(U256::from(gas_limit))?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_chainid(&mut self) -> Result<OpcodeResult, VMError> {
        let chain_id = self.env.block.chain_id;
        self.current_call_frame.increase_consumed_gas(gas::CHAINID)?;
        self.current_call_frame.stack.push(chain_id)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_selfbalance(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.current_call_frame.to;
        self.current_call_frame.increase_consumed_gas(gas::SELFBALANCE)?;
        let balance = self.db.get_account_state(address)?.balance;
        self.current_call_frame.stack.push(balance)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_basefee(&mut self) -> Result<OpcodeResult, VMError> {
        let base_fee = self.env.block.base_fee_per_gas;
        self.current_call_frame.increase_consumed_gas(gas::BASEFEE)?;
        self.current_call_frame.stack.push(base_fee)?;

        Ok(OpcodeResult::Continue)
    }

    /// [EIP-4844]: pushes the `index`th versioned hash of the transaction's
    /// blobs, or zero if `index` is out of range.
    pub fn op_blobhash(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas::BLOBHASH)?;
        let [index] = current_call_frame.stack.pop()?;

        let hash = u256_to_usize(index)
            .ok()
            .and_then(|index| self.env.block.blob_versioned_hashes.get(index))
            .map(|hash| U256::from_big_endian(hash.as_bytes()))
            .unwrap_or_default();

        self.current_call_frame.stack.push(hash)?;

        Ok(OpcodeResult::Continue)
    }

    /// [EIP-7516]: pushes the current block's blob base fee.
    pub fn op_blobbasefee(&mut self) -> Result<OpcodeResult, VMError> {
        let blob_base_fee = self.env.block.blob_base_fee;
        self.current_call_frame.increase_consumed_gas(gas::BLOBBASEFEE)?;
        self.current_call_frame.stack.push(blob_base_fee)?;

        Ok(OpcodeResult::Continue)
    }
}

/// BLOCKHASH only answers for the 256 blocks strictly before the current
/// one; anything older (or the current/future block) yields zero.
fn block_hash_in_range(requested: U256, current: U256) -> bool {
    if requested >= current {
        return false;
    }
    let Some(lower_bound) = current.checked_sub(U256::from(LAST_AVAILABLE_BLOCK_LIMIT)) else {
        return true;
    };
    requested >= lower_bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;

    #[test]
    fn blockhash_of_future_block_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.env.block.number = U256::from(10);
        vm.current_call_frame.stack.push(U256::from(20)).unwrap();
        vm.op_blockhash().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn blockhash_too_far_back_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.env.block.number = U256::from(1000);
        vm.current_call_frame.stack.push(U256::from(10)).unwrap();
        vm.op_blockhash().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn blobhash_out_of_range_is_zero() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(3)).unwrap();
        vm.op_blobhash().unwrap();
        let [result] = vm.current_call_frame.stack.pop().unwrap();
        assert_eq!(result, U256::zero());
    }
}
