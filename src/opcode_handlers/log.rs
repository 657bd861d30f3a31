use ethereum_types::H256;

use crate::{
    account::LogEntry,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas,
    memory::calculate_memory_size,
    utils::u256_to_usize,
    vm::VM,
};

// Logging Operations
// Opcodes: LOG0, LOG1, LOG2, LOG3, LOG4

impl<'a> VM<'a> {
    /// Generic LOG_n, monomorphized at compile time for the topic count.
    pub fn op_log<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;
        let size = u256_to_usize(size)?;

        let topics: [H256; N] = {
            let mut topics = [H256::zero(); N];
            for topic in topics.iter_mut() {
                let [word] = current_call_frame.stack.pop()?;
                let mut bytes = [0u8; 32];
                word.to_big_endian(&mut bytes);
                *topic = H256::from(bytes);
            }
            topics
        };

        let current_memory_size = current_call_frame.memory.len();
        let new_memory_size = calculate_memory_size(offset, size)?;
        let topic_count = u64::try_from(N).unwrap_or(4);
        current_call_frame.increase_consumed_gas(gas::log(
            new_memory_size,
            current_memory_size,
            size,
            topic_count,
        )?)?;

        let data = current_call_frame.memory.load_range(offset, size)?;
        let address = current_call_frame.to;

        self.substate.add_log(LogEntry {
            address,
            topics: topics.to_vec(),
            data,
        });

        Ok(OpcodeResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::vm_with_bytecode;
    use bytes::Bytes;
    use ethereum_types::U256;

    #[test]
    fn log0_records_address_and_data() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(42)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_mstore().unwrap();

        vm.current_call_frame.stack.push(U256::from(32)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_log::<0>().unwrap();

        let logs = vm.substate.extract_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].topics.is_empty());
    }

    #[test]
    fn log2_records_two_topics_in_push_order() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.stack.push(U256::from(1)).unwrap();
        vm.current_call_frame.stack.push(U256::from(2)).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.op_log::<2>().unwrap();

        let logs = vm.substate.extract_logs();
        assert_eq!(logs[0].topics.len(), 2);
    }

    #[test]
    fn log_in_static_context_is_rejected() {
        let mut vm = vm_with_bytecode(Bytes::new());
        vm.current_call_frame.is_static = true;
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        vm.current_call_frame.stack.push(U256::zero()).unwrap();
        assert!(vm.op_log::<0>().is_err());
    }
}
