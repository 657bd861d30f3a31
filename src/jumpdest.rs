//! Static analysis of valid JUMP/JUMPI destinations.
//!
//! A destination is valid only if it lands on a `JUMPDEST` opcode that is
//! not itself embedded inside a `PUSHN` immediate. The analysis is a single
//! linear pass, cached per call frame so JUMP/JUMPI don't re-scan the whole
//! bytecode on every jump.

use bitvec::vec::BitVec;

use crate::opcodes::Opcode;

/// One bit per bytecode offset: `true` if that offset is a valid jump
/// destination.
pub fn analyze(bytecode: &[u8]) -> BitVec {
    let mut valid = BitVec::repeat(false, bytecode.len());
    let mut pc = 0usize;

    while pc < bytecode.len() {
        let Some(byte) = bytecode.get(pc).copied() else {
            break;
        };
        let opcode = Opcode::from(byte);

        if opcode == Opcode::JUMPDEST {
            if let Some(mut bit) = valid.get_mut(pc) {
                *bit = true;
            }
            pc = pc.wrapping_add(1);
            continue;
        }

        let push_size = push_immediate_size(byte);
        pc = pc.wrapping_add(1).wrapping_add(push_size);
    }

    valid
}

/// How many immediate bytes follow a `PUSHN` opcode (0 for anything else,
/// including `PUSH0`).
fn push_immediate_size(byte: u8) -> usize {
    const PUSH1: u8 = 0x60;
    const PUSH32: u8 = 0x7f;
    if (PUSH1..=PUSH32).contains(&byte) {
        usize::from(byte - PUSH1).wrapping_add(1)
    } else {
        0
    }
}

pub fn is_valid_jump_destination(valid: &BitVec, pc: usize) -> bool {
    valid.get(pc).is_some_and(|bit| *bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumpdest_inside_push_data_is_not_valid() {
        // PUSH1 0x5b (JUMPDEST's opcode value, here just push data)
        let bytecode = [0x60, 0x5b];
        let valid = analyze(&bytecode);
        assert!(!is_valid_jump_destination(&valid, 1));
    }

    #[test]
    fn real_jumpdest_after_push_is_valid() {
        // PUSH1 0x00, JUMPDEST
        let bytecode = [0x60, 0x00, 0x5b];
        let valid = analyze(&bytecode);
        assert!(is_valid_jump_destination(&valid, 2));
        assert!(!is_valid_jump_destination(&valid, 0));
    }

    #[test]
    fn out_of_bounds_pc_is_not_valid() {
        let valid = analyze(&[0x5b]);
        assert!(!is_valid_jump_destination(&valid, 50));
    }
}
