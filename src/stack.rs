//! The 1024-slot, 256-bit-word LIFO operand stack.

use ethereum_types::U256;

use crate::constants::STACK_LIMIT;
use crate::errors::{ExceptionalHalt, VMError};

#[derive(Debug, Clone, Default)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(STACK_LIMIT),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        self.values.push(value);
        Ok(())
    }

    pub fn push_zero(&mut self) -> Result<(), VMError> {
        self.push(U256::zero())
    }

    /// Pop `N` values off the top of the stack into an array, top-first
    /// (`out[0]` is what was on top). `N` is almost always inferred from an
    /// array-destructuring call site, e.g. `let [a, b] = *stack.pop()?;`.
    pub fn pop<const N: usize>(&mut self) -> Result<[U256; N], VMError> {
        if self.values.len() < N {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            // SAFETY: length checked above, so this never hits the None arm.
            *slot = self.values.pop().ok_or(ExceptionalHalt::StackUnderflow)?;
        }
        Ok(out)
    }

    /// Peek the value `depth` slots from the top, 0-indexed (depth 0 is the
    /// top of the stack).
    pub fn peek(&self, depth: usize) -> Result<U256, VMError> {
        let len = self.values.len();
        if depth >= len {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        self.values
            .get(len - 1 - depth)
            .copied()
            .ok_or_else(|| ExceptionalHalt::StackUnderflow.into())
    }

    /// DUP_n: duplicate the value `n` slots down (1-indexed) onto the top.
    pub fn dup(&mut self, n: usize) -> Result<(), VMError> {
        let value = self.peek(n - 1)?;
        self.push(value)
    }

    /// SWAP_n: exchange the top of the stack with the value `n` slots down.
    pub fn swap(&mut self, n: usize) -> Result<(), VMError> {
        let len = self.values.len();
        if n >= len {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        self.values.swap(len - 1, len - 1 - n);
        Ok(())
    }

    pub fn set_top(&mut self, value: U256) -> Result<(), VMError> {
        let len = self.values.len();
        let slot = self
            .values
            .last_mut()
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let _ = len;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let mut s = Stack::new();
        s.push(U256::from(42)).unwrap();
        let [v] = s.pop().unwrap();
        assert_eq!(v, U256::from(42));
    }

    #[test]
    fn pop_empty_underflows() {
        let mut s = Stack::new();
        assert_eq!(s.pop::<1>(), Err(ExceptionalHalt::StackUnderflow.into()));
    }

    #[test]
    fn pop_array_order_is_top_first() {
        let mut s = Stack::new();
        s.push(U256::from(1)).unwrap();
        s.push(U256::from(2)).unwrap();
        let [top, second] = s.pop().unwrap();
        assert_eq!(top, U256::from(2));
        assert_eq!(second, U256::from(1));
    }

    #[test]
    fn overflow_at_1024() {
        let mut s = Stack::new();
        for i in 0..STACK_LIMIT {
            s.push(U256::from(i)).unwrap();
        }
        assert_eq!(s.push(U256::one()), Err(ExceptionalHalt::StackOverflow.into()));
    }

    #[test]
    fn dup_and_swap() {
        let mut s = Stack::new();
        s.push(U256::from(1)).unwrap();
        s.push(U256::from(2)).unwrap();
        s.dup(2).unwrap();
        assert_eq!(s.peek(0).unwrap(), U256::from(1));
        s.swap(2).unwrap();
        assert_eq!(s.peek(0).unwrap(), U256::from(2));
    }
}
