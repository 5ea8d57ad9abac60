//! Stack helpers and immediate decoding for the executor.

use crate::backend::error::EvalResult;
use crate::backend::models::Value;
use crate::backend::runtime::ValueIter;

use super::UnitVM;

impl UnitVM<'_, '_> {
    // === Value Stack ===

    #[inline]
    pub(super) fn push(&mut self, value: Value) {
        self.value_stack.push(value);
    }

    #[inline]
    pub(super) fn pop(&mut self) -> EvalResult<Value> {
        match self.value_stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.defect("value stack underflow")),
        }
    }

    /// Pop the top `n` values, oldest first
    pub(super) fn pop_n(&mut self, n: usize) -> EvalResult<Vec<Value>> {
        let len = self.value_stack.len();
        if n > len {
            return Err(self.defect("value stack underflow"));
        }
        Ok(self.value_stack.split_off(len - n))
    }

    // === Iterator Stack ===

    #[inline]
    pub(super) fn push_iter(&mut self, iter: ValueIter) {
        self.iter_stack.push(iter);
    }

    #[inline]
    pub(super) fn top_iter(&mut self) -> EvalResult<&mut ValueIter> {
        if self.iter_stack.is_empty() {
            return Err(self.defect("iterator stack underflow"));
        }
        let top = self.iter_stack.len() - 1;
        Ok(&mut self.iter_stack[top])
    }

    #[inline]
    pub(super) fn pop_iter(&mut self) -> EvalResult<ValueIter> {
        match self.iter_stack.pop() {
            Some(iter) => Ok(iter),
            None => Err(self.defect("iterator stack underflow")),
        }
    }

    // === Bytecode Reading Helpers ===

    #[inline]
    pub(super) fn read_u8(&mut self) -> EvalResult<u8> {
        let byte = self
            .unit
            .read_byte(self.ip)
            .ok_or_else(|| self.defect("truncated immediate"))?;
        self.ip += 1;
        Ok(byte)
    }

    #[inline]
    pub(super) fn read_i8(&mut self) -> EvalResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    #[inline]
    pub(super) fn read_u16(&mut self) -> EvalResult<u16> {
        let value = self
            .unit
            .read_u16(self.ip)
            .ok_or_else(|| self.defect("truncated immediate"))?;
        self.ip += 2;
        Ok(value)
    }

    #[inline]
    pub(super) fn read_i16(&mut self) -> EvalResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Move the instruction pointer by a decoded jump offset
    #[inline]
    pub(super) fn jump_by(&mut self, offset: i16) {
        self.ip = (self.ip as isize + offset as isize) as usize;
    }
}
