//! Jumps, loops, calls and returns.

use std::ops::ControlFlow;

use crate::backend::error::EvalResult;
use crate::backend::models::Value;
use crate::backend::runtime::{self, Args, Kwargs};

use super::UnitVM;

impl UnitVM<'_, '_> {
    pub(super) fn op_jump(&mut self) -> EvalResult<()> {
        let offset = self.read_i16()?;
        self.jump_by(offset);
        Ok(())
    }

    /// Pop a collection and start iterating it
    pub(super) fn op_get_iter(&mut self) -> EvalResult<()> {
        let collection = self.pop()?;
        let iter = runtime::iterate(&collection)?;
        self.push_iter(iter);
        Ok(())
    }

    /// Exhaustion is tested before the next element is taken
    pub(super) fn op_for_iter(&mut self) -> EvalResult<()> {
        let offset = self.read_i16()?;
        let iter = self.top_iter()?;
        match iter.next() {
            Some(item) => {
                self.push(item);
                Ok(())
            }
            None => {
                self.pop_iter()?;
                self.jump_by(offset);
                Ok(())
            }
        }
    }

    /// `call n`: stack holds the callee followed by n positional arguments
    pub(super) fn op_call(&mut self) -> EvalResult<()> {
        let argc = self.read_u8()? as usize;
        let args: Args = self.pop_n(argc)?.into_iter().collect();
        let callee = self.pop()?;
        let result = runtime::invoke(self.frame.thread(), &callee, args, Kwargs::new())?;
        self.push(result);
        Ok(())
    }

    pub(super) fn op_return(&mut self) -> EvalResult<ControlFlow<Value>> {
        let value = self.pop()?;
        Ok(ControlFlow::Break(value))
    }
}
