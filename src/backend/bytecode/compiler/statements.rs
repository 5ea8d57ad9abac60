//! Statement lowering.
//!
//! The value stack is empty before and after every statement. FOR keeps its
//! iterator on the executor's iterator stack, so a RETURN inside a loop body
//! needs no cleanup.

use std::sync::Arc;

use crate::backend::bytecode::opcodes::Opcode;
use crate::backend::error::{Construct, SpecializeResult};
use crate::backend::syntax::{Expression, Identifier, ResolvedFunction, Statement};

use super::Compiler;

impl Compiler {
    pub(crate) fn compile_block(&mut self, body: &[Statement]) -> SpecializeResult<()> {
        body.iter().try_for_each(|statement| self.compile_statement(statement))
    }

    pub(crate) fn compile_statement(&mut self, statement: &Statement) -> SpecializeResult<()> {
        match statement {
            Statement::Return(value) => {
                match value {
                    Some(expr) => self.compile_expression(expr)?,
                    None => self.builder.emit(Opcode::PushNone),
                }
                self.builder.emit(Opcode::Return);
                Ok(())
            }

            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.builder.emit(Opcode::Pop);
                Ok(())
            }

            Statement::Def { target, function } => self.compile_def(target, function),

            Statement::For {
                target,
                collection,
                body,
            } => self.compile_for(target, collection, body),

            Statement::If { .. } | Statement::Assignment { .. } | Statement::Pass => {
                Err(self.unsupported(Construct::Statement(statement.kind())))
            }
        }
    }

    /// DEF: register the definition, then materialize and store a closure
    fn compile_def(
        &mut self,
        target: &Identifier,
        function: &Arc<ResolvedFunction>,
    ) -> SpecializeResult<()> {
        let id = self.functions.register(function);
        let idx = self.builder.add_function(id)?;
        self.builder.emit_u16(Opcode::MakeFunction, idx);
        self.compile_store(target)
    }

    /// FOR over a plain identifier target
    ///
    /// ```text
    ///         <collection>
    ///         get_iter
    /// loop:   for_iter -> end
    ///         store <target>
    ///         <body>
    ///         jump -> loop
    /// end:
    /// ```
    fn compile_for(
        &mut self,
        target: &Expression,
        collection: &Expression,
        body: &[Statement],
    ) -> SpecializeResult<()> {
        let Expression::Identifier(target) = target else {
            return Err(self.unsupported(Construct::LoopTarget(target.kind())));
        };

        self.compile_expression(collection)?;
        self.builder.emit(Opcode::GetIter);

        let loop_start = self.builder.current_offset();
        let exit = self.builder.emit_jump(Opcode::ForIter);
        self.compile_store(target)?;
        self.compile_block(body)?;
        self.builder.emit_loop(loop_start)?;
        self.builder.patch_jump(exit)
    }
}
