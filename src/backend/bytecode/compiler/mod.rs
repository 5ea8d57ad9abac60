//! Lowering engine
//!
//! Compiles a resolved function body into a [`CompiledUnit`]. Only a narrow
//! subset is accepted:
//! - statements: RETURN, EXPRESSION, DEF, FOR over a plain identifier
//! - expressions: CALL with positional arguments, IDENTIFIER, INT and
//!   STRING literals, `+`
//!
//! Anything else fails the whole function with
//! [`SpecializeError::UnsupportedConstruct`]; a body is either lowered
//! completely or not at all, and the caller keeps interpreting it.
//!
//! Nested DEF bodies are not lowered here. Each DEF registers its resolved
//! definition in the unit's function table and emits `MakeFunction`; the
//! closure it produces is specialized on its own when it is materialized.

mod statements;


use std::sync::Arc;

use super::chunk::{CompiledUnit, UnitBuilder};
use super::function_table::{FunctionTable, FunctionTableBuilder};
use super::opcodes::Opcode;
use crate::backend::error::{Construct, SpecializeError, SpecializeResult};
use crate::backend::models::Value;
use crate::backend::syntax::{
    Argument, BinaryOp, Expression, FunctionId, Identifier, ResolvedFunction, Scope,
};

/// Output of a successful lowering pass
#[derive(Debug)]
pub struct LoweredFunction {
    pub unit: CompiledUnit,
    pub functions: FunctionTable,
}

/// Lowering state for one function
pub struct Compiler {
    /// The unit being built
    pub(crate) builder: UnitBuilder,
    /// Nested definitions registered so far
    pub(crate) functions: FunctionTableBuilder,
    /// Function being lowered, for diagnostics
    function: FunctionId,
}

impl Compiler {
    pub fn new(def: &ResolvedFunction) -> Self {
        let mut builder = UnitBuilder::new(def.name(), def.id());
        builder.set_local_count(def.local_count());
        for (slot, param) in def.params().iter().enumerate() {
            builder.name_local(slot as u16, param);
        }
        Self {
            builder,
            functions: FunctionTableBuilder::new(),
            function: def.id(),
        }
    }

    /// Failure for a construct outside the supported subset
    pub(crate) fn unsupported(&self, construct: Construct) -> SpecializeError {
        SpecializeError::UnsupportedConstruct {
            function: self.function,
            construct,
        }
    }

    /// Compile an expression, leaving its value on the stack
    pub fn compile_expression(&mut self, expr: &Expression) -> SpecializeResult<()> {
        match expr {
            Expression::Identifier(ident) => self.compile_load(ident),

            Expression::IntLiteral(n) => self.compile_int(*n),

            Expression::StringLiteral(s) => {
                let idx = self.builder.add_constant(Value::String(Arc::clone(s)))?;
                self.builder.emit_u16(Opcode::PushConstant, idx);
                Ok(())
            }

            Expression::BinaryOperator { op, lhs, rhs } => {
                if *op != BinaryOp::Plus {
                    return Err(self.unsupported(Construct::Operator(op.symbol())));
                }
                self.compile_expression(lhs)?;
                self.compile_expression(rhs)?;
                self.builder.emit(Opcode::Add);
                Ok(())
            }

            Expression::Call { callee, args } => self.compile_call(callee, args),

            Expression::ListExpr(_) => Err(self.unsupported(Construct::Expression(expr.kind()))),
        }
    }

    /// Box an integer literal
    fn compile_int(&mut self, n: i64) -> SpecializeResult<()> {
        if (-128..=127).contains(&n) {
            self.builder.emit_byte(Opcode::PushIntSmall, n as i8 as u8);
        } else {
            let idx = self.builder.add_constant(Value::Int(n))?;
            self.builder.emit_u16(Opcode::PushConstant, idx);
        }
        Ok(())
    }

    /// Callee first, then positional arguments left to right
    fn compile_call(&mut self, callee: &Expression, args: &[Argument]) -> SpecializeResult<()> {
        let argc = u8::try_from(args.len()).map_err(|_| SpecializeError::TooManyArguments(args.len()))?;

        self.compile_expression(callee)?;
        for arg in args {
            match arg {
                Argument::Positional(value) => self.compile_expression(value)?,
                Argument::Keyword { name, .. } => {
                    return Err(self.unsupported(Construct::KeywordArgument(name.to_string())))
                }
            }
        }
        self.builder.emit_byte(Opcode::Call, argc);
        Ok(())
    }

    fn compile_load(&mut self, ident: &Identifier) -> SpecializeResult<()> {
        let binding = &ident.binding;
        match binding.scope {
            Scope::Local => {
                self.builder.name_local(binding.index, &binding.name);
                self.builder.emit_u16(Opcode::LoadLocal, binding.index);
            }
            Scope::Global => {
                self.builder.name_global(binding.index, &binding.name);
                self.builder.emit_u16(Opcode::LoadGlobal, binding.index);
            }
            Scope::Universal => {
                let idx = self.builder.add_name(&binding.name)?;
                self.builder.emit_u16(Opcode::LoadUniversal, idx);
            }
        }
        Ok(())
    }

    /// Pop the top of stack into an identifier
    pub(crate) fn compile_store(&mut self, ident: &Identifier) -> SpecializeResult<()> {
        let binding = &ident.binding;
        match binding.scope {
            Scope::Local => {
                self.builder.name_local(binding.index, &binding.name);
                self.builder.emit_u16(Opcode::StoreLocal, binding.index);
            }
            Scope::Global => {
                self.builder.name_global(binding.index, &binding.name);
                self.builder.emit_u16(Opcode::StoreGlobal, binding.index);
            }
            Scope::Universal => return Err(self.unsupported(Construct::Assignment)),
        }
        Ok(())
    }

    /// Finish compilation; falling off the end returns None
    pub fn finish(mut self) -> LoweredFunction {
        self.builder.emit(Opcode::PushNone);
        self.builder.emit(Opcode::Return);
        LoweredFunction {
            unit: self.builder.build(),
            functions: self.functions.build(),
        }
    }
}

/// Lower a resolved function
pub fn compile(def: &ResolvedFunction) -> SpecializeResult<LoweredFunction> {
    let mut compiler = Compiler::new(def);
    compiler.compile_block(def.body())?;
    Ok(compiler.finish())
}
