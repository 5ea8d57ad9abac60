//! Resolved syntax tree
//!
//! This module defines the tree the specializer consumes: a function body
//! whose identifiers have already been classified by the resolver into one
//! of three storage scopes with a slot index. Everything here is immutable
//! once built and is shared behind `Arc` between the interpreter, the
//! bytecode compiler and every Callable created from a definition.
//!
//! The resolver itself lives outside this crate. Hosts (and tests) build
//! trees with [`FunctionBuilder`] and the small constructor helpers on
//! [`Expression`] and [`Statement`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Stable identity key of a resolved function
///
/// Allocated from a process-wide counter when a [`ResolvedFunction`] is built,
/// so two definitions never share a key even when they have the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

static NEXT_FUNCTION_ID: AtomicU32 = AtomicU32::new(1);

impl FunctionId {
    fn next() -> Self {
        FunctionId(NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage scope of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Process-wide builtin, looked up by name
    Universal,
    /// Slot in the executing Callable's own slot array
    Global,
    /// Slot in the executing Frame's local array
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Universal => "universal",
            Scope::Global => "global",
            Scope::Local => "local",
        };
        f.write_str(s)
    }
}

/// Scope classification attached to an identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub scope: Scope,
    /// Name of the identifier. Storage uses it only for `Universal`.
    pub name: Arc<str>,
    /// Slot index. Ignored for `Universal`.
    pub index: u16,
}

/// An identifier occurrence together with its resolved binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub binding: Binding,
}

impl Identifier {
    pub fn local(name: &str, index: u16) -> Self {
        Self::new(Scope::Local, name, index)
    }

    pub fn global(name: &str, index: u16) -> Self {
        Self::new(Scope::Global, name, index)
    }

    pub fn universal(name: &str) -> Self {
        Self::new(Scope::Universal, name, 0)
    }

    pub fn new(scope: Scope, name: &str, index: u16) -> Self {
        Self {
            binding: Binding {
                scope,
                name: Arc::from(name),
                index,
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.binding.name
    }
}

/// Binary operator token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    EqualsEquals,
    Less,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::EqualsEquals => "==",
            BinaryOp::Less => "<",
        }
    }
}

/// A call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expression),
    Keyword { name: Arc<str>, value: Expression },
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    IntLiteral(i64),
    StringLiteral(Arc<str>),
    BinaryOperator {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Argument>,
    },
    ListExpr(Vec<Expression>),
}

/// Discriminant-only view of an expression, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Identifier,
    IntLiteral,
    StringLiteral,
    BinaryOperator,
    Call,
    ListExpr,
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Identifier(_) => ExpressionKind::Identifier,
            Expression::IntLiteral(_) => ExpressionKind::IntLiteral,
            Expression::StringLiteral(_) => ExpressionKind::StringLiteral,
            Expression::BinaryOperator { .. } => ExpressionKind::BinaryOperator,
            Expression::Call { .. } => ExpressionKind::Call,
            Expression::ListExpr(_) => ExpressionKind::ListExpr,
        }
    }

    pub fn int(value: i64) -> Self {
        Expression::IntLiteral(value)
    }

    pub fn string(value: &str) -> Self {
        Expression::StringLiteral(Arc::from(value))
    }

    pub fn local(name: &str, index: u16) -> Self {
        Expression::Identifier(Identifier::local(name, index))
    }

    pub fn global(name: &str, index: u16) -> Self {
        Expression::Identifier(Identifier::global(name, index))
    }

    pub fn universal(name: &str) -> Self {
        Expression::Identifier(Identifier::universal(name))
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::BinaryOperator {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::Plus, lhs, rhs)
    }

    /// Call with positional arguments only
    pub fn call(callee: Expression, args: Vec<Expression>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            args: args.into_iter().map(Argument::Positional).collect(),
        }
    }

    pub fn call_with(callee: Expression, args: Vec<Argument>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn list(items: Vec<Expression>) -> Self {
        Expression::ListExpr(items)
    }
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Return(Option<Expression>),
    Expression(Expression),
    Def {
        target: Identifier,
        function: Arc<ResolvedFunction>,
    },
    For {
        target: Expression,
        collection: Expression,
        body: Vec<Statement>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Assignment {
        target: Identifier,
        value: Expression,
    },
    Pass,
}

/// Discriminant-only view of a statement, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Return,
    Expression,
    Def,
    For,
    If,
    Assignment,
    Pass,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Return(_) => StatementKind::Return,
            Statement::Expression(_) => StatementKind::Expression,
            Statement::Def { .. } => StatementKind::Def,
            Statement::For { .. } => StatementKind::For,
            Statement::If { .. } => StatementKind::If,
            Statement::Assignment { .. } => StatementKind::Assignment,
            Statement::Pass => StatementKind::Pass,
        }
    }

    pub fn ret(value: Expression) -> Self {
        Statement::Return(Some(value))
    }

    pub fn ret_none() -> Self {
        Statement::Return(None)
    }

    pub fn expr(value: Expression) -> Self {
        Statement::Expression(value)
    }

    pub fn def(target: Identifier, function: Arc<ResolvedFunction>) -> Self {
        Statement::Def { target, function }
    }

    pub fn for_each(target: Identifier, collection: Expression, body: Vec<Statement>) -> Self {
        Statement::For {
            target: Expression::Identifier(target),
            collection,
            body,
        }
    }

    pub fn assign(target: Identifier, value: Expression) -> Self {
        Statement::Assignment { target, value }
    }
}

/// A function body with fully resolved bindings
///
/// Produced once by the resolver and never mutated afterwards. Parameters
/// occupy local slots `0..params.len()`.
#[derive(Debug, PartialEq)]
pub struct ResolvedFunction {
    id: FunctionId,
    name: Arc<str>,
    params: Vec<Arc<str>>,
    local_count: u16,
    body: Vec<Statement>,
}

impl ResolvedFunction {
    pub fn builder(name: &str) -> FunctionBuilder {
        FunctionBuilder::new(name)
    }

    #[inline]
    pub fn id(&self) -> FunctionId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }

    #[inline]
    pub fn local_count(&self) -> u16 {
        self.local_count
    }

    #[inline]
    pub fn body(&self) -> &[Statement] {
        &self.body
    }
}

/// Builder standing in for the resolver's output
#[derive(Debug)]
pub struct FunctionBuilder {
    name: Arc<str>,
    params: Vec<Arc<str>>,
    local_count: u16,
    body: Vec<Statement>,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            params: Vec::new(),
            local_count: 0,
            body: Vec::new(),
        }
    }

    /// Declare the next parameter; it takes the next local slot
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(Arc::from(name));
        self.local_count = self.local_count.max(self.params.len() as u16);
        self
    }

    /// Declare the total number of local slots (parameters included)
    pub fn locals(mut self, count: u16) -> Self {
        self.local_count = count.max(self.params.len() as u16);
        self
    }

    pub fn stmt(mut self, statement: Statement) -> Self {
        self.body.push(statement);
        self
    }

    pub fn body(mut self, statements: Vec<Statement>) -> Self {
        self.body.extend(statements);
        self
    }

    pub fn build(self) -> Arc<ResolvedFunction> {
        Arc::new(ResolvedFunction {
            id: FunctionId::next(),
            name: self.name,
            params: self.params,
            local_count: self.local_count,
            body: self.body,
        })
    }
}
