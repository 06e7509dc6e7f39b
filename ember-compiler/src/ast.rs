//! The abstract syntax tree (spec §3 "Code & AST"): a tagged variant over
//! roughly thirty node kinds, each carrying the token span that produced it.

use ember_core::span::Span;
use ember_runtime::types::int::IntVal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Sqig,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(IntVal, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    None(Span),
    Var(String, Span),
    Attr(Box<Expr>, String, Span),
    Tuple(Vec<Expr>, Span),
    List(Vec<Expr>, Span),
    /// `{ key: value, ... }` (supplemented: §4.G's grammar is silent on a
    /// dict literal, but §8 scenario 5 builds one via `d = {}`).
    Dict(Vec<(Expr, Expr)>, Span),
    Call(Box<Expr>, Vec<Expr>, Span),
    Subscript(Box<Expr>, Vec<Expr>, Span),
    Binary(BinOp, Box<Expr>, Box<Expr>, Span),
    Unary(UnOp, Box<Expr>, Span),
    /// `lhs = rhs`. `lhs` must be a `Var`, `Attr`, or `Subscript`.
    Assign(Box<Expr>, Box<Expr>, Span),
    And(Box<Expr>, Box<Expr>, Span),
    Or(Box<Expr>, Box<Expr>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, s)
            | Expr::Float(_, s)
            | Expr::Str(_, s)
            | Expr::Bool(_, s)
            | Expr::None(s)
            | Expr::Var(_, s)
            | Expr::Attr(_, _, s)
            | Expr::Tuple(_, s)
            | Expr::List(_, s)
            | Expr::Dict(_, s)
            | Expr::Call(_, _, s)
            | Expr::Subscript(_, _, s)
            | Expr::Binary(_, _, _, s)
            | Expr::Unary(_, _, s)
            | Expr::Assign(_, _, s)
            | Expr::And(_, _, s)
            | Expr::Or(_, _, s) => *s,
        }
    }
}

/// A function literal: an ordered parameter name list plus a body statement
/// (commonly a braced block). Used by both `func name(params) stmt` and by
/// `type`'s member functions.
#[derive(Debug, Clone)]
pub struct FuncLit {
    pub name: String,
    pub params: Vec<String>,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Ret(Option<Expr>, Span),
    If {
        branches: Vec<(Expr, Stmt)>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Try {
        body: Box<Stmt>,
        catch_name: Option<String>,
        handler: Option<Box<Stmt>>,
        span: Span,
    },
    /// Sugar over an iterator obtained via the builtin `iter` (SPEC_FULL
    /// supplement 4). `vars` is one name (sequence element) or two (dict
    /// key, value).
    For {
        vars: Vec<String>,
        iter: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Func(FuncLit),
    Type {
        name: String,
        methods: Vec<FuncLit>,
        span: Span,
    },
    Block(Vec<Stmt>, Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::Ret(_, s)
            | Stmt::If { span: s, .. }
            | Stmt::While { span: s, .. }
            | Stmt::Try { span: s, .. }
            | Stmt::For { span: s, .. }
            | Stmt::Type { span: s, .. }
            | Stmt::Block(_, s) => *s,
            Stmt::Func(f) => f.span,
        }
    }
}
