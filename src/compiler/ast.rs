use std::fmt;

use crate::common::data::Data;
use crate::common::span::Spanned;

/// A sequence of statements, as produced for the whole program
/// and for each braced body.
pub type Block = Vec<Spanned<Stmt>>;

/// One `cond { body }` arm of an `if` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub cond: Spanned<Expr>,
    pub body: Block,
}

/// The statement sort of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Spanned<Expr>),
    Let { name: Spanned<String>, value: Spanned<Expr> },
    Assign { name: Spanned<String>, value: Spanned<Expr> },
    Fn { name: Spanned<String>, params: Vec<Spanned<String>>, body: Block },
    Return(Option<Spanned<Expr>>),
    If { clauses: Vec<IfClause>, otherwise: Option<Block> },
    While { cond: Spanned<Expr>, body: Block },
    For { binding: Spanned<String>, iter: Spanned<Expr>, body: Block },
    Break,
    Continue,
}

/// The expression sort of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Boolean(bool),
    Str(String),
    Symbol(String),
    List(Vec<Spanned<Expr>>),
    Map(Vec<(Spanned<Expr>, Spanned<Expr>)>),
    Prefix(Prefix, Box<Spanned<Expr>>),
    Infix(Infix, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Call { callee: Box<Spanned<Expr>>, args: Vec<Spanned<Expr>> },
    Index { item: Box<Spanned<Expr>>, index: Box<Spanned<Expr>> },
}

impl Expr {
    pub fn prefix(op: Prefix, operand: Spanned<Expr>) -> Expr {
        Expr::Prefix(op, Box::new(operand))
    }

    pub fn infix(op: Infix, left: Spanned<Expr>, right: Spanned<Expr>) -> Expr {
        Expr::Infix(op, Box::new(left), Box::new(right))
    }

    pub fn call(callee: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Expr {
        Expr::Call { callee: Box::new(callee), args }
    }

    pub fn index(item: Spanned<Expr>, index: Spanned<Expr>) -> Expr {
        Expr::Index { item: Box::new(item), index: Box::new(index) }
    }
}

/// Prefix operators. There is exactly one, but diagnostics and the
/// printer treat it like any other operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Negate,
}

/// Infix operators. `/` and `//` are kept apart here so the printer can
/// reproduce the source; they compile to the same division instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infix {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
}

impl fmt::Display for Infix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Infix::Add => "+",
            Infix::Sub => "-",
            Infix::Mul => "*",
            Infix::Div => "/",
            Infix::FloorDiv => "//",
            Infix::Eq => "==",
            Infix::Gt => ">",
            Infix::Lt => "<",
            Infix::Ge => ">=",
            Infix::Le => "<=",
            Infix::And => "and",
            Infix::Or => "or",
        };
        write!(f, "{}", op)
    }
}

impl fmt::Display for Expr {
    /// Prints a fully parenthesised form of the expression.
    /// Re-parsing the result yields an equivalent tree, whatever the
    /// precedence of the operators involved.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{}", n),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Str(s) => write!(f, "{}", Data::String(s.clone().into_bytes()).repr()),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.item)?;
                }
                write!(f, "]")
            }
            Expr::Map(pairs) => {
                write!(f, "{{")?;
                for (index, (key, value)) in pairs.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.item, value.item)?;
                }
                write!(f, "}}")
            }
            Expr::Prefix(Prefix::Negate, operand) => write!(f, "(-{})", operand.item),
            Expr::Infix(op, left, right) => {
                write!(f, "({} {} {})", left.item, op, right.item)
            }
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee.item)?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.item)?;
                }
                write!(f, ")")
            }
            Expr::Index { item, index } => write!(f, "{}[{}]", item.item, index.item),
        }
    }
}
