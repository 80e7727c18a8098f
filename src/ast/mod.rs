use std::fmt;
use std::sync::Arc;

mod evaluator;
mod operator;
mod parser;
mod symbols;
mod unresolved;

pub use evaluator::Evaluator;
pub use operator::{is_truthy, Associativity, Operator};
pub use parser::{MathParser, ParserConfig};
pub use symbols::SymbolTable;
pub use unresolved::Unresolved;

pub(crate) use symbols::EvalState;

/// Implementation of a 1-argument function such as `sin`.
pub type UnaryFunction = Arc<dyn Fn(f64) -> f64 + Send + Sync>;
/// Implementation of a 2-argument function or infix operator such as `atan2` or `+`.
pub type BinaryFunction = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// A node of a parsed expression.
///
/// Calls carry the function that was found for their name when the expression was parsed. A call
/// whose `op` is `None` is deferred: its name is looked up again on every evaluation.
#[derive(Clone)]
pub enum Token {
    Constant(f64),
    Variable(String),
    UnaryCall {
        op: Option<UnaryFunction>,
        name: String,
        arg: Box<Token>,
    },
    BinaryCall {
        op: Option<BinaryFunction>,
        name: String,
        arg1: Box<Token>,
        arg2: Box<Token>,
    },
    Conditional {
        condition: Box<Token>,
        then: Box<Token>,
        otherwise: Box<Token>,
    },
}

impl Token {
    /// Builds a 1-argument call, folding it to a constant when `op` is known and `arg` is constant.
    pub fn unary_call(op: Option<UnaryFunction>, name: impl Into<String>, arg: Token) -> Token {
        match (op, arg) {
            (Some(op), Token::Constant(value)) => Token::Constant(op(value)),
            (op, arg) => Token::UnaryCall {
                op,
                name: name.into(),
                arg: Box::new(arg),
            },
        }
    }

    /// Builds a 2-argument call, folding it to a constant when `op` is known and both arguments
    /// are constant.
    pub fn binary_call(
        op: Option<BinaryFunction>,
        name: impl Into<String>,
        arg1: Token,
        arg2: Token,
    ) -> Token {
        match (op, arg1, arg2) {
            (Some(op), Token::Constant(lhs), Token::Constant(rhs)) => Token::Constant(op(lhs, rhs)),
            (op, arg1, arg2) => Token::BinaryCall {
                op,
                name: name.into(),
                arg1: Box::new(arg1),
                arg2: Box::new(arg2),
            },
        }
    }

    /// Builds an `if(condition, then, otherwise)` node, selecting the branch right away when the
    /// condition is already constant.
    pub fn conditional(condition: Token, then: Token, otherwise: Token) -> Token {
        match condition {
            Token::Constant(value) if is_truthy(value) => then,
            Token::Constant(_) => otherwise,
            condition => Token::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
        }
    }

    /// Names in this tree that had no implementation when it was parsed.
    pub fn unresolved(&self) -> Unresolved {
        Unresolved::of(self)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Constant(value) => write!(f, "{:?}", value),
            Token::Variable(name) => write!(f, "{}", name),
            Token::UnaryCall { name, arg, .. } => write!(f, "{}({})", name, arg),
            Token::BinaryCall {
                name, arg1, arg2, ..
            } => write!(f, "{}({}, {})", name, arg1, arg2),
            Token::Conditional {
                condition,
                then,
                otherwise,
            } => write!(f, "if({}, {}, {})", condition, then, otherwise),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Token::Variable(name) => f.debug_tuple("Variable").field(name).finish(),
            Token::UnaryCall { op, name, arg } => f
                .debug_struct("UnaryCall")
                .field("resolved", &op.is_some())
                .field("name", name)
                .field("arg", arg)
                .finish(),
            Token::BinaryCall {
                op,
                name,
                arg1,
                arg2,
            } => f
                .debug_struct("BinaryCall")
                .field("resolved", &op.is_some())
                .field("name", name)
                .field("arg1", arg1)
                .field("arg2", arg2)
                .finish(),
            Token::Conditional {
                condition,
                then,
                otherwise,
            } => f
                .debug_struct("Conditional")
                .field("condition", condition)
                .field("then", then)
                .field("otherwise", otherwise)
                .finish(),
        }
    }
}

/// Structural equality. Function handles have no identity, so calls only compare whether they
/// were resolved.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Constant(a), Token::Constant(b)) => a == b,
            (Token::Variable(a), Token::Variable(b)) => a == b,
            (
                Token::UnaryCall { op, name, arg },
                Token::UnaryCall {
                    op: other_op,
                    name: other_name,
                    arg: other_arg,
                },
            ) => op.is_some() == other_op.is_some() && name == other_name && arg == other_arg,
            (
                Token::BinaryCall {
                    op,
                    name,
                    arg1,
                    arg2,
                },
                Token::BinaryCall {
                    op: other_op,
                    name: other_name,
                    arg1: other_arg1,
                    arg2: other_arg2,
                },
            ) => {
                op.is_some() == other_op.is_some()
                    && name == other_name
                    && arg1 == other_arg1
                    && arg2 == other_arg2
            }
            (
                Token::Conditional {
                    condition,
                    then,
                    otherwise,
                },
                Token::Conditional {
                    condition: other_condition,
                    then: other_then,
                    otherwise: other_otherwise,
                },
            ) => condition == other_condition && then == other_then && otherwise == other_otherwise,
            _ => false,
        }
    }
}
