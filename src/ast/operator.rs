use crate::ast::{BinaryFunction, Token};
use std::sync::Arc;

/// Truth value of a number: anything other than zero or NaN.
pub fn is_truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn from_bool(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Infix operators recognized by the grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    And,
    Or,
}

impl Operator {
    /// Applies the operator with IEEE-754 semantics; comparisons and logical operators yield
    /// `1.0` or `0.0`.
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
            Operator::Power => left.powf(right),
            Operator::GreaterThan => from_bool(left > right),
            Operator::LessThan => from_bool(left < right),
            Operator::GreaterThanOrEqual => from_bool(left >= right),
            Operator::LessThanOrEqual => from_bool(left <= right),
            Operator::Equal => from_bool(left == right),
            Operator::And => from_bool(is_truthy(left) && is_truthy(right)),
            Operator::Or => from_bool(is_truthy(left) || is_truthy(right)),
        }
    }

    /// Canonical symbol, used as the name of the call node built for this operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Equal => "==",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    pub fn associativity(&self) -> Associativity {
        match self {
            Operator::Power => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    pub fn function(self) -> BinaryFunction {
        Arc::new(move |left, right| self.apply(left, right))
    }

    /// Combines two operands: folds them into a constant when both are constant, otherwise builds
    /// a resolved call node named after the operator.
    pub fn reduce(self, lhs: Token, rhs: Token) -> Token {
        Token::binary_call(Some(self.function()), self.symbol(), lhs, rhs)
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" | "×" => Ok(Operator::Multiply),
            "/" | "÷" => Ok(Operator::Divide),
            "^" => Ok(Operator::Power),
            ">" => Ok(Operator::GreaterThan),
            "<" => Ok(Operator::LessThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "<=" => Ok(Operator::LessThanOrEqual),
            "==" => Ok(Operator::Equal),
            "&&" => Ok(Operator::And),
            "||" => Ok(Operator::Or),
            _ => Err(format!("Unknown operator: {}", value)),
        }
    }
}

/// Grouping rule for a chain of operators of the same precedence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Associativity {
    /// `((a op b) op c) op d`
    Left,
    /// `a op (b op (c op d))`
    Right,
}

impl Associativity {
    /// Reduces `first (op operand)*` into a single token.
    pub fn fold(self, first: Token, rest: Vec<(Operator, Token)>) -> Token {
        match self {
            Associativity::Left => rest
                .into_iter()
                .fold(first, |lhs, (operator, rhs)| operator.reduce(lhs, rhs)),
            Associativity::Right => {
                let mut pending = Vec::with_capacity(rest.len());
                let mut last = first;
                for (operator, operand) in rest {
                    pending.push((last, operator));
                    last = operand;
                }
                pending
                    .into_iter()
                    .rev()
                    .fold(last, |rhs, (lhs, operator)| operator.reduce(lhs, rhs))
            }
        }
    }
}
