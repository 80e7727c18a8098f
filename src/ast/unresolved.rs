use crate::ast::Token;
use std::collections::BTreeSet;

/// Names left symbolic in a parsed expression, grouped by kind.
///
/// A non-empty result means evaluation needs caller-supplied symbols; use it to validate an
/// expression once before entering a hot evaluation loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unresolved {
    pub variables: BTreeSet<String>,
    pub unary_functions: BTreeSet<String>,
    pub binary_functions: BTreeSet<String>,
}

impl Unresolved {
    pub fn of(token: &Token) -> Self {
        let mut unresolved = Self::default();
        unresolved.collect(token);
        unresolved
    }

    fn collect(&mut self, token: &Token) {
        match token {
            Token::Constant(_) => {}
            Token::Variable(name) => {
                self.variables.insert(name.clone());
            }
            Token::UnaryCall { op, name, arg } => {
                if op.is_none() {
                    self.unary_functions.insert(name.clone());
                }
                self.collect(arg);
            }
            Token::BinaryCall {
                op,
                name,
                arg1,
                arg2,
            } => {
                if op.is_none() {
                    self.binary_functions.insert(name.clone());
                }
                self.collect(arg1);
                self.collect(arg2);
            }
            Token::Conditional {
                condition,
                then,
                otherwise,
            } => {
                self.collect(condition);
                self.collect(then);
                self.collect(otherwise);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of names across all three kinds.
    pub fn len(&self) -> usize {
        self.variables.len() + self.unary_functions.len() + self.binary_functions.len()
    }
}
