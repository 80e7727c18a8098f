use crate::ast::{is_truthy, EvalState, SymbolTable, Token, Unresolved};
use crate::error::{MathParserError, MathParserResult};
use crate::functions::default_symbols;
use log::trace;
use rayon::prelude::*;
use std::sync::Arc;

impl Token {
    /// Walks the tree post-order, resolving deferred names through `state`.
    pub(crate) fn eval(&self, state: &EvalState<'_>) -> MathParserResult<f64> {
        match self {
            Token::Constant(value) => Ok(*value),
            Token::Variable(name) => state
                .variable(name)
                .ok_or_else(|| MathParserError::VariableNotFound(name.clone())),
            Token::UnaryCall { op, name, arg } => {
                let value = arg.eval(state)?;
                match op.as_ref().or_else(|| state.unary_function(name)) {
                    Some(function) => Ok(function(value)),
                    None => Err(MathParserError::FunctionNotFound(name.clone())),
                }
            }
            Token::BinaryCall {
                op,
                name,
                arg1,
                arg2,
            } => {
                let lhs = arg1.eval(state)?;
                let rhs = arg2.eval(state)?;
                match op.as_ref().or_else(|| state.binary_function(name)) {
                    Some(function) => Ok(function(lhs, rhs)),
                    None => Err(MathParserError::FunctionNotFound(name.clone())),
                }
            }
            Token::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if is_truthy(condition.eval(state)?) {
                    then.eval(state)
                } else {
                    otherwise.eval(state)
                }
            }
        }
    }
}

/// A parsed expression ready to be evaluated any number of times.
///
/// Holds the parsed tree and a snapshot of the parser's own symbols taken when the expression was
/// parsed. Cloning is cheap and evaluation never mutates anything, so one `Evaluator` can be shared
/// across threads.
///
/// The plain methods (`value`, `eval`, `eval_variable`) are best-effort: any failure is reported
/// as NaN. Use the `*_result` variants to tell a missing symbol apart from a NaN result.
#[derive(Clone, Debug)]
pub struct Evaluator {
    token: Arc<Token>,
    symbols: Arc<SymbolTable>,
}

impl Evaluator {
    pub(crate) fn new(token: Token, symbols: Arc<SymbolTable>) -> Self {
        Self {
            token: Arc::new(token),
            symbols,
        }
    }

    fn scope(&self) -> EvalState<'_> {
        EvalState::new(&self.symbols, default_symbols())
    }

    fn or_nan(result: MathParserResult<f64>) -> f64 {
        result.unwrap_or_else(|error| {
            trace!("Evaluation failed: {}", error);
            f64::NAN
        })
    }

    /// Evaluates using only the parser's symbols and the built-in defaults.
    pub fn value(&self) -> f64 {
        Self::or_nan(self.value_result())
    }

    pub fn value_result(&self) -> MathParserResult<f64> {
        self.token.eval(&self.scope())
    }

    /// Evaluates with `symbols` overlaid on top of the parser's symbols for this call only.
    pub fn eval(&self, symbols: &SymbolTable) -> f64 {
        Self::or_nan(self.eval_result(symbols))
    }

    /// Evaluates with `symbols` overlaid on top of the parser's symbols for this call only.
    ///
    /// # Returns
    ///
    /// * `Ok(f64)` if every name in the tree could be resolved.
    /// * `Err(MathParserError::VariableNotFound)` or `Err(MathParserError::FunctionNotFound)`
    ///   naming the first symbol that could not.
    pub fn eval_result(&self, symbols: &SymbolTable) -> MathParserResult<f64> {
        self.token.eval(&self.scope().with_overrides(symbols))
    }

    /// Evaluates with a single variable bound to `value`.
    pub fn eval_variable(&self, name: &str, value: f64) -> f64 {
        Self::or_nan(self.eval_variable_result(name, value))
    }

    pub fn eval_variable_result(&self, name: &str, value: f64) -> MathParserResult<f64> {
        self.token.eval(&self.scope().with_binding(name, value))
    }

    /// Evaluates once per entry of `values`, binding each to `name`, in parallel.
    ///
    /// Results keep the order of `values`; failures come back as NaN.
    pub fn eval_batch(&self, name: &str, values: &[f64]) -> Vec<f64> {
        values
            .par_iter()
            .map(|value| self.eval_variable(name, *value))
            .collect()
    }

    pub fn unresolved(&self) -> Unresolved {
        self.token.unresolved()
    }

    pub fn token(&self) -> &Token {
        &self.token
    }
}
