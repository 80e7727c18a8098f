//! Parse arithmetic expressions once, then evaluate them many times with different bindings.
//!
//! ```
//! use mathparser_rs::{MathParser, SymbolTable};
//!
//! let mut parser = MathParser::new();
//! let evaluator = parser.parse_result("4 * sin(t * pi)").unwrap();
//! assert_eq!(evaluator.unresolved().variables.len(), 1);
//! assert!((evaluator.eval_variable("t", 0.5) - 4.0).abs() < 1e-12);
//!
//! let symbols = SymbolTable::new().with_variable("t", 0.25);
//! assert!((evaluator.eval(&symbols) - 4.0 * std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
//! ```

pub mod ast;
pub mod error;
pub mod functions;

pub use ast::{Evaluator, MathParser, ParserConfig, SymbolTable, Token, Unresolved};
pub use error::{MathParserError, MathParserResult};

use std::collections::HashMap;

/// Parses and evaluates `expression` in one go, resolving free variables from `context`.
pub fn evaluate_expression(
    expression: &str,
    context: &HashMap<String, f64>,
) -> MathParserResult<f64> {
    let evaluator = MathParser::new().parse_result(expression)?;
    evaluator.eval_result(&SymbolTable::from(context.clone()))
}
