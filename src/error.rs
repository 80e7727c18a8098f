//! Error types shared by the parser and the evaluator.

pub type MathParserResult<T> = Result<T, MathParserError>;

/// Failures reported by [`MathParser::parse_result`](crate::MathParser::parse_result) and the
/// `*_result` evaluation methods of [`Evaluator`](crate::Evaluator).
///
/// Parse-time symbol lookups never produce an error: an unknown name simply stays symbolic until
/// evaluation, where it surfaces as [`MathParserError::VariableNotFound`] or
/// [`MathParserError::FunctionNotFound`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathParserError {
    /// The input text does not match the grammar. `context` holds the rendered diagnostic with the
    /// offending source line, a caret under the failure position and the expected productions.
    #[error("Parse failure at {line}:{column}: {context}")]
    ParseFailure {
        context: String,
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("Variable '{0}' not found")]
    VariableNotFound(String),

    #[error("Function '{0}' not found")]
    FunctionNotFound(String),
}

impl MathParserError {
    pub fn parse_failure(context: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        Self::ParseFailure {
            context: context.into(),
            line,
            column,
            offset,
        }
    }

    /// Returns true for failures raised while parsing, as opposed to evaluating.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailure { .. })
    }
}
