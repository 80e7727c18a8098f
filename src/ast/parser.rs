use crate::ast::{Associativity, EvalState, Evaluator, Operator, SymbolTable, Token};
use crate::error::{MathParserError, MathParserResult};
use crate::functions::default_symbols;
use log::{debug, trace};
use lru::LruCache;
use pest::error::{Error, ErrorVariant, InputLocation, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Position, Span};
use pest_derive::Parser;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionGrammar;

/// Construction options for [`MathParser`].
#[derive(Clone, Debug, Default)]
pub struct ParserConfig {
    /// Symbols layered over the built-in defaults for the lifetime of the parser.
    pub symbols: SymbolTable,
    /// Number of parsed expressions to keep, keyed by their text. `0` disables caching.
    pub cache_capacity: usize,
}

/// Parses expression text into [`Evaluator`]s.
///
/// Names known when an expression is parsed (the parser's own symbols, then the built-in defaults)
/// are folded into the tree right away; anything else is left for evaluation time. Parsing an
/// assignment such as `x = 2 * pi` stores the result in the parser's own symbols, which is why
/// parsing takes `&mut self`.
///
/// Parsing and evaluation recurse once per level of nesting, so the depth of parentheses and
/// nested calls a parser accepts is bounded by the thread's stack.
pub struct MathParser {
    symbols: Arc<SymbolTable>,
    cache: Option<LruCache<String, Evaluator>>,
}

impl MathParser {
    pub fn new() -> Self {
        Self::from_config(ParserConfig::default())
    }

    pub fn with_symbols(symbols: SymbolTable) -> Self {
        Self::from_config(ParserConfig {
            symbols,
            ..ParserConfig::default()
        })
    }

    pub fn from_config(config: ParserConfig) -> Self {
        Self {
            symbols: Arc::new(config.symbols),
            cache: NonZeroUsize::new(config.cache_capacity).map(LruCache::new),
        }
    }

    /// Parses `text`, returning `None` when it is not a valid expression.
    pub fn parse(&mut self, text: &str) -> Option<Evaluator> {
        match self.parse_result(text) {
            Ok(evaluator) => Some(evaluator),
            Err(error) => {
                debug!("Failed to parse '{}': {}", text, error);
                None
            }
        }
    }

    /// Parses `text` into an [`Evaluator`].
    ///
    /// # Arguments
    ///
    /// * `text` - A single expression, or a single `name = expression` assignment.
    ///
    /// # Returns
    ///
    /// * `Ok(Evaluator)` holding the folded tree.
    /// * `Err(MathParserError::ParseFailure)` with the position and a rendered diagnostic when the
    ///   whole input does not match the grammar.
    pub fn parse_result(&mut self, text: &str) -> MathParserResult<Evaluator> {
        debug!("Parsing expression: {}", text);
        if let Some(evaluator) = self.cache.as_mut().and_then(|cache| cache.get(text)) {
            debug!("Parse cache hit: {}", text);
            return Ok(evaluator.clone());
        }

        let root = ExpressionGrammar::parse(Rule::expression, text)
            .map_err(|error| parse_failure(text, error))?
            .next()
            .ok_or_else(|| MathParserError::parse_failure("empty parse tree", 1, 1, 0))?;
        let root_span = root.as_span();
        let body = next_pair(&mut root.into_inner(), root_span, "expression")?;

        let evaluator = match body.as_rule() {
            Rule::assignment => {
                let token = self.build_assignment(body)?;
                Evaluator::new(token, self.symbols.clone())
            }
            _ => {
                let token = self.build_subexpression(body)?;
                let evaluator = Evaluator::new(token, self.symbols.clone());
                if let Some(cache) = self.cache.as_mut() {
                    cache.put(text.to_string(), evaluator.clone());
                }
                evaluator
            }
        };
        debug!("Parsed '{}' into {}", text, evaluator.token());
        Ok(evaluator)
    }

    /// Looks `name` up in the parser's own symbols, then in the built-in defaults.
    pub fn variable(&self, name: &str) -> Option<f64> {
        self.scope().variable(name)
    }

    /// The parser's own symbols, including values stored by assignments.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn set_variable(&mut self, name: &str, value: f64) {
        Arc::make_mut(&mut self.symbols).register_variable(name, value);
        self.clear_cache();
    }

    fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }

    fn scope(&self) -> EvalState<'_> {
        EvalState::new(&self.symbols, default_symbols())
    }

    fn build_assignment(&mut self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let name = next_pair(&mut pairs, span, "identifier")?.as_str().to_string();
        let token = self.build_subexpression(next_pair(&mut pairs, span, "expression")?)?;
        let value = token.eval(&self.scope()).unwrap_or_else(|error| {
            trace!("Assignment to '{}' did not evaluate: {}", name, error);
            f64::NAN
        });

        debug!("Assigning {} = {}", name, value);
        // Evaluators handed out earlier keep their own snapshot of the table.
        Arc::make_mut(&mut self.symbols).register_variable(&name, value);
        self.clear_cache();
        Ok(Token::Variable(name))
    }

    /// Builds one precedence layer: `operand (operator operand)*`, folded with `associativity`.
    fn build_infix<'i, F>(
        &self,
        pair: Pair<'i, Rule>,
        associativity: Associativity,
        build_operand: F,
    ) -> MathParserResult<Token>
    where
        F: Fn(&Self, Pair<'i, Rule>) -> MathParserResult<Token>,
    {
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let first = build_operand(self, next_pair(&mut pairs, span, "operand")?)?;

        let mut rest = Vec::new();
        while let Some(operator_pair) = pairs.next() {
            let operator = Operator::try_from(operator_pair.as_str())
                .map_err(|message| failure_at(operator_pair.as_span(), message))?;
            let operand = build_operand(self, next_pair(&mut pairs, span, "operand")?)?;
            rest.push((operator, operand));
        }
        if !rest.is_empty() {
            trace!("{:?} fold of '{}'", associativity, span.as_str());
        }
        Ok(associativity.fold(first, rest))
    }

    fn build_subexpression(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Associativity::Left, Self::build_conjunction)
    }

    fn build_conjunction(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Associativity::Left, Self::build_comparison)
    }

    fn build_comparison(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Associativity::Left, Self::build_additive)
    }

    fn build_additive(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Associativity::Left, Self::build_multiplicative)
    }

    fn build_multiplicative(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Associativity::Left, Self::build_exponential)
    }

    fn build_exponential(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        self.build_infix(pair, Operator::Power.associativity(), Self::build_operand)
    }

    fn build_operand(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let inner = next_pair(&mut pair.into_inner(), span, "operand")?;
        match inner.as_rule() {
            Rule::negation => {
                let span = inner.as_span();
                let operand = self.build_factorial_operand(next_pair(
                    &mut inner.into_inner(),
                    span,
                    "operand",
                )?)?;
                Ok(Operator::Multiply.reduce(Token::Constant(-1.0), operand))
            }
            Rule::factorial_operand => self.build_factorial_operand(inner),
            _ => Err(unexpected(inner.as_span(), "operand")),
        }
    }

    fn build_factorial_operand(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let operand = self.build_primary(next_pair(&mut pairs, span, "operand")?)?;
        match pairs.next() {
            Some(_) => Ok(Token::unary_call(
                self.scope().unary_function("!").cloned(),
                "!",
                operand,
            )),
            None => Ok(operand),
        }
    }

    fn build_primary(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let inner = next_pair(&mut pair.into_inner(), span, "operand")?;
        match inner.as_rule() {
            Rule::conditional => self.build_conditional(inner),
            Rule::call => self.build_call(inner),
            Rule::variable => {
                let name = inner.as_str();
                Ok(match self.scope().variable(name) {
                    Some(value) => Token::Constant(value),
                    None => Token::Variable(name.to_string()),
                })
            }
            Rule::parenthetical => {
                let span = inner.as_span();
                self.build_subexpression(next_pair(&mut inner.into_inner(), span, "expression")?)
            }
            Rule::number => inner
                .as_str()
                .parse::<f64>()
                .map(Token::Constant)
                .map_err(|error| failure_at(inner.as_span(), error.to_string())),
            _ => Err(unexpected(inner.as_span(), "operand")),
        }
    }

    fn build_call(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let name = next_pair(&mut pairs, span, "function name")?.as_str();
        let arguments = next_pair(&mut pairs, span, "arguments")?;
        let arguments = arguments
            .into_inner()
            .filter(|argument| argument.as_rule() == Rule::subexpression)
            .map(|argument| self.build_subexpression(argument))
            .collect::<MathParserResult<Vec<Token>>>()?;

        let scope = self.scope();
        let mut arguments = arguments.into_iter();
        match (arguments.next(), arguments.next(), arguments.next()) {
            (Some(arg), None, None) => Ok(Token::unary_call(
                scope.unary_function(name).cloned(),
                name,
                arg,
            )),
            (Some(arg1), Some(arg2), None) => Ok(Token::binary_call(
                scope.binary_function(name).cloned(),
                name,
                arg1,
                arg2,
            )),
            _ => Err(unexpected(span, "one or two arguments")),
        }
    }

    fn build_conditional(&self, pair: Pair<'_, Rule>) -> MathParserResult<Token> {
        let span = pair.as_span();
        let arguments = next_pair(&mut pair.into_inner(), span, "arguments")?;
        let mut pairs = arguments.into_inner();
        let condition = self.build_subexpression(next_pair(&mut pairs, span, "condition")?)?;
        let then = self.build_subexpression(next_pair(&mut pairs, span, "expression")?)?;
        let otherwise = self.build_subexpression(next_pair(&mut pairs, span, "expression")?)?;
        Ok(Token::conditional(condition, then, otherwise))
    }
}

impl Default for MathParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MathParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathParser")
            .field("symbols", &self.symbols)
            .field("cache_capacity", &self.cache.as_ref().map_or(0, |cache| cache.cap().get()))
            .finish()
    }
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    parent: Span<'i>,
    expected: &str,
) -> MathParserResult<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| unexpected(parent, expected))
}

fn failure_at(span: Span<'_>, message: impl Into<String>) -> MathParserError {
    let (line, column) = span.start_pos().line_col();
    MathParserError::parse_failure(message, line, column, span.start())
}

fn unexpected(span: Span<'_>, expected: &str) -> MathParserError {
    failure_at(span, format!("expected {} in '{}'", expected, span.as_str()))
}

/// Converts a pest error, listing each expected production once under a readable name.
fn parse_failure(text: &str, error: Error<Rule>) -> MathParserError {
    let (line, column) = match &error.line_col {
        LineColLocation::Pos(position) => *position,
        LineColLocation::Span(start, _) => *start,
    };
    let offset = match &error.location {
        InputLocation::Pos(position) => *position,
        InputLocation::Span((start, _)) => *start,
    };
    let message = match &error.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => describe_expected(positives, negatives),
        ErrorVariant::CustomError { message } => message.clone(),
    };
    let context = match Position::new(text, offset) {
        Some(position) => {
            Error::<Rule>::new_from_pos(ErrorVariant::CustomError { message }, position).to_string()
        }
        None => message,
    };
    MathParserError::parse_failure(context, line, column, offset)
}

fn describe_expected(positives: &[Rule], negatives: &[Rule]) -> String {
    match (describe_rules(positives), describe_rules(negatives)) {
        (Some(expected), None) => format!("expected {}", expected),
        (None, Some(unexpected)) => format!("unexpected {}", unexpected),
        (Some(expected), Some(unexpected)) => {
            format!("unexpected {}; expected {}", unexpected, expected)
        }
        (None, None) => "unknown parsing error".to_string(),
    }
}

/// Joins the readable names of `rules` as `a, b, or c`, skipping repeats.
fn describe_rules(rules: &[Rule]) -> Option<String> {
    let mut names: Vec<&str> = Vec::new();
    for rule in rules {
        let name = describe_rule(rule);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    match names.as_slice() {
        [] => None,
        [only] => Some(only.to_string()),
        [first, second] => Some(format!("{} or {}", first, second)),
        [init @ .., last] => Some(format!("{}, or {}", init.join(", "), last)),
    }
}

fn describe_rule(rule: &Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::expression => "expression",
        Rule::assignment => "assignment",
        Rule::subexpression
        | Rule::conjunction
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative
        | Rule::exponential => "expression",
        Rule::or_operator
        | Rule::and_operator
        | Rule::comparison_operator
        | Rule::additive_operator
        | Rule::multiplicative_operator
        | Rule::power_operator => "operator",
        Rule::operand
        | Rule::negation
        | Rule::factorial_operand
        | Rule::primary
        | Rule::parenthetical => "operand",
        Rule::factorial => "factorial",
        Rule::conditional => "conditional",
        Rule::call => "function call",
        Rule::conditional_arguments | Rule::call_arguments => "arguments",
        Rule::closing_parenthesis => "closing parenthesis",
        Rule::variable | Rule::identifier => "identifier",
        Rule::number => "number",
        #[allow(unreachable_patterns)]
        _ => "input",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::BTreeSet;
    use std::f64::consts::{E, PI};

    fn value(text: &str) -> f64 {
        MathParser::new()
            .parse(text)
            .map(|evaluator| evaluator.value())
            .unwrap_or_else(|| panic!("failed to parse '{}'", text))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "{} != {}",
            actual,
            expected
        );
    }

    fn fails(text: &str) -> bool {
        matches!(
            MathParser::new().parse_result(text),
            Err(MathParserError::ParseFailure { .. })
        )
    }

    #[test]
    fn test_numbers() {
        assert_eq!(value("1"), 1.0);
        assert_eq!(value("1.5"), 1.5);
        assert_eq!(value("1e3"), 1000.0);
        assert_eq!(value("2.5E-1"), 0.25);
        assert_eq!(value("1e+2"), 100.0);
        assert_eq!(value("  42  "), 42.0);
        assert!(fails("1."));
        assert!(fails("1e"));
        assert!(fails("+3"));
        assert!(fails("١٢"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(value("pi"), PI);
        assert_eq!(value("π"), PI);
        assert_eq!(value("e"), E);
    }

    #[test]
    fn test_negation_adjacency() {
        let evaluator = MathParser::new().parse("-3").map(|e| e.token().clone());
        assert_eq!(evaluator, Some(Token::Constant(-3.0)));
        assert!(fails("- 3"));
        assert_eq!(value("-pi"), -PI);
        assert_eq!(value("-(-3)"), 3.0);
        assert!(fails("--3"));
        assert_eq!(value("2 - 3"), -1.0);
        assert_eq!(value("2 -3"), -1.0);
        assert_eq!(value("2--3"), 5.0);
        assert_eq!(value("2 * -3"), -6.0);
    }

    #[test]
    fn test_parenthesis_balance() {
        assert!(fails("(1 + 2"));
        assert!(fails("1 + 2)"));
        assert!(fails("()"));
        assert_eq!(value("( 1 + 2 ) * 3"), 9.0);
        assert_eq!(value("((((2))))"), 2.0);
    }

    #[test]
    fn test_trailing_input_fails() {
        assert!(fails("1 + 2 3"));
        assert!(fails("2pi"));
        assert!(fails("1 +"));
        assert!(fails(""));
        assert!(fails("   "));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(value("1 + 2 * 3"), 7.0);
        assert_eq!(value("(1 + 2) * 3"), 9.0);
        assert_eq!(value("2 * 3 ^ 2"), 18.0);
        assert_eq!(value("12 / 4 / 3"), 1.0);
        assert_eq!(value("2 × 3 ÷ 4"), 1.5);
        assert_eq!(value("1 + 2 > 2"), 1.0);
    }

    #[test]
    fn test_associativity() {
        assert_eq!(value("2^3^2"), 512.0);
        assert_eq!(value("(2^3)^2"), 64.0);
        assert_eq!(value("8-3-2"), 3.0);
        assert_eq!(value("2 ^ -1"), 0.5);
    }

    #[test]
    fn test_factorial() {
        assert_eq!(value("4!"), 24.0);
        assert_eq!(value("3 + 4!"), 27.0);
        assert_eq!(value("0!"), 1.0);
        assert_eq!(value("(1 + 2)!"), 6.0);
        assert_eq!(value("-4!"), -24.0);
        assert!(value("(-4)!").is_nan());
        assert!(fails("4 !"));
    }

    #[test]
    fn test_factorial_of_variable() {
        let evaluator = MathParser::new().parse("t!");
        let evaluator = evaluator.unwrap_or_else(|| panic!("t! should parse"));
        let unresolved = evaluator.unresolved();
        assert_eq!(unresolved.variables, BTreeSet::from(["t".to_string()]));
        assert!(unresolved.unary_functions.is_empty());
        assert_eq!(evaluator.eval_variable("t", 5.0), 120.0);
    }

    #[test]
    fn test_functions() {
        assert_close(value("sin(pi / 2)"), 1.0);
        assert_close(value("cos( 0 )"), 1.0);
        assert_eq!(value("sqrt(16)"), 4.0);
        assert_eq!(value("√(16)"), 4.0);
        assert_eq!(value("abs(-2)"), 2.0);
        assert_eq!(value("sgn(-2)"), -1.0);
        assert_eq!(value("hypot(3, 4)"), 5.0);
        assert_eq!(value("pow(2 , 10 )"), 1024.0);
        assert_close(value("atan2(1, 1)"), PI / 4.0);
        assert!(fails("sin (1)"));
        assert!(fails("pow(1, 2, 3)"));
        assert!(fails("sin()"));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(value("2 > 1"), 1.0);
        assert_eq!(value("2 < 1"), 0.0);
        assert_eq!(value("2 >= 2"), 1.0);
        assert_eq!(value("3 <= 2"), 0.0);
        assert_eq!(value("2 == 2"), 1.0);
        assert!(fails("1 < 2 < 3"));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(value("1 < 2 && 2 < 3"), 1.0);
        assert_eq!(value("1 > 2 || 2 < 3"), 1.0);
        assert_eq!(value("0 || 0"), 0.0);
        assert_eq!(value("1 || 0 && 0"), 1.0);
    }

    #[test]
    fn test_conditional() {
        assert_eq!(value("if(1 > 0, 10, 20)"), 10.0);
        assert_eq!(value("if(1 < 0, 10, 20)"), 20.0);
        assert_eq!(value("if( 2 , 3 , 4 ) + 1"), 4.0);

        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("if(t > 0, t, missing)")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.eval_variable_result("t", 2.0), Ok(2.0));
        assert_eq!(
            evaluator.eval_variable_result("t", -2.0),
            Err(MathParserError::VariableNotFound("missing".to_string()))
        );

        // Without a third argument `if` is an ordinary, unknown, function call.
        let evaluator = parser
            .parse_result("if(1, 2)")
            .unwrap_or_else(|error| panic!("{}", error));
        assert!(evaluator.unresolved().binary_functions.contains("if"));
    }

    #[test]
    fn test_deferred_resolution() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("4 * sin(t * pi)")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(
            evaluator.unresolved().variables,
            BTreeSet::from(["t".to_string()])
        );
        assert!(evaluator.unresolved().unary_functions.is_empty());
        assert!(evaluator.value().is_nan());
        assert_eq!(
            evaluator.value_result(),
            Err(MathParserError::VariableNotFound("t".to_string()))
        );
        assert_close(evaluator.eval_variable("t", 0.5), 4.0);
    }

    #[test]
    fn test_deferred_functions() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("foo(1) + bar(2, t)")
            .unwrap_or_else(|error| panic!("{}", error));
        let unresolved = evaluator.unresolved();
        assert_eq!(unresolved.unary_functions, BTreeSet::from(["foo".to_string()]));
        assert_eq!(unresolved.binary_functions, BTreeSet::from(["bar".to_string()]));
        assert_eq!(
            evaluator.value_result(),
            Err(MathParserError::FunctionNotFound("foo".to_string()))
        );

        let symbols = SymbolTable::new()
            .with_variable("t", 3.0)
            .with_unary_function("foo", |x| x * 10.0)
            .with_binary_function("bar", |a, b| a + b);
        assert_eq!(evaluator.eval(&symbols), 15.0);
    }

    #[test]
    fn test_instance_symbols_fold_at_parse_time() {
        let symbols = SymbolTable::new()
            .with_variable("t", 3.0)
            .with_unary_function("double", |x| x * 2.0);
        let mut parser = MathParser::with_symbols(symbols);
        let evaluator = parser
            .parse_result("double(t) + 1")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.token(), &Token::Constant(7.0));
        assert_eq!(parser.variable("t"), Some(3.0));
        assert_eq!(parser.variable("pi"), Some(PI));
        assert_eq!(parser.variable("nope"), None);
    }

    #[test]
    fn test_overlay_precedence() {
        // An assignment yields a deferred `t` whose snapshot holds the stored value.
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("t = 3")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.value(), 3.0);
        assert_eq!(evaluator.eval_variable("t", 5.0), 5.0);
        let overrides = SymbolTable::new().with_variable("t", 5.0);
        assert_eq!(evaluator.eval(&overrides), 5.0);

        // Once folded into the tree, the parser's value is fixed.
        let folded = parser.parse_result("t").unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(folded.token(), &Token::Constant(3.0));
        assert_eq!(folded.eval(&overrides), 3.0);
    }

    #[test]
    fn test_resolved_functions_ignore_overrides() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("sin(t)")
            .unwrap_or_else(|error| panic!("{}", error));
        let symbols = SymbolTable::new()
            .with_variable("t", 1.0)
            .with_unary_function("sin", |x| x + 100.0);
        // `sin` was resolved when parsing, so the override is not consulted.
        assert_eq!(evaluator.eval(&symbols), 1.0_f64.sin());
    }

    #[test]
    fn test_unicode_identifiers() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("sin(🌍)")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.eval_variable("🌍", 1.5), 1.5_f64.sin());

        let evaluator = parser
            .parse_result("👩‍👩‍👧 * 2")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.eval_variable("👩‍👩‍👧", 4.0), 8.0);

        let evaluator = parser
            .parse_result("größe+x1")
            .unwrap_or_else(|error| panic!("{}", error));
        let symbols = SymbolTable::new()
            .with_variable("größe", 1.0)
            .with_variable("x1", 2.0);
        assert_eq!(evaluator.eval(&symbols), 3.0);
        assert!(fails("1abc"));
    }

    #[test]
    fn test_assignment() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("x = 2 * pi")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.value(), 2.0 * PI);
        assert_eq!(parser.variable("x"), Some(2.0 * PI));
        assert_eq!(parser.symbols().variable("x"), Some(2.0 * PI));

        let evaluator = parser
            .parse_result("x / 2")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.token(), &Token::Constant(PI));
    }

    #[test]
    fn test_assignment_of_unresolved_value() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("y = t + 1")
            .unwrap_or_else(|error| panic!("{}", error));
        assert!(evaluator.value().is_nan());
        assert!(parser.variable("y").is_some_and(f64::is_nan));
    }

    #[test]
    fn test_assignment_does_not_touch_earlier_evaluators() {
        let mut parser = MathParser::new();
        let before = parser
            .parse_result("x = 1")
            .unwrap_or_else(|error| panic!("{}", error));
        let after = parser
            .parse_result("x = 2")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(before.value(), 1.0);
        assert_eq!(after.value(), 2.0);
    }

    #[test]
    fn test_equality_is_not_assignment() {
        let mut parser = MathParser::new();
        let evaluator = parser
            .parse_result("x == 2")
            .unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.eval_variable("x", 2.0), 1.0);
        assert_eq!(parser.variable("x"), None);
        assert!(fails("x = y = 1"));
    }

    #[test]
    fn test_parse_failure_position() {
        let error = MathParser::new().parse_result("1 + * 2");
        match error {
            Err(MathParserError::ParseFailure {
                context,
                line,
                column,
                offset,
            }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 5);
                assert_eq!(offset, 4);
                assert!(context.contains("expected"), "{}", context);
            }
            other => panic!("expected a parse failure, got {:?}", other),
        }

        let error = MathParser::new().parse_result("1 +\n(2");
        assert!(matches!(
            error,
            Err(MathParserError::ParseFailure { line: 2, .. })
        ));

        let line = expected_line("(1 + 2");
        assert!(line.contains("closing parenthesis"), "{}", line);
        assert_no_repeats(&line);
    }

    fn expected_line(text: &str) -> String {
        match MathParser::new().parse_result(text) {
            Err(MathParserError::ParseFailure { context, .. }) => context
                .lines()
                .last()
                .unwrap_or_default()
                .to_string(),
            other => panic!("expected a parse failure for '{}', got {:?}", text, other),
        }
    }

    fn assert_no_repeats(line: &str) {
        let names: Vec<&str> = line
            .trim_start_matches(|c: char| c == ' ' || c == '=')
            .trim_start_matches("expected ")
            .split(", ")
            .flat_map(|name| name.split(" or "))
            .map(|name| name.trim_start_matches("or ").trim())
            .collect();
        for (i, name) in names.iter().enumerate() {
            assert!(!names[i + 1..].contains(name), "'{}' repeated in '{}'", name, line);
        }
    }

    #[test]
    fn test_parse_failure_names_productions_once() {
        let line = expected_line("(1 + 2");
        assert!(line.contains("closing parenthesis"), "{}", line);
        assert!(line.contains("operator"), "{}", line);
        assert_eq!(line.matches("operator").count(), 1, "{}", line);
        assert_no_repeats(&line);

        let line = expected_line("1 + 2)");
        assert!(line.contains("end of input"), "{}", line);
        assert_eq!(line.matches("operator").count(), 1, "{}", line);
        assert_no_repeats(&line);

        let line = expected_line("x!y");
        assert_eq!(line.matches("operator").count(), 1, "{}", line);
        assert_no_repeats(&line);

        let line = expected_line("sin(1, 2");
        assert!(line.contains("closing parenthesis"), "{}", line);

        let line = expected_line("if(1, 2, 3");
        assert!(line.contains("closing parenthesis"), "{}", line);
    }

    #[test]
    fn test_parse_failure_keeps_source_context() {
        match MathParser::new().parse_result("(1 + 2") {
            Err(MathParserError::ParseFailure { context, offset, .. }) => {
                assert_eq!(offset, 6);
                assert!(context.contains("1:7"), "{}", context);
                assert!(context.contains("(1 + 2"), "{}", context);
            }
            other => panic!("expected a parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_closing_parenthesis_is_not_an_argument() {
        assert_eq!(value("hypot(3, 4)"), 5.0);
        assert_eq!(value("sqrt((16))"), 4.0);
        assert_eq!(value("if(0, 1, (2))"), 2.0);
    }

    #[test]
    fn test_moderate_nesting() {
        let depth = 32;
        let text = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(value(&text), 1.0);

        let text = format!("{}x{}", "abs(".repeat(depth), ")".repeat(depth));
        let evaluator = MathParser::new().parse(&text);
        assert_eq!(evaluator.map(|e| e.eval_variable("x", -2.0)), Some(2.0));
    }

    #[test]
    fn test_parse_returns_none_on_failure() {
        assert!(MathParser::new().parse("1 +").is_none());
        assert!(MathParser::new().parse("1 + 1").is_some());
    }

    #[test]
    fn test_cache() {
        let mut parser = MathParser::from_config(ParserConfig {
            symbols: SymbolTable::new().with_variable("a", 1.0),
            cache_capacity: 4,
        });
        let first = parser.parse_result("a + t").unwrap_or_else(|error| panic!("{}", error));
        let second = parser.parse_result("a + t").unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(first.token(), second.token());
        assert_eq!(second.eval_variable("t", 1.0), 2.0);

        parser.set_variable("a", 10.0);
        let third = parser.parse_result("a + t").unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(third.eval_variable("t", 1.0), 11.0);

        parser
            .parse_result("a = 20")
            .unwrap_or_else(|error| panic!("{}", error));
        let fourth = parser.parse_result("a + t").unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(fourth.eval_variable("t", 1.0), 21.0);
    }

    #[test]
    fn test_cache_does_not_replay_assignments() {
        let mut parser = MathParser::from_config(ParserConfig {
            cache_capacity: 4,
            ..ParserConfig::default()
        });
        parser.parse_result("x = 1").unwrap_or_else(|error| panic!("{}", error));
        parser.set_variable("x", 5.0);
        let evaluator = parser.parse_result("x = 1").unwrap_or_else(|error| panic!("{}", error));
        assert_eq!(evaluator.value(), 1.0);
        assert_eq!(parser.variable("x"), Some(1.0));
    }

    #[test]
    fn test_random_arithmetic_matches_host() {
        let mut rng = rand::rng();
        let mut parser = MathParser::new();
        for _ in 0..200 {
            let a: f64 = rng.random_range(0.0..1000.0);
            let b: f64 = rng.random_range(0.0..1000.0);
            let c: f64 = rng.random_range(1.0..10.0);
            let text = format!("{:?} + {:?} * {:?} - {:?} / {:?}", a, b, c, a, c);
            let expected = a + b * c - a / c;
            let evaluator = parser
                .parse_result(&text)
                .unwrap_or_else(|error| panic!("{}: {}", text, error));
            assert_eq!(evaluator.value_result(), Ok(expected), "{}", text);
        }
    }
}
