use crate::ast::SymbolTable;

pub fn register(symbols: &mut SymbolTable) {
    symbols.register_unary_function("sin", f64::sin);
    symbols.register_unary_function("asin", f64::asin);
    symbols.register_unary_function("cos", f64::cos);
    symbols.register_unary_function("acos", f64::acos);
    symbols.register_unary_function("tan", f64::tan);
    symbols.register_unary_function("atan", f64::atan);
    symbols.register_unary_function("log10", f64::log10);
    symbols.register_unary_function("ln", f64::ln);
    symbols.register_unary_function("loge", f64::ln);
    symbols.register_unary_function("log2", f64::log2);
    symbols.register_unary_function("exp", f64::exp);
    symbols.register_unary_function("ceil", f64::ceil);
    symbols.register_unary_function("floor", f64::floor);
    symbols.register_unary_function("round", f64::round);
    symbols.register_unary_function("sqrt", f64::sqrt);
    symbols.register_unary_function("√", f64::sqrt);
    symbols.register_unary_function("cbrt", f64::cbrt);
    symbols.register_unary_function("abs", f64::abs);
    symbols.register_unary_function("sgn", sgn);
    symbols.register_unary_function("!", factorial);
}

/// Sign of `x` as -1, 0 or 1. NaN maps to 0.
pub fn sgn(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Product of the integers `1..=floor(n)`.
///
/// Negative and NaN inputs have no factorial and give NaN. Anything past 170 overflows `f64`, so
/// it short-circuits to infinity.
pub fn factorial(n: f64) -> f64 {
    if n.is_nan() || n < 0.0 {
        return f64::NAN;
    }
    let n = n.floor();
    if n > 170.0 {
        return f64::INFINITY;
    }
    (1..=n as u32).map(f64::from).product()
}
