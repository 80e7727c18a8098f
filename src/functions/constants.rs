use crate::ast::SymbolTable;
use std::f64::consts::{E, PI};

pub fn register(symbols: &mut SymbolTable) {
    symbols.register_variable("pi", PI);
    symbols.register_variable("π", PI);
    symbols.register_variable("e", E);
}
