pub mod binary;
pub mod constants;
pub mod unary;

use crate::ast::SymbolTable;
use std::sync::OnceLock;

static DEFAULT_SYMBOLS: OnceLock<SymbolTable> = OnceLock::new();

/// Built-in constants and functions, consulted after every caller-supplied table.
pub fn default_symbols() -> &'static SymbolTable {
    DEFAULT_SYMBOLS.get_or_init(|| {
        let mut symbols = SymbolTable::new();
        register_functions(&mut symbols);
        symbols
    })
}

pub fn register_functions(symbols: &mut SymbolTable) {
    constants::register(symbols);
    unary::register(symbols);
    binary::register(symbols);
}
