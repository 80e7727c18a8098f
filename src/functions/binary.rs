use crate::ast::SymbolTable;

pub fn register(symbols: &mut SymbolTable) {
    // atan2(y, x)
    symbols.register_binary_function("atan2", f64::atan2);
    symbols.register_binary_function("hypot", f64::hypot);
    symbols.register_binary_function("pow", f64::powf);
}
