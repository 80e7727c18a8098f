use crate::ast::{BinaryFunction, UnaryFunction};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named variables and functions available to the parser and the evaluator.
#[derive(Clone, Default)]
pub struct SymbolTable {
    variables: HashMap<String, f64>,
    unary_functions: HashMap<String, UnaryFunction>,
    binary_functions: HashMap<String, BinaryFunction>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
    }

    /// Registers a 1-argument function.
    pub fn register_unary_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.unary_functions
            .insert(name.to_string(), Arc::new(function));
    }

    /// Registers a 2-argument function.
    pub fn register_binary_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.binary_functions
            .insert(name.to_string(), Arc::new(function));
    }

    pub fn with_variable(mut self, name: &str, value: f64) -> Self {
        self.register_variable(name, value);
        self
    }

    pub fn with_unary_function<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.register_unary_function(name, function);
        self
    }

    pub fn with_binary_function<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.register_binary_function(name, function);
        self
    }

    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }

    pub fn unary_function(&self, name: &str) -> Option<&UnaryFunction> {
        self.unary_functions.get(name)
    }

    pub fn binary_function(&self, name: &str) -> Option<&BinaryFunction> {
        self.binary_functions.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.unary_functions.is_empty()
            && self.binary_functions.is_empty()
    }

    /// Copies every entry of `other` into this table, replacing same-named entries.
    pub fn extend(&mut self, other: &SymbolTable) {
        self.variables
            .extend(other.variables.iter().map(|(k, v)| (k.clone(), *v)));
        self.unary_functions.extend(
            other
                .unary_functions
                .iter()
                .map(|(k, f)| (k.clone(), f.clone())),
        );
        self.binary_functions.extend(
            other
                .binary_functions
                .iter()
                .map(|(k, f)| (k.clone(), f.clone())),
        );
    }

    /// Returns a new table holding this table's entries overlaid with `other`'s.
    pub fn appending(&self, other: &SymbolTable) -> SymbolTable {
        let mut merged = self.clone();
        merged.extend(other);
        merged
    }
}

impl From<HashMap<String, f64>> for SymbolTable {
    fn from(variables: HashMap<String, f64>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }
}

impl FromIterator<(String, f64)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<HashMap<_, _>>())
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut unary: Vec<_> = self.unary_functions.keys().collect();
        unary.sort();
        let mut binary: Vec<_> = self.binary_functions.keys().collect();
        binary.sort();
        f.debug_struct("SymbolTable")
            .field("variables", &self.variables)
            .field("unary_functions", &unary)
            .field("binary_functions", &binary)
            .finish()
    }
}

/// Read-only view used to resolve names, consulted from the narrowest scope to the broadest:
/// a single binding, the per-call table, the parser-instance table, then the built-in defaults.
pub(crate) struct EvalState<'a> {
    binding: Option<(&'a str, f64)>,
    overrides: Option<&'a SymbolTable>,
    instance: &'a SymbolTable,
    defaults: &'a SymbolTable,
}

impl<'a> EvalState<'a> {
    pub(crate) fn new(instance: &'a SymbolTable, defaults: &'a SymbolTable) -> Self {
        Self {
            binding: None,
            overrides: None,
            instance,
            defaults,
        }
    }

    pub(crate) fn with_overrides(mut self, overrides: &'a SymbolTable) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub(crate) fn with_binding(mut self, name: &'a str, value: f64) -> Self {
        self.binding = Some((name, value));
        self
    }

    fn tables(&self) -> impl Iterator<Item = &'a SymbolTable> {
        self.overrides
            .into_iter()
            .chain([self.instance, self.defaults])
    }

    pub(crate) fn variable(&self, name: &str) -> Option<f64> {
        match self.binding {
            Some((bound, value)) if bound == name => Some(value),
            _ => self.tables().find_map(|table| table.variable(name)),
        }
    }

    pub(crate) fn unary_function(&self, name: &str) -> Option<&'a UnaryFunction> {
        self.tables().find_map(|table| table.unary_function(name))
    }

    pub(crate) fn binary_function(&self, name: &str) -> Option<&'a BinaryFunction> {
        self.tables().find_map(|table| table.binary_function(name))
    }
}
