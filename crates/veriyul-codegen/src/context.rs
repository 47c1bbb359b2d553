//! Per-compilation state for Yul generation.
//!
//! A [`GenContext`] is created at the start of every `generate` call and dropped at the end
//! of it, so nothing derived from one contract can leak into the next compilation.

use crate::builtins::safe_name;
use crate::layout::StorageLayout;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use veriyul_core::signature::{error_signature, event_signature};
use veriyul_core::{Contract, ReturnShape, Selector, Topic, Type, Variable};
use veriyul_emit::CodeBuffer;

/// Yul helper functions, emitted into a code block only when something there calls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Helper {
    MappingSlot,
    ArrayDataSlot,
    HashWord,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::MappingSlot => "mapping_slot",
            Helper::ArrayDataSlot => "array_data_slot",
            Helper::HashWord => "hash_word",
        }
    }

    pub fn emit(self, out: &mut CodeBuffer) {
        match self {
            Helper::MappingSlot => out.block("function mapping_slot(slot, key) -> result", |out| {
                out.line("mstore(0, slot)");
                out.line("mstore(32, key)");
                out.line("result := keccak256(0, 64)");
            }),
            Helper::ArrayDataSlot => out.block("function array_data_slot(slot) -> result", |out| {
                out.line("mstore(0, slot)");
                out.line("result := keccak256(0, 32)");
            }),
            Helper::HashWord => out.block("function hash_word(value) -> result", |out| {
                out.line("mstore(0, value)");
                out.line("result := keccak256(0, 32)");
            }),
        }
    }
}

/// A storage address, kept as a number while it is known at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loc {
    Static(u64),
    Dynamic(String),
}

impl Loc {
    pub fn offset(self, by: u64) -> Loc {
        match self {
            Loc::Static(slot) => Loc::Static(slot + by),
            Loc::Dynamic(expr) if by == 0 => Loc::Dynamic(expr),
            Loc::Dynamic(expr) => Loc::Dynamic(format!("add({}, {})", expr, by)),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Static(slot) => write!(f, "{}", slot),
            Loc::Dynamic(expr) => f.write_str(expr),
        }
    }
}

/// A storage location together with the type stored there, when that type is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub loc: Loc,
    pub ty: Option<Type>,
}

/// Source locals visible at one point of a function, mapped to their Yul names.
pub type Visible = HashMap<String, String>;

#[derive(Debug, Default)]
pub struct FnScope {
    locals: Visible,
    /// Every Yul name bound so far in the function, including ones no longer visible.
    bound: HashSet<String>,
    returns: Vec<String>,
    temps: usize,
}

impl FnScope {
    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    pub fn local(&self, name: &str) -> Option<&str> {
        self.locals.get(name).map(String::as_str)
    }

    /// Binds a source local and returns its Yul name. Yul forbids redeclaring a name in the
    /// same function, so a name already bound gets a numeric suffix.
    pub fn declare(&mut self, name: &str) -> String {
        let base = safe_name(name).into_owned();
        let mut yul = base.clone();
        let mut n = 1;
        while self.bound.contains(&yul) {
            yul = format!("{}_{}", base, n);
            n += 1;
        }
        self.bound.insert(yul.clone());
        self.locals.insert(name.to_string(), yul.clone());
        yul
    }

    pub fn visible(&self) -> Visible {
        self.locals.clone()
    }

    /// Drops the locals declared since `visible` was taken.
    pub fn restore(&mut self, visible: Visible) {
        self.locals = visible;
    }

    pub fn returns(&self) -> &[String] {
        &self.returns
    }
}

/// Yul names of a method's return bindings. Unnamed values get positional names.
pub fn return_bindings(shape: &ReturnShape) -> Vec<String> {
    match shape {
        ReturnShape::None => Vec::new(),
        ReturnShape::Single(_) => vec!["result".to_string()],
        ReturnShape::Named(vars) => vars
            .iter()
            .enumerate()
            .map(|(i, var)| match var.name.as_str() {
                "" => format!("_r{}", i),
                name => safe_name(name).into_owned(),
            })
            .collect(),
    }
}

pub struct GenContext<'c> {
    pub contract: &'c Contract,
    pub layout: StorageLayout,
    pub scope: FnScope,
    event_topics: IndexMap<String, Topic>,
    error_selectors: IndexMap<String, Selector>,
    helpers: BTreeSet<Helper>,
    calls: IndexSet<String>,
}

impl<'c> GenContext<'c> {
    pub fn new(contract: &'c Contract) -> Self {
        let layout = StorageLayout::allocate(&contract.fields, &contract.structs);
        let event_topics = contract
            .events
            .iter()
            .map(|event| {
                let signature = event_signature(event);
                (event.name.clone(), Topic::from_signature(&signature))
            })
            .collect();
        let error_selectors = contract
            .errors
            .iter()
            .map(|error| {
                let signature = error_signature(error);
                (error.name.clone(), Selector::from_signature(&signature))
            })
            .collect();
        Self {
            contract,
            layout,
            scope: FnScope::default(),
            event_topics,
            error_selectors,
            helpers: BTreeSet::new(),
            calls: IndexSet::new(),
        }
    }

    /// Starts a fresh scope for one Yul function. Parameters and named return values are
    /// its first locals.
    pub fn begin_function(&mut self, params: &[Variable], returns: &ReturnShape) {
        let mut scope = FnScope::default();
        for param in params {
            scope.declare(&param.name);
        }
        if let ReturnShape::Named(vars) = returns {
            for var in vars.iter().filter(|var| !var.name.is_empty()) {
                scope.declare(&var.name);
            }
        }
        scope.returns = return_bindings(returns);
        self.scope = scope;
    }

    pub fn temp(&mut self) -> String {
        self.scope.temps += 1;
        format!("_t{}", self.scope.temps)
    }

    /// Evaluates `value` into a fresh temporary unless it is a literal or a plain name.
    pub fn bind(&mut self, value: String, out: &mut CodeBuffer) -> String {
        if is_atom(&value) {
            return value;
        }
        let temp = self.temp();
        out.line(format!("let {} := {}", temp, value));
        temp
    }

    pub fn use_helper(&mut self, helper: Helper) {
        self.helpers.insert(helper);
    }

    /// Emits and forgets the helpers used since the last call.
    pub fn flush_helpers(&mut self, out: &mut CodeBuffer) {
        for helper in std::mem::take(&mut self.helpers) {
            out.blank();
            helper.emit(out);
        }
    }

    /// Notes a call to one of the contract's own methods.
    pub fn record_call(&mut self, method: &str) {
        if !self.calls.contains(method) {
            self.calls.insert(method.to_string());
        }
    }

    /// Name of the `index`-th method called since the last [`GenContext::clear_calls`].
    pub fn called(&self, index: usize) -> Option<&str> {
        self.calls.get_index(index).map(String::as_str)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn event_topic(&self, name: &str) -> Option<Topic> {
        self.event_topics.get(name).copied()
    }

    pub fn error_selector(&self, name: &str) -> Option<Selector> {
        self.error_selectors.get(name).copied()
    }
}

fn is_atom(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriyul_core::Method;

    #[test]
    fn test_return_bindings() {
        assert!(return_bindings(&ReturnShape::None).is_empty());
        assert_eq!(
            return_bindings(&ReturnShape::Single(Type::Bool)),
            vec!["result"]
        );
        let named = ReturnShape::Named(vec![
            Variable::new("total", Type::Uint(256)),
            Variable::new("", Type::Bool),
            Variable::new("balance", Type::Uint(256)),
        ]);
        assert_eq!(return_bindings(&named), vec!["total", "_r1", "usr_balance"]);
    }

    #[test]
    fn test_scope_is_reset_per_function() {
        let contract = Contract::new("C");
        let mut ctx = GenContext::new(&contract);
        let method = Method::new("f");
        let returns = ReturnShape::Named(vec![Variable::new("total", Type::Uint(256))]);
        ctx.begin_function(&[Variable::new("a", Type::Bool)], &returns);
        assert!(ctx.scope.is_local("a"));
        assert!(ctx.scope.is_local("total"));
        assert_eq!(ctx.scope.returns(), ["total".to_string()]);
        assert_eq!(ctx.temp(), "_t1");

        ctx.begin_function(&method.params, &method.returns);
        assert!(!ctx.scope.is_local("a"));
        assert!(ctx.scope.returns().is_empty());
        assert_eq!(ctx.temp(), "_t1");
    }

    #[test]
    fn test_redeclared_local_gets_suffix() {
        let contract = Contract::new("C");
        let mut ctx = GenContext::new(&contract);
        ctx.begin_function(&[Variable::new("amount", Type::Uint(256))], &ReturnShape::None);
        assert_eq!(ctx.scope.local("amount"), Some("amount"));
        assert_eq!(ctx.scope.declare("amount"), "amount_1");
        assert_eq!(ctx.scope.local("amount"), Some("amount_1"));

        let outer = ctx.scope.visible();
        assert_eq!(ctx.scope.declare("balance"), "usr_balance");
        ctx.scope.restore(outer);
        assert!(!ctx.scope.is_local("balance"));
        assert_eq!(ctx.scope.declare("balance"), "usr_balance_1");
    }

    #[test]
    fn test_calls_are_recorded_once_in_order() {
        let contract = Contract::new("C");
        let mut ctx = GenContext::new(&contract);
        ctx.record_call("mint");
        ctx.record_call("burn");
        ctx.record_call("mint");
        assert_eq!(ctx.called(0), Some("mint"));
        assert_eq!(ctx.called(1), Some("burn"));
        assert_eq!(ctx.called(2), None);
        ctx.clear_calls();
        assert_eq!(ctx.called(0), None);
    }

    #[test]
    fn test_bind_skips_atoms() {
        let contract = Contract::new("C");
        let mut ctx = GenContext::new(&contract);
        let mut out = CodeBuffer::default();
        assert_eq!(ctx.bind("42".to_string(), &mut out), "42");
        assert_eq!(ctx.bind("amount".to_string(), &mut out), "amount");
        assert_eq!(ctx.bind("sload(0)".to_string(), &mut out), "_t1");
        assert_eq!(out.as_str(), "let _t1 := sload(0)\n");
    }

    #[test]
    fn test_helpers_are_flushed_once() {
        let contract = Contract::new("C");
        let mut ctx = GenContext::new(&contract);
        ctx.use_helper(Helper::MappingSlot);
        ctx.use_helper(Helper::MappingSlot);
        let mut out = CodeBuffer::default();
        ctx.flush_helpers(&mut out);
        assert_eq!(out.as_str().matches("function mapping_slot").count(), 1);

        let mut again = CodeBuffer::default();
        ctx.flush_helpers(&mut again);
        assert!(again.is_empty());
    }

    #[test]
    fn test_loc_offsets() {
        assert_eq!(Loc::Static(3).offset(2), Loc::Static(5));
        assert_eq!(
            Loc::Dynamic("x".to_string()).offset(1).to_string(),
            "add(x, 1)"
        );
    }
}
