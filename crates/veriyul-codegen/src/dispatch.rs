//! Runtime entry point: selector dispatch and the calldata wrappers of exposed methods.

use crate::builtins::{external_fn, method_fn, safe_name};
use crate::context::GenContext;
use veriyul_core::signature::method_signature;
use veriyul_core::{Method, Selector};
use veriyul_emit::CodeBuffer;

impl<'c> GenContext<'c> {
    pub fn dispatcher(&mut self, out: &mut CodeBuffer) {
        let contract = self.contract;
        if contract.receive.is_some() {
            out.line("if and(iszero(calldatasize()), callvalue()) { receive_fn() return(0, 0) }");
        }
        out.line("let selector := shr(224, calldataload(0))");
        for method in contract.exposed_methods() {
            let selector = Selector::from_signature(&method_signature(method));
            out.line(format!(
                "if eq(selector, {}) {{ {}() }}",
                selector,
                external_fn(&method.name)
            ));
        }
        if contract.fallback.is_some() {
            out.line("fallback_fn()");
            out.line("return(0, 0)");
        } else {
            out.line("revert(0, 0)");
        }
    }

    /// Decodes the arguments of `method` from calldata, calls its function and returns
    /// every result as one 32-byte word, in declared order.
    pub fn external_wrapper(&mut self, method: &Method, out: &mut CodeBuffer) {
        out.open(format!("function {}()", external_fn(&method.name)));
        if !method.is_payable() {
            out.line("if callvalue() { revert(0, 0) }");
        }
        let mut args = Vec::with_capacity(method.params.len());
        for (i, param) in method.params.iter().enumerate() {
            let name = safe_name(&param.name).into_owned();
            out.line(format!("let {} := calldataload({})", name, 4 + 32 * i));
            args.push(name);
        }
        let call = format!("{}({})", method_fn(&method.name), args.join(", "));
        let count = method.returns.len();
        if count == 0 {
            out.line(call);
        } else {
            let results: Vec<String> = (0..count).map(|i| format!("_r{}", i)).collect();
            out.line(format!("let {} := {}", results.join(", "), call));
            for (i, result) in results.iter().enumerate() {
                out.line(format!("mstore({}, {})", 32 * i, result));
            }
        }
        out.line(format!("return(0, {})", 32 * count));
        out.close();
    }
}
