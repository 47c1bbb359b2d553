use crate::builtins::{method_fn, safe_name};
use crate::context::{return_bindings, GenContext};
use veriyul_core::{Contract, Method, ReturnShape, Variable};
use veriyul_emit::{CodeBuffer, EmitContext, EmitterConfig};

/// Generated Yul for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YulOutput {
    /// The deployable object: creation code with the runtime object nested inside.
    pub object: String,
    /// The runtime object on its own.
    pub runtime: String,
}

#[derive(Debug, Clone, Default)]
pub struct YulGenerator {
    config: EmitterConfig,
}

impl YulGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, contract: &Contract) -> String {
        self.generate_output(contract).object
    }

    pub fn generate_output(&self, contract: &Contract) -> YulOutput {
        let _span = tracing::debug_span!("yul", contract = %contract.name).entered();
        let mut ctx = GenContext::new(contract);

        let mut runtime = self.buffer();
        runtime.block("object \"runtime\"", |out| {
            out.block("code", |out| ctx.runtime_code(out));
        });
        let runtime = runtime.finish();

        let mut object = self.buffer();
        object.block(format!("object \"{}\"", contract.name), |out| {
            out.block("code", |out| ctx.creation_code(out));
            out.embed(&runtime);
        });

        YulOutput {
            object: object.finish(),
            runtime,
        }
    }

    fn buffer(&self) -> CodeBuffer {
        CodeBuffer::new(EmitContext::from_config(&self.config))
    }
}

impl<'c> GenContext<'c> {
    fn creation_code(&mut self, out: &mut CodeBuffer) {
        let contract = self.contract;
        let payable = contract.constructor.as_ref().is_some_and(Method::is_payable);
        if !payable {
            out.line("if callvalue() { revert(0, 0) }");
        }
        for slot in 0..self.layout.total_slots() {
            out.line(format!("sstore({}, 0)", slot));
        }
        if let Some(constructor) = &contract.constructor {
            let params = &constructor.params;
            if !params.is_empty() {
                out.line(format!("let program_size := datasize(\"{}\")", contract.name));
                out.line(format!("codecopy(0, program_size, {})", 32 * params.len()));
            }
            let mut args = Vec::with_capacity(params.len());
            for (i, param) in params.iter().enumerate() {
                let name = safe_name(&param.name).into_owned();
                out.line(format!("let {} := mload({})", name, 32 * i));
                args.push(name);
            }
            out.line(format!("constructor_fn({})", args.join(", ")));
        }
        out.line("datacopy(0, dataoffset(\"runtime\"), datasize(\"runtime\"))");
        out.line("return(0, datasize(\"runtime\"))");

        if let Some(constructor) = &contract.constructor {
            out.blank();
            self.clear_calls();
            self.function("constructor_fn", constructor, out);
            self.called_methods(out);
        }
        self.flush_helpers(out);
    }

    /// Emits every method the code lowered since the last `clear_calls` reaches, following
    /// calls made by the emitted methods in turn. Yul functions are scoped to their object,
    /// so creation code needs its own copy of anything the constructor calls.
    fn called_methods(&mut self, out: &mut CodeBuffer) {
        let contract = self.contract;
        let mut next = 0;
        while let Some(name) = self.called(next) {
            next += 1;
            if let Some(method) = contract.method(name) {
                let name = method_fn(&method.name);
                out.blank();
                self.function(&name, method, out);
            }
        }
        self.clear_calls();
    }

    fn runtime_code(&mut self, out: &mut CodeBuffer) {
        let contract = self.contract;
        self.dispatcher(out);
        for method in contract.exposed_methods() {
            out.blank();
            self.external_wrapper(method, out);
        }
        if let Some(receive) = &contract.receive {
            out.blank();
            self.function("receive_fn", receive, out);
        }
        if let Some(fallback) = &contract.fallback {
            out.blank();
            self.function("fallback_fn", fallback, out);
        }
        for method in &contract.methods {
            out.blank();
            self.function(&method_fn(&method.name), method, out);
        }
        self.flush_helpers(out);
    }

    /// Lowers a method body into a Yul function taking its parameters and returning its
    /// return bindings. Modifier guards run first, then preconditions, then the body.
    fn function(&mut self, name: &str, method: &Method, out: &mut CodeBuffer) {
        self.begin_function(&method.params, &method.returns);
        out.open(function_header(name, &method.params, &method.returns));

        let contract = self.contract;
        for modifier in &method.modifiers {
            match contract.modifier(modifier) {
                Some(modifier) => {
                    for guard in &modifier.guards {
                        self.guard(guard, out);
                    }
                }
                None => tracing::debug!(modifier = %modifier, "unknown modifier skipped"),
            }
        }
        for precondition in &method.preconditions {
            self.guard(precondition, out);
        }
        self.block(&method.body, out);
        out.close();
    }
}

fn function_header(name: &str, params: &[Variable], returns: &ReturnShape) -> String {
    let params: Vec<String> = params
        .iter()
        .map(|param| safe_name(&param.name).into_owned())
        .collect();
    let bindings = return_bindings(returns);
    let mut header = format!("function {}({})", name, params.join(", "));
    if !bindings.is_empty() {
        header.push_str(" -> ");
        header.push_str(&bindings.join(", "));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriyul_core::{Expression, Statement, Type};

    #[test]
    fn test_function_header() {
        let params = vec![
            Variable::new("to", Type::Address),
            Variable::new("gas", Type::Uint(256)),
        ];
        assert_eq!(
            function_header("fun_send", &params, &ReturnShape::Single(Type::Bool)),
            "function fun_send(to, usr_gas) -> result"
        );
        assert_eq!(
            function_header("receive_fn", &[], &ReturnShape::None),
            "function receive_fn()"
        );
    }

    #[test]
    fn test_empty_contract_has_only_fallthrough() {
        let yul = YulGenerator::new().generate(&Contract::new("Empty"));
        assert!(yul.starts_with("object \"Empty\" {\n  code {\n    if callvalue() { revert(0, 0) }\n"));
        assert!(yul.contains("  object \"runtime\" {\n    code {\n"));
        assert!(yul.contains("      let selector := shr(224, calldataload(0))\n      revert(0, 0)\n"));
        assert!(!yul.contains("constructor_fn"));
        assert!(!yul.contains("function mapping_slot"));
    }

    #[test]
    fn test_runtime_is_embedded_verbatim() {
        let mut contract = Contract::new("Counter");
        contract.fields.push(Variable::new("count", Type::Uint(256)));
        let mut bump = Method::new("bump");
        bump.body.push(Statement::Assign {
            target: veriyul_core::AssignTarget::Name("count".into()),
            value: Expression::int(1),
        });
        contract.methods.push(bump);

        let output = YulGenerator::new().generate_output(&contract);
        let nested: String = output
            .runtime
            .lines()
            .map(|line| match line {
                "" => "\n".to_string(),
                line => format!("  {}\n", line),
            })
            .collect();
        assert!(output.object.contains(&nested));
        assert!(output.runtime.starts_with("object \"runtime\" {"));
    }
}
