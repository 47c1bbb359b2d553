//! Statement lowering.

use crate::builtins::safe_name;
use crate::context::{GenContext, Helper, Loc, Place};
use veriyul_core::{AssignTarget, Expression, RevertKind, Selector, Statement, Type};
use veriyul_emit::CodeBuffer;

/// `Panic(uint256)` code for a failed assertion.
const ASSERT_PANIC_CODE: u64 = 0x01;

impl<'c> GenContext<'c> {
    /// Lowers a nested block. Locals declared inside go out of scope at its end.
    pub fn block(&mut self, body: &[Statement], out: &mut CodeBuffer) {
        let outer = self.scope.visible();
        for statement in body {
            self.stmt(statement, out);
        }
        self.scope.restore(outer);
    }

    pub fn stmt(&mut self, statement: &Statement, out: &mut CodeBuffer) {
        match statement {
            Statement::VarDecl { var, init } => {
                let value = match init {
                    Some(init) => self.expr(init, out),
                    None => "0".to_string(),
                };
                let name = self.scope.declare(&var.name);
                out.line(format!("let {} := {}", name, value));
            }
            Statement::Assign { target, value } => self.assign(target, value, out),
            Statement::Return(values) => self.ret(values, out),
            Statement::Assert(condition) => {
                let condition = self.expr(condition, out);
                out.block(format!("if iszero({})", condition), |out| {
                    let panic = Selector::from_signature("Panic(uint256)");
                    out.line(format!("mstore(0, shl(224, {}))", panic));
                    out.line(format!("mstore(4, {})", ASSERT_PANIC_CODE));
                    out.line("revert(0, 36)");
                });
            }
            Statement::Require(condition) => self.guard(condition, out),
            Statement::Emit { event, args } => self.emit(event, args, out),
            Statement::Revert(kind) => self.revert(kind, out),
            Statement::SelfDestruct(beneficiary) => {
                let beneficiary = self.expr(beneficiary, out);
                out.line(format!("selfdestruct({})", beneficiary));
            }
            Statement::Push { array, value } => self.push(array, value, out),
            Statement::Pop { array } => self.pop(array, out),
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.expr(condition, out);
                match else_body {
                    None => {
                        out.open(format!("if {}", condition));
                        self.block(then_body, out);
                        out.close();
                    }
                    Some(else_body) => {
                        out.line(format!("switch {}", condition));
                        out.open("case 0");
                        self.block(else_body, out);
                        out.close();
                        out.open("default");
                        self.block(then_body, out);
                        out.close();
                    }
                }
            }
            Statement::While { condition, body } => {
                let mut prelude = out.scratch();
                let condition = self.expr(condition, &mut prelude);
                if prelude.is_empty() {
                    out.open(format!("for {{ }} {} {{ }}", condition));
                } else {
                    out.open("for { } 1 { }");
                    out.embed(prelude.as_str());
                    out.line(format!("if iszero({}) {{ break }}", condition));
                }
                self.block(body, out);
                out.close();
            }
            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                out.open("for");
                if let Some(init) = init {
                    self.stmt(init, out);
                }
                let mut prelude = out.scratch();
                let condition = self.expr(condition, &mut prelude);
                let header = if prelude.is_empty() { condition.clone() } else { "1".to_string() };
                out.reopen(format!("}} {} {{", header));
                if let Some(update) = update {
                    self.stmt(update, out);
                }
                out.reopen("} {");
                if !prelude.is_empty() {
                    out.embed(prelude.as_str());
                    out.line(format!("if iszero({}) {{ break }}", condition));
                }
                self.block(body, out);
                out.close();
            }
            Statement::Expr(expr) => self.expr_stmt(expr, out),
        }
    }

    /// `if iszero(c) { revert(0, 0) }`, shared by `require`, preconditions and modifier guards.
    pub fn guard(&mut self, condition: &Expression, out: &mut CodeBuffer) {
        let condition = self.expr(condition, out);
        out.line(format!("if iszero({}) {{ revert(0, 0) }}", condition));
    }

    fn assign(&mut self, target: &AssignTarget, value: &Expression, out: &mut CodeBuffer) {
        let lvalue = match target {
            AssignTarget::Name(name) => {
                if let Expression::KeyUpdate { .. } = value {
                    return self.assign_update(name, value, out);
                }
                if let Some(local) = self.scope.local(name).map(str::to_string) {
                    let value = self.expr(value, out);
                    out.line(format!("{} := {}", local, value));
                    return;
                }
                Expression::var(name.clone())
            }
            AssignTarget::Indexed { base, indices } => indices
                .iter()
                .fold(Expression::var(base.clone()), |acc, index| {
                    Expression::index(acc, index.clone())
                }),
            AssignTarget::Field { path } => {
                let mut parts = path.iter();
                let root = Expression::var(parts.next().cloned().unwrap_or_default());
                parts.fold(root, |acc, field| Expression::field(acc, field.clone()))
            }
        };

        if let Expression::KeyUpdate { .. } = value {
            match self.place(&lvalue, out) {
                Some(place) => self.store_update(place, value, out),
                None => tracing::warn!(?target, "map update into a non-storage target dropped"),
            }
            return;
        }
        let value = self.expr(value, out);
        match self.place(&lvalue, out) {
            Some(place) => out.line(format!("sstore({}, {})", place.loc, value)),
            None => {
                tracing::warn!(?target, "assignment target does not resolve to storage");
                if let AssignTarget::Name(name) = target {
                    out.line(format!("{} := {}", safe_name(name), value));
                }
            }
        }
    }

    /// `m := m[k := v]...`: every update is written through to the map's storage.
    fn assign_update(&mut self, name: &str, value: &Expression, out: &mut CodeBuffer) {
        let mut root = value;
        while let Expression::KeyUpdate { base, .. } = root {
            root = base;
        }
        let place = self
            .place(root, out)
            .or_else(|| self.storage_place(name));
        match place {
            Some(place) => self.store_update(place, value, out),
            None => tracing::warn!(target = %name, "map update of a non-storage value dropped"),
        }
    }

    fn store_update(&mut self, place: Place, update: &Expression, out: &mut CodeBuffer) {
        let Expression::KeyUpdate { base, key, value } = update else {
            let value = self.expr(update, out);
            out.line(format!("sstore({}, {})", place.loc, value));
            return;
        };
        if let Expression::KeyUpdate { .. } = base.as_ref() {
            self.store_update(place.clone(), base, out);
        }
        if let Expression::KeyUpdate { .. } = value.as_ref() {
            let key = self.expr(key, out);
            let entry = self.index_place(place, key);
            self.store_update(entry, value, out);
        } else {
            let value = self.expr(value, out);
            let key = self.expr(key, out);
            let entry = self.index_place(place, key);
            out.line(format!("sstore({}, {})", entry.loc, value));
        }
    }

    fn ret(&mut self, values: &[Expression], out: &mut CodeBuffer) {
        let bindings = self.scope.returns().to_vec();
        if values.len() > bindings.len() {
            tracing::warn!(
                values = values.len(),
                declared = bindings.len(),
                "extra return values dropped"
            );
        }
        match values {
            [] => {}
            [value] => {
                let value = self.expr(value, out);
                if let Some(binding) = bindings.first() {
                    out.line(format!("{} := {}", binding, value));
                }
            }
            values => {
                let words: Vec<String> = values
                    .iter()
                    .map(|value| {
                        let word = self.expr(value, out);
                        self.bind(word, out)
                    })
                    .collect();
                for (binding, word) in bindings.iter().zip(words) {
                    out.line(format!("{} := {}", binding, word));
                }
            }
        }
        out.line("leave");
    }

    fn emit(&mut self, name: &str, args: &[Expression], out: &mut CodeBuffer) {
        let Some(event) = self.contract.event(name) else {
            tracing::warn!(event = %name, "emit of an undeclared event dropped");
            return;
        };
        let words: Vec<String> = args
            .iter()
            .map(|arg| {
                let word = self.expr(arg, out);
                self.bind(word, out)
            })
            .collect();

        let mut topics = Vec::new();
        if !event.anonymous {
            if let Some(topic) = self.event_topic(name) {
                topics.push(topic.to_string());
            }
        }
        let mut data = 0u64;
        for (i, word) in words.into_iter().enumerate() {
            if event.is_indexed(i) {
                topics.push(word);
            } else {
                out.line(format!("mstore({}, {})", data * 32, word));
                data += 1;
            }
        }
        if topics.len() > 4 {
            tracing::warn!(event = %name, topics = topics.len(), "too many topics, extra dropped");
            topics.truncate(4);
        }
        let mut args = vec!["0".to_string(), (data * 32).to_string()];
        let count = topics.len();
        args.extend(topics);
        out.line(format!("log{}({})", count, args.join(", ")));
    }

    fn revert(&mut self, kind: &RevertKind, out: &mut CodeBuffer) {
        match kind {
            RevertKind::Bare => out.line("revert(0, 0)"),
            RevertKind::Message(message) => {
                let selector = Selector::from_signature("Error(string)");
                let bytes = message.as_bytes();
                out.line(format!("mstore(0, shl(224, {}))", selector));
                out.line("mstore(4, 32)");
                out.line(format!("mstore(36, {})", bytes.len()));
                for (i, chunk) in bytes.chunks(32).enumerate() {
                    let mut word = [0u8; 32];
                    word[..chunk.len()].copy_from_slice(chunk);
                    out.line(format!("mstore({}, 0x{})", 68 + 32 * i, hex::encode(word)));
                }
                let words = bytes.len().div_ceil(32);
                out.line(format!("revert(0, {})", 68 + 32 * words));
            }
            RevertKind::Error { name, args } => {
                let Some(selector) = self.error_selector(name) else {
                    tracing::warn!(error = %name, "revert with an undeclared error, reverting bare");
                    out.line("revert(0, 0)");
                    return;
                };
                let words: Vec<String> = args
                    .iter()
                    .map(|arg| {
                        let word = self.expr(arg, out);
                        self.bind(word, out)
                    })
                    .collect();
                out.line(format!("mstore(0, shl(224, {}))", selector));
                for (i, word) in words.iter().enumerate() {
                    out.line(format!("mstore({}, {})", 4 + 32 * i, word));
                }
                out.line(format!("revert(0, {})", 4 + 32 * words.len()));
            }
        }
    }

    fn array_place(&self, array: &str) -> Option<(Loc, Type)> {
        let place = self.storage_place(array)?;
        match place.ty {
            Some(Type::Array(elem)) => Some((place.loc, *elem)),
            _ => None,
        }
    }

    fn push(&mut self, array: &str, value: &Expression, out: &mut CodeBuffer) {
        let Some((loc, elem)) = self.array_place(array) else {
            tracing::warn!(array = %array, "push onto a non-storage array dropped");
            return;
        };
        let value = self.expr(value, out);
        let value = self.bind(value, out);
        let len = self.temp();
        out.line(format!("let {} := sload({})", len, loc));
        let element = self.element_slot(&loc, &len, &elem);
        out.line(format!("sstore({}, {})", element, value));
        out.line(format!("sstore({}, add({}, 1))", loc, len));
    }

    fn pop(&mut self, array: &str, out: &mut CodeBuffer) {
        let Some((loc, elem)) = self.array_place(array) else {
            tracing::warn!(array = %array, "pop from a non-storage array dropped");
            return;
        };
        let len = self.temp();
        out.line(format!("let {} := sload({})", len, loc));
        out.line(format!("if iszero({}) {{ revert(0, 0) }}", len));
        let last = self.temp();
        out.line(format!("let {} := sub({}, 1)", last, len));
        let element = Loc::Dynamic(self.element_slot(&loc, &last, &elem));
        for offset in 0..self.layout.size_of(&elem) {
            out.line(format!("sstore({}, 0)", element.clone().offset(offset)));
        }
        out.line(format!("sstore({}, {})", loc, last));
    }

    fn element_slot(&mut self, loc: &Loc, index: &str, elem: &Type) -> String {
        self.use_helper(Helper::ArrayDataSlot);
        match self.layout.size_of(elem) {
            1 => format!("add(array_data_slot({}), {})", loc, index),
            size => format!("add(array_data_slot({}), mul({}, {}))", loc, index, size),
        }
    }

    fn expr_stmt(&mut self, expr: &Expression, out: &mut CodeBuffer) {
        let arity = match expr {
            Expression::Call { name, .. } => self.contract.method(name).map(|m| m.returns.len()),
            _ => None,
        };
        let value = self.expr(expr, out);
        match arity {
            Some(0) => out.line(value),
            Some(n) if n > 1 => {
                let temps: Vec<String> = (0..n).map(|_| self.temp()).collect();
                out.line(format!("let {} := {}", temps.join(", "), value));
            }
            _ => out.line(format!("pop({})", value)),
        }
    }
}
