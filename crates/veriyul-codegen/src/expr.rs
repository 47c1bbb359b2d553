//! Expression lowering.
//!
//! Every lowering returns a Yul expression string. Anything that cannot be written as a
//! single expression (conditional values, external call data) is emitted as statements
//! into `out` ahead of the use site.

use crate::builtins::{method_fn, safe_name};
use crate::context::{GenContext, Helper, Loc, Place};
use veriyul_core::{
    BinaryOp, CallKind, Expression, GhostValue, GlobalVar, Literal, Type, UnaryOp,
};
use veriyul_emit::CodeBuffer;

/// Memory offset external call data is written to, clear of the hashing scratch words.
pub const CALL_DATA_OFFSET: u64 = 128;

impl<'c> GenContext<'c> {
    pub fn expr(&mut self, expr: &Expression, out: &mut CodeBuffer) -> String {
        match expr {
            Expression::Literal(literal) => literal_value(literal),
            Expression::Variable(name) => self.variable(name),
            Expression::Binary { op, left, right } => self.binary(*op, left, right, out),
            Expression::Unary { op, operand } => {
                let value = self.expr(operand, out);
                match op {
                    UnaryOp::Not => format!("iszero({})", value),
                    UnaryOp::Neg => format!("sub(0, {})", value),
                }
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.expr(condition, out);
                let temp = self.temp();
                out.line(format!("let {} := 0", temp));
                out.line(format!("switch {}", condition));
                out.open("case 0");
                let value = self.expr(else_branch, out);
                out.line(format!("{} := {}", temp, value));
                out.close();
                out.open("default");
                let value = self.expr(then_branch, out);
                out.line(format!("{} := {}", temp, value));
                out.close();
                temp
            }
            Expression::Call { name, args } => self.call(name, args, out),
            Expression::Index { .. } | Expression::Field { .. } => match self.place(expr, out) {
                Some(place) => format!("sload({})", place.loc),
                None => {
                    tracing::warn!(?expr, "access does not resolve to storage, using 0");
                    "0".to_string()
                }
            },
            Expression::Length(name) => match self.storage_place(name) {
                Some(place) => format!("sload({})", place.loc),
                None => {
                    tracing::warn!(array = %name, "length of a non-storage value, using 0");
                    "0".to_string()
                }
            },
            Expression::ExternalCall {
                target,
                kind,
                value,
                data,
            } => self.external_call(target, *kind, value.as_deref(), data.as_deref(), out),
            Expression::Global(global) => global_value(global),
            Expression::KeyUpdate { .. } => {
                tracing::warn!("map update used as a value, using 0");
                "0".to_string()
            }
        }
    }

    fn variable(&mut self, name: &str) -> String {
        if let Some(local) = self.scope.local(name) {
            return local.to_string();
        }
        if let Some(value) = self.contract.constants.get(name) {
            return match value {
                GhostValue::Int(value) => value.to_string(),
                GhostValue::Bool(value) => bool_word(*value).to_string(),
                GhostValue::Raw(text) => {
                    tracing::warn!(constant = %name, value = %text, "ghost constant is not a literal");
                    text.clone()
                }
            };
        }
        if let Some(slot) = self.layout.slot(name) {
            return format!("sload({})", slot);
        }
        if name == "this" {
            return "address()".to_string();
        }
        tracing::warn!(name = %name, "unresolved identifier passed through");
        safe_name(name).into_owned()
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        out: &mut CodeBuffer,
    ) -> String {
        let a = self.expr(left, out);
        let b = match op {
            BinaryOp::In => String::new(),
            _ => self.expr(right, out),
        };
        match op {
            BinaryOp::Eq => format!("eq({}, {})", a, b),
            BinaryOp::Ne => format!("iszero(eq({}, {}))", a, b),
            BinaryOp::Le => format!("iszero(gt({}, {}))", a, b),
            BinaryOp::Ge => format!("iszero(lt({}, {}))", a, b),
            BinaryOp::Lt => format!("lt({}, {})", a, b),
            BinaryOp::Gt => format!("gt({}, {})", a, b),
            BinaryOp::Add => format!("add({}, {})", a, b),
            BinaryOp::Sub => format!("sub({}, {})", a, b),
            BinaryOp::Mul => format!("mul({}, {})", a, b),
            BinaryOp::Div => format!("div({}, {})", a, b),
            BinaryOp::Mod => format!("mod({}, {})", a, b),
            BinaryOp::And => format!("and(iszero(iszero({})), iszero(iszero({})))", a, b),
            BinaryOp::Or => format!("iszero(iszero(or({}, {})))", a, b),
            BinaryOp::In => self.membership(a, right, out),
        }
    }

    /// `key in map` holds when the stored entry is nonzero.
    fn membership(&mut self, key: String, map: &Expression, out: &mut CodeBuffer) -> String {
        match self.place(map, out) {
            Some(place) => {
                let entry = self.index_place(place, key);
                format!("iszero(iszero(sload({})))", entry.loc)
            }
            None => {
                tracing::warn!(?map, "membership test on a non-storage value, using 0");
                "0".to_string()
            }
        }
    }

    fn call(&mut self, name: &str, args: &[Expression], out: &mut CodeBuffer) -> String {
        let values: Vec<String> = args.iter().map(|arg| self.expr(arg, out)).collect();
        if values.len() == 1 && is_conversion(name) {
            return values.into_iter().next().unwrap_or_default();
        }
        match (name, values.len()) {
            ("keccak256", 1) => {
                self.use_helper(Helper::HashWord);
                format!("hash_word({})", values[0])
            }
            ("addmod", 3) | ("mulmod", 3) => format!("{}({})", name, values.join(", ")),
            ("gasleft", 0) => "gas()".to_string(),
            _ if self.contract.method(name).is_some() => {
                self.record_call(name);
                format!("{}({})", method_fn(name), values.join(", "))
            }
            _ => {
                tracing::warn!(function = %name, "call to an unknown function passed through");
                format!("{}({})", safe_name(name), values.join(", "))
            }
        }
    }

    fn external_call(
        &mut self,
        target: &Expression,
        kind: CallKind,
        value: Option<&Expression>,
        data: Option<&Expression>,
        out: &mut CodeBuffer,
    ) -> String {
        let target = self.expr(target, out);
        let target = self.bind(target, out);
        let value = match value {
            Some(value) => {
                let value = self.expr(value, out);
                self.bind(value, out)
            }
            None => "0".to_string(),
        };
        let size = match data {
            None => 0,
            Some(Expression::Literal(Literal::Str(text))) if text.is_empty() => 0,
            Some(data) => {
                let word = self.expr(data, out);
                out.line(format!("mstore({}, {})", CALL_DATA_OFFSET, word));
                32
            }
        };
        match kind {
            CallKind::Call => format!(
                "call(gas(), {}, {}, {}, {}, 0, 0)",
                target, value, CALL_DATA_OFFSET, size
            ),
            CallKind::DelegateCall => format!(
                "delegatecall(gas(), {}, {}, {}, 0, 0)",
                target, CALL_DATA_OFFSET, size
            ),
            CallKind::StaticCall => format!(
                "staticcall(gas(), {}, {}, {}, 0, 0)",
                target, CALL_DATA_OFFSET, size
            ),
        }
    }

    /// Storage location of a contract field, unless a local of the same name shadows it.
    pub fn storage_place(&self, name: &str) -> Option<Place> {
        if self.scope.is_local(name) {
            return None;
        }
        self.field_place(name)
    }

    fn field_place(&self, name: &str) -> Option<Place> {
        self.layout.field(name).map(|entry| Place {
            loc: Loc::Static(entry.slot),
            ty: Some(entry.ty.clone()),
        })
    }

    /// Resolves an lvalue-shaped expression to the storage slot it denotes.
    pub fn place(&mut self, expr: &Expression, out: &mut CodeBuffer) -> Option<Place> {
        match expr {
            Expression::Variable(name) => self.storage_place(name),
            Expression::Field { base, field } => {
                if matches!(base.as_ref(), Expression::Variable(name) if name == "this") {
                    return self.field_place(field);
                }
                let base = self.place(base, out)?;
                let member = match base.ty.as_ref().and_then(Type::struct_name) {
                    Some(name) => self
                        .layout
                        .struct_layout(name)
                        .and_then(|layout| layout.member(field)),
                    None => {
                        tracing::debug!(field = %field, "struct type unknown, searching members");
                        self.layout.find_member(field)
                    }
                };
                match member {
                    Some(member) => Some(Place {
                        loc: base.loc.offset(member.offset),
                        ty: Some(member.ty.clone()),
                    }),
                    None => {
                        tracing::warn!(field = %field, "unknown struct member");
                        None
                    }
                }
            }
            Expression::Index { base, index } => {
                let base = self.place(base, out)?;
                let key = self.expr(index, out);
                Some(self.index_place(base, key))
            }
            _ => None,
        }
    }

    /// The slot one level of indexing below `base`. Arrays index from the hash of their
    /// slot; everything else is addressed like a mapping.
    pub fn index_place(&mut self, base: Place, key: String) -> Place {
        match base.ty {
            Some(Type::Array(elem)) => {
                self.use_helper(Helper::ArrayDataSlot);
                let offset = match self.layout.size_of(&elem) {
                    1 => key,
                    size => format!("mul({}, {})", key, size),
                };
                Place {
                    loc: Loc::Dynamic(format!("add(array_data_slot({}), {})", base.loc, offset)),
                    ty: Some(*elem),
                }
            }
            Some(Type::Mapping(_, value)) => {
                self.use_helper(Helper::MappingSlot);
                Place {
                    loc: Loc::Dynamic(format!("mapping_slot({}, {})", base.loc, key)),
                    ty: Some(*value),
                }
            }
            other => {
                tracing::debug!(ty = ?other, "indexing a non-collection, hashing as a mapping");
                self.use_helper(Helper::MappingSlot);
                Place {
                    loc: Loc::Dynamic(format!("mapping_slot({}, {})", base.loc, key)),
                    ty: None,
                }
            }
        }
    }
}

fn literal_value(literal: &Literal) -> String {
    match literal {
        Literal::Int(value) => value.to_string(),
        Literal::Bool(value) => bool_word(*value).to_string(),
        Literal::Str(text) => format!("\"{}\"", text.escape_default()),
    }
}

fn bool_word(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// `uint256(x)`, `address(x)`, `payable(x)` and friends leave the word unchanged.
fn is_conversion(name: &str) -> bool {
    name == "payable" || Type::from_name(name).struct_name().is_none()
}

fn global_value(global: &GlobalVar) -> String {
    let value = match global {
        GlobalVar::MsgSender => "caller()",
        GlobalVar::MsgValue => "callvalue()",
        GlobalVar::MsgData => "calldatasize()",
        GlobalVar::MsgSig => "shr(224, calldataload(0))",
        GlobalVar::TxOrigin => "origin()",
        GlobalVar::TxGasPrice => "gasprice()",
        GlobalVar::BlockTimestamp => "timestamp()",
        GlobalVar::BlockNumber => "number()",
        GlobalVar::BlockDifficulty => "difficulty()",
        GlobalVar::BlockGasLimit => "gaslimit()",
        GlobalVar::BlockCoinbase => "coinbase()",
        GlobalVar::BlockChainId => "chainid()",
        GlobalVar::BlockBaseFee => "basefee()",
        GlobalVar::Unknown(name) => {
            tracing::warn!(global = %name, "unknown context value, using 0");
            "0"
        }
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use veriyul_core::{Contract, ReturnShape, Struct, Variable};

    fn token() -> Contract {
        let mut contract = Contract::new("Token");
        contract.fields.push(Variable::new("total", Type::Uint(256)));
        contract.fields.push(Variable::new(
            "allowed",
            Type::Mapping(
                Box::new(Type::Address),
                Box::new(Type::Mapping(Box::new(Type::Address), Box::new(Type::Uint(256)))),
            ),
        ));
        contract.fields.push(Variable::new(
            "points",
            Type::Array(Box::new(Type::Struct("Point".into()))),
        ));
        contract.fields.push(Variable::new("origin", Type::Struct("Point".into())));
        contract.structs.push(Struct {
            name: "Point".into(),
            fields: vec![
                Variable::new("x", Type::Uint(256)),
                Variable::new("y", Type::Uint(256)),
            ],
        });
        contract
            .constants
            .insert("CAP".into(), GhostValue::Int(1000u32.into()));
        contract
    }

    fn lower(contract: &Contract, expr: &Expression) -> (String, String) {
        let mut ctx = GenContext::new(contract);
        ctx.begin_function(&[Variable::new("who", Type::Address)], &ReturnShape::None);
        let mut out = CodeBuffer::default();
        let value = ctx.expr(expr, &mut out);
        (value, out.finish())
    }

    #[test]
    fn test_nested_mapping_hashes_twice() {
        let contract = token();
        let expr = Expression::index(
            Expression::index(Expression::var("allowed"), Expression::var("who")),
            Expression::Global(GlobalVar::MsgSender),
        );
        let (value, prelude) = lower(&contract, &expr);
        assert_eq!(value, "sload(mapping_slot(mapping_slot(1, who), caller()))");
        assert!(prelude.is_empty());
    }

    #[test]
    fn test_struct_array_element_member() {
        let contract = token();
        let expr = Expression::field(
            Expression::index(Expression::var("points"), Expression::int(3)),
            "y",
        );
        let (value, _) = lower(&contract, &expr);
        assert_eq!(value, "sload(add(add(array_data_slot(2), mul(3, 2)), 1))");

        let (value, _) = lower(&contract, &Expression::field(Expression::var("origin"), "y"));
        assert_eq!(value, "sload(4)");
    }

    #[test]
    fn test_logical_operators_normalise_to_bool() {
        let contract = token();
        let expr = Expression::binary(BinaryOp::And, Expression::var("who"), Expression::int(2));
        assert_eq!(
            lower(&contract, &expr).0,
            "and(iszero(iszero(who)), iszero(iszero(2)))"
        );
        let expr = Expression::binary(BinaryOp::Or, Expression::var("who"), Expression::int(2));
        assert_eq!(lower(&contract, &expr).0, "iszero(iszero(or(who, 2)))");
    }

    #[test]
    fn test_comparisons() {
        let contract = token();
        let expr = Expression::binary(BinaryOp::Le, Expression::var("total"), Expression::var("CAP"));
        assert_eq!(lower(&contract, &expr).0, "iszero(gt(sload(0), 1000))");
        let expr = Expression::binary(BinaryOp::Ne, Expression::var("who"), Expression::int(0));
        assert_eq!(lower(&contract, &expr).0, "iszero(eq(who, 0))");
    }

    #[test]
    fn test_membership_reads_mapping_entry() {
        let contract = token();
        let expr = Expression::binary(
            BinaryOp::In,
            Expression::var("who"),
            Expression::index(Expression::var("allowed"), Expression::var("who")),
        );
        assert_eq!(
            lower(&contract, &expr).0,
            "iszero(iszero(sload(mapping_slot(mapping_slot(1, who), who))))"
        );
    }

    #[test]
    fn test_conditional_binds_a_temporary() {
        let contract = token();
        let expr = Expression::Conditional {
            condition: Box::new(Expression::var("who")),
            then_branch: Box::new(Expression::int(1)),
            else_branch: Box::new(Expression::var("total")),
        };
        let (value, prelude) = lower(&contract, &expr);
        assert_eq!(value, "_t1");
        assert_eq!(
            prelude,
            "let _t1 := 0\nswitch who\ncase 0 {\n  _t1 := sload(0)\n}\ndefault {\n  _t1 := 1\n}\n"
        );
    }

    #[test]
    fn test_conversions_and_builtins() {
        let contract = token();
        let call = |name: &str, args: Vec<Expression>| Expression::Call {
            name: name.into(),
            args,
        };
        assert_eq!(lower(&contract, &call("uint256", vec![Expression::var("who")])).0, "who");
        assert_eq!(lower(&contract, &call("payable", vec![Expression::var("who")])).0, "who");
        assert_eq!(lower(&contract, &call("gasleft", vec![])).0, "gas()");
        assert_eq!(
            lower(&contract, &call("keccak256", vec![Expression::var("who")])).0,
            "hash_word(who)"
        );
    }

    #[test]
    fn test_locals_shadow_storage() {
        let contract = token();
        let mut ctx = GenContext::new(&contract);
        ctx.begin_function(&[Variable::new("total", Type::Uint(256))], &ReturnShape::None);
        let mut out = CodeBuffer::default();
        assert_eq!(ctx.expr(&Expression::var("total"), &mut out), "total");
        let this_total = Expression::field(Expression::var("this"), "total");
        assert_eq!(ctx.expr(&this_total, &mut out), "sload(0)");
    }

    #[test]
    fn test_external_call_writes_data_clear_of_scratch() {
        let contract = token();
        let expr = Expression::ExternalCall {
            target: Box::new(Expression::var("who")),
            kind: CallKind::Call,
            value: Some(Box::new(Expression::var("total"))),
            data: Some(Box::new(Expression::int(7))),
        };
        let (value, prelude) = lower(&contract, &expr);
        assert_eq!(value, "call(gas(), who, _t1, 128, 32, 0, 0)");
        assert_eq!(prelude, "let _t1 := sload(0)\nmstore(128, 7)\n");

        let expr = Expression::ExternalCall {
            target: Box::new(Expression::var("who")),
            kind: CallKind::StaticCall,
            value: None,
            data: Some(Box::new(Expression::Literal(Literal::Str(String::new())))),
        };
        assert_eq!(
            lower(&contract, &expr).0,
            "staticcall(gas(), who, 128, 0, 0, 0)"
        );
    }

    #[test]
    fn test_unresolved_names_pass_through() {
        let contract = token();
        assert_eq!(lower(&contract, &Expression::var("mystery")).0, "mystery");
        assert_eq!(lower(&contract, &Expression::var("balance")).0, "usr_balance");
        assert_eq!(
            lower(&contract, &Expression::Global(GlobalVar::Unknown("msg.gas".into()))).0,
            "0"
        );
    }
}
