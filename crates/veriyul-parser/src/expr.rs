//! Expression parsing over token runs.
//!
//! Binary operators are not parsed by precedence. Each operator in
//! [`BinaryOp::PRIORITY`] is tried in turn and the expression splits at its leftmost
//! depth-0 occurrence that has operands on both sides, so `a - b - c` parses as
//! `a - (b - c)`. Existing sources depend on this shape.

use crate::cursor::{
    find_top, group_spans_rest, matching_close, matching_open, split_top, top_level,
};
use crate::lexer::{source_text, Token, TokenKind};
use num_bigint::BigUint;
use veriyul_core::{BinaryOp, CallKind, Expression, GlobalVar, Literal, UnaryOp};

pub fn parse_expression(source: &str, tokens: &[Token]) -> Expression {
    let tokens = strip_parens(tokens);
    if tokens.is_empty() {
        return Expression::int(0);
    }

    if let Some(expr) = key_update(source, tokens) {
        return expr;
    }
    if let Some(expr) = conditional(source, tokens) {
        return expr;
    }
    if tokens[0].is("!") && tokens.len() > 1 {
        return Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(parse_expression(source, &tokens[1..])),
        };
    }
    if let [single] = tokens {
        if let Some(literal) = literal(single) {
            return Expression::Literal(literal);
        }
    }
    if let Some(expr) = binary(source, tokens) {
        return expr;
    }
    if let Some(expr) = external_call(source, tokens) {
        return expr;
    }
    if let Some(expr) = dotted(tokens) {
        return expr;
    }
    if let Some(expr) = postfix(source, tokens) {
        return expr;
    }
    if let [single] = tokens {
        if single.is_ident() {
            return Expression::Variable(single.text.clone());
        }
    }
    if tokens[0].is("-") && tokens.len() > 1 {
        return Expression::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(parse_expression(source, &tokens[1..])),
        };
    }

    let raw = source_text(source, tokens);
    tracing::debug!(expr = raw, "unrecognised expression, passing text through");
    Expression::Variable(raw.to_string())
}

/// Comma-separated arguments of a call or return.
pub fn parse_list(source: &str, tokens: &[Token]) -> Vec<Expression> {
    split_top(tokens, ",")
        .into_iter()
        .map(|arg| parse_expression(source, arg))
        .collect()
}

fn strip_parens(mut tokens: &[Token]) -> &[Token] {
    while !tokens.is_empty() && tokens[0].is("(") && group_spans_rest(tokens, 0) {
        tokens = &tokens[1..tokens.len() - 1];
    }
    tokens
}

fn literal(token: &Token) -> Option<Literal> {
    match token.kind {
        TokenKind::Number => {
            let value = match token.text.strip_prefix("0x") {
                Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16)?,
                None => BigUint::parse_bytes(token.text.as_bytes(), 10)?,
            };
            Some(Literal::Int(value))
        }
        TokenKind::Str => {
            let inner = &token.text[1..token.text.len() - 1];
            Some(Literal::Str(inner.to_string()))
        }
        TokenKind::Ident if token.text == "true" => Some(Literal::Bool(true)),
        TokenKind::Ident if token.text == "false" => Some(Literal::Bool(false)),
        _ => None,
    }
}

/// `ident (. ident)*`
pub(crate) fn is_name_path(tokens: &[Token]) -> bool {
    !tokens.is_empty()
        && tokens.len() % 2 == 1
        && tokens.iter().enumerate().all(|(i, t)| {
            if i % 2 == 0 {
                t.is_ident()
            } else {
                t.is(".")
            }
        })
}

pub(crate) fn name_path(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().step_by(2).map(|t| t.text.as_str()).collect()
}

/// `base[k := v]`, chained updates nest innermost-first. Plain index groups before the
/// first update stay part of the base, so `m[a][b := v]` updates the inner mapping `m[a]`.
fn key_update(source: &str, tokens: &[Token]) -> Option<Expression> {
    let mut groups = Vec::new();
    let mut end = tokens.len();
    while end > 0 && tokens[end - 1].is("]") {
        let open = matching_open(&tokens[..end], end - 1)?;
        groups.push((open, end - 1));
        end = open;
    }
    if end == 0 || groups.is_empty() || !is_name_path(&tokens[..end]) {
        return None;
    }
    groups.reverse();

    let updates: Vec<Option<usize>> = groups
        .iter()
        .map(|&(open, close)| {
            find_top(&tokens[open + 1..close], |t| t.is(":=")).map(|k| open + 1 + k)
        })
        .collect();
    let first = updates.iter().position(Option::is_some)?;

    let mut acc = parse_expression(source, &tokens[..groups[first].0]);
    for (&(open, close), update) in groups[first..].iter().zip(&updates[first..]) {
        acc = match update {
            Some(assign) => Expression::KeyUpdate {
                base: Box::new(acc),
                key: Box::new(parse_expression(source, &tokens[open + 1..*assign])),
                value: Box::new(parse_expression(source, &tokens[assign + 1..close])),
            },
            None => Expression::index(acc, parse_expression(source, &tokens[open + 1..close])),
        };
    }
    Some(acc)
}

/// `if C then T else E`, counting nested `if`s so an inner conditional keeps its own
/// `then`/`else`.
fn conditional(source: &str, tokens: &[Token]) -> Option<Expression> {
    if !tokens[0].is_keyword("if") {
        return None;
    }
    let mut nesting = 0usize;
    let mut then_at = None;
    let mut else_at = None;
    for (i, token) in top_level(tokens).skip(1) {
        if token.is_keyword("if") {
            nesting += 1;
        } else if token.is_keyword("then") && nesting == 0 && then_at.is_none() {
            then_at = Some(i);
        } else if token.is_keyword("else") {
            if nesting == 0 {
                else_at = Some(i);
                break;
            }
            nesting -= 1;
        }
    }
    let (then_at, else_at) = (then_at?, else_at?);
    if then_at <= 1 || else_at <= then_at + 1 || else_at + 1 >= tokens.len() {
        return None;
    }
    Some(Expression::Conditional {
        condition: Box::new(parse_expression(source, &tokens[1..then_at])),
        then_branch: Box::new(parse_expression(source, &tokens[then_at + 1..else_at])),
        else_branch: Box::new(parse_expression(source, &tokens[else_at + 1..])),
    })
}

fn matches_op(token: &Token, op: BinaryOp) -> bool {
    match op {
        BinaryOp::In => token.is_keyword("in"),
        _ => token.kind == TokenKind::Op && token.text == op.token(),
    }
}

fn binary(source: &str, tokens: &[Token]) -> Option<Expression> {
    for op in BinaryOp::PRIORITY {
        let split = top_level(tokens).find(|&(i, t)| {
            if i == 0 || i + 1 >= tokens.len() || !matches_op(t, op) {
                return false;
            }
            // a unary minus right after another operator is not a split point
            let prev = &tokens[i - 1];
            !(op == BinaryOp::Sub && prev.kind == TokenKind::Op && !prev.is(")") && !prev.is("]"))
        });
        if let Some((i, _)) = split {
            return Some(Expression::binary(
                op,
                parse_expression(source, &tokens[..i]),
                parse_expression(source, &tokens[i + 1..]),
            ));
        }
    }
    None
}

/// `addr.call{value: v}(data)`, `addr.call(data)`, `addr.delegatecall(data)`,
/// `addr.staticcall(data)`.
fn external_call(source: &str, tokens: &[Token]) -> Option<Expression> {
    for (dot, token) in top_level(tokens) {
        if dot == 0 || !token.is(".") {
            continue;
        }
        let Some(kind) = tokens.get(dot + 1).and_then(|t| CallKind::from_member(&t.text)) else {
            continue;
        };
        let mut next = dot + 2;
        let mut value = None;
        if tokens.get(next).is_some_and(|t| t.is("{")) {
            let close = matching_close(tokens, next)?;
            for option in split_top(&tokens[next + 1..close], ",") {
                if option.len() > 2 && option[0].is_keyword("value") && option[1].is(":") {
                    value = Some(Box::new(parse_expression(source, &option[2..])));
                }
            }
            next = close + 1;
        }
        if !tokens.get(next).is_some_and(|t| t.is("(")) || !group_spans_rest(tokens, next) {
            continue;
        }
        let inner = &tokens[next + 1..tokens.len() - 1];
        let data = (!inner.is_empty()).then(|| Box::new(parse_expression(source, inner)));
        return Some(Expression::ExternalCall {
            target: Box::new(parse_expression(source, &tokens[..dot])),
            kind,
            value,
            data,
        });
    }
    None
}

fn dotted(tokens: &[Token]) -> Option<Expression> {
    if tokens.len() < 3 || !is_name_path(tokens) {
        return None;
    }
    let parts = name_path(tokens);
    if GlobalVar::is_namespace(parts[0]) {
        return Some(Expression::Global(GlobalVar::resolve(
            parts[0],
            &parts[1..].join("."),
        )));
    }
    if parts.len() == 2 && parts[1] == "length" {
        return Some(Expression::Length(parts[0].to_string()));
    }
    let mut acc = Expression::var(parts[0]);
    for field in &parts[1..] {
        acc = Expression::field(acc, *field);
    }
    Some(acc)
}

/// Trailing `[i]`, `(args)` or `.field` on something that is not a plain name path.
fn postfix(source: &str, tokens: &[Token]) -> Option<Expression> {
    let last = tokens.len() - 1;
    if tokens[last].is("]") {
        let open = matching_open(tokens, last)?;
        if open == 0 {
            return None;
        }
        return Some(Expression::index(
            parse_expression(source, &tokens[..open]),
            parse_expression(source, &tokens[open + 1..last]),
        ));
    }
    if tokens[last].is(")") {
        let open = matching_open(tokens, last)?;
        if open == 0 || !is_name_path(&tokens[..open]) {
            return None;
        }
        return Some(Expression::Call {
            name: name_path(&tokens[..open]).join("."),
            args: parse_list(source, &tokens[open + 1..last]),
        });
    }
    if last >= 2 && tokens[last].is_ident() && tokens[last - 1].is(".") {
        return Some(Expression::field(
            parse_expression(source, &tokens[..last - 1]),
            tokens[last].text.clone(),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Expression {
        parse_expression(source, &lex(source).unwrap())
    }

    fn var(name: &str) -> Expression {
        Expression::var(name)
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(parse(""), Expression::int(0));
        assert_eq!(parse("()"), Expression::int(0));
    }

    #[test]
    fn test_leftmost_by_priority_list() {
        // `+` is tried before `*`, so the split happens at `+`
        assert_eq!(
            parse("a + b * c"),
            Expression::binary(
                BinaryOp::Add,
                var("a"),
                Expression::binary(BinaryOp::Mul, var("b"), var("c"))
            )
        );
        // `+` is tried before `-`, and the leftmost `-` wins among equals
        assert_eq!(
            parse("a - b + c"),
            Expression::binary(
                BinaryOp::Add,
                Expression::binary(BinaryOp::Sub, var("a"), var("b")),
                var("c")
            )
        );
        assert_eq!(
            parse("a - b - c"),
            Expression::binary(
                BinaryOp::Sub,
                var("a"),
                Expression::binary(BinaryOp::Sub, var("b"), var("c"))
            )
        );
        assert_eq!(
            parse("x == y && z"),
            Expression::binary(
                BinaryOp::Eq,
                var("x"),
                Expression::binary(BinaryOp::And, var("y"), var("z"))
            )
        );
    }

    #[test]
    fn test_not_applies_to_whole_rest() {
        assert_eq!(
            parse("!a && b"),
            Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expression::binary(BinaryOp::And, var("a"), var("b"))),
            }
        );
    }

    #[test]
    fn test_parens_group() {
        assert_eq!(
            parse("(a + b) * c"),
            Expression::binary(
                BinaryOp::Mul,
                Expression::binary(BinaryOp::Add, var("a"), var("b")),
                var("c")
            )
        );
    }

    #[test]
    fn test_unary_minus_operand() {
        assert_eq!(
            parse("a * -b"),
            Expression::binary(
                BinaryOp::Mul,
                var("a"),
                Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(var("b"))
                }
            )
        );
    }

    #[test]
    fn test_membership() {
        assert_eq!(
            parse("owner in balances"),
            Expression::binary(BinaryOp::In, var("owner"), var("balances"))
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("42"), Expression::int(42));
        assert_eq!(parse("0x10"), Expression::int(16));
        assert_eq!(parse("true"), Expression::bool(true));
        assert_eq!(
            parse("\"hi\""),
            Expression::Literal(Literal::Str("hi".into()))
        );
    }

    #[test]
    fn test_chained_key_update_nests_innermost_first() {
        let expected = Expression::KeyUpdate {
            base: Box::new(Expression::KeyUpdate {
                base: Box::new(var("balances")),
                key: Box::new(var("a")),
                value: Box::new(Expression::int(1)),
            }),
            key: Box::new(var("b")),
            value: Box::new(Expression::int(2)),
        };
        assert_eq!(parse("balances[a := 1][b := 2]"), expected);
    }

    #[test]
    fn test_key_update_keeps_leading_index() {
        let expected = Expression::KeyUpdate {
            base: Box::new(Expression::index(var("allowed"), var("owner"))),
            key: Box::new(var("spender")),
            value: Box::new(var("v")),
        };
        assert_eq!(parse("allowed[owner][spender := v]"), expected);
    }

    #[test]
    fn test_key_update_value_with_operators() {
        let expected = Expression::KeyUpdate {
            base: Box::new(var("balances")),
            key: Box::new(Expression::Global(GlobalVar::MsgSender)),
            value: Box::new(Expression::binary(
                BinaryOp::Add,
                Expression::index(var("balances"), Expression::Global(GlobalVar::MsgSender)),
                var("amount"),
            )),
        };
        assert_eq!(
            parse("balances[msg.sender := balances[msg.sender] + amount]"),
            expected
        );
    }

    #[test]
    fn test_nested_conditional() {
        let expected = Expression::Conditional {
            condition: Box::new(var("a")),
            then_branch: Box::new(Expression::Conditional {
                condition: Box::new(var("b")),
                then_branch: Box::new(Expression::int(1)),
                else_branch: Box::new(Expression::int(2)),
            }),
            else_branch: Box::new(Expression::int(3)),
        };
        assert_eq!(parse("if a then if b then 1 else 2 else 3"), expected);
    }

    #[test]
    fn test_external_calls() {
        assert_eq!(
            parse("target.call{value: amount}(payload)"),
            Expression::ExternalCall {
                target: Box::new(var("target")),
                kind: CallKind::Call,
                value: Some(Box::new(var("amount"))),
                data: Some(Box::new(var("payload"))),
            }
        );
        assert_eq!(
            parse("lib.delegatecall(data)"),
            Expression::ExternalCall {
                target: Box::new(var("lib")),
                kind: CallKind::DelegateCall,
                value: None,
                data: Some(Box::new(var("data"))),
            }
        );
    }

    #[test]
    fn test_dotted_names() {
        assert_eq!(parse("msg.value"), Expression::Global(GlobalVar::MsgValue));
        assert_eq!(parse("items.length"), Expression::Length("items".into()));
        assert_eq!(parse("config.owner"), Expression::field(var("config"), "owner"));
    }

    #[test]
    fn test_chained_index_and_field() {
        assert_eq!(
            parse("grid[i][j]"),
            Expression::index(Expression::index(var("grid"), var("i")), var("j"))
        );
        assert_eq!(
            parse("positions[who].amount"),
            Expression::field(Expression::index(var("positions"), var("who")), "amount")
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parse("max(a, f(b))"),
            Expression::Call {
                name: "max".into(),
                args: vec![
                    var("a"),
                    Expression::Call {
                        name: "f".into(),
                        args: vec![var("b")]
                    }
                ],
            }
        );
        assert_eq!(
            parse("now()"),
            Expression::Call {
                name: "now".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_unknown_text_passes_through() {
        assert_eq!(parse("a ==> b"), var("a ==> b"));
    }
}
