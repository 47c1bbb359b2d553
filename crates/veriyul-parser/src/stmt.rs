use crate::cursor::{
    continues_across_lines, find_top, group_spans_rest, is_close, is_infix, is_open,
    matching_close, split_top,
};
use crate::expr::{is_name_path, name_path, parse_expression, parse_list};
use crate::lexer::{source_text, Token, TokenKind};
use crate::types::parse_type;
use veriyul_core::{AssignTarget, Expression, RevertKind, Statement, Type, Variable};

const LOOP_ANNOTATIONS: &[&str] = &["invariant", "decreases", "modifies"];

pub fn parse_block(source: &str, tokens: &[Token]) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let (statement, next) = parse_statement(source, tokens, pos);
        statements.extend(statement);
        pos = next.max(pos + 1);
    }
    statements
}

/// Parses the statement that starts at `start` and returns it, if recognised, together
/// with the index where the following statement begins.
pub fn parse_statement(source: &str, tokens: &[Token], start: usize) -> (Option<Statement>, usize) {
    let head = &tokens[start];
    if head.is(";") {
        return (None, start + 1);
    }
    if head.is_keyword("if") {
        return parse_if(source, tokens, start);
    }
    if head.is_keyword("while") {
        return parse_while(source, tokens, start);
    }
    if head.is_keyword("for") {
        return parse_for(source, tokens, start);
    }
    match statement_end(tokens, start) {
        End::Simple { end, next } => (simple(source, &tokens[start..end]), next),
        End::Block { next } => {
            tracing::debug!(
                line = head.line,
                stmt = source_text(source, &tokens[start..next]),
                "skipping unrecognised block statement"
            );
            (None, next)
        }
    }
}

enum End {
    Simple { end: usize, next: usize },
    Block { next: usize },
}

/// A simple statement runs to a `;` or to a line break at depth 0 that does not sit next
/// to an infix operator. A `{` at depth 0 (other than `call{...}` options) makes it a
/// block statement this parser does not model.
fn statement_end(tokens: &[Token], start: usize) -> End {
    let mut depth = 0usize;
    for i in start..tokens.len() {
        let token = &tokens[i];
        if depth == 0 && i > start {
            if token.is(";") {
                return End::Simple { end: i, next: i + 1 };
            }
            let prev = &tokens[i - 1];
            if token.line != prev.line && !continues_across_lines(prev, token) {
                return End::Simple { end: i, next: i };
            }
        }
        if depth == 0 && token.is("{") && !(i > start && tokens[i - 1].is_keyword("call")) {
            let next = matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
            return End::Block { next };
        }
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.saturating_sub(1);
        }
    }
    End::Simple {
        end: tokens.len(),
        next: tokens.len(),
    }
}

fn skip(source: &str, tokens: &[Token], start: usize) -> (Option<Statement>, usize) {
    let next = match statement_end(tokens, start) {
        End::Simple { next, .. } | End::Block { next } => next,
    };
    tracing::debug!(
        line = tokens[start].line,
        stmt = source_text(source, &tokens[start..next.max(start + 1).min(tokens.len())]),
        "skipping malformed control-flow statement"
    );
    (None, next)
}

enum Body {
    Block { open: usize, close: usize },
    Single { start: usize },
}

/// Locates the end of an `if`/`while` header and the body that follows it. A
/// parenthesised header may be followed by a single statement instead of a block.
fn split_header(tokens: &[Token], start: usize) -> Option<(usize, Body)> {
    let after = start + 1;
    if tokens.get(after).is_some_and(|t| t.is("(")) {
        let close = matching_close(tokens, after)?;
        let next = tokens.get(close + 1)?;
        if !next.is("{") && !is_infix(next) && !next.is_any_keyword(LOOP_ANNOTATIONS) {
            return Some((close + 1, Body::Single { start: close + 1 }));
        }
    }
    let open = after + find_top(&tokens[after..], |t| t.is("{") || t.is(";"))?;
    if !tokens[open].is("{") {
        return None;
    }
    let close = matching_close(tokens, open)?;
    Some((open, Body::Block { open, close }))
}

fn body_statements(source: &str, tokens: &[Token], body: Body) -> (Vec<Statement>, usize) {
    match body {
        Body::Block { open, close } => (parse_block(source, &tokens[open + 1..close]), close + 1),
        Body::Single { start } => {
            let (statement, next) = parse_statement(source, tokens, start);
            (statement.into_iter().collect(), next)
        }
    }
}

fn parse_if(source: &str, tokens: &[Token], start: usize) -> (Option<Statement>, usize) {
    let Some((header_end, body)) = split_header(tokens, start) else {
        return skip(source, tokens, start);
    };
    let condition = parse_expression(source, &tokens[start + 1..header_end]);
    let (then_body, mut next) = body_statements(source, tokens, body);

    let mut else_body = None;
    if tokens.get(next).is_some_and(|t| t.is_keyword("else")) {
        let else_start = next + 1;
        match tokens.get(else_start) {
            Some(t) if t.is("{") => {
                let close = matching_close(tokens, else_start).unwrap_or(tokens.len());
                else_body = Some(parse_block(source, &tokens[else_start + 1..close]));
                next = (close + 1).min(tokens.len());
            }
            Some(_) => {
                let (statement, after) = parse_statement(source, tokens, else_start);
                else_body = Some(statement.into_iter().collect());
                next = after;
            }
            None => next = else_start,
        }
    }

    let statement = Statement::If {
        condition,
        then_body,
        else_body,
    };
    (Some(statement), next)
}

fn parse_while(source: &str, tokens: &[Token], start: usize) -> (Option<Statement>, usize) {
    let Some((header_end, body)) = split_header(tokens, start) else {
        return skip(source, tokens, start);
    };
    let header = &tokens[start + 1..header_end];
    let cut = find_top(header, |t| t.is_any_keyword(LOOP_ANNOTATIONS)).unwrap_or(header.len());
    let condition = parse_expression(source, &header[..cut]);
    let (body, next) = body_statements(source, tokens, body);
    (Some(Statement::While { condition, body }), next)
}

fn parse_for(source: &str, tokens: &[Token], start: usize) -> (Option<Statement>, usize) {
    let open = start + 1;
    if !tokens.get(open).is_some_and(|t| t.is("(")) {
        return skip(source, tokens, start);
    }
    let Some(close) = matching_close(tokens, open) else {
        return skip(source, tokens, start);
    };
    let parts = split_top(&tokens[open + 1..close], ";");
    let [init, condition, update] = parts.as_slice() else {
        return skip(source, tokens, start);
    };
    let body = match tokens.get(close + 1) {
        Some(t) if t.is("{") => match matching_close(tokens, close + 1) {
            Some(end) => Body::Block {
                open: close + 1,
                close: end,
            },
            None => return skip(source, tokens, start),
        },
        Some(_) => Body::Single { start: close + 1 },
        None => return skip(source, tokens, start),
    };
    let (body, next) = body_statements(source, tokens, body);
    let statement = Statement::For {
        init: simple(source, init).map(Box::new),
        condition: parse_expression(source, condition),
        update: simple(source, update).map(Box::new),
        body,
    };
    (Some(statement), next)
}

fn simple(source: &str, tokens: &[Token]) -> Option<Statement> {
    let head = tokens.first()?;
    let rest = &tokens[1..];
    if head.is_ident() {
        match head.text.as_str() {
            "var" => return var_decl(source, rest),
            "ghost" => return None,
            "emit" => return emit(source, rest),
            "revert" => return Some(Statement::Revert(revert(source, rest))),
            "selfdestruct" if !rest.is_empty() => {
                return Some(Statement::SelfDestruct(parse_expression(source, rest)));
            }
            "return" => return Some(Statement::Return(parse_list(source, rest))),
            "assert" => return Some(Statement::Assert(first_argument(source, rest))),
            "require" => return Some(Statement::Require(first_argument(source, rest))),
            _ => {}
        }
    }
    if let Some(assign) = find_top(tokens, |t| t.is(":=")) {
        return assignment(source, tokens, assign);
    }
    if let Some(statement) = array_op(source, tokens) {
        return Some(statement);
    }
    match parse_expression(source, tokens) {
        call @ (Expression::Call { .. } | Expression::ExternalCall { .. }) => {
            Some(Statement::Expr(call))
        }
        _ => {
            tracing::debug!(
                line = head.line,
                stmt = source_text(source, tokens),
                "skipping unrecognised statement"
            );
            None
        }
    }
}

fn var_decl(source: &str, rest: &[Token]) -> Option<Statement> {
    let name = rest.first().filter(|t| t.is_ident())?;
    let after = &rest[1..];
    let (ty, init) = match after.first() {
        None => (Type::Uint(256), None),
        Some(t) if t.is(":") => match find_top(after, |t| t.is(":=")) {
            Some(assign) => (
                parse_type(&after[1..assign]),
                Some(parse_expression(source, &after[assign + 1..])),
            ),
            None => (parse_type(&after[1..]), None),
        },
        Some(t) if t.is(":=") => (Type::Uint(256), Some(parse_expression(source, &after[1..]))),
        Some(_) => return None,
    };
    Some(Statement::VarDecl {
        var: Variable::new(name.text.clone(), ty),
        init,
    })
}

/// `cond`, `(cond)` or `(cond, "message")`; only the condition is kept.
fn first_argument(source: &str, rest: &[Token]) -> Expression {
    if !rest.is_empty() && rest[0].is("(") && group_spans_rest(rest, 0) {
        let args = split_top(&rest[1..rest.len() - 1], ",");
        if let Some(first) = args.first() {
            return parse_expression(source, first);
        }
    }
    parse_expression(source, rest)
}

fn emit(source: &str, rest: &[Token]) -> Option<Statement> {
    let name = rest.first().filter(|t| t.is_ident())?;
    if rest.len() < 3 || !rest[1].is("(") || !group_spans_rest(rest, 1) {
        return None;
    }
    Some(Statement::Emit {
        event: name.text.clone(),
        args: parse_list(source, &rest[2..rest.len() - 1]),
    })
}

pub(crate) fn unquote(token: &Token) -> String {
    token.text[1..token.text.len() - 1].to_string()
}

fn revert(source: &str, rest: &[Token]) -> RevertKind {
    match rest {
        [] => RevertKind::Bare,
        [message] if message.kind == TokenKind::Str => RevertKind::Message(unquote(message)),
        [open, .., _] if open.is("(") && group_spans_rest(rest, 0) => {
            match &rest[1..rest.len() - 1] {
                [] => RevertKind::Bare,
                [message] if message.kind == TokenKind::Str => {
                    RevertKind::Message(unquote(message))
                }
                _ => RevertKind::Bare,
            }
        }
        [name] if name.is_ident() => RevertKind::Error {
            name: name.text.clone(),
            args: Vec::new(),
        },
        [name, ..] if name.is_ident() && rest[1].is("(") && group_spans_rest(rest, 1) => {
            RevertKind::Error {
                name: name.text.clone(),
                args: parse_list(source, &rest[2..rest.len() - 1]),
            }
        }
        _ => RevertKind::Bare,
    }
}

fn assignment(source: &str, tokens: &[Token], assign: usize) -> Option<Statement> {
    let target = assign_target(source, &tokens[..assign])?;
    Some(Statement::Assign {
        target,
        value: parse_expression(source, &tokens[assign + 1..]),
    })
}

fn assign_target(source: &str, tokens: &[Token]) -> Option<AssignTarget> {
    let head = tokens.first().filter(|t| t.is_ident())?;
    if tokens.len() == 1 {
        return Some(AssignTarget::Name(head.text.clone()));
    }
    if tokens[1].is("[") {
        let mut indices = Vec::new();
        let mut pos = 1;
        while pos < tokens.len() {
            if !tokens[pos].is("[") {
                return None;
            }
            let close = matching_close(tokens, pos)?;
            indices.push(parse_expression(source, &tokens[pos + 1..close]));
            pos = close + 1;
        }
        return Some(AssignTarget::Indexed {
            base: head.text.clone(),
            indices,
        });
    }
    if is_name_path(tokens) {
        let path: Vec<String> = name_path(tokens).into_iter().map(String::from).collect();
        if path.len() == 2 && path[0] == "this" {
            return Some(AssignTarget::Name(path[1].clone()));
        }
        return Some(AssignTarget::Field { path });
    }
    None
}

/// `name.push(value)` and `name.pop()`.
fn array_op(source: &str, tokens: &[Token]) -> Option<Statement> {
    if tokens.len() < 5 || !tokens[0].is_ident() || !tokens[1].is(".") {
        return None;
    }
    if !tokens[3].is("(") || !group_spans_rest(tokens, 3) {
        return None;
    }
    let array = tokens[0].text.clone();
    let inner = &tokens[4..tokens.len() - 1];
    match tokens[2].text.as_str() {
        "push" if !inner.is_empty() => Some(Statement::Push {
            array,
            value: parse_expression(source, inner),
        }),
        "pop" if inner.is_empty() => Some(Statement::Pop { array }),
        _ => None,
    }
}
