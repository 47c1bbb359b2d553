//! Declaration-level extraction.
//!
//! The class body is first cut into declarations (keyword, leading modifier keywords and
//! the token run up to the end of the declaration). Each extractor then makes its own pass
//! over that list, so every kind keeps source order independently of the others.

use crate::cursor::{
    continues_across_lines, find_top, is_close, is_open, matching_close, top_level,
};
use crate::error::ParseError;
use crate::expr::{parse_expression, parse_list};
use crate::lexer::{source_text, Token, TokenKind};
use crate::stmt::{parse_block, unquote};
use crate::types::{parse_param, parse_params, parse_type, split_args};
use crate::ParseResult;
use num_bigint::BigUint;
use veriyul_core::{
    Contract, CustomError, Event, GhostValue, Library, Method, Modifier,
    ReturnShape, StateMutability, Statement, Struct, Variable, Visibility,
};

const DECL_KEYWORDS: &[&str] = &[
    "var",
    "const",
    "struct",
    "event",
    "error",
    "modifier",
    "constructor",
    "method",
    "function",
    "predicate",
    "lemma",
    "invariant",
    "import",
];

const DECL_PREFIXES: &[&str] = &[
    "public", "private", "internal", "external", "view", "pure", "payable", "ghost", "static",
    "virtual", "override", "abstract",
];

const HEADER_KEYWORDS: &[&str] = &[
    "public", "private", "internal", "external", "view", "pure", "payable", "method", "returns",
    "virtual", "override",
];

const CLAUSES: &[&str] = &["requires", "ensures", "modifies", "reads", "decreases"];

struct Decl<'t> {
    keyword: &'static str,
    prefix: Vec<&'t Token>,
    tokens: &'t [Token],
}

impl Decl<'_> {
    fn has_prefix(&self, word: &str) -> bool {
        self.prefix.iter().any(|t| t.is_keyword(word))
    }

    fn line(&self) -> usize {
        self.tokens.first().map_or(0, |t| t.line)
    }
}

pub fn parse_contract(source: &str, tokens: &[Token]) -> ParseResult<Contract> {
    let mut contract = Contract::new("Contract");
    contract.license = license(source);

    let mut decls = split_decls(tokens);
    if let Some(class) = find_class(tokens) {
        contract.name = class.name;
        contract.base = class.base;
        decls.extend(split_decls(&tokens[class.body_start..class.body_end]));
    }

    extract_imports(&decls, &mut contract);
    contract.structs = extract_structs(&decls);
    contract.fields = extract_fields(&decls);
    contract.constants = extract_constants(source, &decls).into_iter().collect();
    contract.events = extract_events(&decls);
    contract.errors = extract_errors(&decls);
    contract.modifiers = extract_modifiers(source, &decls);
    contract.constructor = decls
        .iter()
        .find(|d| d.keyword == "constructor")
        .map(|d| parse_callable(source, d, "constructor", 1));

    for method in extract_methods(source, &decls)? {
        match method.name.as_str() {
            "receive" => contract.receive = Some(method),
            "fallback" => contract.fallback = Some(method),
            _ => contract.methods.push(method),
        }
    }

    contract.invariants = decls
        .iter()
        .filter(|d| d.keyword == "invariant")
        .map(|d| parse_expression(source, trim_semicolon(&d.tokens[1..])))
        .collect();

    tracing::debug!(
        contract = %contract.name,
        fields = contract.fields.len(),
        methods = contract.methods.len(),
        "parsed contract"
    );
    Ok(contract)
}

fn license(source: &str) -> Option<String> {
    const MARKER: &str = "SPDX-License-Identifier:";
    source.lines().find_map(|line| {
        let trimmed = line.trim_start();
        if !trimmed.starts_with("//") && !trimmed.starts_with("/*") {
            return None;
        }
        let at = trimmed.find(MARKER)?;
        let id = trimmed[at + MARKER.len()..].trim().trim_end_matches("*/").trim();
        (!id.is_empty()).then(|| id.to_string())
    })
}

struct ClassHeader {
    name: String,
    base: Option<String>,
    body_start: usize,
    body_end: usize,
}

fn find_class(tokens: &[Token]) -> Option<ClassHeader> {
    let at = tokens
        .windows(2)
        .position(|w| w[0].is_keyword("class") && w[1].is_ident())?;
    let name = tokens[at + 1].text.clone();
    let base = match tokens.get(at + 2) {
        Some(t) if t.is_keyword("is") || t.is_keyword("extends") => tokens
            .get(at + 3)
            .filter(|t| t.is_ident())
            .map(|t| t.text.clone()),
        _ => None,
    };
    let open = at + 2 + find_top(&tokens[at + 2..], |t| t.is("{"))?;
    let close = matching_close(tokens, open).unwrap_or(tokens.len());
    Some(ClassHeader {
        name,
        base,
        body_start: open + 1,
        body_end: close,
    })
}

fn declaration_keyword(tokens: &[Token], pos: usize) -> Option<&'static str> {
    let token = &tokens[pos];
    if !token.is_ident() {
        return None;
    }
    if let Some(keyword) = DECL_KEYWORDS.iter().copied().find(|kw| token.text == *kw) {
        return Some(keyword);
    }
    let opens_params = tokens.get(pos + 1).is_some_and(|t| t.is("("));
    match token.text.as_str() {
        "receive" if opens_params => Some("receive"),
        "fallback" if opens_params => Some("fallback"),
        _ => None,
    }
}

fn split_decls(tokens: &[Token]) -> Vec<Decl<'_>> {
    let mut decls = Vec::new();
    let mut prefix = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let token = &tokens[pos];
        if token.is_any_keyword(DECL_PREFIXES) {
            prefix.push(token);
            pos += 1;
            continue;
        }
        match declaration_keyword(tokens, pos) {
            Some(keyword) => {
                let end = decl_end(tokens, pos, keyword);
                decls.push(Decl {
                    keyword,
                    prefix: std::mem::take(&mut prefix),
                    tokens: &tokens[pos..end],
                });
                pos = end.max(pos + 1);
            }
            None => {
                prefix.clear();
                pos = if is_open(token) {
                    matching_close(tokens, pos).map_or(tokens.len(), |close| close + 1)
                } else {
                    pos + 1
                };
            }
        }
    }
    decls
}

fn decl_end(tokens: &[Token], pos: usize, keyword: &str) -> usize {
    match keyword {
        "var" | "const" | "invariant" | "import" | "event" | "error" => line_end(tokens, pos),
        "struct" => match find_top(&tokens[pos..], |t| t.is("{")) {
            Some(open) => {
                matching_close(tokens, pos + open).map_or(tokens.len(), |close| close + 1)
            }
            None => line_end(tokens, pos),
        },
        _ => body_end(tokens, pos),
    }
}

/// End of a one-line declaration: just past its `;`, the first line break at depth 0, or
/// the next declaration when several share a line.
fn line_end(tokens: &[Token], pos: usize) -> usize {
    let mut depth = 0usize;
    for i in pos..tokens.len() {
        let token = &tokens[i];
        if depth == 0 && i > pos {
            if token.is(";") {
                return i + 1;
            }
            if token.line != tokens[i - 1].line && !continues_across_lines(&tokens[i - 1], token) {
                return i;
            }
            if declaration_keyword(tokens, i).is_some() || token.is_any_keyword(DECL_PREFIXES) {
                return i;
            }
        }
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.saturating_sub(1);
        }
    }
    tokens.len()
}

/// End of a declaration that may carry a body. Without a body it stops at the next
/// declaration keyword, or a modifier keyword that starts a line.
fn body_end(tokens: &[Token], pos: usize) -> usize {
    let start = pos + 1;
    for (offset, token) in top_level(&tokens[start..]) {
        let i = start + offset;
        if token.is("{") {
            return matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
        }
        // the name slot may itself be a keyword: `function method f`, `method constructor`
        if i > start && declaration_keyword(tokens, i).is_some() {
            return i;
        }
        if token.is_any_keyword(DECL_PREFIXES) && tokens[i - 1].line != token.line {
            return i;
        }
    }
    tokens.len()
}

fn trim_semicolon(tokens: &[Token]) -> &[Token] {
    match tokens.split_last() {
        Some((last, rest)) if last.is(";") => rest,
        _ => tokens,
    }
}

fn extract_imports(decls: &[Decl], contract: &mut Contract) {
    for decl in decls.iter().filter(|d| d.keyword == "import") {
        let mut rest = trim_semicolon(&decl.tokens[1..]);
        if rest.first().is_some_and(|t| t.is_keyword("opened")) {
            rest = &rest[1..];
        }
        match rest {
            [path, ..] if path.kind == TokenKind::Str => contract.imports.push(unquote(path)),
            [name, from, path, ..]
                if name.is_ident() && from.is_keyword("from") && path.kind == TokenKind::Str =>
            {
                contract.imports.push(name.text.clone());
                contract.libraries.push(Library {
                    name: name.text.clone(),
                    path: unquote(path),
                });
            }
            [name, ..] if name.is_ident() => contract.imports.push(name.text.clone()),
            _ => tracing::debug!(line = decl.line(), "skipping malformed import"),
        }
    }
}

/// Struct members separated by `;`, `,` or line breaks.
fn split_members(tokens: &[Token]) -> Vec<&[Token]> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if depth == 0 && (token.is(";") || token.is(",")) {
            members.push(&tokens[start..i]);
            start = i + 1;
            continue;
        }
        if depth == 0 && i > start && token.line != tokens[i - 1].line {
            members.push(&tokens[start..i]);
            start = i;
        }
        if is_open(token) || token.is("<") {
            depth += 1;
        } else if is_close(token) || token.is(">") {
            depth = depth.saturating_sub(1);
        }
    }
    members.push(&tokens[start..]);
    members.retain(|m| !m.is_empty());
    members
}

fn extract_structs(decls: &[Decl]) -> Vec<Struct> {
    decls
        .iter()
        .filter(|d| d.keyword == "struct")
        .filter_map(|decl| {
            let name = decl.tokens.get(1).filter(|t| t.is_ident())?;
            let open = find_top(decl.tokens, |t| t.is("{"))?;
            let close = matching_close(decl.tokens, open).unwrap_or(decl.tokens.len());
            let fields = split_members(&decl.tokens[open + 1..close])
                .into_iter()
                .filter_map(parse_param)
                .collect();
            Some(Struct {
                name: name.text.clone(),
                fields,
            })
        })
        .collect()
}

fn visibility_of(decl: &Decl) -> Visibility {
    decl.prefix
        .iter()
        .rev()
        .find_map(|t| Visibility::from_keyword(&t.text))
        .unwrap_or_default()
}

fn extract_fields(decls: &[Decl]) -> Vec<Variable> {
    decls
        .iter()
        .filter(|d| d.keyword == "var" && !d.has_prefix("ghost"))
        .filter_map(|decl| {
            let tokens = trim_semicolon(decl.tokens);
            let name = tokens.get(1).filter(|t| t.is_ident())?;
            if !tokens.get(2).is_some_and(|t| t.is(":")) {
                tracing::debug!(line = decl.line(), "skipping untyped field");
                return None;
            }
            let type_end = find_top(tokens, |t| t.is(":=")).unwrap_or(tokens.len());
            let ty = parse_type(&tokens[3..type_end.max(3)]);
            Some(Variable::new(name.text.clone(), ty).with_visibility(visibility_of(decl)))
        })
        .collect()
}

fn ghost_value(source: &str, tokens: &[Token]) -> GhostValue {
    match tokens {
        [single] if single.kind == TokenKind::Number => {
            let parsed = match single.text.strip_prefix("0x") {
                Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
                None => BigUint::parse_bytes(single.text.as_bytes(), 10),
            };
            parsed.map_or_else(|| GhostValue::Raw(single.text.clone()), GhostValue::Int)
        }
        [single] if single.is_keyword("true") => GhostValue::Bool(true),
        [single] if single.is_keyword("false") => GhostValue::Bool(false),
        _ => GhostValue::Raw(source_text(source, tokens).to_string()),
    }
}

fn extract_constants(source: &str, decls: &[Decl]) -> Vec<(String, GhostValue)> {
    decls
        .iter()
        .filter(|d| d.keyword == "const")
        .filter_map(|decl| {
            if !decl.has_prefix("ghost") {
                tracing::debug!(line = decl.line(), "skipping non-ghost const");
                return None;
            }
            let tokens = trim_semicolon(decl.tokens);
            let name = tokens.get(1).filter(|t| t.is_ident())?;
            let assign = find_top(tokens, |t| t.is(":="))?;
            Some((name.text.clone(), ghost_value(source, &tokens[assign + 1..])))
        })
        .collect()
}

/// Parameter list of `keyword Name(...)`, as the token run inside the parentheses and the
/// index of the closing parenthesis.
fn named_params<'t>(decl: &Decl<'t>) -> Option<(&'t Token, &'t [Token], usize)> {
    let name = decl.tokens.get(1).filter(|t| t.is_ident())?;
    if !decl.tokens.get(2).is_some_and(|t| t.is("(")) {
        return None;
    }
    let close = matching_close(decl.tokens, 2)?;
    Some((name, &decl.tokens[3..close], close))
}

fn extract_events(decls: &[Decl]) -> Vec<Event> {
    decls
        .iter()
        .filter(|d| d.keyword == "event")
        .filter_map(|decl| {
            let (name, inner, close) = named_params(decl)?;
            let mut params = Vec::new();
            let mut indexed = Vec::new();
            for param in split_args(inner) {
                let kept: Vec<Token> = param
                    .iter()
                    .filter(|t| !t.is_keyword("indexed"))
                    .cloned()
                    .collect();
                if let Some(var) = parse_param(&kept) {
                    indexed.push(kept.len() != param.len());
                    params.push(var);
                }
            }
            let anonymous = decl.tokens[close + 1..]
                .iter()
                .any(|t| t.is_keyword("anonymous"));
            Some(Event {
                name: name.text.clone(),
                params,
                indexed,
                anonymous,
            })
        })
        .collect()
}

fn extract_errors(decls: &[Decl]) -> Vec<CustomError> {
    decls
        .iter()
        .filter(|d| d.keyword == "error")
        .filter_map(|decl| {
            let (name, inner, _) = named_params(decl)?;
            Some(CustomError {
                name: name.text.clone(),
                params: parse_params(inner),
            })
        })
        .collect()
}

fn extract_modifiers(source: &str, decls: &[Decl]) -> Vec<Modifier> {
    decls
        .iter()
        .filter(|d| d.keyword == "modifier")
        .filter_map(|decl| {
            let name = decl.tokens.get(1).filter(|t| t.is_ident())?;
            let params = named_params(decl)
                .map(|(_, inner, _)| parse_params(inner))
                .unwrap_or_default();
            let open = find_top(decl.tokens, |t| t.is("{"))?;
            let close = matching_close(decl.tokens, open).unwrap_or(decl.tokens.len());
            let guards = parse_block(source, &decl.tokens[open + 1..close])
                .into_iter()
                .filter_map(|statement| match statement {
                    Statement::Require(condition) => Some(condition),
                    _ => None,
                })
                .collect();
            Some(Modifier {
                name: name.text.clone(),
                params,
                guards,
            })
        })
        .collect()
}

fn extract_methods(source: &str, decls: &[Decl]) -> ParseResult<Vec<Method>> {
    let mut methods = Vec::new();
    for decl in decls {
        match decl.keyword {
            "method" => {
                let Some(name) = decl.tokens.get(1).filter(|t| t.is_ident()) else {
                    continue;
                };
                if name.text == "constructor" {
                    return Err(ParseError::ConstructorAsMethod { line: decl.line() });
                }
                if decl.has_prefix("ghost") {
                    tracing::debug!(method = %name.text, "skipping ghost method");
                    continue;
                }
                methods.push(parse_callable(source, decl, &name.text, 2));
            }
            "receive" | "fallback" => methods.push(parse_callable(source, decl, decl.keyword, 1)),
            _ => {}
        }
    }
    Ok(methods)
}

fn return_shape(tokens: &[Token]) -> ReturnShape {
    if tokens.is_empty() {
        return ReturnShape::None;
    }
    let entries = split_args(tokens);
    if entries.len() == 1 && !tokens.iter().any(|t| t.is(":")) {
        return ReturnShape::Single(parse_type(tokens));
    }
    ReturnShape::Named(
        entries
            .into_iter()
            .map(|entry| parse_param(entry).unwrap_or_else(|| Variable::new("", parse_type(entry))))
            .collect(),
    )
}

fn apply_keywords(method: &mut Method, keywords: &[&Token]) {
    for keyword in keywords {
        if let Some(visibility) = Visibility::from_keyword(&keyword.text) {
            method.visibility = visibility;
            continue;
        }
        match keyword.text.as_str() {
            "view" | "pure" => method.state_mutability = StateMutability::from_keyword(&keyword.text),
            "payable" => {
                method.payable = true;
                method.state_mutability.get_or_insert(StateMutability::Payable);
            }
            _ => {}
        }
    }
}

/// Predicate-style clauses such as `requires Valid()` only matter to the verifier.
fn is_predicate_call(clause: &[Token]) -> bool {
    let opens = clause.iter().filter(|t| t.is("(")).count();
    let empty_call = clause.windows(2).any(|w| w[0].is("(") && w[1].is(")"));
    empty_call && opens <= 1
}

fn clause_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for i in start + 1..tokens.len() {
        let token = &tokens[i];
        if depth == 0 {
            if token.is("{") || token.is_any_keyword(CLAUSES) || token.is_keyword("returns") {
                return i;
            }
            let prev = &tokens[i - 1];
            if i > start + 1 && token.line != prev.line && !continues_across_lines(prev, token) {
                return i;
            }
        }
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.saturating_sub(1);
        }
    }
    tokens.len()
}

/// Methods, the constructor and receive/fallback share one shape:
/// `name(params) [keywords] [returns(...)] [modifiers] [clauses] [{ body }]`.
fn parse_callable(source: &str, decl: &Decl, name: &str, open: usize) -> Method {
    let tokens = decl.tokens;
    let mut method = Method::new(name);
    let mut keywords: Vec<&Token> = decl.prefix.clone();

    let close = match tokens.get(open) {
        Some(t) if t.is("(") => matching_close(tokens, open),
        _ => None,
    };
    let Some(close) = close else {
        tracing::debug!(method = name, line = decl.line(), "missing parameter list");
        return method;
    };
    method.params = parse_params(&tokens[open + 1..close]);

    // header tail on the same line as the closing parenthesis
    let mut pos = close + 1;
    while let Some(token) = tokens.get(pos) {
        if token.line != tokens[close].line || token.is("{") || token.is_any_keyword(CLAUSES) {
            break;
        }
        let has_args = tokens.get(pos + 1).is_some_and(|t| t.is("("));
        if token.is_keyword("returns") && has_args {
            let end = matching_close(tokens, pos + 1).unwrap_or(tokens.len());
            method.returns = return_shape(&tokens[pos + 2..end.max(pos + 2)]);
            pos = end + 1;
            continue;
        }
        if token.is_any_keyword(HEADER_KEYWORDS) {
            keywords.push(token);
        } else if token.is_ident() {
            method.modifiers.push(token.text.clone());
        }
        pos = if has_args && token.is_ident() {
            matching_close(tokens, pos + 1).map_or(tokens.len(), |c| c + 1)
        } else {
            pos + 1
        };
    }
    apply_keywords(&mut method, &keywords);

    while let Some(token) = tokens.get(pos) {
        if token.is("{") {
            let close = matching_close(tokens, pos).unwrap_or(tokens.len());
            method.body = parse_block(source, &tokens[pos + 1..close]);
            break;
        }
        if token.is_keyword("returns") && tokens.get(pos + 1).is_some_and(|t| t.is("(")) {
            let end = matching_close(tokens, pos + 1).unwrap_or(tokens.len());
            method.returns = return_shape(&tokens[pos + 2..end.max(pos + 2)]);
            pos = end + 1;
            continue;
        }
        if token.is_any_keyword(CLAUSES) {
            let end = clause_end(tokens, pos);
            let clause = &tokens[pos + 1..end];
            match token.text.as_str() {
                "requires" if !is_predicate_call(clause) => {
                    method.preconditions.push(parse_expression(source, clause));
                }
                "ensures" if !is_predicate_call(clause) => {
                    method.postconditions.push(parse_expression(source, clause));
                }
                "modifies" => method.modifies.extend(parse_list(source, clause)),
                _ => {}
            }
            pos = end;
            continue;
        }
        pos += 1;
    }
    method
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use veriyul_core::{Expression, Type};

    fn contract(source: &str) -> Contract {
        parse_contract(source, &lex(source).unwrap()).unwrap()
    }

    #[test]
    fn test_header_keywords_after_params() {
        let c = contract("class A {\n  method get() view returns (uint256) {\n    return 1;\n  }\n}");
        let m = &c.methods[0];
        assert_eq!(m.state_mutability, Some(StateMutability::View));
        assert_eq!(m.returns, ReturnShape::Single(Type::Uint(256)));
        assert!(m.modifiers.is_empty());
    }

    #[test]
    fn test_predicate_clauses_are_skipped() {
        let c = contract(
            "class A {\n  method f(x: uint256)\n    requires Valid()\n    requires x > 0\n    ensures Valid()\n    modifies this\n  {\n  }\n}",
        );
        let m = &c.methods[0];
        assert_eq!(m.preconditions.len(), 1);
        assert!(m.postconditions.is_empty());
        assert_eq!(m.modifies, vec![Expression::var("this")]);
    }

    #[test]
    fn test_bodiless_method_stops_at_next_declaration() {
        let c = contract("class A {\n  method check(x: uint256)\n    requires x > 0\n  method g() { }\n}");
        let names: Vec<&str> = c.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["check", "g"]);
        assert!(c.methods[0].body.is_empty());
    }

    #[test]
    fn test_function_method_is_not_a_method() {
        let c = contract("class A {\n  function method sq(x: int): int { x * x }\n  method m() { }\n}");
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "m");
    }

    #[test]
    fn test_license_comment() {
        assert_eq!(
            license("// SPDX-License-Identifier: MIT\nclass A {}"),
            Some("MIT".to_string())
        );
        assert_eq!(license("class A {}"), None);
    }
}
