use crate::cursor::{is_close, is_open};
use crate::lexer::Token;
use veriyul_core::{Type, Variable};

/// Splits on commas that are outside every bracket, including angle brackets.
pub fn split_args(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if is_open(token) || token.is("<") {
            depth += 1;
        } else if is_close(token) || token.is(">") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is(",") {
            pieces.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    pieces.push(&tokens[start..]);
    pieces
}

pub fn parse_type(tokens: &[Token]) -> Type {
    let Some(head) = tokens.first() else {
        return Type::Uint(256);
    };
    let len = tokens.len();
    if len == 1 {
        return Type::from_name(&head.text);
    }
    if tokens[len - 1].is("]") && tokens[len - 2].is("[") {
        return Type::Array(Box::new(parse_type(&tokens[..len - 2])));
    }
    if tokens[1].is("<") && tokens[len - 1].is(">") {
        let args = split_args(&tokens[2..len - 1]);
        match (head.text.as_str(), args.as_slice()) {
            ("mapping" | "map", [key, value]) => {
                return Type::Mapping(Box::new(parse_type(key)), Box::new(parse_type(value)));
            }
            ("array" | "seq", [elem]) => return Type::Array(Box::new(parse_type(elem))),
            _ => {}
        }
    }
    // Solidity spelling: mapping(K => V)
    if head.is_keyword("mapping") && tokens[1].is("(") && tokens[len - 1].is(")") {
        let inner = &tokens[2..len - 1];
        if let Some(arrow) = inner.iter().position(|t| t.is("=>")) {
            return Type::Mapping(
                Box::new(parse_type(&inner[..arrow])),
                Box::new(parse_type(&inner[arrow + 1..])),
            );
        }
    }
    tracing::debug!(ty = %head.text, "unrecognised type shape, using its head name");
    Type::from_name(&head.text)
}

/// `name: Type` or `Type name`.
pub fn parse_param(tokens: &[Token]) -> Option<Variable> {
    if let Some(colon) = tokens.iter().position(|t| t.is(":")) {
        let name = tokens[..colon].iter().rev().find(|t| t.is_ident())?;
        return Some(Variable::new(name.text.clone(), parse_type(&tokens[colon + 1..])));
    }
    match tokens {
        [.., last] if tokens.len() >= 2 && last.is_ident() => Some(Variable::new(
            last.text.clone(),
            parse_type(&tokens[..tokens.len() - 1]),
        )),
        _ => None,
    }
}

pub fn parse_params(tokens: &[Token]) -> Vec<Variable> {
    split_args(tokens)
        .into_iter()
        .filter_map(parse_param)
        .collect()
}
