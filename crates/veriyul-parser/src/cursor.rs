//! Bracket-depth bookkeeping shared by every scanner in the parser.
//!
//! Parentheses, square brackets and braces all count toward one depth. Angle brackets do
//! not, because `<` and `>` are also comparison operators; type parsing tracks them itself.

use crate::lexer::Token;

pub fn is_open(token: &Token) -> bool {
    token.is("(") || token.is("[") || token.is("{")
}

pub fn is_close(token: &Token) -> bool {
    token.is(")") || token.is("]") || token.is("}")
}

/// Yields the tokens that sit at depth 0, including the opener of each nested group but
/// nothing inside it and not its closer.
pub struct TopLevel<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Iterator for TopLevel<'t> {
    type Item = (usize, &'t Token);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.pos;
            let token = self.tokens.get(index)?;
            self.pos += 1;
            let at_top = self.depth == 0;
            if is_open(token) {
                self.depth += 1;
            } else if is_close(token) {
                self.depth = self.depth.saturating_sub(1);
            }
            if at_top {
                return Some((index, token));
            }
        }
    }
}

pub fn top_level(tokens: &[Token]) -> TopLevel<'_> {
    TopLevel {
        tokens,
        pos: 0,
        depth: 0,
    }
}

pub fn find_top<F>(tokens: &[Token], pred: F) -> Option<usize>
where
    F: Fn(&Token) -> bool,
{
    top_level(tokens).find(|(_, t)| pred(t)).map(|(i, _)| i)
}

pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if is_open(token) {
            depth += 1;
        } else if is_close(token) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

pub fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close.min(tokens.len().checked_sub(1)?)).rev() {
        let token = &tokens[i];
        if is_close(token) {
            depth += 1;
        } else if is_open(token) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Splits on a separator token at depth 0. An empty input yields no pieces.
pub fn split_top<'t>(tokens: &'t [Token], separator: &str) -> Vec<&'t [Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, token) in top_level(tokens) {
        if token.is(separator) {
            pieces.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    pieces.push(&tokens[start..]);
    pieces
}

/// True when `tokens[open]` opens a group that closes on the last token.
pub fn group_spans_rest(tokens: &[Token], open: usize) -> bool {
    tokens.get(open).is_some_and(is_open)
        && matching_close(tokens, open) == Some(tokens.len() - 1)
}

const INFIX: &[&str] = &[
    "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "&&", "||", "==>", "<==>", ":=",
    ",", ".", "=",
];

pub fn is_infix(token: &Token) -> bool {
    token.is_any_keyword(&["in"]) || INFIX.iter().any(|op| token.is(op))
}

/// Whether a line break between `prev` and `next` keeps one expression going.
pub fn continues_across_lines(prev: &Token, next: &Token) -> bool {
    is_infix(prev) || is_infix(next)
}
