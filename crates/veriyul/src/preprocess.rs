//! Rewrites contract sources into plain Dafny the stock verifier accepts.
//!
//! Works on the token stream, so comments, strings and spacing outside the rewritten
//! tokens come through untouched:
//!
//! * `mapping<..>` and `array<..>` become `map<..>` and `seq<..>`
//! * fixed-width integers, `address` and `bytesN` become `int`
//! * `msg.sender` becomes a `msg_sender` field declared on the class
//! * `constructor(..)` becomes `method init(..)` with a `modifies this` frame
//! * single-key stores `m[k] := v;` become `m := m[k := v];`
//! * EVM-only keywords, events, emits and class invariants are commented out

use veriyul_parser::cursor::matching_close;
use veriyul_parser::lexer::{self, source_text, Token, TokenKind};
use veriyul_parser::ParseResult;

const EVM_KEYWORDS: &[&str] = &["payable", "view", "pure", "external", "internal"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

impl Edit {
    fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }
}

pub fn preprocess(source: &str) -> ParseResult<String> {
    let tokens = lexer::lex(source)?;
    Ok(apply(source, edits(source, &tokens)))
}

fn edits(source: &str, tokens: &[Token]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut depth = 0usize;
    let mut class_pending = false;
    let mut init_pending = false;
    let mut init_modifies = false;

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let next = tokens.get(i + 1);
        let next_is = |text: &str| next.is_some_and(|t| t.is(text));

        if token.kind == TokenKind::Str {
            i += 1;
            continue;
        }

        if token.is("{") {
            if class_pending {
                edits.push(Edit::insert(token.end, "\n  var msg_sender: int"));
                class_pending = false;
            }
            if init_pending {
                if !init_modifies {
                    edits.push(Edit::insert(token.start, "modifies this "));
                }
                init_pending = false;
            }
            depth += 1;
        } else if token.is("}") {
            depth = depth.saturating_sub(1);
        } else if token.is_keyword("class") && depth == 0 {
            class_pending = true;
        } else if token.is_keyword("mapping") && next_is("<") {
            edits.push(Edit::replace(token.start, token.end, "map"));
        } else if token.is_keyword("array") && next_is("<") {
            edits.push(Edit::replace(token.start, token.end, "seq"));
        } else if token.is_ident() && is_fixed_width(&token.text) {
            edits.push(Edit::replace(token.start, token.end, "int"));
        } else if token.is_keyword("msg")
            && next_is(".")
            && tokens.get(i + 2).is_some_and(|t| t.is_keyword("sender"))
        {
            edits.push(Edit::replace(token.start, tokens[i + 2].end, "msg_sender"));
            i += 3;
            continue;
        } else if token.is_keyword("constructor") && next_is("(") {
            edits.push(Edit::replace(token.start, token.end, "method init"));
            init_pending = true;
            init_modifies = false;
        } else if token.is_keyword("modifies") && init_pending {
            init_modifies = true;
        } else if token.is_any_keyword(EVM_KEYWORDS) {
            edits.push(Edit::replace(
                token.start,
                token.end,
                format!("/* {} */", token.text),
            ));
        } else if token.is_keyword("invariant") && depth == 1 {
            let last = line_end(tokens, i);
            edits.push(commented(source, tokens, i, last));
            i = last + 1;
            continue;
        } else if token.is_any_keyword(&["emit", "event"]) {
            if let Some(last) = declaration_end(tokens, i) {
                edits.push(commented(source, tokens, i, last));
                i = last + 1;
                continue;
            }
        } else if token.is_ident() && next_is("[") && depth >= 2 && at_statement_start(tokens, i) {
            edits.extend(map_store(tokens, i));
        }
        i += 1;
    }
    edits
}

fn apply(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| (edit.start, edit.end));
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for edit in edits {
        if edit.start < copied {
            tracing::debug!(?edit, "overlapping rewrite skipped");
            continue;
        }
        out.push_str(&source[copied..edit.start]);
        out.push_str(&edit.text);
        copied = edit.end;
    }
    out.push_str(&source[copied..]);
    out
}

fn is_fixed_width(word: &str) -> bool {
    let digits = |rest: &str| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
    if word == "address" {
        return true;
    }
    if let Some(rest) = word.strip_prefix("bytes") {
        return rest.is_empty() || digits(rest);
    }
    word.strip_prefix("uint")
        .or_else(|| word.strip_prefix("int"))
        .is_some_and(digits)
}

fn at_statement_start(tokens: &[Token], i: usize) -> bool {
    i == 0 || tokens[i - 1].is(";") || tokens[i - 1].is("{") || tokens[i - 1].is("}")
}

/// Index of the last token on the same source line as `tokens[i]`.
fn line_end(tokens: &[Token], i: usize) -> usize {
    let line = tokens[i].line;
    tokens[i..]
        .iter()
        .take_while(|t| t.line == line)
        .count()
        + i
        - 1
}

/// `emit Name(..)` or `event Name(..)`, with a trailing `;` when present.
fn declaration_end(tokens: &[Token], i: usize) -> Option<usize> {
    if !tokens.get(i + 1)?.is_ident() || !tokens.get(i + 2)?.is("(") {
        return None;
    }
    let close = matching_close(tokens, i + 2)?;
    match tokens.get(close + 1) {
        Some(semi) if semi.is(";") => Some(close + 1),
        _ => Some(close),
    }
}

fn commented(source: &str, tokens: &[Token], first: usize, last: usize) -> Edit {
    let text = source_text(source, &tokens[first..=last]).trim_end_matches(';');
    Edit::replace(
        tokens[first].start,
        tokens[last].end,
        format!("/* {} */", text),
    )
}

/// `m[k] := v;` into `m := m[k := v];`. Key and value tokens keep their own rewrites.
fn map_store(tokens: &[Token], i: usize) -> Vec<Edit> {
    let Some(close) = matching_close(tokens, i + 1) else {
        return Vec::new();
    };
    if !tokens.get(close + 1).is_some_and(|t| t.is(":=")) {
        return Vec::new();
    }
    let Some(semi) = tokens[close + 2..]
        .iter()
        .position(|t| t.is(";") || t.is("{") || t.is("}"))
        .map(|offset| close + 2 + offset)
        .filter(|&end| tokens[end].is(";"))
    else {
        return Vec::new();
    };

    let name = &tokens[i];
    vec![
        Edit::insert(name.start, format!("{} := ", name.text)),
        Edit::replace(tokens[close].start, tokens[close].end, ""),
        Edit::insert(tokens[semi].start, "]"),
    ]
}
