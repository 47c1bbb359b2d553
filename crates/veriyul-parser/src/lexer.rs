use crate::{ParseResult, Rule, VeriLexer};
use pest::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Op,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based.
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Str && self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    pub fn is_any_keyword(&self, words: &[&str]) -> bool {
        self.kind == TokenKind::Ident && words.contains(&self.text.as_str())
    }
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

pub fn lex(source: &str) -> ParseResult<Vec<Token>> {
    let lines = LineIndex::new(source);
    let pairs = VeriLexer::parse(Rule::tokens, source).map_err(Box::new)?;

    let mut tokens = Vec::new();
    for pair in pairs.flatten() {
        let kind = match pair.as_rule() {
            Rule::ident => TokenKind::Ident,
            Rule::number => TokenKind::Number,
            Rule::string => TokenKind::Str,
            Rule::op => TokenKind::Op,
            Rule::unknown => TokenKind::Unknown,
            _ => continue,
        };
        let span = pair.as_span();
        tokens.push(Token {
            kind,
            text: span.as_str().to_string(),
            line: lines.line_of(span.start()),
            start: span.start(),
            end: span.end(),
        });
    }
    Ok(tokens)
}

/// Source text covered by a token run, with its original spacing.
pub fn source_text<'s>(source: &'s str, tokens: &[Token]) -> &'s str {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => &source[first.start..last.end],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        lex(source).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_multi_char_operators() {
        assert_eq!(
            texts("a := b <= c ==> d != e"),
            vec!["a", ":=", "b", "<=", "c", "==>", "d", "!=", "e"]
        );
    }

    #[test]
    fn test_nested_generic_closes_separately() {
        assert_eq!(
            texts("mapping<address, mapping<address, uint256>>"),
            vec![
                "mapping", "<", "address", ",", "mapping", "<", "address", ",", "uint256", ">",
                ">"
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(
            texts("x // trailing\n/* block\n comment */ y"),
            vec!["x", "y"]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = lex("a\n\n  b\nc").unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn test_never_fails() {
        let tokens = lex("var x := \"unterminated\n @ # $").unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Unknown));
    }

    #[test]
    fn test_hex_and_strings() {
        let tokens = lex("0xff \"a \\\" b\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Str);
        assert_eq!(tokens[1].text, "\"a \\\" b\"");
    }
}
