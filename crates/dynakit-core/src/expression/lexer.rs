//! Lossless tokenizer for expression strings.
//!
//! Unlike a parser front end, this lexer never fails and never drops input:
//! concatenating the text of every token reproduces the source exactly. That
//! makes it suitable for rewriting caller-supplied expressions one token at a
//! time (renaming `:value` placeholders, escaping reserved identifiers) without
//! touching anything else.

use std::iter::Peekable;
use std::str::CharIndices;

/// Grammar keywords and function names. These are never treated as attribute
/// names even though several of them are also reserved words.
const GRAMMAR_WORDS: &[&str] = &[
    "and",
    "or",
    "not",
    "between",
    "in",
    "set",
    "remove",
    "add",
    "delete",
    "attribute_exists",
    "attribute_not_exists",
    "attribute_type",
    "begins_with",
    "contains",
    "size",
    "if_not_exists",
    "list_append",
];

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A bare attribute name segment.
    Identifier,
    /// A grammar keyword or function name.
    Keyword,
    /// `#name`
    NameRef,
    /// `:value`
    ValueRef,
    /// Whitespace, punctuation, operators, numbers.
    Other,
}

/// A slice of the source with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Iterator over the tokens of an expression string.
pub(crate) struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.chars.peek().is_some_and(|&(_, c)| pred(c)) {
            self.chars.next();
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let (start, ch) = self.chars.next()?;

        let kind = match ch {
            '#' | ':' => {
                self.eat_while(is_ident_continue);
                if self.offset() == start + 1 {
                    TokenKind::Other
                } else if ch == '#' {
                    TokenKind::NameRef
                } else {
                    TokenKind::ValueRef
                }
            }
            c if is_ident_start(c) => {
                self.eat_while(is_ident_continue);
                let end = self.offset();
                if is_grammar_word(&self.input[start..end]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            }
            c if c.is_ascii_digit() => {
                self.eat_while(is_ident_continue);
                TokenKind::Other
            }
            c if c.is_whitespace() => {
                self.eat_while(char::is_whitespace);
                TokenKind::Other
            }
            _ => TokenKind::Other,
        };

        let end = self.offset();
        Some(Token {
            kind,
            text: &self.input[start..end],
        })
    }
}

fn is_grammar_word(word: &str) -> bool {
    GRAMMAR_WORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Every `#name` placeholder referenced by `expression`, in order, repeats included.
pub(crate) fn name_refs(expression: &str) -> impl Iterator<Item = &str> {
    Lexer::new(expression)
        .filter(|t| t.kind == TokenKind::NameRef)
        .map(|t| t.text)
}
