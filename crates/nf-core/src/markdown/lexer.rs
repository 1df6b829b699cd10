//! Markdown tokenizer.
//!
//! Built on `winnow` 0.7. Headings, block quotes, code fences and list
//! markers are only recognized at the start of a line; the line-start flag
//! is set by a newline and survives spaces and tabs. Everything else is
//! coalesced into `Text` runs that stop at the next delimiter.

use winnow::combinator::{alt, opt, peek, preceded, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    NewLine,
    Whitespace,
    Tab,
    /// `#` through `######`, level 1-6.
    Heading(u8),
    ListMarker,
    Star,
    DoubleStar,
    DoubleTilde,
    InlineCode,
    TripleBacktick,
    BlockQuote,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Text,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    /// Inline code tokens carry the text between the backticks.
    pub lexeme: &'s str,
    pub start: usize,
    pub end: usize,
    pub line_start: bool,
}

const TEXT_DELIMITERS: [char; 10] = ['\n', '\t', '*', '`', '[', ']', '(', ')', '~', '>'];

// ─── Token parsers ───────────────────────────────────────────────────────

fn whitespace<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., ' ').parse_next(input)
}

fn heading<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1..=6, '#').parse_next(input)
}

/// `*`, `-` or `+` followed by a space, or a `[ ]` / `[x]` checkbox.
fn list_marker<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    alt((
        "[ ]",
        "[x]",
        terminated(one_of(['*', '-', '+']), peek(' ')).take(),
    ))
    .parse_next(input)
}

/// Backtick-delimited code. An unterminated span runs to end of input.
fn inline_code<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded('`', terminated(take_till(0.., '`'), opt('`'))).parse_next(input)
}

fn bracket<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    one_of(['[', ']', '(', ')']).take().parse_next(input)
}

/// At least one char, then everything up to the next delimiter. Taking the
/// first char unconditionally lets a stray `>` or `~` lex as text.
fn text_run<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (any, take_till(0.., TEXT_DELIMITERS))
        .take()
        .parse_next(input)
}

// ─── Lexer ───────────────────────────────────────────────────────────────

struct Lexer<'s> {
    src: &'s str,
    rest: &'s str,
    line_start: bool,
    tokens: Vec<Token<'s>>,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            rest: src,
            line_start: true,
            tokens: Vec::new(),
        }
    }

    fn offset(&self) -> usize {
        self.src.len() - self.rest.len()
    }

    /// Run `parser` at the cursor. On failure the cursor is left untouched.
    fn scan(
        &mut self,
        mut parser: impl Parser<&'s str, &'s str, ErrMode<ContextError>>,
    ) -> Option<(usize, &'s str)> {
        let checkpoint = self.rest;
        let start = self.offset();
        match parser.parse_next(&mut self.rest) {
            Ok(lexeme) => Some((start, lexeme)),
            Err(_) => {
                self.rest = checkpoint;
                None
            }
        }
    }

    fn push(&mut self, kind: TokenKind, lexeme: &'s str, start: usize) {
        self.tokens.push(Token {
            kind,
            lexeme,
            start,
            end: self.offset(),
            line_start: self.line_start,
        });
        match kind {
            TokenKind::NewLine => self.line_start = true,
            TokenKind::Whitespace | TokenKind::Tab => {}
            _ => self.line_start = false,
        }
    }

    fn emit(
        &mut self,
        kind: TokenKind,
        parser: impl Parser<&'s str, &'s str, ErrMode<ContextError>>,
    ) -> bool {
        match self.scan(parser) {
            Some((start, lexeme)) => {
                self.push(kind, lexeme, start);
                true
            }
            None => false,
        }
    }

    /// `>` markers, each optionally followed by one space, all flagged as
    /// line-start.
    fn block_quotes(&mut self) {
        while let Some((start, lexeme)) = self.scan(">") {
            self.line_start = true;
            self.push(TokenKind::BlockQuote, lexeme, start);
            self.line_start = true;
            self.emit(TokenKind::Whitespace, " ");
        }
        self.line_start = false;
    }

    fn next_token(&mut self) {
        if self.emit(TokenKind::NewLine, "\n")
            || self.emit(TokenKind::Tab, "\t")
            || self.emit(TokenKind::Whitespace, whitespace)
        {
            return;
        }

        if self.line_start {
            if self.rest.starts_with('>') {
                self.block_quotes();
                return;
            }
            if self.emit(TokenKind::TripleBacktick, "```") {
                return;
            }
            if let Some((start, hashes)) = self.scan(heading) {
                self.push(TokenKind::Heading(hashes.len() as u8), hashes, start);
                return;
            }
            if self.emit(TokenKind::ListMarker, list_marker) {
                return;
            }
        }

        if self.emit(TokenKind::DoubleTilde, "~~")
            || self.emit(TokenKind::DoubleStar, "**")
            || self.emit(TokenKind::Star, "*")
            || self.emit(TokenKind::InlineCode, inline_code)
        {
            return;
        }

        if let Some((start, b)) = self.scan(bracket) {
            let kind = match b {
                "[" => TokenKind::LBracket,
                "]" => TokenKind::RBracket,
                "(" => TokenKind::LParen,
                _ => TokenKind::RParen,
            };
            self.push(kind, b, start);
            return;
        }

        if !self.emit(TokenKind::Text, text_run) {
            // text_run only fails on empty input
            self.rest = "";
        }
    }

    fn run(mut self) -> Vec<Token<'s>> {
        while !self.rest.is_empty() {
            self.next_token();
        }
        let end = self.offset();
        self.push(TokenKind::Eof, "", end);
        self.tokens
    }
}

/// Tokenize `source`. The stream always ends with [`TokenKind::Eof`].
pub fn lex(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).run()
}
