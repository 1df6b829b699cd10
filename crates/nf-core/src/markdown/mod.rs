//! Markdown for notes: lexer, block parser and renderable entries.
//!
//! Supports headings, paragraphs with bold/italic/strike/inline code,
//! fenced code blocks, nested block quotes, and unordered lists with
//! checkbox markers. Links and images are not supported.

pub mod entry;
pub mod lexer;
pub mod parser;

pub use entry::{
    BasicEntry, BlockQuoteEntry, CodeBlockEntry, ListEntry, ListItem, ListMarker, MarkdownEntry,
};
pub use lexer::{Token, TokenKind, lex};
pub use parser::parse;
