//! Recursive-descent block parser over the token stream.

use super::entry::{
    BasicEntry, BlockQuoteEntry, CodeBlockEntry, ListEntry, ListItem, ListMarker, MarkdownEntry,
};
use super::lexer::{Token, TokenKind, lex};
use crate::text::{FontStrike, FontStyle, FontWeight, Text, TextStyleConfig};
use crate::theme::{self, Theme};
use std::sync::Arc;

/// Parse markdown source into renderable entries. Never fails: malformed
/// input degrades into plain paragraphs.
pub fn parse(source: &str) -> Vec<MarkdownEntry> {
    let tokens = lex(source);
    BlockParser::new(&tokens, source).parse()
}

struct BlockParser<'t, 's> {
    tokens: &'t [Token<'s>],
    source: &'s str,
    pos: usize,
    theme: Arc<Theme>,
}

impl<'t, 's> BlockParser<'t, 's> {
    fn new(tokens: &'t [Token<'s>], source: &'s str) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
            theme: theme::current(),
        }
    }

    fn current(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> TokenKind {
        self.current().map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_line_end(&self) -> bool {
        matches!(self.kind(), TokenKind::NewLine | TokenKind::Eof)
    }

    fn skip(&mut self, kind: TokenKind) {
        if self.at(kind) {
            self.pos += 1;
        }
    }

    fn at_list_item(&self) -> bool {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .find(|t| !is_indent(t.kind))
            .is_some_and(|t| t.kind == TokenKind::ListMarker)
    }

    fn parse(mut self) -> Vec<MarkdownEntry> {
        let mut entries = Vec::new();

        while !self.at(TokenKind::Eof) {
            let before = self.pos;

            match self.kind() {
                TokenKind::Heading(level) => entries.push(self.heading(level)),
                TokenKind::TripleBacktick => entries.push(self.code_block()),
                TokenKind::BlockQuote => entries.push(self.block_quote()),
                _ if self.at_list_item() => entries.push(self.list()),
                TokenKind::NewLine => self.pos += 1,
                _ => entries.push(self.paragraph()),
            }

            if self.pos == before {
                log::warn!("markdown parser stalled, skipping {:?}", self.current());
                self.pos += 1;
            }
        }

        entries
    }

    fn body_style(&self) -> TextStyleConfig {
        TextStyleConfig::default().with_size(self.theme.note.font_size)
    }

    fn heading(&mut self, level: u8) -> MarkdownEntry {
        self.pos += 1;
        self.skip(TokenKind::Whitespace);

        let mut title = String::new();
        while !self.at_line_end() {
            if let Some(t) = self.current() {
                title.push_str(t.lexeme);
            }
            self.pos += 1;
        }
        self.skip(TokenKind::NewLine);

        let index = usize::from(level.clamp(1, 6)) - 1;
        let style = TextStyleConfig::default()
            .with_size(self.theme.note.heading_sizes[index])
            .with_weight(FontWeight::Bold);
        MarkdownEntry::Heading {
            level,
            body: BasicEntry::new(vec![Text::new(title, &style)], true),
        }
    }

    fn code_block(&mut self) -> MarkdownEntry {
        self.pos += 1;
        let start = self.current().map_or(self.source.len(), |t| t.start);

        while !self.at(TokenKind::TripleBacktick) && !self.at(TokenKind::Eof) {
            self.pos += 1;
        }
        let end = self.current().map_or(start, |t| t.start).max(start);
        self.skip(TokenKind::TripleBacktick);

        let content = &self.source[start..end];
        let content = content.strip_prefix('\n').unwrap_or(content);
        let content = content.strip_suffix('\n').unwrap_or(content);
        CodeBlockEntry::new(Text::new(content, &self.body_style())).into()
    }

    fn block_quote(&mut self) -> MarkdownEntry {
        let mut depth = 0usize;
        while self.at(TokenKind::BlockQuote) {
            depth += 1;
            self.pos += 1;
            self.skip(TokenKind::Whitespace);
        }

        let mut fragments = self.inline_until_newline();
        self.skip(TokenKind::NewLine);

        let indent = ((depth - 1) as f64 * self.theme.note.quote_indent) as usize;
        for t in &mut fragments {
            t.set_indent(indent);
        }
        BlockQuoteEntry::new(BasicEntry::new(fragments, false), depth).into()
    }

    fn list(&mut self) -> MarkdownEntry {
        let mut items = Vec::new();

        while self.at_list_item() {
            let mut depth = 0usize;
            while let Some(t) = self.current().filter(|t| is_indent(t.kind)) {
                depth += indent_levels(t);
                self.pos += 1;
            }
            let Some(marker) = self.current().and_then(|t| ListMarker::from_lexeme(t.lexeme))
            else {
                break;
            };
            self.pos += 1;
            self.skip(TokenKind::Whitespace);

            let fragments = self.inline_until_newline();
            self.skip(TokenKind::NewLine);
            items.push(ListItem {
                body: BasicEntry::new(fragments, false),
                depth,
                marker,
            });
        }

        ListEntry::new(items).into()
    }

    fn paragraph(&mut self) -> MarkdownEntry {
        let fragments = self.inline_until_newline();
        self.skip(TokenKind::NewLine);
        MarkdownEntry::Paragraph(BasicEntry::new(fragments, false))
    }

    /// Inline fragments up to the end of the line. `**`, `*` and `~~` each
    /// toggle their own flag; inline code ignores all three.
    fn inline_until_newline(&mut self) -> Vec<Text> {
        let mut fragments = Vec::new();
        let (mut bold, mut italic, mut strike) = (false, false, false);
        let base = self.body_style();

        while !self.at_line_end() {
            let Some(t) = self.current().copied() else {
                break;
            };
            self.pos += 1;

            match t.kind {
                TokenKind::Star => italic = !italic,
                TokenKind::DoubleStar => bold = !bold,
                TokenKind::DoubleTilde => strike = !strike,
                TokenKind::InlineCode => {
                    let style = base
                        .clone()
                        .with_font("monospace")
                        .with_weight(FontWeight::Bold);
                    fragments.push(Text::new(t.lexeme, &style));
                }
                _ => {
                    let mut style = base.clone();
                    if bold {
                        style.weight = Some(FontWeight::Bold);
                    }
                    if italic {
                        style.style = Some(FontStyle::Italic);
                    }
                    if strike {
                        style.strike = Some(FontStrike::Line);
                    }
                    fragments.push(Text::new(t.lexeme, &style));
                }
            }
        }

        fragments
    }
}

fn is_indent(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Tab | TokenKind::Whitespace)
}

/// A tab is one level; spaces count two to a level.
fn indent_levels(token: &Token<'_>) -> usize {
    match token.kind {
        TokenKind::Tab => 1,
        _ => token.lexeme.len().div_ceil(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Frag {
        text: String,
        bold: bool,
        italic: bool,
        strike: bool,
    }

    fn frags(entry: &BasicEntry) -> Vec<Frag> {
        entry
            .fragments()
            .iter()
            .map(|t| {
                let s = t.style().borrow();
                Frag {
                    text: t.get().to_string(),
                    bold: s.weight() == FontWeight::Bold,
                    italic: s.style() == FontStyle::Italic,
                    strike: s.strike() != FontStrike::None,
                }
            })
            .collect()
    }

    fn frag(text: &str, bold: bool, italic: bool, strike: bool) -> Frag {
        Frag {
            text: text.into(),
            bold,
            italic,
            strike,
        }
    }

    #[test]
    fn headings_use_level_sizes() {
        let entries = parse("### Three");
        let MarkdownEntry::Heading { level, body } = &entries[0] else {
            panic!("expected heading, got {:?}", entries[0]);
        };
        assert_eq!(*level, 3);
        let t = &body.fragments()[0];
        assert_eq!(t.get(), "Three");
        assert_eq!(t.style().borrow().size(), 24.0);
        assert_eq!(t.style().borrow().weight(), FontWeight::Bold);
    }

    #[test]
    fn inline_toggles_close() {
        let entries = parse("a **b** c *d* ~~e~~ f");
        let MarkdownEntry::Paragraph(p) = &entries[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            frags(p),
            vec![
                frag("a ", false, false, false),
                frag("b", true, false, false),
                frag(" ", false, false, false),
                frag("c ", false, false, false),
                frag("d", false, true, false),
                frag(" ", false, false, false),
                frag("e", false, false, true),
                frag(" ", false, false, false),
                frag("f", false, false, false),
            ]
        );
    }

    #[test]
    fn inline_code_is_monospace_bold() {
        let entries = parse("*x `code` y*");
        let MarkdownEntry::Paragraph(p) = &entries[0] else {
            panic!("expected paragraph");
        };
        let code = &p.fragments()[1];
        assert_eq!(code.get(), "code");
        let style = code.style().borrow();
        assert_eq!(style.font(), "monospace");
        assert_eq!(style.weight(), FontWeight::Bold);
        assert_eq!(style.style(), FontStyle::Normal);
    }

    #[test]
    fn code_block_keeps_raw_source() {
        let entries = parse("```\n# not a heading\n*raw*\n```\nafter");
        assert_eq!(entries.len(), 2);
        let MarkdownEntry::CodeBlock(code) = &entries[0] else {
            panic!("expected code block");
        };
        assert_eq!(code.source(), "# not a heading\n*raw*");
        assert!(matches!(entries[1], MarkdownEntry::Paragraph(_)));
    }

    #[test]
    fn unterminated_code_block_runs_to_end() {
        let entries = parse("```\nabc");
        let MarkdownEntry::CodeBlock(code) = &entries[0] else {
            panic!("expected code block");
        };
        assert_eq!(code.source(), "abc");
    }

    #[test]
    fn block_quote_depth() {
        let entries = parse(">> nested");
        let MarkdownEntry::BlockQuote(q) = &entries[0] else {
            panic!("expected block quote");
        };
        assert_eq!(q.depth(), 2);
        assert_eq!(q.body().fragments()[0].get(), "nested");
    }

    #[test]
    fn list_items_capture_depth_and_marker() {
        let entries = parse("- a\n\t[x] b\n\t\t[ ] c\n+ d");
        let MarkdownEntry::List(list) = &entries[0] else {
            panic!("expected list");
        };
        let shape: Vec<(usize, ListMarker)> =
            list.items().iter().map(|i| (i.depth, i.marker)).collect();
        assert_eq!(
            shape,
            vec![
                (0, ListMarker::Dash),
                (1, ListMarker::Checked),
                (2, ListMarker::Unchecked),
                (0, ListMarker::Plus),
            ]
        );
    }

    #[test]
    fn space_indented_items_stay_in_the_list() {
        let entries = parse("- a\n  - b\n    - c\n \t- d");
        assert_eq!(entries.len(), 1);
        let MarkdownEntry::List(list) = &entries[0] else {
            panic!("expected list, got {:?}", entries[0]);
        };
        let depths: Vec<usize> = list.items().iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2]);
        assert_eq!(list.items()[1].body.fragments()[0].get(), "b");
    }

    #[test]
    fn malformed_input_terminates() {
        for src in ["~", ">", "a > b ~ c", "[", "```", "**", "\t\t", "`", "# ", "-"] {
            let _ = parse(src);
        }
    }
}
