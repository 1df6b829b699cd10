//! Renderable markdown blocks.
//!
//! Each entry lays itself out for a given max width and caches the result
//! until the width, the theme, or the loaded fonts change. `render` returns
//! the height it used in screen units.

use crate::geometry::{BoundingBox, Vector2};
use crate::pool::Pool;
use crate::surface::{CornerRadii, PaintMode, Surface};
use crate::text::{self, Text, find_break};
use crate::theme;

thread_local! {
    /// Fragments waiting for their line to be closed.
    static PENDING_LINE: Pool<Vec<(Text, f64)>> = Pool::vecs();
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    width: f64,
    font_epoch: u64,
    theme: u64,
}

impl LayoutKey {
    fn new(width: f64) -> Self {
        Self {
            width,
            font_epoch: text::font_epoch(),
            theme: theme::generation(),
        }
    }
}

#[derive(Debug)]
pub enum MarkdownEntry {
    Heading { level: u8, body: BasicEntry },
    Paragraph(BasicEntry),
    CodeBlock(CodeBlockEntry),
    BlockQuote(BlockQuoteEntry),
    List(ListEntry),
}

impl MarkdownEntry {
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        max_width: f64,
    ) -> f64 {
        match self {
            MarkdownEntry::Heading { body, .. } | MarkdownEntry::Paragraph(body) => {
                body.render(surface, position, scale, max_width)
            }
            MarkdownEntry::CodeBlock(e) => e.render(surface, position, scale, max_width),
            MarkdownEntry::BlockQuote(e) => e.render(surface, position, scale, max_width),
            MarkdownEntry::List(e) => e.render(surface, position, scale, max_width),
        }
    }
}

impl From<CodeBlockEntry> for MarkdownEntry {
    fn from(e: CodeBlockEntry) -> Self {
        MarkdownEntry::CodeBlock(e)
    }
}

impl From<BlockQuoteEntry> for MarkdownEntry {
    fn from(e: BlockQuoteEntry) -> Self {
        MarkdownEntry::BlockQuote(e)
    }
}

impl From<ListEntry> for MarkdownEntry {
    fn from(e: ListEntry) -> Self {
        MarkdownEntry::List(e)
    }
}

// ─── Basic ───────────────────────────────────────────────────────────────

/// Inline fragments flowed left to right with word wrapping.
#[derive(Debug)]
pub struct BasicEntry {
    fragments: Vec<Text>,
    underline: bool,
    placed: Vec<(Text, Vector2)>,
    cached: Option<LayoutKey>,
}

impl BasicEntry {
    pub fn new(fragments: Vec<Text>, underline: bool) -> Self {
        Self {
            fragments,
            underline,
            placed: Vec::new(),
            cached: None,
        }
    }

    pub fn fragments(&self) -> &[Text] {
        &self.fragments
    }

    /// Laid-out pieces with their unscaled baseline offsets.
    pub fn placed(&self) -> &[(Text, Vector2)] {
        &self.placed
    }

    pub fn layout(&mut self, surface: &mut dyn Surface, max_width: f64) {
        let key = LayoutKey::new(max_width);
        if self.cached == Some(key) {
            return;
        }

        let line_spacing = theme::current().note.line_spacing;
        let Self {
            fragments, placed, ..
        } = self;
        placed.clear();

        PENDING_LINE.with(|pool| {
            let mut line = pool.get();
            let mut x = 0.0;
            let mut y = 0.0;
            let mut line_height: f64 = 0.0;

            for fragment in fragments.iter() {
                let mut piece = fragment.clone();
                loop {
                    let available = (max_width - x).max(0.0);
                    piece.style().borrow_mut().setup(surface, 1.0);
                    let Some(b) = find_break(surface, piece.get(), available) else {
                        break;
                    };

                    // Mid-line, a word that does not fit moves to the next
                    // line whole.
                    let mut index = if b.word_boundary || line.is_empty() {
                        b.index
                    } else {
                        0
                    };
                    if index == 0 && line.is_empty() {
                        if piece.get().chars().count() <= 1 {
                            break;
                        }
                        index = 1;
                    }

                    let [mut head, tail] = piece.split_at_index(index);
                    if !head.get().is_empty() {
                        line_height = line_height.max(head.height(surface));
                        line.push((head, x));
                    }

                    y += line_height;
                    placed.extend(line.drain(..).map(|(t, lx)| (t, Vector2::new(lx, y))));
                    y += line_spacing;
                    line_height = 0.0;
                    x = 0.0;
                    piece = tail;
                }

                let size = piece.measure(surface);
                line_height = line_height.max(size.y);
                line.push((piece, x));
                x += size.x;
            }

            y += line_height;
            placed.extend(line.drain(..).map(|(t, lx)| (t, Vector2::new(lx, y))));
        });

        self.cached = Some(key);
    }

    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        max_width: f64,
    ) -> f64 {
        self.layout(surface, max_width);

        let mut max: f64 = 0.0;
        for (text, pos) in &mut self.placed {
            text.render(
                surface,
                scale,
                Vector2::new(pos.x * scale + position.x, pos.y * scale + position.y),
            );
            max = max.max(pos.y * scale);
        }

        if self.underline {
            let theme = theme::current();
            let y = position.y + max + scale * 5.0;
            surface.set_stroke(theme.note.font_color);
            surface.set_line_width(theme.note.header_line_width * scale);
            surface.line(
                Vector2::new(position.x, y),
                Vector2::new(position.x + max_width * scale, y),
            );
        }

        max
    }
}

// ─── Code block ──────────────────────────────────────────────────────────

/// Preformatted text on a padded background panel.
#[derive(Debug)]
pub struct CodeBlockEntry {
    text: Text,
    lines: Vec<(Text, f64)>,
    cached: Option<LayoutKey>,
}

impl CodeBlockEntry {
    pub fn new(text: Text) -> Self {
        Self {
            text,
            lines: Vec::new(),
            cached: None,
        }
    }

    pub fn source(&self) -> &str {
        self.text.get()
    }

    fn layout(&mut self, surface: &mut dyn Surface, max_width: f64) {
        let key = LayoutKey::new(max_width);
        if self.cached == Some(key) {
            return;
        }

        let theme = theme::current();
        let width = max_width - theme.note.code_padding * 2.0;
        let font_size = self.text.style().borrow().size();
        let step = font_size + theme.note.line_spacing;

        self.lines.clear();
        let mut y = 0.0;
        for source_line in self.text.split('\n') {
            for line in source_line.break_into_lines(surface, width) {
                self.lines.push((line, y + font_size));
                y += step;
            }
        }
        self.cached = Some(key);
    }

    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        max_width: f64,
    ) -> f64 {
        self.layout(surface, max_width);

        let theme = theme::current();
        let padding = theme.note.code_padding * scale;
        let content = self.lines.last().map_or(0.0, |(_, y)| y * scale);

        surface.set_fill(theme.note.code_background);
        surface.rounded_rect(
            BoundingBox::new(position, Vector2::new(max_width * scale, content + padding * 2.0)),
            CornerRadii::uniform(theme.note.code_border_radius * scale),
            PaintMode::Fill,
        );

        for (line, y) in &mut self.lines {
            line.render(
                surface,
                scale,
                Vector2::new(position.x + padding, *y * scale + position.y + padding),
            );
        }

        content + padding * 2.0
    }
}

// ─── Block quote ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BlockQuoteEntry {
    body: BasicEntry,
    depth: usize,
}

impl BlockQuoteEntry {
    const BAR_WIDTH: f64 = 4.0;
    const PADDING: f64 = 10.0;

    pub fn new(body: BasicEntry, depth: usize) -> Self {
        Self {
            body,
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn body(&self) -> &BasicEntry {
        &self.body
    }

    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        max_width: f64,
    ) -> f64 {
        let theme = theme::current();
        let bar = Self::BAR_WIDTH * scale;
        let padding = Self::PADDING * scale;
        let offset = (self.depth - 1) as f64 * theme.note.quote_indent * scale;

        let height = self.body.render(
            surface,
            Vector2::new(position.x + bar + padding, position.y),
            scale,
            max_width - Self::BAR_WIDTH - Self::PADDING,
        );

        surface.set_fill(theme.note.quote_bar_color);
        surface.rect(
            BoundingBox::from_xywh(
                position.x + offset,
                position.y - padding / 2.0,
                bar,
                height + padding * 1.5,
            ),
            PaintMode::Fill,
        );

        height
    }
}

// ─── Unordered list ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Star,
    Dash,
    Plus,
    Unchecked,
    Checked,
}

impl ListMarker {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "*" => Some(ListMarker::Star),
            "-" => Some(ListMarker::Dash),
            "+" => Some(ListMarker::Plus),
            "[ ]" => Some(ListMarker::Unchecked),
            "[x]" => Some(ListMarker::Checked),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ListItem {
    pub body: BasicEntry,
    /// Indent level: one per tab, one per two spaces.
    pub depth: usize,
    pub marker: ListMarker,
}

#[derive(Debug)]
pub struct ListEntry {
    items: Vec<ListItem>,
}

impl ListEntry {
    const INDENT: f64 = 24.0;

    pub fn new(items: Vec<ListItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    fn render_marker(surface: &mut dyn Surface, marker: ListMarker, at: Vector2, scale: f64) {
        let theme = theme::current();
        let size = theme.note.dot_size * scale;
        let check_box = BoundingBox::from_xywh(at.x, at.y + size, size * 2.0, size * 2.0);

        surface.set_fill(theme.note.font_color);
        surface.set_stroke(theme.note.font_color);
        match marker {
            ListMarker::Unchecked => {
                surface.set_line_width(2.0);
                surface.rect(check_box, PaintMode::Stroke);
            }
            ListMarker::Checked => {
                surface.set_line_width(2.0);
                surface.rect(check_box, PaintMode::FillAndStroke);
            }
            _ => surface.circle(
                Vector2::new(at.x + size, at.y + size * 2.0),
                size,
                PaintMode::Fill,
            ),
        }
    }

    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        max_width: f64,
    ) -> f64 {
        let line_spacing = theme::current().note.line_spacing;
        let indent = Self::INDENT * scale;
        let mut offset = 0.0;

        for item in &mut self.items {
            let x = position.x + item.depth as f64 * indent;
            let y = position.y + offset;
            Self::render_marker(surface, item.marker, Vector2::new(x, y), scale);

            let width = max_width - Self::INDENT * (item.depth + 1) as f64;
            offset += item
                .body
                .render(surface, Vector2::new(x + indent, y), scale, width)
                + line_spacing * scale;
        }

        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, HeadlessSurface};
    use crate::text::TextStyleConfig;

    fn texts(words: &[&str]) -> Vec<Text> {
        let style = TextStyleConfig::default().with_size(10.0);
        words.iter().map(|w| Text::new(*w, &style)).collect()
    }

    #[test]
    fn fragments_flow_on_one_line() {
        let mut s = HeadlessSurface::default();
        let mut e = BasicEntry::new(texts(&["ab ", "cd"]), false);
        e.layout(&mut s, 1000.0);
        let xs: Vec<f64> = e.placed().iter().map(|(_, p)| p.x).collect();
        assert_eq!(xs, vec![0.0, 18.0]);
        assert!(e.placed().iter().all(|(_, p)| p.y == 10.0));
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let mut s = HeadlessSurface::default();
        // 6px per char; 60px holds 10 chars
        let mut e = BasicEntry::new(texts(&["hello world again"]), false);
        e.layout(&mut s, 60.0);
        let lines: Vec<(&str, f64)> = e.placed().iter().map(|(t, p)| (t.get(), p.y)).collect();
        assert_eq!(lines, vec![("hello ", 10.0), ("world ", 25.0), ("again", 40.0)]);
    }

    #[test]
    fn word_that_does_not_fit_mid_line_moves_down() {
        let mut s = HeadlessSurface::default();
        let mut e = BasicEntry::new(texts(&["aaaaaaaa", "bbbb"]), false);
        e.layout(&mut s, 60.0);
        let lines: Vec<(&str, f64, f64)> = e
            .placed()
            .iter()
            .map(|(t, p)| (t.get(), p.x, p.y))
            .collect();
        assert_eq!(lines, vec![("aaaaaaaa", 0.0, 10.0), ("bbbb", 0.0, 25.0)]);
    }

    #[test]
    fn layout_is_cached_per_width() {
        let mut s = HeadlessSurface::default();
        let mut e = BasicEntry::new(texts(&["one two three"]), false);
        e.layout(&mut s, 1000.0);
        assert_eq!(e.placed().len(), 1);
        e.layout(&mut s, 30.0);
        assert_eq!(e.placed().len(), 3);
    }

    #[test]
    fn heading_draws_underline() {
        let mut s = HeadlessSurface::default();
        let mut e = BasicEntry::new(texts(&["Title"]), true);
        let h = e.render(&mut s, Vector2::ZERO, 1.0, 200.0);
        assert_eq!(h, 10.0);
        assert!(s.ops().iter().any(|op| matches!(
            op,
            DrawOp::Line { from, to, .. } if from.y == 15.0 && to.x == 200.0
        )));
    }

    #[test]
    fn code_block_height_includes_padding() {
        let mut s = HeadlessSurface::default();
        let style = TextStyleConfig::default().with_size(10.0);
        let mut e = CodeBlockEntry::new(Text::new("a\nb", &style));
        let h = e.render(&mut s, Vector2::ZERO, 1.0, 300.0);
        // baselines at 10 and 25, padding 16 on both sides
        assert_eq!(h, 25.0 + 32.0);
        assert_eq!(s.texts(), vec!["a", "b"]);
    }

    #[test]
    fn checkbox_markers_draw_squares() {
        let mut s = HeadlessSurface::default();
        let mut list = ListEntry::new(vec![
            ListItem {
                body: BasicEntry::new(texts(&["x"]), false),
                depth: 0,
                marker: ListMarker::Checked,
            },
            ListItem {
                body: BasicEntry::new(texts(&["y"]), false),
                depth: 1,
                marker: ListMarker::Dash,
            },
        ]);
        list.render(&mut s, Vector2::ZERO, 1.0, 400.0);
        assert!(s.ops().iter().any(|op| matches!(
            op,
            DrawOp::Rect { mode: PaintMode::FillAndStroke, .. }
        )));
        assert!(s.ops().iter().any(|op| matches!(op, DrawOp::Circle { center, .. } if center.x == 27.0)));
    }
}
