//! Context menus.
//!
//! Subsystems each contribute a partial [`ContextMenuConfig`]; the graph
//! merges them with [`combine_context_menus`] and builds one [`ContextMenu`]
//! per right click. Entries are bucketed by their optional `group` key: the
//! ungrouped bucket renders first, the rest in first-seen order, separated by
//! a rule. Selecting an item yields its action value to the caller.

use crate::color::Color;
use crate::geometry::{BoundingBox, Vector2};
use crate::surface::{CornerRadii, PaintMode, Surface, TextAlign, TextBaseline};
use crate::text::{self, TextStyle, TextStyleConfig};
use crate::theme;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const ENTRY_HEIGHT: f64 = 30.0;
const MENU_SCALE: f64 = 1.25;

// ─── Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMenuItemConfig<A> {
    pub name: Option<String>,
    pub group: Option<String>,
    pub text_style: Option<TextStyleConfig>,
    pub action: Option<A>,
}

impl<A> Default for ContextMenuItemConfig<A> {
    fn default() -> Self {
        Self {
            name: None,
            group: None,
            text_style: None,
            action: None,
        }
    }
}

impl<A> ContextMenuItemConfig<A> {
    pub fn new(name: impl Into<String>, action: A) -> Self {
        Self {
            name: Some(name.into()),
            action: Some(action),
            ..Default::default()
        }
    }

    pub fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMenuConfig<A> {
    pub name: Option<String>,
    pub group: Option<String>,
    pub text_style: Option<TextStyleConfig>,
    pub items: Vec<ContextMenuItemConfig<A>>,
    pub sub_menus: Vec<ContextMenuConfig<A>>,
}

impl<A> Default for ContextMenuConfig<A> {
    fn default() -> Self {
        Self {
            name: None,
            group: None,
            text_style: None,
            items: Vec::new(),
            sub_menus: Vec::new(),
        }
    }
}

impl<A> ContextMenuConfig<A> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn item(mut self, item: ContextMenuItemConfig<A>) -> Self {
        self.items.push(item);
        self
    }

    pub fn sub_menu(mut self, menu: ContextMenuConfig<A>) -> Self {
        self.sub_menus.push(menu);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.sub_menus.is_empty()
    }
}

/// Concatenate items and sub menus of every config, in order. Names,
/// groups and styles of the inputs are dropped.
pub fn combine_context_menus<A>(
    menus: impl IntoIterator<Item = ContextMenuConfig<A>>,
) -> ContextMenuConfig<A> {
    let mut combined = ContextMenuConfig::default();
    for menu in menus {
        combined.items.extend(menu.items);
        combined.sub_menus.extend(menu.sub_menus);
    }
    combined
}

// ─── Menu ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ContextMenuItem<A> {
    name: String,
    group: Option<String>,
    action: Option<A>,
}

impl<A> ContextMenuItem<A> {
    fn new(config: ContextMenuItemConfig<A>) -> Self {
        Self {
            name: config.name.unwrap_or_else(|| "item".into()),
            group: config.group,
            action: config.action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }
}

/// Position of one rendered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRef {
    Item(usize),
    SubMenu(usize),
}

#[derive(Debug, Clone)]
pub struct ContextMenu<A> {
    name: String,
    group: Option<String>,
    items: Vec<ContextMenuItem<A>>,
    sub_menus: Vec<ContextMenu<A>>,
    style: TextStyle,
    color_override: bool,
    groups: Vec<Vec<EntryRef>>,
    text_width: Option<(u64, f64)>,
    open_sub_menu: Option<usize>,
    sub_menu_position: Vector2,
}

impl<A: Clone> ContextMenu<A> {
    pub fn new(config: ContextMenuConfig<A>) -> Self {
        let style_config = config.text_style.unwrap_or_default();
        let mut menu = Self {
            name: config.name.unwrap_or_else(|| "menu".into()),
            group: config.group,
            items: config.items.into_iter().map(ContextMenuItem::new).collect(),
            sub_menus: config.sub_menus.into_iter().map(ContextMenu::new).collect(),
            color_override: style_config.color.is_some(),
            style: TextStyle::new(&style_config),
            groups: Vec::new(),
            text_width: None,
            open_sub_menu: None,
            sub_menu_position: Vector2::ZERO,
        };
        menu.calculate_entries();
        menu
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[ContextMenuItem<A>] {
        &self.items
    }

    pub fn sub_menus(&self) -> &[ContextMenu<A>] {
        &self.sub_menus
    }

    pub fn groups(&self) -> &[Vec<EntryRef>] {
        &self.groups
    }

    /// Display name of an entry.
    pub fn entry_name(&self, entry: EntryRef) -> &str {
        match entry {
            EntryRef::Item(i) => self.items.get(i).map_or("", |it| it.name()),
            EntryRef::SubMenu(i) => self.sub_menus.get(i).map_or("", |m| m.name()),
        }
    }

    /// Rebuild the group buckets. Items precede sub menus within a bucket.
    pub fn calculate_entries(&mut self) {
        let mut buckets: IndexMap<Option<&str>, Vec<EntryRef>> = IndexMap::new();
        buckets.insert(None, Vec::new());

        for (i, item) in self.items.iter().enumerate() {
            buckets
                .entry(item.group.as_deref())
                .or_default()
                .push(EntryRef::Item(i));
        }
        for (i, sub) in self.sub_menus.iter().enumerate() {
            buckets
                .entry(sub.group.as_deref())
                .or_default()
                .push(EntryRef::SubMenu(i));
        }

        self.groups = buckets.into_values().filter(|g| !g.is_empty()).collect();
    }

    fn entry_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    fn max_text_width(&mut self, surface: &mut dyn Surface) -> f64 {
        let epoch = text::font_epoch();
        if let Some((cached_epoch, width)) = self.text_width
            && cached_epoch == epoch
        {
            return width;
        }

        let mut width: f64 = 0.0;
        for group in &self.groups {
            for &entry in group {
                let name = match entry {
                    EntryRef::Item(i) => self.items.get(i).map(|it| it.name.as_str()),
                    EntryRef::SubMenu(i) => self.sub_menus.get(i).map(|m| m.name.as_str()),
                };
                if let Some(name) = name {
                    width = width.max(self.style.measure(surface, MENU_SCALE, name).x);
                }
            }
        }
        self.text_width = Some((epoch, width));
        width
    }

    /// Draw the menu at `position` and return the action under the cursor,
    /// descending into the hovered sub menu. Hovering a sub menu entry opens
    /// it but yields no action.
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        mouse: Option<Vector2>,
        open_right: bool,
    ) -> Option<A> {
        let theme = theme::current();
        let entry_height = MENU_SCALE * ENTRY_HEIGHT;
        let entry_width = MENU_SCALE * 40.0 + self.max_text_width(surface);
        let total_height = self.entry_count() as f64 * entry_height;
        let radius = CornerRadii::uniform(5.0 * MENU_SCALE);

        let mut pos = position;
        if !open_right {
            pos.x -= entry_width;
        }
        if pos.y + total_height > surface.height() {
            pos.y = surface.height() - total_height;
        }
        pos.y = pos.y.max(0.0);
        let mut sub_open_right = open_right;
        if open_right && pos.x + entry_width > surface.width() {
            pos.x = surface.width() - entry_width;
            sub_open_right = false;
        } else if !open_right && pos.x < 0.0 {
            sub_open_right = true;
        }
        pos.x = pos.x.max(0.0);

        surface.save();
        surface.set_text_align(TextAlign::Left);
        surface.set_text_baseline(TextBaseline::Middle);
        surface.set_fill(theme.context_menu.background);
        surface.set_shadow(Color::rgba(0.0, 0.0, 0.0, 0.87), 5.0 * MENU_SCALE);
        surface.rounded_rect(
            BoundingBox::from_xywh(pos.x, pos.y, entry_width, total_height),
            radius,
            PaintMode::Fill,
        );
        surface.set_shadow(Color::TRANSPARENT, 0.0);

        let mut hovered = None;
        let mut rendered = 0usize;
        let group_count = self.groups.len();

        for group_index in 0..group_count {
            let mut entry_y = pos.y;
            for entry_index in 0..self.groups[group_index].len() {
                let entry = self.groups[group_index][entry_index];
                entry_y = pos.y + entry_height * rendered as f64;
                let bounds = BoundingBox::from_xywh(pos.x, entry_y, entry_width, entry_height);

                let mouse_over = mouse.is_some_and(|m| bounds.contains(m));
                if mouse_over {
                    match entry {
                        EntryRef::Item(i) => {
                            hovered = self.items.get(i).and_then(|it| it.action.clone());
                            self.open_sub_menu = None;
                        }
                        EntryRef::SubMenu(i) => {
                            self.open_sub_menu = Some(i);
                            self.sub_menu_position = Vector2::new(
                                if sub_open_right { pos.x + entry_width } else { pos.x },
                                entry_y,
                            );
                        }
                    }
                }

                let is_open = matches!(entry, EntryRef::SubMenu(i) if self.open_sub_menu == Some(i));
                if mouse_over || is_open {
                    surface.set_fill(theme.context_menu.highlight);
                    surface.rounded_rect(
                        BoundingBox::from_xywh(
                            pos.x + entry_height / 10.0,
                            entry_y + entry_height / 10.0,
                            entry_width - entry_height / 5.0,
                            entry_height - entry_height / 5.0,
                        ),
                        radius,
                        PaintMode::Fill,
                    );
                }

                self.style.setup(surface, MENU_SCALE);
                if !self.color_override {
                    surface.set_fill(theme.context_menu.font_color);
                }
                let name = self.entry_name(entry).to_string();
                surface.fill_text(
                    &name,
                    Vector2::new(pos.x + entry_height / 5.0, entry_y + entry_height / 2.0),
                );

                if matches!(entry, EntryRef::SubMenu(_)) {
                    let right = pos.x + entry_width;
                    let tip = Vector2::new(right - entry_height / 4.0, entry_y + entry_height / 2.0);
                    surface.set_stroke(theme.context_menu.font_color);
                    surface.set_line_width(MENU_SCALE);
                    surface.line(
                        Vector2::new(right - entry_height / 2.5, entry_y + entry_height / 3.0),
                        tip,
                    );
                    surface.line(
                        tip,
                        Vector2::new(right - entry_height / 2.5, entry_y + entry_height * 2.0 / 3.0),
                    );
                }

                rendered += 1;
            }

            if group_index + 1 != group_count {
                let x = pos.x + entry_height / 10.0;
                let y = entry_y + entry_height;
                surface.set_stroke(theme.context_menu.font_color);
                surface.set_line_width(0.5 * MENU_SCALE);
                surface.line(
                    Vector2::new(x, y),
                    Vector2::new(x + entry_width - entry_height / 5.0, y),
                );
            }
        }
        surface.restore();

        if let Some(open) = self.open_sub_menu {
            let at = self.sub_menu_position;
            if let Some(sub) = self.sub_menus.get_mut(open)
                && let Some(action) = sub.render(surface, at, mouse, sub_open_right)
            {
                hovered = Some(action);
            }
        }

        hovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;
    use pretty_assertions::assert_eq;

    fn names(menu: &ContextMenu<u32>) -> Vec<Vec<String>> {
        menu.groups()
            .iter()
            .map(|g| g.iter().map(|e| menu.entry_name(*e).to_string()).collect())
            .collect()
    }

    #[test]
    fn combine_concatenates_in_order() {
        let a = ContextMenuConfig::default().item(ContextMenuItemConfig::new("a", 1));
        let b = ContextMenuConfig::default()
            .item(ContextMenuItemConfig::new("b", 2))
            .sub_menu(ContextMenuConfig::named("sub"));
        let c = combine_context_menus([a, b]);
        assert_eq!(c.items.len(), 2);
        assert_eq!(c.items[1].name.as_deref(), Some("b"));
        assert_eq!(c.sub_menus.len(), 1);
    }

    #[test]
    fn ungrouped_bucket_comes_first() {
        let config = ContextMenuConfig::default()
            .item(ContextMenuItemConfig::new("g1", 1).grouped("g"))
            .item(ContextMenuItemConfig::new("plain", 2))
            .sub_menu(ContextMenuConfig::named("sub-g").grouped("g"))
            .item(ContextMenuItemConfig::new("h1", 3).grouped("h"));
        let menu = ContextMenu::new(config);
        assert_eq!(
            names(&menu),
            vec![vec!["plain"], vec!["g1", "sub-g"], vec!["h1"]]
        );
    }

    #[test]
    fn empty_default_bucket_is_dropped() {
        let config = ContextMenuConfig::<u32>::default()
            .item(ContextMenuItemConfig::new("x", 1).grouped("only"));
        let menu = ContextMenu::new(config);
        assert_eq!(names(&menu), vec![vec!["x"]]);
    }

    #[test]
    fn hover_returns_item_action() {
        let mut s = HeadlessSurface::new(800.0, 600.0);
        let config = ContextMenuConfig::default()
            .item(ContextMenuItemConfig::new("first", 10))
            .item(ContextMenuItemConfig::new("second", 20));
        let mut menu = ContextMenu::new(config);
        let origin = Vector2::new(100.0, 100.0);
        // entries are 37.5px tall
        let hit = menu.render(&mut s, origin, Some(Vector2::new(110.0, 150.0)), true);
        assert_eq!(hit, Some(20));
        let miss = menu.render(&mut s, origin, Some(Vector2::new(0.0, 0.0)), true);
        assert_eq!(miss, None);
    }

    #[test]
    fn hovering_sub_menu_opens_it() {
        let mut s = HeadlessSurface::new(800.0, 600.0);
        let config = ContextMenuConfig::default().sub_menu(
            ContextMenuConfig::named("more").item(ContextMenuItemConfig::new("deep", 7)),
        );
        let mut menu = ContextMenu::new(config);
        let origin = Vector2::new(100.0, 100.0);
        assert_eq!(menu.render(&mut s, origin, Some(Vector2::new(110.0, 110.0)), true), None);
        assert!(s.texts().contains(&"deep"));

        // "more" at 16px * 1.25 measures 48, so the menu is 98 wide and the
        // sub menu opens at x = 198
        let hit = menu.render(&mut s, origin, Some(Vector2::new(215.0, 110.0)), true);
        assert_eq!(hit, Some(7));
    }

    #[test]
    fn flips_left_at_right_edge() {
        let mut s = HeadlessSurface::new(300.0, 600.0);
        let config = ContextMenuConfig::default().sub_menu(
            ContextMenuConfig::named("more").item(ContextMenuItemConfig::new("deep", 7)),
        );
        let mut menu = ContextMenu::new(config);
        menu.render(&mut s, Vector2::new(290.0, 10.0), Some(Vector2::new(295.0, 15.0)), true);
        // menu clamped to x = 202; sub menu opens leftward from there
        let texts: Vec<(String, f64)> = s
            .ops()
            .iter()
            .filter_map(|op| match op {
                crate::surface::DrawOp::Text { text, position, .. } => {
                    Some((text.clone(), position.x))
                }
                _ => None,
            })
            .collect();
        let deep = texts.iter().find(|(t, _)| t == "deep").map(|(_, x)| *x);
        assert!(deep.is_some_and(|x| x < 202.0));
    }

    #[test]
    fn flips_right_at_left_edge() {
        let mut s = HeadlessSurface::new(300.0, 600.0);
        let config = ContextMenuConfig::default().sub_menu(
            ContextMenuConfig::named("more").item(ContextMenuItemConfig::new("deep", 7)),
        );
        let mut menu = ContextMenu::new(config);
        // 98 wide, so opening leftward from x = 20 would start at -78
        menu.render(&mut s, Vector2::new(20.0, -40.0), Some(Vector2::new(10.0, 15.0)), false);
        let texts: Vec<(String, Vector2)> = s
            .ops()
            .iter()
            .filter_map(|op| match op {
                crate::surface::DrawOp::Text { text, position, .. } => {
                    Some((text.clone(), *position))
                }
                _ => None,
            })
            .collect();
        let at = |name: &str| texts.iter().find(|(t, _)| t == name).map(|(_, p)| *p);
        assert_eq!(at("more"), Some(Vector2::new(7.5, 18.75)));
        assert!(at("deep").is_some_and(|p| p.x >= 98.0));
    }
}
