//! Integration tests: combining partial context menus from several sources.

use nf_core::menu::{ContextMenu, ContextMenuConfig, ContextMenuItemConfig, combine_context_menus};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rendered_order(menu: &ContextMenu<&'static str>) -> Vec<Vec<String>> {
    menu.groups()
        .iter()
        .map(|g| g.iter().map(|e| menu.entry_name(*e).to_string()).collect())
        .collect()
}

#[test]
fn groups_keep_first_seen_order_across_sources() {
    let a = ContextMenuConfig::default().item(ContextMenuItemConfig::new("X", "x"));
    let b = ContextMenuConfig::default().item(ContextMenuItemConfig::new("Y", "y").grouped("g"));
    let c = ContextMenuConfig::default().item(ContextMenuItemConfig::new("Z", "z").grouped("g"));

    let combined = combine_context_menus([combine_context_menus([a, b]), c]);
    let menu = ContextMenu::new(combined);

    assert_eq!(rendered_order(&menu), vec![vec!["X"], vec!["Y", "Z"]]);
}

#[test]
fn nested_menus_survive_combination() {
    let nodes = ContextMenuConfig::default().sub_menu(
        ContextMenuConfig::named("Organize")
            .item(ContextMenuItemConfig::new("All Nodes", "all"))
            .item(ContextMenuItemConfig::new("Selected Nodes", "selected")),
    );
    let graph = ContextMenuConfig::default().item(ContextMenuItemConfig::new("Reset View", "reset"));

    let menu = ContextMenu::new(combine_context_menus([graph, nodes]));
    assert_eq!(rendered_order(&menu), vec![vec!["Reset View", "Organize"]]);
    assert_eq!(menu.sub_menus()[0].items().len(), 2);
    assert_eq!(menu.sub_menus()[0].items()[1].action(), Some(&"selected"));
}

#[test]
fn config_loads_from_json() {
    init_logging();
    let json = r#"{
        "items": [{ "name": "Hello", "group": "greet", "action": "hi" }],
        "sub_menus": [{ "name": "More" }]
    }"#;
    let config: ContextMenuConfig<String> = serde_json::from_str(json).unwrap();
    let menu = ContextMenu::new(config);
    assert_eq!(menu.entry_name(menu.groups()[0][0]), "More");
    assert_eq!(menu.items()[0].action().map(String::as_str), Some("hi"));
}
