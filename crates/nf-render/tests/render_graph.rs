//! Integration tests: rendering a full graph into a Vello scene (nf-render).
//!
//! Checks that a frame drawn through `VelloSurface` leaves the canvas state
//! balanced, and that layout measured on it matches the headless surface.

use nf_core::surface::{HeadlessSurface, Surface};
use nf_graph::{FlowNode, FlowNodeConfig, FlowNote, FlowNoteConfig, NodeFlowGraph, PortConfig, Vector2};
use nf_render::VelloSurface;
use pretty_assertions::assert_eq;

fn sample_graph() -> NodeFlowGraph {
    let mut graph = NodeFlowGraph::from_json(r#"{ "minimap": {} }"#).expect("valid config");
    let a = graph.add_node(
        FlowNode::new(FlowNodeConfig {
            title: Some("Source".into()),
            outputs: vec![PortConfig::new("value", "float")],
            ..Default::default()
        })
        .expect("node"),
    );
    let b = graph.add_node(
        FlowNode::new(FlowNodeConfig {
            title: Some("Sink".into()),
            position: Vector2::new(300.0, 40.0),
            inputs: vec![PortConfig::new("value", "float")],
            ..Default::default()
        })
        .expect("node"),
    );
    graph.connect_nodes(a, 0, b, 0).expect("connect");
    graph.add_note(FlowNote::new(FlowNoteConfig {
        text: Some("# Notes\n\n- one\n- two\n\n```\ncode\n```".into()),
        position: Vector2::new(0.0, 300.0),
        ..Default::default()
    }));
    graph
}

#[test]
fn frame_leaves_state_balanced() {
    let mut graph = sample_graph();
    let mut surface = VelloSurface::new(1280.0, 720.0);

    graph.mouse_move(Vector2::new(75.0, 20.0));
    graph.render(&mut surface);
    graph.open_context_menu(Vector2::new(600.0, 300.0));
    graph.render(&mut surface);

    assert_eq!(surface.save_depth(), 0);
    assert_eq!(surface.clip_depth(), 0);
}

#[test]
fn layout_matches_headless_surface() {
    let mut vello = VelloSurface::new(1280.0, 720.0);
    let mut headless = HeadlessSurface::new(1280.0, 720.0);
    let camera = nf_core::Camera::default();

    let mut a = FlowNode::new(FlowNodeConfig::titled("Measure me")).expect("node");
    let mut b = FlowNode::new(FlowNodeConfig::titled("Measure me")).expect("node");
    assert_eq!(
        a.calculate_bounds(&mut vello, &camera),
        b.calculate_bounds(&mut headless, &camera)
    );
    assert_eq!(vello.measure_text("abc"), headless.measure_text("abc"));
}

#[test]
fn clear_starts_a_fresh_frame() {
    let mut graph = sample_graph();
    let mut surface = VelloSurface::new(1280.0, 720.0);
    graph.render(&mut surface);
    surface.clear();
    assert_eq!(surface.save_depth(), 0);
    graph.render(&mut surface);
    assert_eq!(surface.save_depth(), 0);
}
