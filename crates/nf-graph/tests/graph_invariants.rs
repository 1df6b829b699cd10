//! Integration tests: structural invariants of the node graph (nf-graph).
//!
//! Drives `NodeFlowGraph` through its public API only and checks the
//! connection bookkeeping stays consistent across connect, replace and
//! delete, and that organize produces a readable column layout.

use nf_core::surface::HeadlessSurface;
use nf_graph::{FlowNode, FlowNodeConfig, GraphAction, NodeFlowGraph, NodeId, PortConfig, Vector2};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn add(graph: &mut NodeFlowGraph, inputs: Vec<PortConfig>, outputs: Vec<PortConfig>) -> NodeId {
    let node = FlowNode::new(FlowNodeConfig {
        inputs,
        outputs,
        ..Default::default()
    })
    .expect("valid node");
    graph.add_node(node)
}

fn pass_through(graph: &mut NodeFlowGraph) -> NodeId {
    add(
        graph,
        vec![PortConfig::new("in", "float")],
        vec![PortConfig::new("out", "float")],
    )
}

/// Every port lists exactly the connections that reference it.
fn assert_ports_consistent(graph: &NodeFlowGraph) {
    let nodes = graph.nodes();
    for connection in nodes.connections() {
        if let Some(input) = connection.input() {
            let port = nodes.node(input.node).and_then(|n| n.input_port(input.port)).expect("input port");
            assert!(port.connections().contains(&connection.id()));
        }
        if let Some(output) = connection.output() {
            let port = nodes.node(output.node).and_then(|n| n.output_port(output.port)).expect("output port");
            assert!(port.connections().contains(&connection.id()));
        }
    }
    for node in nodes.nodes().values() {
        for port in node.inputs().iter().chain(node.outputs()) {
            for id in port.connections() {
                assert!(nodes.connection(*id).is_some(), "port holds stale connection {id:?}");
            }
        }
    }
}

// ─── Arity ──────────────────────────────────────────────────────────────

#[test]
fn single_input_holds_at_most_one_connection() {
    init_logging();
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    let c = pass_through(&mut graph);

    graph.connect_nodes(a, 0, c, 0).expect("connect a");
    let second = graph.connect_nodes(b, 0, c, 0).expect("connect b").expect("accepted");

    let input = graph.nodes().node(c).and_then(|n| n.input_port(0)).expect("port");
    assert_eq!(input.connections(), &[second]);
    assert_eq!(graph.connected_input_nodes(c), vec![b]);
    assert!(graph.nodes().node(a).and_then(|n| n.output_port(0)).expect("port").connections().is_empty());
    assert_ports_consistent(&graph);
}

#[test]
fn array_input_accepts_many_connections() {
    init_logging();
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    let sink = add(&mut graph, vec![PortConfig::new("all", "float").array()], vec![]);

    graph.connect_nodes(a, 0, sink, 0).expect("connect a");
    graph.connect_nodes(b, 0, sink, 0).expect("connect b");

    assert_eq!(graph.connected_input_nodes(sink), vec![a, b]);
    assert_ports_consistent(&graph);
}

#[test]
fn outputs_fan_out() {
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    let c = pass_through(&mut graph);

    graph.connect_nodes(a, 0, b, 0).expect("connect b");
    graph.connect_nodes(a, 0, c, 0).expect("connect c");

    assert_eq!(graph.connected_output_nodes(a), vec![b, c]);
    assert_ports_consistent(&graph);
}

// ─── Types ──────────────────────────────────────────────────────────────

#[test]
fn mismatched_types_leave_graph_unchanged() {
    init_logging();
    let mut graph = NodeFlowGraph::default();
    let text = add(&mut graph, vec![], vec![PortConfig::new("out", "string")]);
    let number = pass_through(&mut graph);

    assert_eq!(graph.connect_nodes(text, 0, number, 0).expect("no error"), None);
    assert!(graph.nodes().connections().is_empty());
}

#[test]
fn out_of_range_ports_are_errors() {
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    assert!(graph.connect_nodes(a, 3, b, 0).is_err());
    assert!(graph.connect_nodes(a, 0, b, 3).is_err());
    assert!(graph.nodes().connections().is_empty());
}

// ─── Deletion ───────────────────────────────────────────────────────────

#[test]
fn deleting_a_node_removes_its_connections() {
    init_logging();
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    let c = pass_through(&mut graph);
    graph.connect_nodes(a, 0, b, 0).expect("a -> b");
    graph.connect_nodes(b, 0, c, 0).expect("b -> c");

    graph.remove_node(b).expect("remove b");

    assert!(graph.nodes().connections().is_empty());
    assert!(graph.connected_output_nodes(a).is_empty());
    assert!(graph.connected_input_nodes(c).is_empty());
    assert_ports_consistent(&graph);
}

#[test]
fn clear_connections_keeps_the_node() {
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    graph.connect_nodes(a, 0, b, 0).expect("a -> b");

    graph.execute(&GraphAction::ClearConnections(b), Vector2::ZERO);

    assert!(graph.nodes().node(b).is_some());
    assert!(graph.nodes().connections().is_empty());
    assert_ports_consistent(&graph);
}

#[test]
fn removing_unknown_node_is_an_error() {
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    graph.remove_node(a).expect("first removal");
    assert!(graph.remove_node(a).is_err());
}

// ─── Organize ───────────────────────────────────────────────────────────

#[test]
fn organize_places_chain_in_adjacent_columns() {
    init_logging();
    let mut graph = NodeFlowGraph::default();
    let a = pass_through(&mut graph);
    let b = pass_through(&mut graph);
    let c = pass_through(&mut graph);
    graph.connect_nodes(a, 0, b, 0).expect("a -> b");
    graph.connect_nodes(b, 0, c, 0).expect("b -> c");

    let mut surface = HeadlessSurface::default();
    graph.organize(&mut surface);

    let x = |id: NodeId| graph.nodes().node(id).map(|n| n.position().x).expect("node");
    assert_eq!(x(a) - x(b), 250.0);
    assert_eq!(x(b) - x(c), 250.0);
}

#[test]
fn organize_stacks_siblings_without_overlap() {
    let mut graph = NodeFlowGraph::default();
    let root = pass_through(&mut graph);
    let left = pass_through(&mut graph);
    let right = pass_through(&mut graph);
    graph.connect_nodes(root, 0, left, 0).expect("root -> left");
    graph.connect_nodes(root, 0, right, 0).expect("root -> right");

    let mut surface = HeadlessSurface::default();
    graph.organize(&mut surface);
    let camera = nf_core::Camera::default();

    let mut boxes: Vec<_> = [left, right]
        .iter()
        .map(|id| {
            graph
                .nodes_mut()
                .node_mut(*id)
                .map(|n| n.calculate_bounds(&mut surface, &camera))
                .expect("node")
        })
        .collect();
    boxes.sort_by(|p, q| p.pos.y.total_cmp(&q.pos.y));

    assert_eq!(boxes[0].pos.x, boxes[1].pos.x);
    assert!(boxes[0].bottom() <= boxes[1].pos.y);
}
