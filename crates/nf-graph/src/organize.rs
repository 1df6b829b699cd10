//! Auto layout: nodes are placed in columns by their depth along the
//! connections between them.
//!
//! Every candidate node gets a vector of relative depths: upstream nodes at
//! negative hop distances, downstream nodes at positive ones. Nodes whose
//! vectors span the most columns claim their neighbourhood first. Column 0
//! holds the most upstream nodes and is placed rightmost.

use crate::connection::Connection;
use crate::node::NodeMap;
use nf_core::surface::Surface;
use nf_core::{Camera, NodeId, Vector2};
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Reversed;

const COLUMN_SPACING: f64 = 100.0;
const ROW_SPACING: f64 = 50.0;

struct Entry {
    node: usize,
    min: i64,
    span: i64,
}

#[derive(Default)]
struct Column {
    nodes: Vec<usize>,
    width: f64,
}

/// Lay out `subset` (all nodes when `None`). A subset of fewer than two
/// nodes is left untouched. Returns the number of nodes moved.
pub fn organize(
    surface: &mut dyn Surface,
    nodes: &mut NodeMap,
    connections: &[Connection],
    subset: Option<&[NodeId]>,
) -> usize {
    let candidates: Vec<NodeId> = match subset {
        Some(ids) if ids.len() < 2 => return 0,
        Some(ids) => nodes.keys().copied().filter(|id| ids.contains(id)).collect(),
        None => nodes.keys().copied().collect(),
    };
    if candidates.is_empty() {
        return 0;
    }

    // Edges run output node -> input node, restricted to candidates.
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(candidates.len(), connections.len());
    let indices: Vec<NodeIndex> = (0..candidates.len()).map(|i| graph.add_node(i)).collect();
    let lookup = |id: NodeId| candidates.iter().position(|c| *c == id);
    for connection in connections {
        let (Some(input), Some(output)) = (connection.input(), connection.output()) else {
            continue;
        };
        if let (Some(to), Some(from)) = (lookup(input.node), lookup(output.node)) {
            graph.update_edge(indices[from], indices[to], ());
        }
    }

    let relative: Vec<Vec<Option<i64>>> = indices
        .iter()
        .map(|&start| {
            let mut depths = vec![None; candidates.len()];
            for (n, d) in dijkstra(Reversed(&graph), start, None, |_| 1i64) {
                depths[graph[n]] = Some(-d);
            }
            for (n, d) in dijkstra(&graph, start, None, |_| 1i64) {
                depths[graph[n]] = Some(d);
            }
            depths[graph[start]] = Some(0);
            depths
        })
        .collect();

    let mut entries: Vec<Entry> = relative
        .iter()
        .enumerate()
        .map(|(node, depths)| {
            let (min, max) = depths
                .iter()
                .flatten()
                .fold((0, 0), |(lo, hi), &d| (lo.min(d), hi.max(d)));
            Entry {
                node,
                min,
                span: max - min,
            }
        })
        .collect();
    entries.sort_by(|a, b| b.span.cmp(&a.span));

    let camera = Camera::default();
    let mut bounds = Vec::with_capacity(candidates.len());
    for id in &candidates {
        let size = match nodes.get_mut(id) {
            Some(node) => node.calculate_bounds(surface, &camera).size,
            None => Vector2::ZERO,
        };
        bounds.push(size);
    }

    let column_count = entries.first().map_or(1, |e| e.span as usize + 1);
    let mut columns: Vec<Column> = (0..column_count).map(|_| Column::default()).collect();
    let mut claimed = vec![false; candidates.len()];

    for entry in &entries {
        if claimed[entry.node] {
            continue;
        }
        for (p, depth) in relative[entry.node].iter().enumerate() {
            let Some(depth) = depth else {
                continue;
            };
            if claimed[p] {
                continue;
            }
            let column = &mut columns[(depth - entry.min) as usize];
            column.nodes.push(p);
            column.width = column.width.max(bounds[p].x);
            claimed[p] = true;
        }
    }

    let total_width: f64 = columns.iter().map(|c| c.width).sum();
    let origin = total_width + columns.len() as f64 * COLUMN_SPACING;
    let mut x_offset = 0.0;
    let mut moved = 0;
    for column in &columns {
        x_offset -= COLUMN_SPACING + column.width;
        let mut y_offset = 0.0;
        for &p in &column.nodes {
            if let Some(node) = nodes.get_mut(&candidates[p]) {
                node.set_position(Vector2::new(x_offset + origin, y_offset));
                moved += 1;
            }
            y_offset += bounds[p].y + ROW_SPACING;
        }
    }

    log::debug!("organized {moved} nodes into {} columns", columns.len());
    moved
}
