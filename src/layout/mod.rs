mod force;
mod minimize;
mod scale;

use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Pos2, pos2, vec2};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::geometry::clamp_axis;
use crate::sim::{Node, NodeRole, Snapshot};

pub use force::force_layout;
pub use minimize::minimize_intersections;
pub use scale::scale_supplied;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(self) -> Pos2 {
        pos2(self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(self) -> f32 {
        self.width.min(self.height)
    }

    pub fn clamp(self, position: Pos2, margin: f32) -> Pos2 {
        pos2(
            clamp_axis(position.x, margin, self.width),
            clamp_axis(position.y, margin, self.height),
        )
    }
}

/// Evenly spaced slot on the circle of radius `min_side / 3` around the
/// canvas center, starting at angle zero.
pub fn circle_position(slot: usize, count: usize, canvas: Canvas) -> Pos2 {
    if count == 0 {
        return canvas.center();
    }

    let angle = TAU * slot as f32 / count as f32;
    canvas.center() + vec2(angle.cos(), angle.sin()) * (canvas.min_side() / 3.0)
}

/// Drawn radius of a node of the given role.
pub fn footprint_radius(role: NodeRole, base: f32) -> f32 {
    match role {
        NodeRole::Location => base,
        NodeRole::Task => base * 0.75,
        NodeRole::Driver => base * 0.6,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutStrategy {
    ForceDirected,
    Scaled,
}

impl LayoutStrategy {
    pub fn label(self) -> &'static str {
        match self {
            Self::ForceDirected => "force-directed",
            Self::Scaled => "scaled",
        }
    }
}

pub fn choose_strategy(nodes: &[Node]) -> LayoutStrategy {
    if nodes.iter().any(Node::has_non_origin_position) {
        LayoutStrategy::Scaled
    } else {
        LayoutStrategy::ForceDirected
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionedNode {
    pub id: String,
    pub label: String,
    pub role: NodeRole,
    pub center: Pos2,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionedEdge {
    pub source: usize,
    pub target: usize,
    pub weight: Option<f32>,
    pub show_weight: bool,
}

/// Canvas-space view derived from a snapshot. Never written back into it.
#[derive(Clone, Debug)]
pub struct PositionedGraph {
    pub canvas: Canvas,
    pub strategy: LayoutStrategy,
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<PositionedEdge>,
    index_by_id: HashMap<String, usize>,
}

impl PositionedGraph {
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn center_of(&self, id: &str) -> Option<Pos2> {
        self.node(id).map(|node| node.center)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Runs the full pipeline for one topology: strategy choice, the force layout
/// or the scaler, then the intersection pass.
pub fn layout_snapshot(snapshot: &Snapshot, canvas: Canvas, config: &LayoutConfig) -> PositionedGraph {
    let mut index_by_id = HashMap::with_capacity(snapshot.nodes.len());
    for (index, node) in snapshot.nodes.iter().enumerate() {
        index_by_id.entry(node.id.clone()).or_insert(index);
    }

    let mut edges = Vec::with_capacity(snapshot.edges.len());
    for edge in &snapshot.edges {
        let (Some(&source), Some(&target)) =
            (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
        else {
            debug!(source = %edge.source, target = %edge.target, "edge endpoint missing, skipped");
            continue;
        };
        edges.push(PositionedEdge {
            source,
            target,
            weight: edge.weight,
            show_weight: edge.show_weight,
        });
    }

    let strategy = choose_strategy(&snapshot.nodes);
    let pairs = edges
        .iter()
        .map(|edge| (edge.source, edge.target))
        .collect::<Vec<_>>();
    let mut centers = match strategy {
        LayoutStrategy::Scaled => scale_supplied(&snapshot.nodes, canvas, config),
        LayoutStrategy::ForceDirected => force_layout(snapshot.nodes.len(), &pairs, canvas, config),
    };
    let rounds = minimize_intersections(&mut centers, &pairs, canvas, config);
    debug!(rounds, "intersection pass finished");

    debug!(
        strategy = strategy.label(),
        nodes = snapshot.nodes.len(),
        edges = edges.len(),
        "layout computed"
    );

    let nodes = snapshot
        .nodes
        .iter()
        .zip(centers)
        .map(|(node, center)| PositionedNode {
            id: node.id.clone(),
            label: node.display_label().to_owned(),
            role: node.role,
            center,
            radius: footprint_radius(node.role, config.node_radius),
        })
        .collect();

    PositionedGraph {
        canvas,
        strategy,
        nodes,
        edges,
        index_by_id,
    }
}
