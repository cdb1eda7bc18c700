mod build;

pub use build::{BuildInput, build};

/// Classification of a node within one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Center,
    Connected,
    /// Content-similar annotation; never an edge endpoint.
    Related,
}

/// Edge direction relative to the page closer to the center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `target_id` links to `source_id`.
    Incoming,
    /// `source_id` links to `target_id`.
    Outgoing,
    /// Links exist both ways.
    Bidirectional,
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub username: Option<String>,
    pub hop_level: u8,
    pub node_type: NodeType,
    pub is_center: bool,
}

#[derive(Clone, Debug)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub direction: EdgeDirection,
}

/// Immutable node/edge structure for one (page, connection-data) pair.
/// Mutable physics state lives elsewhere, keyed by node id, so a rebuild
/// never has to discard simulation state for surviving nodes.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// True when the snapshot is just the center node. The caller renders
    /// an explicit "no connections" state and never starts a simulation.
    pub fn is_empty_connections(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn center(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.is_center)
    }
}
