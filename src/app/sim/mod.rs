mod forces;

use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::graph::{EdgeDirection, GraphSnapshot, NodeType};
use crate::util::stable_pair;

use forces::{
    accumulate_bias_forces, accumulate_boundary_forces, accumulate_center_force,
    accumulate_charge_forces, accumulate_collision_forces, accumulate_link_forces,
};

/// Below this energy the simulation is settled and `step` is a no-op.
const ALPHA_MIN: f32 = 0.001;
const ALPHA_INITIAL: f32 = 1.0;
/// Reheat level after a reconfigure or pin; positions are never touched.
const ALPHA_REHEAT: f32 = 0.5;
const ALPHA_REHEAT_VIEWPORT: f32 = 0.3;
/// Ticks the center node is held at the viewport center after start, so
/// the first frames are stable before physics may move it.
const CENTER_LOCK_TICKS: u32 = 30;
const MAX_SPEED: f32 = 40.0;

const HOP1_RING: f32 = 0.25;
const HOP2_RING: f32 = 0.36;
const HOP3_RING: f32 = 0.44;
const RELATED_RING: f32 = 0.48;
/// Horizontal seed/bias offset for hop-1 nodes, as a fraction of the
/// smaller viewport dimension. Outgoing right, incoming left,
/// bidirectional right but closer.
const BIAS_OFFSET: f32 = 0.30;
const BIAS_OFFSET_BIDIRECTIONAL: f32 = 0.18;

const DEEP_LINK_FACTOR: f32 = 0.8;
const BIDIRECTIONAL_LINK_FACTOR: f32 = 0.6;

/// User-tunable force parameters, live-reconfigurable through
/// [`Session::reconfigure`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSettings {
    pub charge_strength: f32,
    pub link_distance: f32,
    pub center_strength: f32,
    pub collision_radius: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            charge_strength: -200.0,
            link_distance: 80.0,
            center_strength: 0.5,
            collision_radius: 25.0,
            alpha_decay: 0.02,
            velocity_decay: 0.4,
        }
    }
}

/// Per-node mutable physics state, kept apart from the immutable
/// snapshot. World coordinates are centered on the viewport center.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimState {
    pub pos: Vec2,
    pub vel: Vec2,
    pub pinned: Option<Vec2>,
}

/// Structural facts the force passes need per node, derived once from
/// the snapshot at session start.
struct NodeProfile {
    charge_factor: f32,
    collision_factor: f32,
    bias_target_x: Option<f32>,
}

struct LinkSpec {
    a: usize,
    b: usize,
    rest_factor: f32,
    stiffness: f32,
}

enum SimCommand {
    Reconfigure(PhysicsSettings),
    Pin { index: usize, pos: Vec2 },
    Unpin { index: usize },
    SetViewport(Vec2),
}

/// One live layout session for one snapshot. Owned by the controller and
/// dropped to stop; all mutations go through the command queue, which is
/// flushed at the top of `step` so a tick never sees torn parameters.
pub struct Session {
    states: Vec<SimState>,
    index_by_id: HashMap<String, usize>,
    profiles: Vec<NodeProfile>,
    links: Vec<LinkSpec>,
    settings: PhysicsSettings,
    viewport: Vec2,
    alpha: f32,
    center_index: usize,
    center_lock_remaining: u32,
    pending: Vec<SimCommand>,
    forces: Vec<Vec2>,
}

impl Session {
    /// The caller guarantees a nonzero viewport and a snapshot with more
    /// than just the center node.
    pub fn start(snapshot: &GraphSnapshot, settings: PhysicsSettings, viewport: Vec2) -> Self {
        Self::start_preserving(&HashMap::new(), snapshot, settings, viewport)
    }

    /// Starts a session for a rebuilt snapshot, carrying position and
    /// velocity for node ids that survive the rebuild and seeding only
    /// the new ones.
    pub fn start_preserving(
        prior: &HashMap<String, SimState>,
        snapshot: &GraphSnapshot,
        settings: PhysicsSettings,
        viewport: Vec2,
    ) -> Self {
        let node_count = snapshot.nodes.len();
        let mut index_by_id = HashMap::with_capacity(node_count);
        for (index, node) in snapshot.nodes.iter().enumerate() {
            index_by_id.insert(node.id.clone(), index);
        }
        let center_index = snapshot
            .nodes
            .iter()
            .position(|node| node.is_center)
            .unwrap_or(0);
        let center_id = snapshot.nodes[center_index].id.as_str();

        let min_dim = viewport.x.min(viewport.y);

        // Direction of each center-adjacent edge, for seeding bias.
        let mut direction_by_id: HashMap<&str, EdgeDirection> = HashMap::new();
        for edge in &snapshot.edges {
            if edge.source_id == center_id {
                direction_by_id.insert(edge.target_id.as_str(), edge.direction);
            }
        }

        let profiles = snapshot
            .nodes
            .iter()
            .map(|node| {
                let charge_factor = match node.node_type {
                    NodeType::Related => 0.5,
                    NodeType::Connected if node.hop_level == 1 => 0.4,
                    _ => 1.0,
                };
                let collision_factor = if node.node_type == NodeType::Related {
                    0.8
                } else {
                    1.0
                };
                let bias_target_x = (node.hop_level == 1)
                    .then(|| direction_by_id.get(node.id.as_str()))
                    .flatten()
                    .map(|direction| bias_offset(*direction) * min_dim);

                NodeProfile {
                    charge_factor,
                    collision_factor,
                    bias_target_x,
                }
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; node_count];
        for edge in &snapshot.edges {
            if let (Some(&a), Some(&b)) = (
                index_by_id.get(&edge.source_id),
                index_by_id.get(&edge.target_id),
            ) {
                degree[a] += 1;
                degree[b] += 1;
            }
        }

        let links = snapshot
            .edges
            .iter()
            .filter_map(|edge| {
                let a = *index_by_id.get(&edge.source_id)?;
                let b = *index_by_id.get(&edge.target_id)?;
                let rest_factor = if edge.direction == EdgeDirection::Bidirectional {
                    BIDIRECTIONAL_LINK_FACTOR
                } else if a == center_index || b == center_index {
                    1.0
                } else {
                    DEEP_LINK_FACTOR
                };
                let stiffness = 1.0 / degree[a].min(degree[b]).max(1) as f32;
                Some(LinkSpec {
                    a,
                    b,
                    rest_factor,
                    stiffness,
                })
            })
            .collect::<Vec<_>>();

        let mut session = Self {
            states: vec![SimState::default(); node_count],
            index_by_id,
            profiles,
            links,
            settings,
            viewport,
            alpha: ALPHA_INITIAL,
            center_index,
            center_lock_remaining: CENTER_LOCK_TICKS,
            pending: Vec::new(),
            forces: vec![Vec2::ZERO; node_count],
        };
        session.seed(snapshot, prior, min_dim);
        session
    }

    fn seed(&mut self, snapshot: &GraphSnapshot, prior: &HashMap<String, SimState>, min_dim: f32) {
        let ring_members = |level: u8| {
            snapshot
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.hop_level == level && !node.is_center)
                .map(|(index, _)| index)
                .collect::<Vec<_>>()
        };

        for (level, ring) in [
            (1u8, HOP1_RING),
            (2, HOP2_RING),
            (3, HOP3_RING),
            (4, RELATED_RING),
        ] {
            let members = ring_members(level);
            let count = members.len().max(1) as f32;
            for (slot, index) in members.into_iter().enumerate() {
                let node = &snapshot.nodes[index];
                if let Some(prior_state) = prior.get(&node.id) {
                    self.states[index] = SimState {
                        pinned: None,
                        ..*prior_state
                    };
                    continue;
                }

                let angle = ((slot as f32 + (level as f32 * 0.5)) / count) * TAU;
                let mut pos = vec2(angle.cos(), angle.sin()) * (ring * min_dim);
                if let Some(target_x) = self.profiles[index].bias_target_x {
                    // Compress the radial x so the directional offset
                    // dominates the left/right placement from frame one.
                    pos.x = (pos.x * 0.35) + target_x;
                }
                if node.node_type == NodeType::Related {
                    let (jx, jy) = stable_pair(&node.id);
                    pos += vec2(jx, jy) * (0.05 * min_dim);
                }
                self.states[index] = SimState {
                    pos,
                    vel: Vec2::ZERO,
                    pinned: None,
                };
            }
        }

        // Center starts at the viewport center regardless of prior state;
        // the center lock holds it there for the first frames anyway.
        self.states[self.center_index] = SimState::default();
    }

    pub fn reconfigure(&mut self, settings: PhysicsSettings) {
        self.pending.push(SimCommand::Reconfigure(settings));
    }

    /// Fixes a node at `pos` (world coordinates) and excludes it from
    /// force-driven movement until `unpin`. Repeated calls move the pin.
    pub fn pin(&mut self, node_id: &str, pos: Vec2) {
        if let Some(&index) = self.index_by_id.get(node_id) {
            self.pending.push(SimCommand::Pin { index, pos });
        }
    }

    pub fn unpin(&mut self, node_id: &str) {
        if let Some(&index) = self.index_by_id.get(node_id) {
            self.pending.push(SimCommand::Unpin { index });
        }
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.pending.push(SimCommand::SetViewport(viewport));
    }

    pub fn states(&self) -> &[SimState] {
        &self.states
    }

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.index_by_id.get(node_id).copied()
    }

    /// Snapshot of per-node state for carrying across a graph rebuild.
    pub fn state_map(&self) -> HashMap<String, SimState> {
        self.index_by_id
            .iter()
            .map(|(id, &index)| (id.clone(), self.states[index]))
            .collect()
    }

    fn flush_pending(&mut self) {
        for command in self.pending.drain(..) {
            match command {
                SimCommand::Reconfigure(settings) => {
                    self.settings = settings;
                    self.alpha = self.alpha.max(ALPHA_REHEAT);
                }
                SimCommand::Pin { index, pos } => {
                    self.states[index].pinned = Some(pos);
                    self.alpha = self.alpha.max(ALPHA_REHEAT);
                }
                SimCommand::Unpin { index } => {
                    self.states[index].pinned = None;
                }
                SimCommand::SetViewport(viewport) => {
                    self.viewport = viewport;
                    self.alpha = self.alpha.max(ALPHA_REHEAT_VIEWPORT);
                }
            }
        }
    }

    /// One integration tick. Returns false once the simulation has
    /// settled (alpha below threshold).
    pub fn step(&mut self) -> bool {
        self.flush_pending();

        if self.alpha < ALPHA_MIN {
            return false;
        }

        self.forces.resize(self.states.len(), Vec2::ZERO);
        self.forces.fill(Vec2::ZERO);

        accumulate_link_forces(
            &self.states,
            &self.links,
            &self.settings,
            self.alpha,
            &mut self.forces,
        );
        accumulate_charge_forces(
            &self.states,
            &self.profiles,
            &self.settings,
            self.alpha,
            &mut self.forces,
        );
        accumulate_center_force(&self.states, &self.settings, self.alpha, &mut self.forces);
        accumulate_collision_forces(&self.states, &self.profiles, &self.settings, &mut self.forces);
        accumulate_bias_forces(&self.states, &self.profiles, self.alpha, &mut self.forces);
        accumulate_boundary_forces(&self.states, self.viewport, &mut self.forces);

        let damping = (1.0 - self.settings.velocity_decay).clamp(0.05, 0.99);
        for (index, state) in self.states.iter_mut().enumerate() {
            if let Some(pinned) = state.pinned {
                state.pos = pinned;
                state.vel = Vec2::ZERO;
                continue;
            }
            if index == self.center_index && self.center_lock_remaining > 0 {
                state.pos = Vec2::ZERO;
                state.vel = Vec2::ZERO;
                continue;
            }

            let mut velocity = (state.vel + self.forces[index]) * damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }
            state.vel = velocity;
            state.pos += velocity;
        }

        self.center_lock_remaining = self.center_lock_remaining.saturating_sub(1);
        self.alpha *= 1.0 - self.settings.alpha_decay.clamp(0.001, 0.5);
        true
    }
}

fn bias_offset(direction: EdgeDirection) -> f32 {
    match direction {
        EdgeDirection::Outgoing => BIAS_OFFSET,
        EdgeDirection::Incoming => -BIAS_OFFSET,
        EdgeDirection::Bidirectional => BIAS_OFFSET_BIDIRECTIONAL,
    }
}
