use eframe::egui::{Vec2, vec2};

use super::{LinkSpec, NodeProfile, PhysicsSettings, SimState};

const CHARGE_SOFTENING: f32 = 100.0;
const COLLISION_STRENGTH: f32 = 0.5;
const CENTER_PULL_SCALE: f32 = 0.1;
const BIAS_FRACTION: f32 = 0.08;
const BOUNDARY_PADDING: f32 = 28.0;
const BOUNDARY_STRENGTH: f32 = 0.12;

fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

/// Pulls each link's endpoints toward its rest length, split evenly
/// between the two endpoints.
pub(super) fn accumulate_link_forces(
    states: &[SimState],
    links: &[LinkSpec],
    settings: &PhysicsSettings,
    alpha: f32,
    forces: &mut [Vec2],
) {
    for link in links {
        let delta = states[link.b].pos - states[link.a].pos;
        let distance = delta.length();
        let (distance, delta) = if distance > 0.0001 {
            (distance, delta)
        } else {
            (1.0, fallback_direction(link.a, link.b))
        };

        let rest = settings.link_distance * link.rest_factor;
        let magnitude = ((distance - rest) / distance) * link.stiffness * alpha;
        let adjust = delta * magnitude * 0.5;
        forces[link.a] += adjust;
        forces[link.b] -= adjust;
    }
}

/// Pairwise repulsion. Related nodes repel at half strength so they
/// drift loosely; hop-1 nodes at 40% so the directional bias is not
/// overwhelmed. Graphs here are tens of nodes, so O(n^2) is fine.
pub(super) fn accumulate_charge_forces(
    states: &[SimState],
    profiles: &[NodeProfile],
    settings: &PhysicsSettings,
    alpha: f32,
    forces: &mut [Vec2],
) {
    let node_count = states.len();
    for i in 0..node_count {
        for j in (i + 1)..node_count {
            let delta = states[i].pos - states[j].pos;
            let mut distance_sq = delta.length_sq();
            let delta = if distance_sq > 0.0001 {
                delta
            } else {
                distance_sq = 1.0;
                fallback_direction(i, j)
            };

            let shared = alpha / (distance_sq + CHARGE_SOFTENING);
            forces[i] += delta * (-settings.charge_strength * profiles[j].charge_factor * shared);
            forces[j] -= delta * (-settings.charge_strength * profiles[i].charge_factor * shared);
        }
    }
}

pub(super) fn accumulate_center_force(
    states: &[SimState],
    settings: &PhysicsSettings,
    alpha: f32,
    forces: &mut [Vec2],
) {
    let pull = settings.center_strength * CENTER_PULL_SCALE * alpha;
    for (state, force) in states.iter().zip(forces.iter_mut()) {
        *force -= state.pos * pull;
    }
}

/// Keeps node centers a minimum distance apart. Not scaled by alpha:
/// overlap is corrected even late in the cooldown.
pub(super) fn accumulate_collision_forces(
    states: &[SimState],
    profiles: &[NodeProfile],
    settings: &PhysicsSettings,
    forces: &mut [Vec2],
) {
    let node_count = states.len();
    for i in 0..node_count {
        for j in (i + 1)..node_count {
            let delta = states[i].pos - states[j].pos;
            let distance = delta.length();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                fallback_direction(i, j)
            };

            let min_distance = settings.collision_radius
                * (profiles[i].collision_factor + profiles[j].collision_factor)
                * 0.5;
            if distance < min_distance {
                let overlap_push = (min_distance - distance) * COLLISION_STRENGTH;
                forces[i] += direction * overlap_push;
                forces[j] -= direction * overlap_push;
            }
        }
    }
}

/// Hop-1 nodes are nudged toward their classification-determined x
/// offset every tick, keeping the outgoing-right / incoming-left reading
/// stable under repulsion instead of only applying it at seed time.
pub(super) fn accumulate_bias_forces(
    states: &[SimState],
    profiles: &[NodeProfile],
    alpha: f32,
    forces: &mut [Vec2],
) {
    for ((state, profile), force) in states.iter().zip(profiles.iter()).zip(forces.iter_mut()) {
        if let Some(target_x) = profile.bias_target_x {
            force.x += (target_x - state.pos.x) * BIAS_FRACTION * alpha;
        }
    }
}

/// Soft containment near the viewport edges; a correction back inward,
/// not a hard clamp.
pub(super) fn accumulate_boundary_forces(states: &[SimState], viewport: Vec2, forces: &mut [Vec2]) {
    let half = viewport * 0.5;
    let limit_x = (half.x - BOUNDARY_PADDING).max(0.0);
    let limit_y = (half.y - BOUNDARY_PADDING).max(0.0);

    for (state, force) in states.iter().zip(forces.iter_mut()) {
        if state.pos.x < -limit_x {
            force.x += (-limit_x - state.pos.x) * BOUNDARY_STRENGTH;
        } else if state.pos.x > limit_x {
            force.x += (limit_x - state.pos.x) * BOUNDARY_STRENGTH;
        }

        if state.pos.y < -limit_y {
            force.y += (-limit_y - state.pos.y) * BOUNDARY_STRENGTH;
        } else if state.pos.y > limit_y {
            force.y += (limit_y - state.pos.y) * BOUNDARY_STRENGTH;
        }
    }
}
