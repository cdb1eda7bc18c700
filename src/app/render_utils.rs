use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::graph::{EdgeDirection, GraphNode, NodeType};

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Dot grid that pans with the graph, so dragging the view reads as
/// moving over a surface rather than the nodes sliding on a void.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(21, 24, 31));

    let step = (64.0 * zoom.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + pan;
    let dot = Color32::from_rgba_unmultiplied(86, 96, 110, 95);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
        while y < rect.bottom() {
            painter.circle_filled(Pos2::new(x, y), 1.1, dot);
            y += step;
        }
        x += step;
    }
}

pub(super) fn node_radius(node: &GraphNode) -> f32 {
    match node.node_type {
        NodeType::Center => 16.0,
        NodeType::Related => 7.0,
        NodeType::Connected => match node.hop_level {
            1 => 11.0,
            2 => 8.0,
            _ => 6.5,
        },
    }
}

pub(super) fn node_color(node: &GraphNode) -> Color32 {
    match node.node_type {
        NodeType::Center => Color32::from_rgb(245, 206, 93),
        NodeType::Related => Color32::from_rgb(128, 128, 138),
        NodeType::Connected => match node.hop_level {
            1 => Color32::from_rgb(106, 198, 255),
            2 => Color32::from_rgb(84, 146, 196),
            _ => Color32::from_rgb(64, 108, 150),
        },
    }
}

pub(super) fn edge_color(direction: EdgeDirection) -> Color32 {
    match direction {
        EdgeDirection::Outgoing => Color32::from_rgb(235, 142, 92),
        EdgeDirection::Incoming => Color32::from_rgb(110, 172, 230),
        EdgeDirection::Bidirectional => Color32::from_rgb(246, 206, 104),
    }
}

/// Two short segments forming an arrowhead just outside the target
/// node's circle, pointing along the edge.
pub(super) fn draw_arrowhead(
    painter: &Painter,
    from: Pos2,
    to: Pos2,
    target_radius: f32,
    stroke: Stroke,
) {
    let delta = to - from;
    let length = delta.length();
    if length <= target_radius + 2.0 {
        return;
    }
    let direction = delta / length;
    let tip = to - direction * (target_radius + 2.0);
    let side = vec2(-direction.y, direction.x);
    let back = tip - direction * 7.0;

    painter.line_segment([tip, back + side * 4.0], stroke);
    painter.line_segment([tip, back - side * 4.0], stroke);
}
