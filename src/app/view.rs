use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};

use crate::graph::EdgeDirection;
use crate::util::{hover_label, truncate_label};

use super::interaction::{ClickOutcome, ClickTarget, click_outcome};
use super::render_utils::{
    circle_visible, dim_color, draw_arrowhead, draw_background, edge_color, node_color,
    node_radius, screen_to_world, world_to_screen,
};
use super::{ViewMode, ViewModel};

const LABEL_MAX_CHARS: usize = 26;

impl ViewModel {
    /// Draws the graph into the available space and runs one simulation
    /// tick. Returns the page id to navigate to, if a click asked for
    /// that.
    pub(super) fn draw_graph(&mut self, ui: &mut Ui, interactive: bool) -> Option<String> {
        let sense = if interactive {
            Sense::click_and_drag()
        } else {
            Sense::click()
        };
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), sense);
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        if self.snapshot.is_empty_connections() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No connections yet",
                FontId::proportional(14.0),
                Color32::from_gray(170),
            );
            self.handle_click(&response, None);
            return None;
        }

        // A surface that has not been laid out yet reports a degenerate
        // size; starting a simulation against it would be meaningless,
        // so defer until a real size arrives.
        if rect.width() < 8.0 || rect.height() < 8.0 {
            return None;
        }
        self.ensure_session(rect.size());

        if interactive {
            self.handle_graph_zoom(ui, rect, &response);
            self.handle_graph_pan(&response);
        }

        let moving = {
            let Some(session) = self.session.as_mut() else {
                return None;
            };
            if (self.last_surface - rect.size()).length() > 1.0 {
                session.set_viewport(rect.size());
                self.last_surface = rect.size();
            }
            session.step()
        };
        if moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        let (screen_positions, screen_radii) = self.screen_space(rect);

        // Edges first so nodes paint over them.
        for edge in &self.snapshot.edges {
            let Some(source) = self.node_position(&edge.source_id, &screen_positions) else {
                continue;
            };
            let Some(target) = self.node_position(&edge.target_id, &screen_positions) else {
                continue;
            };

            let color = edge_color(edge.direction);
            let stroke = Stroke::new((1.2 * self.zoom.sqrt()).clamp(0.7, 2.6), color);
            painter.line_segment([source, target], stroke);

            let target_index = self.node_lookup(&edge.target_id);
            let source_index = self.node_lookup(&edge.source_id);
            match edge.direction {
                EdgeDirection::Outgoing => {
                    if let Some(index) = target_index {
                        draw_arrowhead(&painter, source, target, screen_radii[index], stroke);
                    }
                }
                EdgeDirection::Incoming => {
                    if let Some(index) = source_index {
                        draw_arrowhead(&painter, target, source, screen_radii[index], stroke);
                    }
                }
                EdgeDirection::Bidirectional => {
                    if let Some(index) = target_index {
                        draw_arrowhead(&painter, source, target, screen_radii[index], stroke);
                    }
                    if let Some(index) = source_index {
                        draw_arrowhead(&painter, target, source, screen_radii[index], stroke);
                    }
                }
            }
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer));
        let hovered = self.hovered_index(pointer, &screen_positions, &screen_radii);

        if interactive {
            if hovered.is_some() || self.dragging.is_some() {
                ui.output_mut(|output| {
                    output.cursor_icon = if self.dragging.is_some() {
                        egui::CursorIcon::Grabbing
                    } else {
                        egui::CursorIcon::PointingHand
                    };
                });
            }
            self.handle_drag(rect, &response, pointer, hovered);
        }

        for (index, node) in self.snapshot.nodes.iter().enumerate() {
            let position = screen_positions[index];
            let radius = screen_radii[index];
            if !circle_visible(rect, position, radius) {
                continue;
            }

            let base_color = node_color(node);
            let color = if node.hop_level >= 3 && hovered != Some(index) {
                dim_color(base_color, 0.8)
            } else {
                base_color
            };
            painter.circle_filled(position, radius, color);
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190)),
            );
            if hovered == Some(index) {
                painter.circle_stroke(
                    position,
                    radius + 3.0,
                    Stroke::new(1.4, Color32::from_rgba_unmultiplied(245, 206, 93, 180)),
                );
            }

            let show_label = node.is_center
                || hovered == Some(index)
                || (interactive && self.zoom > 0.9 && node.hop_level <= 1);
            if show_label {
                // The hover label carries the author so a page can be
                // told apart from a same-titled one before navigating.
                let label = if hovered == Some(index) {
                    hover_label(&node.title, node.username.as_deref(), LABEL_MAX_CHARS)
                } else {
                    truncate_label(&node.title, LABEL_MAX_CHARS)
                };
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    label,
                    FontId::proportional(if node.is_center { 13.0 } else { 12.0 }),
                    Color32::from_gray(238),
                );
            }
        }

        self.handle_click(&response, hovered)
    }

    fn screen_space(&self, rect: egui::Rect) -> (Vec<Pos2>, Vec<f32>) {
        let states = self
            .session
            .as_ref()
            .map(|session| session.states())
            .unwrap_or(&[]);

        let mut screen_positions = Vec::with_capacity(self.snapshot.nodes.len());
        let mut screen_radii = Vec::with_capacity(self.snapshot.nodes.len());
        for (node, state) in self.snapshot.nodes.iter().zip(states.iter()) {
            screen_positions.push(world_to_screen(rect, self.pan, self.zoom, state.pos));
            screen_radii.push((node_radius(node) * self.zoom.powf(0.5)).clamp(3.0, 30.0));
        }
        (screen_positions, screen_radii)
    }

    fn node_lookup(&self, node_id: &str) -> Option<usize> {
        self.session
            .as_ref()
            .and_then(|session| session.node_index(node_id))
    }

    fn node_position(&self, node_id: &str, screen_positions: &[Pos2]) -> Option<Pos2> {
        self.node_lookup(node_id)
            .and_then(|index| screen_positions.get(index).copied())
    }

    fn handle_drag(
        &mut self,
        rect: egui::Rect,
        response: &egui::Response,
        pointer: Option<Pos2>,
        hovered: Option<usize>,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(index) = hovered
        {
            self.dragging = Some(index);
            // Pin at the node's current position first; drag moves then
            // update the pinned coordinates.
            let node_id = self.snapshot.nodes[index].id.clone();
            if let Some(session) = self.session.as_mut() {
                let held = session.states()[index].pos;
                session.pin(&node_id, held);
            }
        }

        if let Some(index) = self.dragging {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(pointer) = pointer
            {
                let world = screen_to_world(rect, self.pan, self.zoom, pointer);
                let node_id = self.snapshot.nodes[index].id.clone();
                if let Some(session) = self.session.as_mut() {
                    session.pin(&node_id, world);
                }
            }

            if response.drag_stopped() {
                let node_id = self.snapshot.nodes[index].id.clone();
                if let Some(session) = self.session.as_mut() {
                    session.unpin(&node_id);
                }
                self.dragging = None;
            }
        }
    }

    fn handle_click(&mut self, response: &egui::Response, hovered: Option<usize>) -> Option<String> {
        if !response.clicked_by(egui::PointerButton::Primary) || self.dragging.is_some() {
            return None;
        }

        let target = match hovered {
            None => ClickTarget::Background,
            Some(index) if self.snapshot.nodes[index].is_center => ClickTarget::CenterNode,
            Some(_) => ClickTarget::OtherNode,
        };

        match click_outcome(self.mode, target) {
            ClickOutcome::PromoteToFullscreen => {
                self.set_mode(ViewMode::Fullscreen);
                None
            }
            ClickOutcome::Navigate => hovered.map(|index| self.snapshot.nodes[index].id.clone()),
            ClickOutcome::Ignore => None,
        }
    }
}
