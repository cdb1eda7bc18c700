use eframe::egui::{self, Pos2, Rect, Ui};

use super::render_utils::screen_to_world;
use super::{ViewMode, ViewModel};

/// What a primary click landed on, resolved by the hit test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ClickTarget {
    Background,
    CenterNode,
    OtherNode,
}

/// The controller's response to a click, by view mode. Kept as a pure
/// mapping so the policy is testable without a pointer surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ClickOutcome {
    PromoteToFullscreen,
    Navigate,
    Ignore,
}

/// Preview clicks always promote and never navigate, so a misclick in
/// the small preview cannot leave the page. In fullscreen, any
/// non-center node navigates; the center node and the background do
/// nothing (the Close button and Esc exit).
pub(super) fn click_outcome(mode: ViewMode, target: ClickTarget) -> ClickOutcome {
    match mode {
        ViewMode::Preview => ClickOutcome::PromoteToFullscreen,
        ViewMode::Fullscreen => match target {
            ClickTarget::OtherNode => ClickOutcome::Navigate,
            ClickTarget::CenterNode | ClickTarget::Background => ClickOutcome::Ignore,
        },
    }
}

impl ViewModel {
    pub(super) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.2, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(super) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(super) fn hovered_index(
        &self,
        pointer: Option<Pos2>,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        pointer.and_then(|pointer| {
            (0..screen_positions.len())
                .filter_map(|index| {
                    let distance = screen_positions[index].distance(pointer);
                    // A slop margin keeps small hop-3 nodes clickable.
                    (distance <= screen_radii[index] + 3.0).then_some((index, distance))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(index, _distance)| index)
        })
    }
}
