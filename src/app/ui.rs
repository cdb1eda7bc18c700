use eframe::egui::{self, Ui};

use super::ViewModel;
use super::sim::PhysicsSettings;

impl ViewModel {
    /// Physics sliders, forwarded to the engine as one reconfigure per
    /// changed frame. Returns true when any value changed.
    pub(super) fn settings_panel(&mut self, ui: &mut Ui) -> bool {
        let mut changed = false;

        ui.heading("Physics");
        ui.add_space(4.0);

        egui::Grid::new("physics-settings")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label("Charge");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.charge_strength,
                        -600.0..=-20.0,
                    ))
                    .changed();
                ui.end_row();

                ui.label("Link distance");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.link_distance,
                        30.0..=200.0,
                    ))
                    .changed();
                ui.end_row();

                ui.label("Center pull");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.center_strength,
                        0.0..=1.5,
                    ))
                    .changed();
                ui.end_row();

                ui.label("Collision radius");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.collision_radius,
                        5.0..=60.0,
                    ))
                    .changed();
                ui.end_row();

                ui.label("Alpha decay");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.alpha_decay,
                        0.005..=0.1,
                    ))
                    .changed();
                ui.end_row();

                ui.label("Velocity decay");
                changed |= ui
                    .add(egui::Slider::new(
                        &mut self.settings.velocity_decay,
                        0.1..=0.9,
                    ))
                    .changed();
                ui.end_row();
            });

        ui.add_space(8.0);
        if ui.button("Reset to defaults").clicked() {
            self.reset_settings();
        } else if changed {
            self.apply_settings();
        }

        ui.add_space(12.0);
        ui.separator();
        ui.label(format!(
            "{} pages, {} links",
            self.snapshot.nodes.len(),
            self.snapshot.edges.len()
        ));

        changed
    }

    pub(super) fn apply_settings(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reconfigure(self.settings);
        }
    }

    pub(super) fn reset_settings(&mut self) {
        self.settings = PhysicsSettings::default();
        self.apply_settings();
    }
}
