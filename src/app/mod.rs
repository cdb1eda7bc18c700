use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use eframe::egui::{self, Context, Vec2, vec2};

use crate::data::PageStore;
use crate::data::fetch::{FetchResult, spawn_fetch};
use crate::graph::{self, BuildInput, GraphSnapshot};

mod interaction;
mod render_utils;
mod sim;
mod ui;
mod view;

use sim::{PhysicsSettings, Session, SimState};

const PREVIEW_HEIGHT: f32 = 280.0;

pub struct LinkGraphApp {
    store: Arc<PageStore>,
    viewer: Option<String>,
    page_id: String,
    /// Bumped on every navigation; fetch results carrying an older
    /// generation are stale and dropped.
    generation: u64,
    fetch_rx: Option<Receiver<FetchResult>>,
    state: AppState,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ViewMode {
    Preview,
    Fullscreen,
}

/// Everything worth keeping when the snapshot is rebuilt for a new
/// center page: user-tuned physics, view state, and per-node simulation
/// state for ids that survive the rebuild.
struct Carryover {
    settings: PhysicsSettings,
    mode: ViewMode,
    states: HashMap<String, SimState>,
}

pub(crate) struct ViewModel {
    snapshot: GraphSnapshot,
    session: Option<Session>,
    carry_states: HashMap<String, SimState>,
    settings: PhysicsSettings,
    mode: ViewMode,
    pan: Vec2,
    zoom: f32,
    dragging: Option<usize>,
    last_surface: Vec2,
}

impl LinkGraphApp {
    pub fn new(store: Arc<PageStore>, page_id: String, viewer: Option<String>) -> Self {
        let generation = 0;
        let fetch_rx = Some(spawn_fetch(
            Arc::clone(&store),
            page_id.clone(),
            viewer.clone(),
            generation,
        ));

        Self {
            store,
            viewer,
            page_id,
            generation,
            fetch_rx,
            state: AppState::Loading,
        }
    }

    fn start_fetch(&mut self) {
        self.generation += 1;
        self.fetch_rx = Some(spawn_fetch(
            Arc::clone(&self.store),
            self.page_id.clone(),
            self.viewer.clone(),
            self.generation,
        ));
    }

    fn navigate_to(&mut self, target: String) {
        log::debug!("navigating to page {target}");
        self.page_id = target;
        self.start_fetch();
    }

    fn apply_fetch_result(&mut self, result: FetchResult) {
        if result.generation != self.generation {
            log::debug!(
                "discarding stale fetch result for {} (generation {})",
                result.page_id,
                result.generation
            );
            return;
        }

        match result.outcome {
            Ok(data) => {
                let snapshot = graph::build(BuildInput {
                    center_id: &data.center_id,
                    center_title: &data.center_title,
                    incoming: &data.incoming,
                    outgoing: &data.outgoing,
                    second_hop: &data.hops.second_hop,
                    third_hop: &data.hops.third_hop,
                    related: &data.related,
                    viewer_username: self.viewer.as_deref(),
                });
                log::debug!(
                    "built snapshot for {}: {} nodes, {} edges",
                    data.center_id,
                    snapshot.nodes.len(),
                    snapshot.edges.len()
                );

                let carryover = match &mut self.state {
                    AppState::Ready(model) => Some(model.carryover()),
                    _ => None,
                };
                self.state = AppState::Ready(Box::new(ViewModel::from_parts(snapshot, carryover)));
            }
            Err(error) => {
                log::warn!("connection fetch failed for {}: {error}", result.page_id);
                self.state = AppState::Error(error);
            }
        }
    }
}

impl eframe::App for LinkGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(rx) = self.fetch_rx.take() {
            match rx.try_recv() {
                Ok(result) => self.apply_fetch_result(result),
                Err(TryRecvError::Empty) => {
                    self.fetch_rx = Some(rx);
                    ctx.request_repaint_after(Duration::from_millis(50));
                }
                Err(TryRecvError::Disconnected) => {
                    self.state = AppState::Error("background fetch worker disconnected".to_owned());
                }
            }
        }

        let mut navigate = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading page connections...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load page connections");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        retry = true;
                    }
                });
            }
            AppState::Ready(model) => {
                navigate = model.show(ctx);
            }
        }

        if retry {
            self.state = AppState::Loading;
            self.start_fetch();
        }
        if let Some(target) = navigate {
            self.navigate_to(target);
        }
    }
}

impl ViewModel {
    fn from_parts(snapshot: GraphSnapshot, carryover: Option<Carryover>) -> Self {
        let (settings, mode, carry_states) = match carryover {
            Some(carry) => (carry.settings, carry.mode, carry.states),
            None => (PhysicsSettings::default(), ViewMode::Preview, HashMap::new()),
        };

        Self {
            snapshot,
            session: None,
            carry_states,
            settings,
            mode,
            pan: Vec2::ZERO,
            zoom: 1.0,
            dragging: None,
            last_surface: Vec2::ZERO,
        }
    }

    /// Stops the current session and hands back what the next snapshot's
    /// model should inherit.
    fn carryover(&mut self) -> Carryover {
        let states = self
            .session
            .take()
            .map(|session| session.state_map())
            .unwrap_or_default();

        Carryover {
            settings: self.settings,
            mode: self.mode,
            states,
        }
    }

    /// Lazily starts the simulation once a usable surface size is known.
    /// Empty-connections snapshots never get a session.
    fn ensure_session(&mut self, surface: Vec2) {
        if self.session.is_some()
            || self.snapshot.is_empty_connections()
            || surface.x < 8.0
            || surface.y < 8.0
        {
            return;
        }

        let carry = std::mem::take(&mut self.carry_states);
        log::debug!(
            "starting layout session: {} nodes, surface {:.0}x{:.0}",
            self.snapshot.nodes.len(),
            surface.x,
            surface.y
        );
        self.session = Some(if carry.is_empty() {
            Session::start(&self.snapshot, self.settings, surface)
        } else {
            Session::start_preserving(&carry, &self.snapshot, self.settings, surface)
        });
        self.last_surface = surface;
    }

    fn set_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.pan = Vec2::ZERO;
        if mode == ViewMode::Preview {
            self.zoom = 1.0;
        }
        // The surface is re-measured on the next draw; draw_graph queues
        // a viewport update for the session when the size changes.
    }

    fn center_title(&self) -> &str {
        self.snapshot
            .center()
            .map(|node| node.title.as_str())
            .unwrap_or("Untitled page")
    }

    fn show(&mut self, ctx: &Context) -> Option<String> {
        if self.mode == ViewMode::Fullscreen
            && ctx.input(|input| input.key_pressed(egui::Key::Escape))
        {
            self.set_mode(ViewMode::Preview);
        }

        let mut navigate = None;
        match self.mode {
            ViewMode::Preview => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading(self.center_title());
                    let connected = self
                        .snapshot
                        .nodes
                        .iter()
                        .filter(|node| node.node_type == crate::graph::NodeType::Connected)
                        .count();
                    let related = self
                        .snapshot
                        .nodes
                        .iter()
                        .filter(|node| node.node_type == crate::graph::NodeType::Related)
                        .count();
                    ui.label(format!("{connected} linked pages, {related} related"));
                    ui.add_space(6.0);

                    let height = PREVIEW_HEIGHT.min(ui.available_height() - 24.0);
                    ui.allocate_ui(vec2(ui.available_width(), height), |ui| {
                        navigate = self.draw_graph(ui, false);
                    });
                    ui.add_space(4.0);
                    ui.small("Click the graph to explore connections");
                });
            }
            ViewMode::Fullscreen => {
                egui::TopBottomPanel::top("graph-header").show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.heading(self.center_title());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Close").clicked() {
                                self.set_mode(ViewMode::Preview);
                            }
                        });
                    });
                });
                egui::SidePanel::right("physics-panel")
                    .default_width(230.0)
                    .show(ctx, |ui| {
                        self.settings_panel(ui);
                    });
                egui::CentralPanel::default().show(ctx, |ui| {
                    navigate = self.draw_graph(ui, true);
                });
            }
        }

        navigate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Connection;

    fn connection(id: &str) -> Connection {
        Connection {
            id: id.to_owned(),
            title: format!("Title {id}"),
            username: None,
            last_modified: None,
            is_public: None,
        }
    }

    fn snapshot() -> GraphSnapshot {
        let incoming = [connection("B")];
        let outgoing = [connection("B"), connection("C")];
        graph::build(BuildInput {
            center_id: "A",
            center_title: "Center",
            incoming: &incoming,
            outgoing: &outgoing,
            second_hop: &[],
            third_hop: &[],
            related: &[],
            viewer_username: None,
        })
    }

    fn fetch_result(generation: u64, page_id: &str) -> FetchResult {
        FetchResult {
            generation,
            page_id: page_id.to_owned(),
            outcome: Ok(crate::data::fetch::ConnectionData {
                center_id: page_id.to_owned(),
                center_title: format!("Title {page_id}"),
                incoming: vec![connection("B")],
                outgoing: vec![connection("C")],
                hops: Default::default(),
                related: Vec::new(),
            }),
        }
    }

    fn test_app() -> LinkGraphApp {
        let store = Arc::new(crate::data::tests::sample_store());
        let mut app = LinkGraphApp::new(store, "center".to_owned(), None);
        // Drop the spawned receiver; these tests drive results by hand.
        app.fetch_rx = None;
        app
    }

    #[test]
    fn stale_fetch_results_are_discarded() {
        let mut app = test_app();
        app.generation = 3;

        app.apply_fetch_result(fetch_result(1, "old-page"));
        assert!(matches!(app.state, AppState::Loading));

        app.apply_fetch_result(fetch_result(3, "center"));
        assert!(matches!(app.state, AppState::Ready(_)));
    }

    #[test]
    fn failed_base_fetch_moves_to_error_state() {
        let mut app = test_app();
        app.apply_fetch_result(FetchResult {
            generation: 0,
            page_id: "center".to_owned(),
            outcome: Err("boom".to_owned()),
        });
        assert!(matches!(app.state, AppState::Error(_)));
    }

    #[test]
    fn navigation_carries_settings_and_mode_into_the_next_model() {
        let mut app = test_app();
        app.apply_fetch_result(fetch_result(0, "center"));

        if let AppState::Ready(model) = &mut app.state {
            model.set_mode(ViewMode::Fullscreen);
            model.settings.link_distance = 140.0;
        } else {
            panic!("expected ready state");
        }

        app.generation += 1;
        app.apply_fetch_result(fetch_result(app.generation, "other"));

        let AppState::Ready(model) = &app.state else {
            panic!("expected ready state");
        };
        assert_eq!(model.mode, ViewMode::Fullscreen);
        assert_eq!(model.settings.link_distance, 140.0);
    }

    #[test]
    fn mode_transitions_leave_node_and_edge_sets_unchanged() {
        let mut model = ViewModel::from_parts(snapshot(), None);
        let ids_before = model
            .snapshot
            .nodes
            .iter()
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();
        let directions_before = model
            .snapshot
            .edges
            .iter()
            .map(|edge| edge.direction)
            .collect::<Vec<_>>();

        model.set_mode(ViewMode::Fullscreen);
        model.set_mode(ViewMode::Preview);

        let ids_after = model
            .snapshot
            .nodes
            .iter()
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();
        let directions_after = model
            .snapshot
            .edges
            .iter()
            .map(|edge| edge.direction)
            .collect::<Vec<_>>();
        assert_eq!(ids_before, ids_after);
        assert_eq!(directions_before, directions_after);
    }

    #[test]
    fn reset_settings_restores_documented_defaults() {
        let mut model = ViewModel::from_parts(snapshot(), None);
        model.settings.charge_strength = -50.0;
        model.settings.link_distance = 33.0;

        model.reset_settings();

        assert_eq!(model.settings, PhysicsSettings::default());
        assert_eq!(model.settings.charge_strength, -200.0);
        assert_eq!(model.settings.link_distance, 80.0);
        assert_eq!(model.settings.center_strength, 0.5);
        assert_eq!(model.settings.collision_radius, 25.0);
        assert_eq!(model.settings.alpha_decay, 0.02);
        assert_eq!(model.settings.velocity_decay, 0.4);
    }

    #[test]
    fn session_is_deferred_until_a_nonzero_surface_appears() {
        let mut model = ViewModel::from_parts(snapshot(), None);

        model.ensure_session(Vec2::ZERO);
        assert!(model.session.is_none());

        model.ensure_session(vec2(400.0, 300.0));
        assert!(model.session.is_some());
    }

    #[test]
    fn empty_connections_snapshot_never_starts_a_session() {
        let empty = graph::build(BuildInput {
            center_id: "A",
            center_title: "Center",
            incoming: &[],
            outgoing: &[],
            second_hop: &[],
            third_hop: &[],
            related: &[],
            viewer_username: None,
        });
        let mut model = ViewModel::from_parts(empty, None);

        model.ensure_session(vec2(400.0, 300.0));
        assert!(model.session.is_none());
    }
}
