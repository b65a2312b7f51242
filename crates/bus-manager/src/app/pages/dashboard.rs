//! Dashboard page
//!
//! Loads the whole game state in one concurrent fetch, walks the player
//! through first-time setup (create a company, then place the first depot by
//! clicking the map), and otherwise renders the fleet map with the stats
//! side panel. All network work runs on the tokio runtime; results come back
//! over channels owned by this page, so anything that lands after the page
//! is dropped is discarded.

use crate::app::map_view::{BusMarker, FleetSnapshot, MapCallbacks, MapView};
use crate::app::pages::Navigate;
use crate::app::settings::Settings;
use crate::app::ui_panels::{
    active_trips_panel, error_banner, format_rupiah, quick_stats_panel, selection_panel,
    tiles_provider_panel,
};
use bus_manager_api::types::{
    Bus, Company, CreateCompanyRequest, CreateDepotRequest, Depot, Route, Trip,
};
use bus_manager_api::{ApiClient, ApiError, SharedSession};
use egui::RichText;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Everything one dashboard fetch brings back. `company` is `None` when the
/// backend answered 404, meaning the player has not created one yet.
pub(crate) struct GameData {
    pub(crate) company: Option<Company>,
    pub(crate) depots: Vec<Depot>,
    pub(crate) buses: Vec<Bus>,
    pub(crate) routes: Vec<Route>,
    pub(crate) active_trips: Vec<Trip>,
}

pub struct DashboardPage {
    fallback_center: (f64, f64),

    company: Option<Company>,
    depots: Vec<Depot>,
    buses: Vec<Bus>,
    active_trips: Vec<Trip>,
    snapshot: FleetSnapshot,
    map: MapView,

    started: bool,
    loading: bool,
    submitting: bool,
    error: Option<String>,

    selected_depot: Option<Depot>,
    selected_bus: Option<Bus>,

    company_name: String,
    depot_name: String,
    depot_location: Option<(f64, f64)>,

    fetch_rx: Option<Receiver<bus_manager_api::Result<GameData>>>,
    action_rx: Option<Receiver<bus_manager_api::Result<()>>>,
}

impl DashboardPage {
    pub fn new(settings: &Settings) -> Self {
        Self {
            fallback_center: (settings.center_lat, settings.center_lng),
            company: None,
            depots: Vec::new(),
            buses: Vec::new(),
            active_trips: Vec::new(),
            snapshot: FleetSnapshot::default(),
            map: MapView::new(settings.center_lat, settings.center_lng, settings.zoom),
            started: false,
            loading: false,
            submitting: false,
            error: None,
            selected_depot: None,
            selected_bus: None,
            company_name: String::new(),
            depot_name: String::new(),
            depot_location: None,
            fetch_rx: None,
            action_rx: None,
        }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        client: &Arc<ApiClient>,
        session: &SharedSession,
    ) -> Option<Navigate> {
        profiling::scope!("DashboardPage::show");

        if !self.started {
            self.started = true;
            self.start_fetch(ctx, client);
        }

        self.poll_fetch();
        self.poll_action(ctx, client);

        if self.loading && self.company.is_none() && self.depots.is_empty() {
            self.show_loading(ctx);
            return None;
        }

        if self.company.is_none() {
            self.show_company_setup(ctx, client);
        } else if self.depots.is_empty() {
            self.show_depot_setup(ctx, client);
        } else {
            self.show_main(ctx, client, session);
        }

        None
    }

    fn start_fetch(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>) {
        let (tx, rx) = mpsc::channel();
        self.fetch_rx = Some(rx);
        self.loading = true;

        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let result = fetch_game_data(&client).await;
            // The receiver is gone if the page was torn down meanwhile; the
            // update is simply discarded.
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn poll_fetch(&mut self) {
        let Some(rx) = &self.fetch_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(data)) => {
                self.fetch_rx = None;
                self.loading = false;
                self.apply_game_data(data);
            }
            Ok(Err(ApiError::Unauthorized)) => {
                // The session is already cleared; the app shell routes back
                // to the login page.
                self.fetch_rx = None;
                self.loading = false;
            }
            Ok(Err(err)) => {
                self.fetch_rx = None;
                self.loading = false;
                self.error = Some(err.to_string());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.fetch_rx = None;
                self.loading = false;
            }
        }
    }

    fn poll_action(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>) {
        let Some(rx) = &self.action_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(())) => {
                self.action_rx = None;
                self.submitting = false;
                self.company_name.clear();
                self.depot_name.clear();
                self.depot_location = None;
                self.start_fetch(ctx, client);
            }
            Ok(Err(ApiError::Unauthorized)) => {
                self.action_rx = None;
                self.submitting = false;
            }
            Ok(Err(err)) => {
                self.action_rx = None;
                self.submitting = false;
                self.error = Some(err.to_string());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.action_rx = None;
                self.submitting = false;
            }
        }
    }

    fn apply_game_data(&mut self, data: GameData) {
        self.company = data.company;
        self.depots = data.depots;
        self.buses = data.buses;
        self.active_trips = data.active_trips;

        // Refresh stale selections from the new collections.
        if let Some(selected) = &self.selected_depot {
            self.selected_depot = self.depots.iter().find(|d| d.id == selected.id).cloned();
        }
        if let Some(selected) = &self.selected_bus {
            self.selected_bus = self.buses.iter().find(|b| b.id == selected.id).cloned();
        }

        self.snapshot = FleetSnapshot {
            depots: self.depots.clone(),
            buses: join_bus_positions(&self.buses, &self.depots, self.fallback_center),
            routes: data.routes,
            revision: self.snapshot.revision + 1,
        };
    }

    fn show_loading(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.4);
                ui.add(egui::Spinner::new().size(32.0));
                ui.add_space(8.0);
                ui.label("Loading your company...");
            });
        });
    }

    fn show_company_setup(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.2);
                ui.set_max_width(420.0);

                ui.heading("Create Your Bus Company");
                ui.label("Name your company to start the game.");
                ui.add_space(12.0);

                error_banner(ui, &mut self.error);

                ui.label("Company Name");
                ui.text_edit_singleline(&mut self.company_name);
                ui.add_space(12.0);

                let label = if self.submitting {
                    "Creating..."
                } else {
                    "Create Company"
                };
                if ui
                    .add_enabled(!self.submitting, egui::Button::new(label))
                    .clicked()
                {
                    let name = self.company_name.trim().to_string();
                    match validate_entity_name(&name) {
                        Ok(()) => self.submit_create_company(ctx, client, name),
                        Err(message) => self.error = Some(message),
                    }
                }
            });
        });
    }

    fn show_depot_setup(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>) {
        egui::SidePanel::right("depot_setup_side")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("Place Your First Depot");
                ui.label("Click the map to choose a location, then name the depot.");
                ui.add_space(12.0);

                error_banner(ui, &mut self.error);

                match self.depot_location {
                    Some((lat, lng)) => {
                        ui.label(RichText::new("Location").strong());
                        ui.label(format!("({lat:.4}, {lng:.4})"));
                    }
                    None => {
                        ui.label(RichText::new("No location selected yet").italics().weak());
                    }
                }
                ui.add_space(8.0);

                ui.label("Depot Name");
                ui.text_edit_singleline(&mut self.depot_name);
                ui.add_space(12.0);

                let ready = self.depot_location.is_some() && !self.submitting;
                let label = if self.submitting {
                    "Creating..."
                } else {
                    "Create Depot"
                };
                if ui.add_enabled(ready, egui::Button::new(label)).clicked() {
                    let name = self.depot_name.trim().to_string();
                    match validate_entity_name(&name) {
                        Ok(()) => {
                            if let Some((lat, lng)) = self.depot_location {
                                self.submit_create_depot(ctx, client, name, lat, lng);
                            }
                        }
                        Err(message) => self.error = Some(message),
                    }
                }
            });

        let mut picked: Option<(f64, f64)> = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let mut on_map_click = |lat: f64, lng: f64| {
                    picked = Some((lat, lng));
                };
                self.map.show(
                    ui,
                    &self.snapshot,
                    MapCallbacks {
                        on_map_click: Some(&mut on_map_click),
                        ..Default::default()
                    },
                );
            });
        if let Some(location) = picked {
            self.depot_location = Some(location);
        }
    }

    fn show_main(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>, session: &SharedSession) {
        egui::TopBottomPanel::top("dashboard_header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if let Some(company) = &self.company {
                    ui.heading(&company.name);
                    ui.separator();
                    ui.label(format!("Level {} • {} XP", company.level, company.experience));
                    ui.separator();
                    ui.label(RichText::new(format_rupiah(company.money)).strong());
                    ui.separator();
                    ui.label(format!("Reputation: {}", company.reputation));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Logout").clicked() {
                        self.logout(client, session);
                    }
                    if ui
                        .add_enabled(!self.loading, egui::Button::new("⟳ Refresh"))
                        .clicked()
                    {
                        self.start_fetch(ctx, client);
                    }
                });
            });
            ui.add_space(4.0);
        });

        egui::SidePanel::right("dashboard_side")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                error_banner(ui, &mut self.error);

                quick_stats_panel(ui, &self.depots, &self.buses, &self.active_trips);
                ui.add_space(12.0);

                active_trips_panel(ui, &self.active_trips);
                ui.add_space(12.0);

                selection_panel(ui, self.selected_depot.as_ref(), self.selected_bus.as_ref());
                ui.add_space(12.0);

                tiles_provider_panel(ui, &mut self.map);
            });

        let mut clicked_depot: Option<Depot> = None;
        let mut clicked_bus: Option<Bus> = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let mut on_depot_click = |depot: &Depot| {
                    clicked_depot = Some(depot.clone());
                };
                let mut on_bus_click = |bus: &Bus| {
                    clicked_bus = Some(bus.clone());
                };
                self.map.show(
                    ui,
                    &self.snapshot,
                    MapCallbacks {
                        on_depot_click: Some(&mut on_depot_click),
                        on_bus_click: Some(&mut on_bus_click),
                        on_map_click: None,
                    },
                );
            });

        if let Some(depot) = clicked_depot {
            self.selected_depot = Some(depot);
        }
        if let Some(bus) = clicked_bus {
            self.selected_bus = Some(bus);
        }
    }

    fn submit_create_company(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>, name: String) {
        let (tx, rx) = mpsc::channel();
        self.action_rx = Some(rx);
        self.submitting = true;
        self.error = None;

        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let result = client
                .create_company(&CreateCompanyRequest { name })
                .await
                .map(|_| ());
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn submit_create_depot(
        &mut self,
        ctx: &egui::Context,
        client: &Arc<ApiClient>,
        name: String,
        latitude: f64,
        longitude: f64,
    ) {
        let (tx, rx) = mpsc::channel();
        self.action_rx = Some(rx);
        self.submitting = true;
        self.error = None;

        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let result = client
                .create_depot(&CreateDepotRequest {
                    name,
                    latitude,
                    longitude,
                })
                .await
                .map(|_| ());
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    /// Clears the session immediately so the shell redirects on this frame,
    /// then revokes the token in the background.
    fn logout(&self, client: &Arc<ApiClient>, session: &SharedSession) {
        if let Ok(mut session) = session.write() {
            session.clear();
        }
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.logout().await {
                tracing::debug!(error = %err, "logout request failed");
            }
        });
    }
}

/// Fetch the company, fleet and trip collections concurrently. A missing
/// company (404) is a normal first-run state, not an error.
async fn fetch_game_data(client: &ApiClient) -> bus_manager_api::Result<GameData> {
    let (company, depots, buses, routes, active_trips) = tokio::join!(
        client.company(),
        client.depots(),
        client.buses(),
        client.routes(),
        client.active_trips(),
    );

    let company = match company {
        Ok(company) => Some(company),
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(err),
    };

    Ok(GameData {
        company,
        depots: depots?,
        buses: buses?,
        routes: routes?,
        active_trips: active_trips?,
    })
}

/// Resolve each bus to a map position. The backend keeps coordinates on the
/// depot: prefer the embedded depot, fall back to a lookup by `depot_id`,
/// and finally to the map center so every bus stays visible.
pub(crate) fn join_bus_positions(
    buses: &[Bus],
    depots: &[Depot],
    fallback: (f64, f64),
) -> Vec<BusMarker> {
    buses
        .iter()
        .map(|bus| {
            let (latitude, longitude) = bus
                .depot
                .as_ref()
                .map(|depot| (depot.latitude, depot.longitude))
                .or_else(|| {
                    depots
                        .iter()
                        .find(|depot| depot.id == bus.depot_id)
                        .map(|depot| (depot.latitude, depot.longitude))
                })
                .unwrap_or(fallback);
            BusMarker {
                bus: bus.clone(),
                latitude,
                longitude,
            }
        })
        .collect()
}

/// Shared 3-100 character rule for company and depot names.
pub(crate) fn validate_entity_name(name: &str) -> Result<(), String> {
    let length = name.chars().count();
    if length < 3 {
        return Err("Name must be at least 3 characters long".to_string());
    }
    if length > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_manager_api::types::BusStatus;
    use clap::Parser;

    fn create_test_settings() -> Settings {
        Settings::parse_from(["bus-manager"])
    }

    fn create_test_depot(id: u64, lat: f64, lng: f64) -> Depot {
        Depot {
            id,
            company_id: 1,
            name: format!("Depot {id}"),
            latitude: lat,
            longitude: lng,
            capacity: 5,
            current_buses: 1,
            level: 1,
        }
    }

    fn create_test_bus(id: u64, depot_id: u64, depot: Option<Depot>) -> Bus {
        Bus {
            id,
            company_id: 1,
            depot_id,
            name: format!("Bus {id}"),
            kind: "minibus".to_string(),
            capacity: 20,
            fuel_capacity: 100.0,
            current_fuel: 80.0,
            range: 300.0,
            service_type: "economy".to_string(),
            status: BusStatus::Available,
            condition: 100.0,
            purchase_price: 150_000_000.0,
            operating_cost: 500_000.0,
            depot,
        }
    }

    fn create_test_game_data() -> GameData {
        let depot = create_test_depot(1, -6.2, 106.8);
        GameData {
            company: Some(Company {
                id: 1,
                user_id: 1,
                name: "Trans Java".to_string(),
                money: 1_000_000.0,
                reputation: 50,
                level: 1,
                experience: 0,
            }),
            depots: vec![depot],
            buses: vec![create_test_bus(9, 1, None)],
            routes: Vec::new(),
            active_trips: Vec::new(),
        }
    }

    #[test]
    fn test_join_prefers_embedded_depot() {
        let embedded = create_test_depot(2, -7.0, 110.0);
        let listed = create_test_depot(2, -6.0, 107.0);
        let buses = vec![create_test_bus(1, 2, Some(embedded))];

        let markers = join_bus_positions(&buses, &[listed], (0.0, 0.0));
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].latitude, -7.0);
        assert_eq!(markers[0].longitude, 110.0);
    }

    #[test]
    fn test_join_falls_back_to_depot_lookup() {
        let depot = create_test_depot(3, -6.9, 107.6);
        let buses = vec![create_test_bus(1, 3, None)];

        let markers = join_bus_positions(&buses, &[depot], (0.0, 0.0));
        assert_eq!(markers[0].latitude, -6.9);
        assert_eq!(markers[0].longitude, 107.6);
    }

    #[test]
    fn test_join_uses_map_center_when_depot_is_unknown() {
        let buses = vec![create_test_bus(1, 99, None)];

        let markers = join_bus_positions(&buses, &[], (-7.2575, 112.7521));
        assert_eq!(markers[0].latitude, -7.2575);
        assert_eq!(markers[0].longitude, 112.7521);
    }

    #[test]
    fn test_validate_entity_name_length_bounds() {
        assert!(validate_entity_name("ab").is_err());
        assert!(validate_entity_name("abc").is_ok());
        assert!(validate_entity_name(&"x".repeat(100)).is_ok());
        assert!(validate_entity_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_apply_game_data_bumps_snapshot_revision() {
        let settings = create_test_settings();
        let mut page = DashboardPage::new(&settings);

        page.apply_game_data(create_test_game_data());
        assert_eq!(page.snapshot.revision, 1);
        assert_eq!(page.snapshot.depots.len(), 1);
        assert_eq!(page.snapshot.buses.len(), 1);

        page.apply_game_data(create_test_game_data());
        assert_eq!(page.snapshot.revision, 2);
    }

    #[test]
    fn test_apply_game_data_refreshes_selection() {
        let settings = create_test_settings();
        let mut page = DashboardPage::new(&settings);
        page.selected_depot = Some(create_test_depot(1, 0.0, 0.0));
        page.selected_bus = Some(create_test_bus(42, 1, None));

        page.apply_game_data(create_test_game_data());

        // Depot 1 still exists, refreshed from the new data; bus 42 vanished.
        let depot = page.selected_depot.as_ref().unwrap();
        assert_eq!(depot.latitude, -6.2);
        assert!(page.selected_bus.is_none());
    }

    #[test]
    fn test_missing_company_is_first_run_state() {
        let settings = create_test_settings();
        let mut page = DashboardPage::new(&settings);
        let mut data = create_test_game_data();
        data.company = None;

        page.apply_game_data(data);
        assert!(page.company.is_none());
    }

    #[test]
    fn test_update_after_page_drop_is_discarded() {
        let settings = create_test_settings();
        let mut page = DashboardPage::new(&settings);
        let (tx, rx) = mpsc::channel();
        page.fetch_rx = Some(rx);

        drop(page);

        // Delivery to a dropped page fails quietly instead of panicking.
        let result = tx.send(Ok(create_test_game_data()));
        assert!(result.is_err());
    }
}
