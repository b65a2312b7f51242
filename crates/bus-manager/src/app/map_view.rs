//! Map view controller
//!
//! Owns one map surface (tile pipeline + camera memory) and a registry of
//! visual layers kept in sync with the fleet collections supplied by the
//! host page. Synchronization is a full teardown/rebuild per snapshot
//! revision: after every reconciliation the registry corresponds exactly to
//! the current depot/bus/route collections, with no stale or duplicated
//! layer. Collections are tens of items, so correctness wins over an
//! incremental diff.
//!
//! User gestures flow outward: the plugin pushes synthetic events (entity
//! kind + id, or a map coordinate) into a queue, and the controller resolves
//! entity ids against the *current* snapshot before invoking the host's
//! callbacks. Popups do the same live lookup when their select button is
//! pressed, so a popup held open across reconciliations still reports the
//! up-to-date record.

use crate::app::plugin::{FleetPlugin, MapEvent};
use bus_manager_api::types::{Bus, BusStatus, Depot, Route};
use egui::Color32;
use std::sync::{Arc, Mutex};
use walkers::sources::OpenStreetMap;
use walkers::{HttpTiles, Map, MapMemory, TileId, sources};

/// Glyph colors for the bus status mapping. Anything that is not
/// available/on-trip (maintenance included) renders red.
const BUS_AVAILABLE_COLOR: Color32 = Color32::from_rgb(0x4c, 0xaf, 0x50);
const BUS_ON_TRIP_COLOR: Color32 = Color32::from_rgb(0xff, 0x98, 0x00);
const BUS_FALLBACK_COLOR: Color32 = Color32::from_rgb(0xf4, 0x43, 0x36);

pub fn bus_status_color(status: BusStatus) -> Color32 {
    match status {
        BusStatus::Available => BUS_AVAILABLE_COLOR,
        BusStatus::OnTrip => BUS_ON_TRIP_COLOR,
        _ => BUS_FALLBACK_COLOR,
    }
}

/// A bus joined with its resolved map position. The backend keeps bus
/// coordinates on the depot, so the dashboard performs the join before
/// handing buses to the map.
#[derive(Clone, Debug, PartialEq)]
pub struct BusMarker {
    pub bus: Bus,
    pub latitude: f64,
    pub longitude: f64,
}

/// The fleet collections the map renders, plus a revision counter bumped by
/// the owner whenever any collection changes. Reconciliation runs once per
/// revision.
#[derive(Clone, Debug, Default)]
pub struct FleetSnapshot {
    pub depots: Vec<Depot>,
    pub buses: Vec<BusMarker>,
    pub routes: Vec<Route>,
    pub revision: u64,
}

impl FleetSnapshot {
    fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Depot(id) => self.depots.iter().any(|d| d.id == id),
            EntityRef::Bus(id) => self.buses.iter().any(|m| m.bus.id == id),
            EntityRef::Route(id) => self.routes.iter().any(|r| r.id == id),
        }
    }
}

/// One visual layer registered on the surface.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    Depot {
        id: u64,
        name: String,
        latitude: f64,
        longitude: f64,
    },
    Bus {
        id: u64,
        name: String,
        status: BusStatus,
        color: Color32,
        latitude: f64,
        longitude: f64,
    },
    Route {
        id: u64,
        origin: String,
        destination: String,
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
    },
}

/// Identity of a clickable map entity. Routes open an info popup but have
/// no host callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Depot(u64),
    Bus(u64),
    Route(u64),
}

/// Interaction callbacks supplied by the host page, all optional.
#[derive(Default)]
pub struct MapCallbacks<'a> {
    pub on_depot_click: Option<&'a mut dyn FnMut(&Depot)>,
    pub on_bus_click: Option<&'a mut dyn FnMut(&Bus)>,
    pub on_map_click: Option<&'a mut dyn FnMut(f64, f64)>,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TilesProvider {
    #[default]
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }
}

/// Custom OpenTopoMap tile source
struct OpenTopoMap;

impl sources::TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> sources::Attribution {
        sources::Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17 // OpenTopoMap has max zoom of 17
    }
}

/// Tile pipelines for both providers, created together when the surface
/// mounts and dropped together when the controller is dropped.
struct SurfaceTiles {
    osm: HttpTiles,
    otm: HttpTiles,
}

/// The map view controller. One instance per mounted map; dropping it
/// releases the surface and every bound resource.
pub struct MapView {
    center_lat: f64,
    center_lng: f64,
    zoom: f64,
    provider: TilesProvider,
    tiles: Option<SurfaceTiles>,
    memory: MapMemory,
    layers: Arc<Vec<Layer>>,
    reconciled_revision: Option<u64>,
    events: Arc<Mutex<Vec<MapEvent>>>,
    popup: Option<EntityRef>,
    popup_anchor: Arc<Mutex<Option<egui::Pos2>>>,
}

impl MapView {
    pub fn new(center_lat: f64, center_lng: f64, zoom: f64) -> Self {
        Self {
            center_lat,
            center_lng,
            zoom,
            provider: TilesProvider::default(),
            tiles: None,
            memory: MapMemory::default(),
            layers: Arc::new(Vec::new()),
            reconciled_revision: None,
            events: Arc::new(Mutex::new(Vec::new())),
            popup: None,
            popup_anchor: Arc::new(Mutex::new(None)),
        }
    }

    pub fn provider(&self) -> TilesProvider {
        self.provider
    }

    pub fn set_provider(&mut self, provider: TilesProvider) {
        self.provider = provider;
    }

    #[cfg(test)]
    pub(crate) fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Rebuild the layer registry if the snapshot revision moved. Full
    /// teardown and rebuild; idempotent for an unchanged revision.
    pub fn reconcile(&mut self, snapshot: &FleetSnapshot) {
        if self.reconciled_revision == Some(snapshot.revision) {
            return;
        }
        profiling::scope!("MapView::reconcile");

        // Drop every previously registered layer, then rebuild from the
        // current collections only.
        self.layers = Arc::new(build_layers(snapshot));
        self.reconciled_revision = Some(snapshot.revision);

        // A popup whose entity left the collections has nothing to show.
        if let Some(entity) = self.popup
            && !snapshot.contains(entity)
        {
            self.popup = None;
        }

        tracing::trace!(
            revision = snapshot.revision,
            layers = self.layers.len(),
            "map layers reconciled"
        );
    }

    /// Render the map and dispatch any interactions. The surface is created
    /// on the first call that has a usable container; a zero-sized container
    /// skips creation silently and retries next frame.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        snapshot: &FleetSnapshot,
        mut callbacks: MapCallbacks<'_>,
    ) {
        profiling::scope!("MapView::show");

        self.reconcile(snapshot);

        if self.tiles.is_none() {
            let rect = ui.available_rect_before_wrap();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                return; // container not ready yet
            }
            let ctx = ui.ctx().clone();
            self.tiles = Some(SurfaceTiles {
                osm: HttpTiles::new(OpenStreetMap, ctx.clone()),
                otm: HttpTiles::new(OpenTopoMap, ctx),
            });
            self.memory
                .center_at(walkers::lat_lon(self.center_lat, self.center_lng));
            let _ = self.memory.set_zoom(self.zoom);
            tracing::debug!("map surface created");
        }

        let Some(tiles) = self.tiles.as_mut() else {
            return;
        };
        let tiles = match self.provider {
            TilesProvider::OpenStreetMap => &mut tiles.osm,
            TilesProvider::OpenTopoMap => &mut tiles.otm,
        };

        let plugin = FleetPlugin::new(
            self.layers.clone(),
            self.events.clone(),
            self.popup_anchor.clone(),
            self.popup,
            callbacks.on_map_click.is_some(),
        );

        let map = Map::new(
            Some(tiles),
            &mut self.memory,
            walkers::lat_lon(self.center_lat, self.center_lng),
        )
        .with_plugin(plugin);
        ui.add(map);

        let events: Vec<MapEvent> = match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for event in events {
            self.dispatch(event, snapshot, &mut callbacks);
        }

        self.show_popup(ui, snapshot, &mut callbacks);
    }

    /// Route a synthetic map event to the host callbacks, resolving entity
    /// ids against the current snapshot.
    pub(crate) fn dispatch(
        &mut self,
        event: MapEvent,
        snapshot: &FleetSnapshot,
        callbacks: &mut MapCallbacks<'_>,
    ) {
        match event {
            MapEvent::EntityClicked(entity) => {
                self.popup = Some(entity);
                invoke_entity_callback(entity, snapshot, callbacks);
            }
            MapEvent::MapClicked { lat, lng } => {
                if let Some(on_map_click) = callbacks.on_map_click.as_mut() {
                    on_map_click(lat, lng);
                }
            }
        }
    }

    /// Popup window for the selected entity, anchored to the marker. The
    /// select button resolves the entity by id from the snapshot at click
    /// time, so it reports the same record a marker-body click would.
    fn show_popup(
        &mut self,
        ui: &egui::Ui,
        snapshot: &FleetSnapshot,
        callbacks: &mut MapCallbacks<'_>,
    ) {
        let Some(entity) = self.popup else {
            return;
        };
        let anchor = match self.popup_anchor.lock() {
            Ok(anchor) => *anchor,
            Err(_) => None,
        };
        let Some(anchor) = anchor else {
            return;
        };

        let mut close = false;
        let mut select = false;

        egui::Area::new(egui::Id::new("fleet_map_popup"))
            .fixed_pos(anchor + egui::vec2(14.0, -14.0))
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    match entity {
                        EntityRef::Depot(id) => {
                            let Some(depot) = snapshot.depots.iter().find(|d| d.id == id) else {
                                close = true;
                                return;
                            };
                            ui.strong(&depot.name);
                            ui.label(format!("Depot ID: {}", depot.id));
                            ui.horizontal(|ui| {
                                select = ui.button("Select Depot").clicked();
                                close = ui.button("Close").clicked();
                            });
                        }
                        EntityRef::Bus(id) => {
                            let Some(marker) = snapshot.buses.iter().find(|m| m.bus.id == id)
                            else {
                                close = true;
                                return;
                            };
                            ui.strong(&marker.bus.name);
                            ui.label(format!("Status: {}", marker.bus.status.label()));
                            ui.label(format!("Bus ID: {}", marker.bus.id));
                            ui.horizontal(|ui| {
                                select = ui.button("Select Bus").clicked();
                                close = ui.button("Close").clicked();
                            });
                        }
                        EntityRef::Route(id) => {
                            let Some(route) = snapshot.routes.iter().find(|r| r.id == id) else {
                                close = true;
                                return;
                            };
                            ui.strong(format!("{} → {}", route.origin, route.destination));
                            ui.label(format!("Route ID: {}", route.id));
                            close = ui.button("Close").clicked();
                        }
                    };
                });
            });

        if select {
            invoke_entity_callback(entity, snapshot, callbacks);
        }
        if close {
            self.popup = None;
        }
    }
}

/// Look the entity up in the live snapshot and hand the full record to the
/// matching callback. Both the marker body and the popup button land here.
fn invoke_entity_callback(
    entity: EntityRef,
    snapshot: &FleetSnapshot,
    callbacks: &mut MapCallbacks<'_>,
) {
    match entity {
        EntityRef::Depot(id) => {
            if let Some(on_depot_click) = callbacks.on_depot_click.as_mut()
                && let Some(depot) = snapshot.depots.iter().find(|d| d.id == id)
            {
                on_depot_click(depot);
            }
        }
        EntityRef::Bus(id) => {
            if let Some(on_bus_click) = callbacks.on_bus_click.as_mut()
                && let Some(marker) = snapshot.buses.iter().find(|m| m.bus.id == id)
            {
                on_bus_click(&marker.bus);
            }
        }
        // Routes open a popup only.
        EntityRef::Route(_) => {}
    }
}

/// Build the full layer set for a snapshot: one marker per depot, one glyph
/// per bus, one dashed line per route. No deduplication; identity-unique
/// collections are the caller's contract.
pub(crate) fn build_layers(snapshot: &FleetSnapshot) -> Vec<Layer> {
    let mut layers =
        Vec::with_capacity(snapshot.depots.len() + snapshot.buses.len() + snapshot.routes.len());

    for depot in &snapshot.depots {
        layers.push(Layer::Depot {
            id: depot.id,
            name: depot.name.clone(),
            latitude: depot.latitude,
            longitude: depot.longitude,
        });
    }

    for marker in &snapshot.buses {
        layers.push(Layer::Bus {
            id: marker.bus.id,
            name: marker.bus.name.clone(),
            status: marker.bus.status,
            color: bus_status_color(marker.bus.status),
            latitude: marker.latitude,
            longitude: marker.longitude,
        });
    }

    for route in &snapshot.routes {
        layers.push(Layer::Route {
            id: route.id,
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            origin_lat: route.origin_lat,
            origin_lng: route.origin_lng,
            dest_lat: route.dest_lat,
            dest_lng: route.dest_lng,
        });
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_depot(id: u64, name: &str, lat: f64, lng: f64) -> Depot {
        Depot {
            id,
            company_id: 1,
            name: name.to_string(),
            latitude: lat,
            longitude: lng,
            capacity: 10,
            current_buses: 0,
            level: 1,
        }
    }

    fn create_test_bus(id: u64, name: &str, status: BusStatus) -> Bus {
        Bus {
            id,
            company_id: 1,
            depot_id: 1,
            name: name.to_string(),
            kind: "normal".to_string(),
            capacity: 40,
            fuel_capacity: 100.0,
            current_fuel: 100.0,
            range: 500.0,
            service_type: "economy".to_string(),
            status,
            condition: 100.0,
            purchase_price: 0.0,
            operating_cost: 0.0,
            depot: None,
        }
    }

    fn create_test_bus_marker(id: u64, name: &str, status: BusStatus, lat: f64, lng: f64) -> BusMarker {
        BusMarker {
            bus: create_test_bus(id, name, status),
            latitude: lat,
            longitude: lng,
        }
    }

    fn create_test_route(id: u64, origin: &str, destination: &str) -> Route {
        Route {
            id,
            name: format!("{origin}-{destination}"),
            origin: origin.to_string(),
            destination: destination.to_string(),
            origin_lat: -7.25,
            origin_lng: 112.75,
            dest_lat: -6.2,
            dest_lng: 106.8,
            distance: 660.0,
            duration: 9.0,
            base_fare: 150000.0,
            popularity: 0.8,
            kind: "inter_province".to_string(),
        }
    }

    fn create_test_snapshot() -> FleetSnapshot {
        FleetSnapshot {
            depots: vec![
                create_test_depot(1, "Surabaya Central", -7.25, 112.75),
                create_test_depot(2, "Malang", -7.98, 112.63),
            ],
            buses: vec![
                create_test_bus_marker(10, "B1", BusStatus::Available, -7.25, 112.75),
                create_test_bus_marker(11, "B2", BusStatus::OnTrip, -7.26, 112.76),
                create_test_bus_marker(12, "B3", BusStatus::Maintenance, -7.27, 112.77),
            ],
            routes: vec![create_test_route(100, "Surabaya", "Jakarta")],
            revision: 1,
        }
    }

    #[test]
    fn test_layer_count_matches_collections() {
        let snapshot = create_test_snapshot();
        let layers = build_layers(&snapshot);
        assert_eq!(
            layers.len(),
            snapshot.depots.len() + snapshot.buses.len() + snapshot.routes.len()
        );
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let snapshot = create_test_snapshot();
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);

        view.reconcile(&snapshot);
        let first = view.layers().to_vec();

        view.reconcile(&snapshot);
        assert_eq!(view.layers(), first.as_slice());

        // Same collections under a new revision must also rebuild to the
        // identical registry, not double it.
        let mut again = snapshot.clone();
        again.revision = 2;
        view.reconcile(&again);
        assert_eq!(view.layers(), first.as_slice());
    }

    #[test]
    fn test_reconcile_drops_stale_layers() {
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        view.reconcile(&create_test_snapshot());
        assert!(!view.layers().is_empty());

        let empty = FleetSnapshot {
            revision: 2,
            ..FleetSnapshot::default()
        };
        view.reconcile(&empty);
        assert!(view.layers().is_empty());
    }

    #[test]
    fn test_bus_status_color_mapping() {
        assert_eq!(bus_status_color(BusStatus::Available), BUS_AVAILABLE_COLOR);
        assert_eq!(bus_status_color(BusStatus::OnTrip), BUS_ON_TRIP_COLOR);
        assert_eq!(
            bus_status_color(BusStatus::Maintenance),
            BUS_FALLBACK_COLOR
        );
        // The fallback branch also covers statuses this client has never
        // heard of.
        assert_eq!(bus_status_color(BusStatus::Unknown), BUS_FALLBACK_COLOR);
    }

    #[test]
    fn test_depot_and_maintenance_bus_example() {
        let snapshot = FleetSnapshot {
            depots: vec![create_test_depot(1, "Central", -7.25, 112.75)],
            buses: vec![create_test_bus_marker(
                9,
                "B1",
                BusStatus::Maintenance,
                -7.26,
                112.76,
            )],
            routes: Vec::new(),
            revision: 1,
        };

        let layers = build_layers(&snapshot);
        assert_eq!(layers.len(), 2);
        match &layers[1] {
            Layer::Bus { color, .. } => assert_eq!(*color, BUS_FALLBACK_COLOR),
            other => panic!("expected bus layer, got {other:?}"),
        }
    }

    #[test]
    fn test_entity_click_resolves_against_live_snapshot() {
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        let initial = create_test_snapshot();
        view.reconcile(&initial);

        // A depot appears after the last reconciliation; dispatch must find
        // it in the snapshot passed at click time, not in anything captured
        // earlier.
        let mut live = initial.clone();
        live.depots
            .push(create_test_depot(3, "Kediri", -7.82, 112.01));

        let mut clicked: Option<Depot> = None;
        let mut on_depot = |depot: &Depot| clicked = Some(depot.clone());
        let mut callbacks = MapCallbacks {
            on_depot_click: Some(&mut on_depot),
            ..MapCallbacks::default()
        };
        view.dispatch(
            MapEvent::EntityClicked(EntityRef::Depot(3)),
            &live,
            &mut callbacks,
        );
        drop(callbacks);

        assert_eq!(clicked.as_ref().map(|d| d.name.as_str()), Some("Kediri"));
    }

    #[test]
    fn test_marker_body_and_popup_select_report_identical_record() {
        let snapshot = create_test_snapshot();
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        view.reconcile(&snapshot);

        let mut from_body: Option<Depot> = None;
        let mut on_depot = |depot: &Depot| from_body = Some(depot.clone());
        let mut callbacks = MapCallbacks {
            on_depot_click: Some(&mut on_depot),
            ..MapCallbacks::default()
        };
        view.dispatch(
            MapEvent::EntityClicked(EntityRef::Depot(1)),
            &snapshot,
            &mut callbacks,
        );
        drop(callbacks);

        // The popup select path goes through the same live-lookup helper.
        let mut from_popup: Option<Depot> = None;
        let mut on_depot = |depot: &Depot| from_popup = Some(depot.clone());
        let mut callbacks = MapCallbacks {
            on_depot_click: Some(&mut on_depot),
            ..MapCallbacks::default()
        };
        invoke_entity_callback(EntityRef::Depot(1), &snapshot, &mut callbacks);
        drop(callbacks);

        assert_eq!(from_body, from_popup);
        assert!(from_body.is_some());
    }

    #[test]
    fn test_map_click_dispatches_coordinate() {
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        let snapshot = FleetSnapshot::default();

        let mut picked: Option<(f64, f64)> = None;
        let mut on_map = |lat: f64, lng: f64| picked = Some((lat, lng));
        let mut callbacks = MapCallbacks {
            on_map_click: Some(&mut on_map),
            ..MapCallbacks::default()
        };
        view.dispatch(
            MapEvent::MapClicked {
                lat: -7.3,
                lng: 112.8,
            },
            &snapshot,
            &mut callbacks,
        );
        drop(callbacks);

        assert_eq!(picked, Some((-7.3, 112.8)));
    }

    #[test]
    fn test_popup_closes_when_entity_vanishes() {
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        let snapshot = create_test_snapshot();
        view.reconcile(&snapshot);

        let mut callbacks = MapCallbacks::default();
        view.dispatch(
            MapEvent::EntityClicked(EntityRef::Bus(10)),
            &snapshot,
            &mut callbacks,
        );
        assert_eq!(view.popup, Some(EntityRef::Bus(10)));

        let mut without_bus = snapshot.clone();
        without_bus.buses.retain(|m| m.bus.id != 10);
        without_bus.revision = 2;
        view.reconcile(&without_bus);
        assert_eq!(view.popup, None);
    }

    #[test]
    fn test_route_click_opens_popup_without_callback() {
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        let snapshot = create_test_snapshot();
        view.reconcile(&snapshot);

        let mut depot_clicked = false;
        let mut on_depot = |_: &Depot| depot_clicked = true;
        let mut callbacks = MapCallbacks {
            on_depot_click: Some(&mut on_depot),
            ..MapCallbacks::default()
        };
        view.dispatch(
            MapEvent::EntityClicked(EntityRef::Route(100)),
            &snapshot,
            &mut callbacks,
        );
        drop(callbacks);

        assert_eq!(view.popup, Some(EntityRef::Route(100)));
        assert!(!depot_clicked);

        // The popup follows the same vanish rule as markers.
        let mut without_route = snapshot.clone();
        without_route.routes.clear();
        without_route.revision = 2;
        view.reconcile(&without_route);
        assert_eq!(view.popup, None);
    }

    #[test]
    fn test_reconcile_without_surface_never_panics() {
        // Reconciliation must work (and stay registry-only) before the
        // surface exists, e.g. when the container was not ready at mount.
        let mut view = MapView::new(-7.2575, 112.7521, 7.0);
        view.reconcile(&create_test_snapshot());
        assert!(view.tiles.is_none());
        assert_eq!(view.layers().len(), 6);
    }
}
