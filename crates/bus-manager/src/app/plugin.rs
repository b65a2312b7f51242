//! Walkers plugin for drawing fleet layers on the map
//!
//! This plugin renders the layer registry built by the map view controller
//! (depot markers, status-colored bus glyphs, dashed route lines), hit-tests
//! pointer clicks against markers and route lines, and reports interactions
//! back through
//! a shared event queue. It never resolves entities itself; it only carries
//! the entity kind and id, and the controller looks the record up against
//! the live collections.

use crate::app::map_view::{EntityRef, Layer};
use egui::{Align2, Color32, FontId, Pos2, Stroke};
use std::sync::{Arc, Mutex};
use walkers::{Plugin, Projector};

/// Route overlay color (dashed blue line).
const ROUTE_COLOR: Color32 = Color32::from_rgb(0x21, 0x96, 0xf3);
/// Depot marker fill.
const DEPOT_COLOR: Color32 = Color32::from_rgb(0x1f, 0x63, 0xcf);

const DEPOT_RADIUS: f32 = 7.0;
const BUS_RADIUS: f32 = 10.0;
/// Extra slack around a marker that still counts as a hit.
const HIT_SLACK: f32 = 4.0;
/// Distance from a route line that still counts as a hit.
const ROUTE_HIT_DISTANCE: f32 = 6.0;

/// Synthetic interaction event, drained by the controller after each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapEvent {
    /// A depot or bus marker body was clicked.
    EntityClicked(EntityRef),
    /// The map background was clicked (only reported when the host view
    /// installed a map-click handler).
    MapClicked { lat: f64, lng: f64 },
}

/// Per-frame rendering and hit-testing of the fleet layers.
pub struct FleetPlugin {
    layers: Arc<Vec<Layer>>,
    events: Arc<Mutex<Vec<MapEvent>>>,
    /// Screen anchor of the currently open popup, updated every frame so the
    /// popup follows its marker when the map pans.
    popup_anchor: Arc<Mutex<Option<Pos2>>>,
    popup_entity: Option<EntityRef>,
    report_map_clicks: bool,
}

impl FleetPlugin {
    pub fn new(
        layers: Arc<Vec<Layer>>,
        events: Arc<Mutex<Vec<MapEvent>>>,
        popup_anchor: Arc<Mutex<Option<Pos2>>>,
        popup_entity: Option<EntityRef>,
        report_map_clicks: bool,
    ) -> Self {
        Self {
            layers,
            events,
            popup_anchor,
            popup_entity,
            report_map_clicks,
        }
    }

    fn push_event(&self, event: MapEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

fn project(projector: &Projector, lat: f64, lng: f64) -> Pos2 {
    let screen_vec = projector.project(walkers::lat_lon(lat, lng));
    Pos2::new(screen_vec.x, screen_vec.y)
}

fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

impl Plugin for FleetPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("FleetPlugin::run");

        let painter = ui.painter();
        let mut popup_anchor: Option<Pos2> = None;

        // Route overlays first so markers draw on top of them.
        for layer in self.layers.iter() {
            if let Layer::Route {
                id,
                origin_lat,
                origin_lng,
                dest_lat,
                dest_lng,
                ..
            } = layer
            {
                let from = project(projector, *origin_lat, *origin_lng);
                let to = project(projector, *dest_lat, *dest_lng);
                painter.extend(egui::Shape::dashed_line(
                    &[from, to],
                    Stroke::new(3.0, ROUTE_COLOR),
                    10.0,
                    10.0,
                ));
                if self.popup_entity == Some(EntityRef::Route(*id)) {
                    popup_anchor = Some(from + (to - from) * 0.5);
                }
            }
        }

        for layer in self.layers.iter() {
            match layer {
                Layer::Depot {
                    id,
                    latitude,
                    longitude,
                    ..
                } => {
                    let pos = project(projector, *latitude, *longitude);
                    painter.circle_filled(pos, DEPOT_RADIUS, DEPOT_COLOR);
                    painter.circle_stroke(pos, DEPOT_RADIUS, Stroke::new(2.0, Color32::WHITE));
                    if self.popup_entity == Some(EntityRef::Depot(*id)) {
                        popup_anchor = Some(pos);
                    }
                }
                Layer::Bus {
                    id,
                    color,
                    latitude,
                    longitude,
                    ..
                } => {
                    let pos = project(projector, *latitude, *longitude);
                    painter.circle_filled(pos, BUS_RADIUS, *color);
                    painter.circle_stroke(pos, BUS_RADIUS, Stroke::new(2.0, Color32::WHITE));
                    painter.text(
                        pos,
                        Align2::CENTER_CENTER,
                        "🚌",
                        FontId::proportional(12.0),
                        Color32::WHITE,
                    );
                    if self.popup_entity == Some(EntityRef::Bus(*id)) {
                        popup_anchor = Some(pos);
                    }
                }
                Layer::Route { .. } => {}
            }
        }

        if let Ok(mut anchor) = self.popup_anchor.lock() {
            *anchor = popup_anchor;
        }

        if response.clicked()
            && let Some(pointer) = response.interact_pointer_pos()
        {
            // Nearest marker within its hit radius wins; a marker hit
            // suppresses the background map-click for this frame. Routes
            // are only hit when no marker is, since they pass under the
            // markers visually as well.
            let mut best: Option<(f32, EntityRef)> = None;
            for layer in self.layers.iter() {
                let (entity, pos, radius) = match layer {
                    Layer::Depot {
                        id,
                        latitude,
                        longitude,
                        ..
                    } => (
                        EntityRef::Depot(*id),
                        project(projector, *latitude, *longitude),
                        DEPOT_RADIUS,
                    ),
                    Layer::Bus {
                        id,
                        latitude,
                        longitude,
                        ..
                    } => (
                        EntityRef::Bus(*id),
                        project(projector, *latitude, *longitude),
                        BUS_RADIUS,
                    ),
                    Layer::Route { .. } => continue,
                };

                let distance = pointer.distance(pos);
                if distance <= radius + HIT_SLACK
                    && best.is_none_or(|(best_distance, _)| distance < best_distance)
                {
                    best = Some((distance, entity));
                }
            }

            if best.is_none() {
                for layer in self.layers.iter() {
                    let Layer::Route {
                        id,
                        origin_lat,
                        origin_lng,
                        dest_lat,
                        dest_lng,
                        ..
                    } = layer
                    else {
                        continue;
                    };
                    let from = project(projector, *origin_lat, *origin_lng);
                    let to = project(projector, *dest_lat, *dest_lng);
                    let distance = distance_to_segment(pointer, from, to);
                    if distance <= ROUTE_HIT_DISTANCE
                        && best.is_none_or(|(best_distance, _)| distance < best_distance)
                    {
                        best = Some((distance, EntityRef::Route(*id)));
                    }
                }
            }

            if let Some((_, entity)) = best {
                self.push_event(MapEvent::EntityClicked(entity));
            } else if self.report_map_clicks {
                let position = projector.unproject(egui::Vec2::new(pointer.x, pointer.y));
                self.push_event(MapEvent::MapClicked {
                    lat: position.y(),
                    lng: position.x(),
                });
            }
        }
    }
}
