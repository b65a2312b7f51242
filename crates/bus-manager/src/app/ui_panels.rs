//! UI panels for the application
//!
//! Reusable widgets shared by the pages: the dismissible error banner, the
//! dashboard side-panel sections, and currency formatting.

use crate::app::map_view::{MapView, TilesProvider, bus_status_color};
use bus_manager_api::types::{Bus, BusStatus, Depot, Trip};
use egui::{Color32, RichText, Ui};

/// Dismissible inline error message. Network and API failures end up here;
/// nothing rendered by this banner is fatal.
pub fn error_banner(ui: &mut Ui, error: &mut Option<String>) {
    let Some(message) = error.clone() else {
        return;
    };

    egui::Frame::group(ui.style())
        .fill(Color32::from_rgb(0xfd, 0xec, 0xea))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(Color32::from_rgb(0xb7, 0x1c, 0x1c), message);
                if ui.small_button("✕").clicked() {
                    *error = None;
                }
            });
        });
    ui.add_space(4.0);
}

/// Render the quick stats section
pub fn quick_stats_panel(ui: &mut Ui, depots: &[Depot], buses: &[Bus], active_trips: &[Trip]) {
    ui.heading("Quick Stats");
    ui.separator();

    let available = buses
        .iter()
        .filter(|b| b.status == BusStatus::Available)
        .count();

    stat_row(ui, "Depots:", &depots.len().to_string(), None);
    stat_row(ui, "Buses:", &buses.len().to_string(), None);
    stat_row(ui, "Active Trips:", &active_trips.len().to_string(), None);
    stat_row(
        ui,
        "Available Buses:",
        &available.to_string(),
        Some(bus_status_color(BusStatus::Available)),
    );
}

fn stat_row(ui: &mut Ui, label: &str, value: &str, color: Option<Color32>) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let text = RichText::new(value).strong();
            match color {
                Some(color) => ui.label(text.color(color)),
                None => ui.label(text),
            };
        });
    });
}

/// Render the active trips section
pub fn active_trips_panel(ui: &mut Ui, trips: &[Trip]) {
    ui.heading("Active Trips");
    ui.separator();

    if trips.is_empty() {
        ui.label(RichText::new("No active trips").italics().weak());
        return;
    }

    egui::ScrollArea::vertical()
        .max_height(220.0)
        .show(ui, |ui| {
            for trip in trips {
                let bus_name = trip
                    .bus
                    .as_ref()
                    .map(|b| b.name.clone())
                    .unwrap_or_else(|| format!("Bus #{}", trip.bus_id));
                let route_label = trip
                    .route
                    .as_ref()
                    .map(|r| format!("{} → {}", r.origin, r.destination))
                    .unwrap_or_else(|| format!("Route #{}", trip.route_id));

                ui.label(RichText::new(format!("{bus_name} • {route_label}")).strong());
                ui.label(
                    RichText::new(format!(
                        "Progress: {:.0}% • {} passengers",
                        trip.progress, trip.passengers
                    ))
                    .small(),
                );
                ui.add(egui::ProgressBar::new((trip.progress / 100.0) as f32));
                ui.add_space(6.0);
            }
        });
}

/// Render whatever the user last selected on the map
pub fn selection_panel(ui: &mut Ui, depot: Option<&Depot>, bus: Option<&Bus>) {
    if depot.is_none() && bus.is_none() {
        return;
    }

    ui.heading("Selection");
    ui.separator();

    if let Some(depot) = depot {
        ui.label(RichText::new(&depot.name).strong());
        ui.label(format!("Depot #{} • level {}", depot.id, depot.level));
        ui.label(format!(
            "Buses: {}/{}",
            depot.current_buses, depot.capacity
        ));
        ui.label(format!(
            "({:.4}, {:.4})",
            depot.latitude, depot.longitude
        ));
        ui.add_space(4.0);
    }

    if let Some(bus) = bus {
        ui.label(RichText::new(&bus.name).strong());
        ui.label(format!("Bus #{} • {}", bus.id, bus.kind));
        ui.horizontal(|ui| {
            ui.label("Status:");
            ui.colored_label(bus_status_color(bus.status), bus.status.label());
        });
        ui.label(format!("Capacity: {} seats", bus.capacity));
        ui.add_space(4.0);
    }
}

/// Render the tile provider picker
pub fn tiles_provider_panel(ui: &mut Ui, map: &mut MapView) {
    ui.heading("Map Tiles");
    ui.separator();

    for provider in TilesProvider::all() {
        let selected = map.provider() == *provider;
        if ui.selectable_label(selected, provider.name()).clicked() {
            map.set_provider(*provider);
        }
    }
    ui.label(
        RichText::new(map.provider().attribution())
            .small()
            .italics(),
    );
}

/// Format a balance as Indonesian Rupiah, dot-grouped with no decimals,
/// e.g. `Rp 1.000.000`.
pub fn format_rupiah(amount: f64) -> String {
    let negative = amount < 0.0;
    let whole = amount.abs().round() as u64;
    let grouped = format_number_with_dots(whole);
    if negative {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Helper to format numbers with id-ID dot separators
fn format_number_with_dots(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
