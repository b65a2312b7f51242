//! Bus Manager - Application Library
//!
//! This is the application crate that combines the API client with the
//! egui/eframe front-end: page routing, the interactive company map, and
//! the creation flows for company and depot.

mod app;

pub use app::BusManagerApp;
pub use app::settings::Settings;
