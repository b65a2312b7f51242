#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use bus_manager::{BusManagerApp, Settings};
use bus_manager_api::{ApiClient, Session, session};
use std::sync::Arc;

fn main() {
    setup_logging();

    let settings = Settings::from_cli();
    let session = session::shared(Session::new());
    let client = match ApiClient::new(&settings.api_url, session.clone()) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::error!("cannot start: {err}");
            std::process::exit(2);
        }
    };

    // The tokio runtime must outlive the UI loop: pages spawn fetch tasks
    // onto it from inside eframe callbacks.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    rt.block_on(async {
        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1280.0, 720.0])
                .with_title("Bus Manager"),
            ..Default::default()
        };

        let _ = eframe::run_native(
            "Bus Manager",
            native_options,
            Box::new(move |cc| Ok(Box::new(BusManagerApp::new(cc, settings, session, client)))),
        );
    });
}

/// Initialize tracing with an env-driven filter; default to info-level
/// output for our crates when RUST_LOG is unset.
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bus_manager=debug,bus_manager_api=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
