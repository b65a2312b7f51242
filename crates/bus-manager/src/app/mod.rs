//! Application shell
//!
//! Owns the page router and the persisted session. Routing is a small state
//! machine over three pages; a cleared session (logout or any 401) forces
//! the dashboard back to the login page on the next frame.

pub(crate) mod map_view;
pub(crate) mod pages;
pub(crate) mod plugin;
pub mod settings;
pub(crate) mod ui_panels;

use crate::app::pages::{DashboardPage, LoginPage, Navigate, RegisterPage};
use crate::app::settings::Settings;
use bus_manager_api::{ApiClient, Session, SharedSession};
use std::sync::Arc;

const SESSION_STORAGE_KEY: &str = "session";

enum Page {
    Login(LoginPage),
    Register(RegisterPage),
    Dashboard(Box<DashboardPage>),
}

pub struct BusManagerApp {
    settings: Settings,
    session: SharedSession,
    client: Arc<ApiClient>,
    page: Page,
}

impl BusManagerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        session: SharedSession,
        client: Arc<ApiClient>,
    ) -> Self {
        let stored = cc
            .storage
            .and_then(|storage| storage.get_string(SESSION_STORAGE_KEY));
        let restored = Session::from_json(stored.as_deref());
        let authenticated = restored.is_authenticated();
        if let Ok(mut guard) = session.write() {
            *guard = restored;
        }

        let page = if authenticated {
            tracing::info!("restored a persisted session, revalidating");
            spawn_session_refresh(&cc.egui_ctx, &client, &session);
            Page::Dashboard(Box::new(DashboardPage::new(&settings)))
        } else {
            Page::Login(LoginPage::new())
        };

        Self {
            settings,
            session,
            client,
            page,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .map(|session| session.is_authenticated())
            .unwrap_or(false)
    }

    fn navigate(&mut self, target: Navigate) {
        self.page = match target {
            Navigate::ToLogin => Page::Login(LoginPage::new()),
            Navigate::ToRegister => Page::Register(RegisterPage::new()),
            Navigate::ToDashboard => Page::Dashboard(Box::new(DashboardPage::new(&self.settings))),
        };
    }
}

impl eframe::App for BusManagerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        profiling::scope!("BusManagerApp::update");

        if matches!(self.page, Page::Dashboard(_)) && !self.is_authenticated() {
            self.navigate(Navigate::ToLogin);
        }

        let navigate = match &mut self.page {
            Page::Login(page) => page.show(ctx, &self.client, &self.session),
            Page::Register(page) => page.show(ctx, &self.client, &self.session),
            Page::Dashboard(page) => page.show(ctx, &self.client, &self.session),
        };

        if let Some(target) = navigate {
            self.navigate(target);
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(session) = self.session.read() {
            storage.set_string(SESSION_STORAGE_KEY, session.to_json());
        }
    }
}

/// Revalidate a restored token against the server and refresh the cached
/// user profile. A 401 clears the session inside the client, which routes
/// back to the login page.
fn spawn_session_refresh(ctx: &egui::Context, client: &Arc<ApiClient>, session: &SharedSession) {
    let ctx = ctx.clone();
    let client = client.clone();
    let session = session.clone();
    tokio::spawn(async move {
        match client.refresh().await {
            Ok(auth) => {
                if let Ok(mut session) = session.write() {
                    session.set_token(auth.token);
                    session.set_user(auth.user);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed");
            }
        }
        ctx.request_repaint();
    });
}
