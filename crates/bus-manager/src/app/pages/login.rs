//! Login page

use crate::app::pages::Navigate;
use crate::app::ui_panels::error_banner;
use bus_manager_api::types::{AuthResponse, LoginRequest};
use bus_manager_api::{ApiClient, SharedSession};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

pub struct LoginPage {
    email: String,
    password: String,
    error: Option<String>,
    pending: Option<Receiver<bus_manager_api::Result<AuthResponse>>>,
}

impl LoginPage {
    pub fn new() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            error: None,
            pending: None,
        }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        client: &Arc<ApiClient>,
        session: &SharedSession,
    ) -> Option<Navigate> {
        let mut navigate = None;

        if let Some(rx) = &self.pending {
            match rx.try_recv() {
                Ok(Ok(auth)) => {
                    if let Ok(mut session) = session.write() {
                        session.set_token(auth.token);
                        session.set_user(auth.user);
                    }
                    self.pending = None;
                    navigate = Some(Navigate::ToDashboard);
                }
                Ok(Err(err)) => {
                    self.error = Some(err.to_string());
                    self.pending = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.error = Some("Login failed".to_string());
                    self.pending = None;
                }
            }
        }

        let busy = self.pending.is_some();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.2);
                ui.set_max_width(360.0);

                ui.heading("Bus Manager Login");
                ui.add_space(12.0);

                error_banner(ui, &mut self.error);

                ui.label("Email");
                ui.text_edit_singleline(&mut self.email);
                ui.add_space(6.0);

                ui.label("Password");
                ui.add(egui::TextEdit::singleline(&mut self.password).password(true));
                ui.add_space(12.0);

                let label = if busy { "Logging in..." } else { "Login" };
                if ui
                    .add_enabled(!busy, egui::Button::new(label))
                    .clicked()
                {
                    match validate_login(&self.email, &self.password) {
                        Ok(()) => self.submit(ctx, client),
                        Err(message) => self.error = Some(message),
                    }
                }

                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    ui.label("Don't have an account?");
                    if ui.link("Register here").clicked() {
                        navigate = Some(Navigate::ToRegister);
                    }
                });
            });
        });

        navigate
    }

    fn submit(&mut self, ctx: &egui::Context, client: &Arc<ApiClient>) {
        let (tx, rx) = mpsc::channel();
        self.pending = Some(rx);
        self.error = None;

        let request = LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let result = client.login(&request).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }
}

/// Client-side validation; failures block submission without a network call.
pub(crate) fn validate_login(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Email and password are required".to_string());
    }
    if !email.contains('@') {
        return Err("Enter a valid email address".to_string());
    }
    if password.len() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_login_requires_both_fields() {
        assert!(validate_login("", "secret1").is_err());
        assert!(validate_login("a@b.c", "").is_err());
    }

    #[test]
    fn test_validate_login_rejects_short_password() {
        assert!(validate_login("a@b.c", "12345").is_err());
        assert!(validate_login("a@b.c", "123456").is_ok());
    }

    #[test]
    fn test_validate_login_wants_an_email() {
        assert!(validate_login("not-an-email", "secret1").is_err());
    }
}
