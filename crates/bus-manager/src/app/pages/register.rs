//! Registration page

use crate::app::pages::Navigate;
use crate::app::ui_panels::error_banner;
use bus_manager_api::types::{AuthResponse, RegisterRequest};
use bus_manager_api::{ApiClient, SharedSession};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

pub struct RegisterPage {
    email: String,
    username: String,
    password: String,
    confirm_password: String,
    error: Option<String>,
    pending: Option<Receiver<bus_manager_api::Result<AuthResponse>>>,
}

impl RegisterPage {
    pub fn new() -> Self {
        Self {
            email: String::new(),
            username: String::new(),
            password: String::new(),
            confirm_password: String::new(),
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
                    self.error = Some("Registration failed".to_string());
                    self.pending = None;
                }
            }
        }

        let busy = self.pending.is_some();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.15);
                ui.set_max_width(360.0);

                ui.heading("Register for Bus Manager");
                ui.add_space(12.0);

                error_banner(ui, &mut self.error);

                ui.label("Email");
                ui.text_edit_singleline(&mut self.email);
                ui.add_space(6.0);

                ui.label("Username");
                ui.text_edit_singleline(&mut self.username);
                ui.add_space(6.0);

                ui.label("Password");
                ui.add(egui::TextEdit::singleline(&mut self.password).password(true));
                ui.add_space(6.0);

                ui.label("Confirm Password");
                ui.add(egui::TextEdit::singleline(&mut self.confirm_password).password(true));
                ui.add_space(12.0);

                let label = if busy { "Registering..." } else { "Register" };
                if ui
                    .add_enabled(!busy, egui::Button::new(label))
                    .clicked()
                {
                    match validate_register(
                        &self.email,
                        &self.username,
                        &self.password,
                        &self.confirm_password,
                    ) {
                        Ok(()) => self.submit(ctx, client),
                        Err(message) => self.error = Some(message),
                    }
                }

                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    ui.label("Already have an account?");
                    if ui.link("Login here").clicked() {
                        navigate = Some(Navigate::ToLogin);
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

        let request = RegisterRequest {
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        };
        let client = client.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let result = client.register(&request).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }
}

/// Client-side validation; failures block submission without a network call.
pub(crate) fn validate_register(
    email: &str,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), String> {
    if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err("All fields are required".to_string());
    }
    if !email.contains('@') {
        return Err("Enter a valid email address".to_string());
    }
    if password != confirm_password {
        return Err("Passwords do not match".to_string());
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
    fn test_validate_register_requires_all_fields() {
        assert!(validate_register("", "driver", "secret1", "secret1").is_err());
        assert!(validate_register("a@b.c", "", "secret1", "secret1").is_err());
        assert!(validate_register("a@b.c", "driver", "", "").is_err());
    }

    #[test]
    fn test_validate_register_checks_password_confirmation() {
        assert!(validate_register("a@b.c", "driver", "secret1", "secret2").is_err());
        assert!(validate_register("a@b.c", "driver", "secret1", "secret1").is_ok());
    }

    #[test]
    fn test_validate_register_rejects_short_password() {
        assert!(validate_register("a@b.c", "driver", "12345", "12345").is_err());
    }
}
