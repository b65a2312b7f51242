//! Page views
//!
//! Each page owns its form state and any in-flight request channels; the
//! app shell routes between them via [`Navigate`] intents. Dropping a page
//! drops its receivers, so responses that arrive after the page is gone are
//! discarded instead of being applied to torn-down state.

mod dashboard;
mod login;
mod register;

pub use dashboard::DashboardPage;
pub use login::LoginPage;
pub use register::RegisterPage;

/// Navigation intent returned by a page to the app shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigate {
    ToLogin,
    ToRegister,
    ToDashboard,
}
