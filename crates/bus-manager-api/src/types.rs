//! Wire data model for the Bus Manager game API
//!
//! Field names and shapes follow the backend JSON exactly; timestamps are
//! kept as RFC 3339 strings since the client only ever displays them.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    /// Balance in Indonesian Rupiah.
    pub money: f64,
    pub reputation: i64,
    pub level: i64,
    pub experience: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default)]
    pub current_buses: i64,
    #[serde(default)]
    pub level: i64,
}

/// Operational status of a bus. The backend may grow new statuses before the
/// client does, so anything unrecognized lands on [`BusStatus::Unknown`]
/// instead of failing deserialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    #[default]
    Available,
    OnTrip,
    Maintenance,
    #[serde(other)]
    Unknown,
}

impl BusStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::OnTrip => "on trip",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: u64,
    pub company_id: u64,
    pub depot_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capacity: i64,
    #[serde(default)]
    pub fuel_capacity: f64,
    #[serde(default)]
    pub current_fuel: f64,
    #[serde(default)]
    pub range: f64,
    pub service_type: String,
    pub status: BusStatus,
    #[serde(default)]
    pub condition: f64,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub operating_cost: f64,
    /// Embedded depot when the backend preloads the association.
    #[serde(default)]
    pub depot: Option<Depot>,
}

/// A point-to-point route segment between two cities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub base_fare: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    #[serde(default)]
    pub experience: i64,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: u64,
    pub bus_id: u64,
    pub route_id: u64,
    #[serde(default)]
    pub driver_id: u64,
    pub status: String,
    #[serde(default)]
    pub passengers: i64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub profit: f64,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_lat: Option<f64>,
    #[serde(default)]
    pub current_lng: Option<f64>,
    #[serde(default)]
    pub bus: Option<Bus>,
    #[serde(default)]
    pub route: Option<Route>,
    #[serde(default)]
    pub driver: Option<Driver>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateCompanyRequest {
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateDepotRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateBusRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capacity: i64,
    pub service_type: String,
    pub purchase_price: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateTripRequest {
    pub bus_id: u64,
    pub route_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<u64>,
}
