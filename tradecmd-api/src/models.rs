//! Wire models for the SpaceTraders v1 API
//!
//! Field names follow the server's camelCase JSON. Optional or rarely
//! populated fields default so partial payloads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed-in user account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub credits: i64,
}

/// A ship as reported by the server
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ship {
    pub id: String,
    /// Current flight plan, present while the ship is travelling
    pub flight_plan_id: Option<String>,
    /// Docked location symbol, absent while the ship is travelling
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub ship_type: String,
    pub class: String,
    pub manufacturer: String,
    pub space_available: i64,
    pub max_cargo: i64,
    pub cargo: Vec<Cargo>,
    pub speed: i64,
    pub plating: i64,
    pub weapons: i64,
}

impl Ship {
    /// Docked location, treating an empty symbol as no location
    pub fn docked_at(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// A stack of goods in a ship's hold
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cargo {
    pub good: String,
    pub quantity: i64,
    #[serde(default)]
    pub total_volume: i64,
}

/// Server-authoritative description of a flight
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPlan {
    pub id: String,
    #[serde(default)]
    pub ship_id: String,
    #[serde(default)]
    pub fuel_consumed: i64,
    #[serde(default)]
    pub fuel_remaining: i64,
    #[serde(default)]
    pub time_remaining_in_seconds: i64,
    pub arrives_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub terminated_at: Option<DateTime<Utc>>,
    pub destination: String,
    pub departure: String,
    #[serde(default)]
    pub distance: i64,
}

/// One good listed on a location's marketplace
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketGood {
    pub symbol: String,
    pub price_per_unit: i64,
    pub purchase_price_per_unit: i64,
    pub sell_price_per_unit: i64,
    pub quantity_available: i64,
    pub volume_per_unit: i64,
    pub spread: i64,
}

/// Executed buy or sell order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub good: String,
    pub quantity: i64,
    pub price_per_unit: i64,
    pub total: i64,
}

/// Result of a purchase or sell order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub credits: i64,
    pub order: Order,
    pub ship: Ship,
}

// ============================================================================
// REQUEST BODIES AND RESPONSE ENVELOPES
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlightRequest<'a> {
    pub ship_id: &'a str,
    pub destination: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WarpRequest<'a> {
    pub ship_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionRequest<'a> {
    pub ship_id: &'a str,
    pub good: &'a str,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub(crate) struct AccountResponse {
    pub user: Account,
}

#[derive(Deserialize)]
pub(crate) struct ShipsResponse {
    #[serde(default)]
    pub ships: Vec<Ship>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlightResponse {
    pub flight_plan: FlightPlan,
}

#[derive(Deserialize)]
pub(crate) struct MarketResponse {
    #[serde(default)]
    pub marketplace: Vec<MarketGood>,
}

/// `{ "error": { "code": .., "message": .. } }`
#[derive(Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: RemoteError,
}

#[derive(Deserialize)]
pub(crate) struct RemoteError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
