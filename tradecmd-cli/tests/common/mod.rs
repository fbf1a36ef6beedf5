//! Shared fixtures: a local axum server standing in for the game API and an
//! app wired against it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tradecmd_cli::{App, ClientConfig};
use tradecmd_core::ConsoleOutput;

pub const TOKEN: &str = "good-token";
pub const STARTING_CREDITS: i64 = 1000;
pub const FUEL_PRICE: i64 = 2;
/// Purchases of exactly this many units are refused by the mock server
pub const REFUSED_QUANTITY: i64 = 13;

#[derive(Clone)]
pub struct MockState {
    pub credits: Arc<AtomicI64>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            credits: Arc::new(AtomicI64::new(STARTING_CREDITS)),
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn remote_error(status: StatusCode, code: i64, message: &str) -> Response {
    (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
}

fn unauthorized() -> Response {
    remote_error(StatusCode::UNAUTHORIZED, 40101, "Token was invalid or missing.")
}

fn flight_plan(id: &str, ship_id: &Value, departure: &str, destination: &Value, seconds: i64) -> Value {
    let now = Utc::now();
    json!({
        "id": id,
        "shipId": ship_id,
        "fuelConsumed": 2,
        "fuelRemaining": 18,
        "timeRemainingInSeconds": seconds,
        "createdAt": now.to_rfc3339(),
        "arrivesAt": (now + Duration::seconds(seconds)).to_rfc3339(),
        "departure": departure,
        "destination": destination,
        "distance": 10
    })
}

// ============================================================================
// ROUTES
// ============================================================================

async fn account(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let credits = state.credits.load(Ordering::SeqCst);
    Json(json!({ "user": { "username": "trader", "credits": credits } })).into_response()
}

async fn ships(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "ships": [
            {
                "id": "ship-a",
                "location": "OE-PM",
                "type": "JW-MK-I",
                "class": "MK-I",
                "manufacturer": "Jackshaw",
                "maxCargo": 50,
                "spaceAvailable": 30,
                "cargo": [{ "good": "FUEL", "quantity": 20, "totalVolume": 20 }],
                "speed": 1,
                "plating": 5,
                "weapons": 5
            },
            {
                "id": "ship-b",
                "flightPlanId": "fp-b",
                "type": "GR-MK-I",
                "class": "MK-I",
                "manufacturer": "Gravager",
                "maxCargo": 100,
                "spaceAvailable": 100,
                "cargo": []
            }
        ]
    }))
    .into_response()
}

async fn get_flight(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != "fp-b" {
        return remote_error(StatusCode::NOT_FOUND, 404, "Flight plan not found.");
    }
    Json(json!({ "flightPlan": flight_plan("fp-b", &json!("ship-b"), "OE-PM", &json!("OE-CR"), 3600) }))
        .into_response()
}

async fn create_flight(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["destination"] == "OE-PM" {
        return remote_error(StatusCode::BAD_REQUEST, 400, "Ship destination is same as departure.");
    }
    if body["destination"] == "NOWHERE" {
        return remote_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            404,
            "Destination does not exist. Please specify a valid destination.",
        );
    }
    Json(json!({
        "flightPlan": flight_plan("fp-new", &body["shipId"], "OE-PM", &body["destination"], 60)
    }))
    .into_response()
}

async fn warp(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    remote_error(StatusCode::BAD_REQUEST, 400, "Ship is not docked at a wormhole.")
}

async fn marketplace(headers: HeaderMap, Path(symbol): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if symbol != "OE-PM" {
        return remote_error(StatusCode::NOT_FOUND, 404, "Location not found.");
    }
    Json(json!({
        "marketplace": [
            {
                "symbol": "FUEL",
                "pricePerUnit": FUEL_PRICE,
                "purchasePricePerUnit": FUEL_PRICE,
                "sellPricePerUnit": 1,
                "quantityAvailable": 500,
                "volumePerUnit": 1,
                "spread": 1
            },
            {
                "symbol": "METALS",
                "pricePerUnit": 5,
                "purchasePricePerUnit": 5,
                "sellPricePerUnit": 4,
                "quantityAvailable": 0,
                "volumePerUnit": 1,
                "spread": 1
            }
        ]
    }))
    .into_response()
}

async fn purchase(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let quantity = body["quantity"].as_i64().unwrap_or_default();
    if quantity == REFUSED_QUANTITY {
        return remote_error(StatusCode::BAD_REQUEST, 400, "Purchase could not be completed.");
    }
    let total = quantity * FUEL_PRICE;
    let credits = state.credits.fetch_sub(total, Ordering::SeqCst) - total;
    let held = 20 + quantity;

    (
        StatusCode::CREATED,
        Json(json!({
            "credits": credits,
            "order": { "good": body["good"], "quantity": quantity, "pricePerUnit": FUEL_PRICE, "total": total },
            "ship": {
                "id": body["shipId"],
                "location": "OE-PM",
                "maxCargo": 50,
                "spaceAvailable": 50 - held,
                "cargo": [{ "good": "FUEL", "quantity": held, "totalVolume": held }]
            }
        })),
    )
        .into_response()
}

async fn sell(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let quantity = body["quantity"].as_i64().unwrap_or_default();
    let credits = state.credits.fetch_add(quantity, Ordering::SeqCst) + quantity;

    (
        StatusCode::CREATED,
        Json(json!({
            "credits": credits,
            "order": { "good": body["good"], "quantity": quantity, "pricePerUnit": 1, "total": quantity },
            "ship": { "id": body["shipId"], "location": "OE-PM", "maxCargo": 50, "spaceAvailable": 50, "cargo": [] }
        })),
    )
        .into_response()
}

pub async fn spawn_mock() -> (String, MockState) {
    let state = MockState::default();
    let router = Router::new()
        .route("/my/account", get(account))
        .route("/users/trader/ships", get(ships))
        .route("/users/trader/flight-plans", post(create_flight))
        .route("/users/trader/flight-plans/:id", get(get_flight))
        .route("/users/trader/warp-jump", post(warp))
        .route("/users/trader/purchase-orders", post(purchase))
        .route("/users/trader/sell-orders", post(sell))
        .route("/game/locations/:symbol/marketplace", get(marketplace))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

// ============================================================================
// APP FIXTURES
// ============================================================================

pub struct Client {
    pub app: App,
    pub output: ConsoleOutput,
    pub mock: MockState,
}

impl Client {
    /// Signed-out app talking to a fresh mock, state kept in memory
    pub async fn new() -> Self {
        let (base_url, mock) = spawn_mock().await;
        Self::with_config(config(&base_url), mock)
    }

    pub fn with_config(config: ClientConfig, mock: MockState) -> Self {
        let (app, output) = App::build(&config).unwrap();
        Self { app, output, mock }
    }

    /// Signed in with the fleet fetched and routes loaded
    pub async fn signed_in() -> Self {
        let mut client = Self::new().await;
        client.login().await;
        client
    }

    pub async fn login(&mut self) {
        assert!(self.app.execute(&format!("LOGIN {TOKEN}")).await.is_success());
        self.app.sync().await;
        self.output.drain();
    }

    /// Run a line and return what it printed
    pub async fn run(&mut self, line: &str) -> (tradecmd_core::CommandResult, Vec<String>) {
        let result = self.app.execute(line).await;
        (result, self.output.drain())
    }
}

pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig::in_memory()
        .with_base_url(base_url)
        .with_rate_limit(50)
}
