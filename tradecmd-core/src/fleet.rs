//! Fleet tracker - Local view of the signed-in user's ships
//!
//! Two things keep the view current:
//! - `tick_at()`: a local clock reconciliation run every second. Counts each
//!   transit down against its arrival time and flags it concluded exactly
//!   once. Never touches the network.
//! - `refresh()`: re-fetches the ship list, merges it with the persisted
//!   record (dropping vanished ships, numbering new ones) and swaps the whole
//!   set in a single write, so a tick sees either the old or the new fleet.
//!   Ships updated locally while the fetch was in flight keep their local
//!   state, and a transit that concludes mid-refresh triggers another pass.
//!
//! Accessors hand out owned snapshots; all mutation goes through the tracker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tradecmd_api::{ApiError, Cargo, FlightPlan, GameClient, Ship};

use crate::events::{StateEvent, StateEvents};
use crate::naming::pick_name;
use crate::session::Session;
use crate::storage::{load_json, save_json, ship_key, KeyValueStore};

const FUEL: &str = "FUEL";

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("no such ship: {0}")]
    UnknownShip(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// SHIP STATE
// ============================================================================

/// A flight in progress, counted down locally between refreshes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transit {
    /// Flight plan id
    pub id: String,
    pub departure: String,
    pub destination: String,
    pub total_seconds: i64,
    pub remaining_seconds: i64,
    pub fuel_consumed: i64,
    pub created_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
}

impl Transit {
    pub fn from_plan(plan: &FlightPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: plan.id.clone(),
            departure: plan.departure.clone(),
            destination: plan.destination.clone(),
            total_seconds: (plan.arrives_at - plan.created_at).num_seconds().max(0),
            remaining_seconds: seconds_until(plan.arrives_at, now),
            fuel_consumed: plan.fuel_consumed,
            created_at: plan.created_at,
            arrives_at: plan.arrives_at,
        }
    }
}

/// Whole seconds from `now` until `at`, rounded up
pub fn seconds_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (at - now).num_milliseconds();
    millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) > 0)
}

/// One tracked ship
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipData {
    /// Short id typed by the user, stable for the life of the fleet record
    pub local_id: u32,
    pub server_id: String,
    pub display_name: String,
    #[serde(default)]
    pub transit: Option<Transit>,
    #[serde(default)]
    pub elapsed_seconds: i64,
    #[serde(default)]
    pub transit_concluded: bool,
    /// Latest server snapshot; filled in by refresh
    #[serde(skip)]
    pub status: Option<Ship>,
}

impl ShipData {
    fn discovered(local_id: u32, ship: Ship) -> Self {
        Self {
            local_id,
            server_id: ship.id.clone(),
            display_name: ship.id.clone(),
            transit: None,
            elapsed_seconds: 0,
            transit_concluded: false,
            status: Some(ship),
        }
    }

    pub fn docked_at(&self) -> Option<&str> {
        self.status.as_ref().and_then(Ship::docked_at)
    }

    pub fn is_docked(&self) -> bool {
        self.docked_at().is_some()
    }

    /// Travelling with a transit that has not yet run out
    pub fn in_transit(&self) -> bool {
        !self.is_docked() && self.transit.is_some() && !self.transit_concluded
    }
}

/// Persisted fleet state for one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetRecord {
    pub next_local_id: u32,
    pub ships: Vec<ShipData>,
}

impl Default for FleetRecord {
    fn default() -> Self {
        Self {
            next_local_id: 1,
            ships: Vec::new(),
        }
    }
}

impl FleetRecord {
    /// Merge an authoritative ship list: vanished ships are dropped, known
    /// ships get the new snapshot, new ships are appended with fresh ids.
    pub fn merge(&mut self, ships: Vec<Ship>) {
        let highest = self.ships.iter().map(|s| s.local_id).max().unwrap_or(0);
        self.next_local_id = self.next_local_id.max(highest + 1);

        self.ships
            .retain(|data| ships.iter().any(|ship| ship.id == data.server_id));

        for ship in ships {
            match self.ships.iter_mut().find(|d| d.server_id == ship.id) {
                Some(data) => data.status = Some(ship),
                None => {
                    let local_id = self.next_local_id;
                    self.next_local_id += 1;
                    self.ships.push(ShipData::discovered(local_id, ship));
                }
            }
        }
    }
}

/// Give every still-unnamed ship a name from the list, or its local id once
/// the list runs out. Ships already named are left alone.
pub fn assign_names(ships: &mut [ShipData]) {
    for i in 0..ships.len() {
        if ships[i].display_name != ships[i].server_id {
            continue;
        }

        let picked = {
            let in_use: Vec<&str> = ships.iter().map(|s| s.display_name.as_str()).collect();
            pick_name(&ships[i].server_id, &in_use)
        };

        ships[i].display_name = match picked {
            Some(name) => name.to_string(),
            None => ships[i].local_id.to_string(),
        };
    }
}

fn deduct_fuel(status: &mut Ship, consumed: i64) {
    if let Some(pos) = status.cargo.iter().position(|c| c.good == FUEL) {
        if consumed >= status.cargo[pos].quantity {
            status.cargo.remove(pos);
        } else {
            let fuel = &mut status.cargo[pos];
            fuel.quantity -= consumed;
            fuel.total_volume -= consumed;
        }
    }
    recount_space(status);
}

fn recount_space(status: &mut Ship) {
    let held: i64 = status.cargo.iter().map(|c| c.quantity).sum();
    status.space_available = status.max_cargo - held;
}

// ============================================================================
// REMOTE SEAM
// ============================================================================

/// The two calls a refresh needs
pub trait FleetApi: Send + Sync {
    fn list_ships(&self) -> BoxFuture<'_, tradecmd_api::Result<Vec<Ship>>>;
    fn flight_plan<'a>(&'a self, flight_plan_id: &'a str) -> BoxFuture<'a, tradecmd_api::Result<FlightPlan>>;
}

impl FleetApi for GameClient {
    fn list_ships(&self) -> BoxFuture<'_, tradecmd_api::Result<Vec<Ship>>> {
        self.ships().boxed()
    }

    fn flight_plan<'a>(&'a self, flight_plan_id: &'a str) -> BoxFuture<'a, tradecmd_api::Result<FlightPlan>> {
        GameClient::flight_plan(self, flight_plan_id).boxed()
    }
}

// ============================================================================
// TRACKER
// ============================================================================

/// Local revision of each ship, bumped by every local update
type Revisions = HashMap<String, u64>;

#[derive(Default)]
struct FleetState {
    owner: Option<String>,
    record: FleetRecord,
    revisions: Revisions,
}

pub struct FleetTracker {
    state: RwLock<FleetState>,
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
    /// Set when a transit concludes while a refresh is running
    rerun: AtomicBool,
    store: Arc<dyn KeyValueStore>,
    session: Session,
    events: StateEvents,
}

impl FleetTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, session: Session, events: StateEvents) -> Self {
        Self {
            state: RwLock::new(FleetState::default()),
            refresh_gate: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            store,
            session,
            events,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// All ships, ordered by local id
    pub async fn ships(&self) -> Vec<ShipData> {
        self.state.read().await.record.ships.clone()
    }

    pub async fn ship(&self, server_id: &str) -> Option<ShipData> {
        let state = self.state.read().await;
        state
            .record
            .ships
            .iter()
            .find(|s| s.server_id == server_id)
            .cloned()
    }

    /// Look a ship up by local id, then by display name ignoring case
    pub async fn find(&self, key: &str) -> Option<ShipData> {
        let key = key.trim();
        let state = self.state.read().await;
        let ships = &state.record.ships;

        ships
            .iter()
            .find(|s| s.local_id.to_string() == key)
            .or_else(|| {
                ships
                    .iter()
                    .find(|s| s.display_name.to_lowercase() == key.to_lowercase())
            })
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------------

    pub async fn tick(&self) -> Vec<ShipData> {
        self.tick_at(Utc::now()).await
    }

    /// Advance every running transit to `now`. Returns the ships whose
    /// transit concluded on this tick.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Vec<ShipData> {
        let (concluded, snapshot) = {
            let mut state = self.state.write().await;
            if state.owner.is_none() {
                return Vec::new();
            }

            let mut concluded = Vec::new();
            for ship in state.record.ships.iter_mut() {
                if !ship.in_transit() {
                    continue;
                }
                let Some(transit) = ship.transit.as_mut() else {
                    continue;
                };

                let remaining = seconds_until(transit.arrives_at, now);
                let passed = transit.remaining_seconds - remaining;
                transit.remaining_seconds = remaining;
                ship.elapsed_seconds += passed;

                if remaining < 0 {
                    ship.transit_concluded = true;
                    concluded.push(ship.clone());
                }
            }

            if !concluded.is_empty() {
                if self.is_refreshing() {
                    // The running refresh may hold a pre-arrival snapshot
                    self.rerun.store(true, Ordering::SeqCst);
                } else {
                    self.persist(&state);
                }
            }
            (concluded, state.record.ships.clone())
        };

        for ship in &concluded {
            tracing::info!(ship = %ship.display_name, "transit concluded");
            self.events
                .publish(StateEvent::TransitConcluded { ship: ship.clone() });
        }
        self.events
            .publish(StateEvent::FlightsUpdated { ships: snapshot });

        concluded
    }

    /// Tick every `every` until the returned task is aborted
    pub fn spawn_flight_ticker(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Rebuild the fleet from the server. Signed out, the fleet is cleared.
    /// Repeats while transits conclude during the rebuild.
    pub async fn refresh(&self, api: &dyn FleetApi) -> Result<(), FleetError> {
        let _gate = self.refresh_gate.lock().await;

        loop {
            self.rerun.store(false, Ordering::SeqCst);
            self.refreshing.store(true, Ordering::SeqCst);
            let result = self.rebuild(api).await;
            self.refreshing.store(false, Ordering::SeqCst);

            if !self.rerun.swap(false, Ordering::SeqCst) {
                return result;
            }
            if let Err(err) = result {
                tracing::warn!(error = %err, "refresh failed, retrying for concluded transit");
            } else {
                tracing::debug!("transit concluded during refresh, refreshing again");
            }
        }
    }

    async fn rebuild(&self, api: &dyn FleetApi) -> Result<(), FleetError> {
        let Some(username) = self.session.username() else {
            self.clear().await;
            return Ok(());
        };

        let started = self.state.read().await.revisions.clone();
        let ships = api.list_ships().await?;
        let mut record = self.base_record(&username).await;
        record.merge(ships);

        let now = Utc::now();
        for data in record.ships.iter_mut() {
            sync_transit(api, data, now).await;
        }
        assign_names(&mut record.ships);

        let snapshot = {
            let mut state = self.state.write().await;
            let revisions = if state.owner.as_deref() == Some(username.as_str()) {
                let kept = keep_local_changes(&mut record, &state, &started);
                if kept > 0 {
                    tracing::debug!(kept, "kept ships updated during refresh");
                }
                std::mem::take(&mut state.revisions)
            } else {
                Revisions::new()
            };

            *state = FleetState {
                owner: Some(username.clone()),
                record,
                revisions,
            };
            self.persist(&state);
            state.record.ships.clone()
        };

        tracing::info!(%username, ships = snapshot.len(), "fleet refreshed");
        self.events.publish(StateEvent::ShipsUpdated {
            ships: snapshot,
            full_refresh: true,
        });
        Ok(())
    }

    /// In-memory record if it belongs to `username`, else the stored one
    async fn base_record(&self, username: &str) -> FleetRecord {
        {
            let state = self.state.read().await;
            if state.owner.as_deref() == Some(username) {
                return state.record.clone();
            }
        }
        self.stored_record(username)
    }

    fn stored_record(&self, username: &str) -> FleetRecord {
        match load_json(self.store.as_ref(), &ship_key(username)) {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(%username, error = %err, "discarding unreadable fleet record");
                FleetRecord::default()
            }
        }
    }

    /// Load the persisted fleet for the signed-in user without contacting
    /// the server. Ship statuses stay empty until the next refresh.
    pub async fn load(&self) -> usize {
        let Some(username) = self.session.username() else {
            return 0;
        };

        let record = self.stored_record(&username);
        let snapshot = record.ships.clone();
        *self.state.write().await = FleetState {
            owner: Some(username),
            record,
            revisions: Revisions::new(),
        };

        let count = snapshot.len();
        self.events.publish(StateEvent::ShipsUpdated {
            ships: snapshot,
            full_refresh: false,
        });
        count
    }

    /// Forget every ship (sign-out)
    pub async fn clear(&self) {
        *self.state.write().await = FleetState::default();
        self.events.publish(StateEvent::ShipsUpdated {
            ships: Vec::new(),
            full_refresh: true,
        });
    }

    // ------------------------------------------------------------------------
    // Local updates
    // ------------------------------------------------------------------------

    pub async fn rename(&self, server_id: &str, name: &str) -> Result<ShipData, FleetError> {
        let name = name.to_string();
        let ship = self
            .update(server_id, move |ship| ship.display_name = name)
            .await?;
        self.publish_ships().await;
        Ok(ship)
    }

    /// Start a transit locally after the server accepted a flight plan
    pub async fn record_flight(&self, server_id: &str, plan: &FlightPlan) -> Result<ShipData, FleetError> {
        let now = Utc::now();
        let ship = self
            .update(server_id, |ship| {
                ship.transit = Some(Transit::from_plan(plan, now));
                ship.transit_concluded = false;
                ship.elapsed_seconds = 0;
                if let Some(status) = ship.status.as_mut() {
                    status.location = None;
                    status.flight_plan_id = Some(plan.id.clone());
                    deduct_fuel(status, plan.fuel_consumed);
                }
            })
            .await?;

        let ships = self.ships().await;
        self.events.publish(StateEvent::FlightsUpdated {
            ships: ships.clone(),
        });
        self.events.publish(StateEvent::ShipsUpdated {
            ships,
            full_refresh: false,
        });
        Ok(ship)
    }

    /// Replace a ship's hold after a trade
    pub async fn update_cargo(&self, server_id: &str, cargo: Vec<Cargo>) -> Result<ShipData, FleetError> {
        let ship = self
            .update(server_id, move |ship| {
                if let Some(status) = ship.status.as_mut() {
                    status.cargo = cargo;
                    recount_space(status);
                }
            })
            .await?;
        self.publish_ships().await;
        Ok(ship)
    }

    async fn update<F>(&self, server_id: &str, apply: F) -> Result<ShipData, FleetError>
    where
        F: FnOnce(&mut ShipData),
    {
        let mut state = self.state.write().await;
        let ship = state
            .record
            .ships
            .iter_mut()
            .find(|s| s.server_id == server_id)
            .ok_or_else(|| FleetError::UnknownShip(server_id.to_string()))?;

        apply(ship);
        let updated = ship.clone();
        let revision = state.revisions.entry(updated.server_id.clone()).or_default();
        *revision = revision.wrapping_add(1);
        self.persist(&state);
        Ok(updated)
    }

    async fn publish_ships(&self) {
        let ships = self.ships().await;
        self.events.publish(StateEvent::ShipsUpdated {
            ships,
            full_refresh: false,
        });
    }

    fn persist(&self, state: &FleetState) {
        let Some(owner) = state.owner.as_deref() else {
            return;
        };
        if let Err(err) = save_json(self.store.as_ref(), &ship_key(owner), &state.record) {
            tracing::warn!(error = %err, "failed to save fleet record");
        }
    }
}

/// Swap in the live copy of every ship whose revision moved since `started`.
/// Such a ship was updated after the server produced the merged snapshot.
fn keep_local_changes(record: &mut FleetRecord, live: &FleetState, started: &Revisions) -> usize {
    let mut kept = 0;
    for data in record.ships.iter_mut() {
        let revision = live.revisions.get(&data.server_id);
        if revision.is_none() || revision == started.get(&data.server_id) {
            continue;
        }
        if let Some(current) = live.record.ships.iter().find(|s| s.server_id == data.server_id) {
            *data = current.clone();
            kept += 1;
        }
    }
    kept
}

/// Bring a ship's transit in line with its server snapshot
async fn sync_transit(api: &dyn FleetApi, data: &mut ShipData, now: DateTime<Utc>) {
    if !data.is_docked() {
        let current = data
            .status
            .as_ref()
            .and_then(|s| s.flight_plan_id.clone());
        let cached = data.transit.as_ref().map(|t| t.id.clone());

        if cached != current {
            data.transit = None;
            if let Some(id) = current {
                match api.flight_plan(&id).await {
                    Ok(plan) => {
                        let transit = Transit::from_plan(&plan, now);
                        data.elapsed_seconds = (transit.total_seconds - transit.remaining_seconds).max(0);
                        data.transit = Some(transit);
                    }
                    Err(err) => {
                        tracing::warn!(ship = %data.server_id, error = %err, "could not fetch flight plan");
                    }
                }
            }
        }
    }

    if let Some(transit) = data.transit.as_mut() {
        transit.remaining_seconds = seconds_until(transit.arrives_at, now);
    }
    data.transit_concluded = data
        .transit
        .as_ref()
        .map_or(true, |t| t.remaining_seconds < 0);
}
