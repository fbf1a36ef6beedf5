//! Shared fixtures: an in-process stand-in for the ship endpoints and a
//! signed-in fleet wired to an in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Notify;
use tradecmd_api::{Account, ApiError, FlightPlan, Ship};
use tradecmd_core::{
    Console, ConsoleOutput, FleetApi, FleetTracker, KeyValueStore, MemoryStore, Session,
    StateEvents,
};

pub const USER: &str = "trader";

#[derive(Default)]
pub struct StubFleet {
    ships: Mutex<Vec<Ship>>,
    plans: Mutex<HashMap<String, FlightPlan>>,
    plan_fetches: AtomicUsize,
}

impl StubFleet {
    pub fn new(ships: Vec<Ship>) -> Arc<Self> {
        let stub = Self::default();
        *stub.ships.lock().unwrap() = ships;
        Arc::new(stub)
    }

    pub fn set_ships(&self, ships: Vec<Ship>) {
        *self.ships.lock().unwrap() = ships;
    }

    pub fn add_plan(&self, plan: FlightPlan) {
        self.plans.lock().unwrap().insert(plan.id.clone(), plan);
    }

    pub fn plan_fetches(&self) -> usize {
        self.plan_fetches.load(Ordering::SeqCst)
    }
}

impl FleetApi for StubFleet {
    fn list_ships(&self) -> BoxFuture<'_, tradecmd_api::Result<Vec<Ship>>> {
        let ships = self.ships.lock().unwrap().clone();
        async move { Ok(ships) }.boxed()
    }

    fn flight_plan<'a>(&'a self, flight_plan_id: &'a str) -> BoxFuture<'a, tradecmd_api::Result<FlightPlan>> {
        self.plan_fetches.fetch_add(1, Ordering::SeqCst);
        let plan = self.plans.lock().unwrap().get(flight_plan_id).cloned();
        async move {
            plan.ok_or(ApiError::Remote {
                status: 404,
                code: 404,
                message: "Flight plan not found.".to_string(),
            })
        }
        .boxed()
    }
}

/// Wraps a [`StubFleet`] and can hold one ship listing after the server
/// has produced it, so tests can act while that listing is in flight
pub struct GatedFleet {
    inner: Arc<StubFleet>,
    hold: AtomicBool,
    listings: AtomicUsize,
    entered: Notify,
    release: Notify,
}

impl GatedFleet {
    pub fn new(inner: Arc<StubFleet>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            hold: AtomicBool::new(true),
            listings: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    /// Wait until the held listing has been produced
    pub async fn held(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

impl FleetApi for GatedFleet {
    fn list_ships(&self) -> BoxFuture<'_, tradecmd_api::Result<Vec<Ship>>> {
        async move {
            self.listings.fetch_add(1, Ordering::SeqCst);
            let ships = self.inner.list_ships().await?;
            if self.hold.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(ships)
        }
        .boxed()
    }

    fn flight_plan<'a>(&'a self, flight_plan_id: &'a str) -> BoxFuture<'a, tradecmd_api::Result<FlightPlan>> {
        self.inner.flight_plan(flight_plan_id)
    }
}

pub fn docked(id: &str, location: &str) -> Ship {
    Ship {
        id: id.to_string(),
        location: Some(location.to_string()),
        max_cargo: 100,
        ..Default::default()
    }
}

pub fn travelling(id: &str, flight_plan_id: &str) -> Ship {
    Ship {
        id: id.to_string(),
        flight_plan_id: Some(flight_plan_id.to_string()),
        max_cargo: 100,
        ..Default::default()
    }
}

pub fn flight(id: &str, ship_id: &str, created_at: DateTime<Utc>, arrives_at: DateTime<Utc>) -> FlightPlan {
    FlightPlan {
        id: id.to_string(),
        ship_id: ship_id.to_string(),
        fuel_consumed: 2,
        fuel_remaining: 18,
        time_remaining_in_seconds: (arrives_at - created_at).num_seconds(),
        arrives_at,
        created_at,
        terminated_at: None,
        destination: "OE-CR".to_string(),
        departure: "OE-PM".to_string(),
        distance: 12,
    }
}

/// A signed-in session with a fleet backed by an in-memory store
pub struct FleetHarness {
    pub session: Session,
    pub store: Arc<dyn KeyValueStore>,
    pub events: StateEvents,
    pub console: Console,
    pub output: ConsoleOutput,
    pub fleet: Arc<FleetTracker>,
}

impl FleetHarness {
    pub fn signed_in() -> Self {
        let session = Session::new();
        session.sign_in(Account {
            username: USER.to_string(),
            credits: 1000,
        });

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let events = StateEvents::new();
        let (console, output) = Console::channel();
        let fleet = Arc::new(FleetTracker::new(Arc::clone(&store), session.clone(), events.clone()));

        Self {
            session,
            store,
            events,
            console,
            output,
            fleet,
        }
    }
}
