//! Route scheduler - Drives assigned ships through their routes
//!
//! Architecture:
//! - Level 1: tick() - one pass over every assignment under the route lock
//! - Level 2: run_assignment() - advance the cursor, dispatch, evict on failure
//!
//! The route lock is taken with `try_lock` by ticks, so a tick that fires
//! while the previous one is still dispatching is skipped outright. Manual
//! edits and `reload()` wait for the lock instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::console::Console;
use crate::dispatcher::Dispatcher;
use crate::events::StateEvents;
use crate::fleet::{FleetTracker, ShipData};
use crate::routes::{Assignment, Route, RouteBook, RouteCommand, RouteError};
use crate::session::Session;
use crate::storage::{load_json, route_key, save_json, KeyValueStore};

/// Replaced by the ship's local id before a route command is dispatched
pub const SHIP_PLACEHOLDER: &str = "$s";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The previous tick still held the lock
    Skipped,
    /// No routes loaded (signed out)
    Idle,
    /// Commands dispatched this tick, and how many of them evicted their ship
    Completed { executed: usize, evicted: usize },
}

enum Step {
    Waiting,
    Ran,
    Evicted,
}

struct LoadedRoutes {
    owner: String,
    book: RouteBook,
}

pub struct RouteScheduler {
    routes: Mutex<Option<LoadedRoutes>>,
    fleet: Arc<FleetTracker>,
    store: Arc<dyn KeyValueStore>,
    session: Session,
    events: StateEvents,
    console: Console,
}

impl RouteScheduler {
    pub fn new(
        fleet: Arc<FleetTracker>,
        store: Arc<dyn KeyValueStore>,
        session: Session,
        events: StateEvents,
        console: Console,
    ) -> Self {
        Self {
            routes: Mutex::new(None),
            fleet,
            store,
            session,
            events,
            console,
        }
    }

    // ========================================================================
    // Level 1 - TICK
    // ========================================================================

    /// Run one scheduler pass, dispatching through `dispatcher` in background
    /// mode. Never waits for the route lock.
    pub async fn tick(&self, dispatcher: &Dispatcher) -> TickOutcome {
        let Ok(mut guard) = self.routes.try_lock() else {
            tracing::trace!("route tick skipped, previous tick still running");
            return TickOutcome::Skipped;
        };
        let Some(loaded) = guard.as_mut() else {
            return TickOutcome::Idle;
        };

        let mut executed = 0;
        let mut evicted = 0;
        for (route_id, ship_id) in loaded.book.assignments() {
            match self
                .run_assignment(dispatcher, &mut loaded.book, route_id, &ship_id)
                .await
            {
                Step::Waiting => {}
                Step::Ran => executed += 1,
                Step::Evicted => {
                    executed += 1;
                    evicted += 1;
                }
            }
        }

        self.save(loaded);
        self.events.routes_updated(loaded.book.to_vec());
        TickOutcome::Completed { executed, evicted }
    }

    /// Dispatch a tick every `every` until the returned task is aborted.
    /// Each tick runs as its own task so a slow tick makes the next one skip.
    pub fn spawn_route_runner(self: Arc<Self>, dispatcher: Dispatcher, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let scheduler = Arc::clone(&self);
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let TickOutcome::Completed { executed, evicted } = scheduler.tick(&dispatcher).await {
                        if executed > 0 {
                            tracing::debug!(executed, evicted, "route tick finished");
                        }
                    }
                });
            }
        })
    }

    // ========================================================================
    // Level 2 - ONE ASSIGNMENT
    // ========================================================================

    async fn run_assignment(
        &self,
        dispatcher: &Dispatcher,
        book: &mut RouteBook,
        route_id: u32,
        ship_id: &str,
    ) -> Step {
        // Only docked ships advance
        let Some(ship) = self.fleet.ship(ship_id).await else {
            return Step::Waiting;
        };
        if !ship.is_docked() {
            return Step::Waiting;
        }

        let Some(command) = book.advance(route_id, ship_id) else {
            return Step::Waiting;
        };

        let line = command
            .command
            .replace(SHIP_PLACEHOLDER, &ship.local_id.to_string());
        let result = dispatcher.dispatch(&line, true).await;
        if result.is_success() {
            return Step::Ran;
        }

        // The assignment may be gone already; either way it is gone now
        let _ = book.unassign(route_id, ship_id);
        tracing::warn!(route = route_id, ship = %ship.display_name, command = %command.command, ?result, "ship evicted from route");
        self.console.write_line(format!(
            "Command failed for {} during route. Ship removed from route.",
            ship.display_name
        ));
        self.console
            .write_line(format!("Command failed: {}", command.command));
        Step::Evicted
    }

    // ========================================================================
    // MANUAL EDITS
    // ========================================================================

    pub async fn is_loaded(&self) -> bool {
        self.routes.lock().await.is_some()
    }

    /// Snapshot of every route, `None` while signed out
    pub async fn routes(&self) -> Option<Vec<Route>> {
        self.routes
            .lock()
            .await
            .as_ref()
            .map(|loaded| loaded.book.to_vec())
    }

    pub async fn route(&self, id: u32) -> Result<Route, RouteError> {
        let guard = self.routes.lock().await;
        let loaded = guard.as_ref().ok_or(RouteError::NotLoaded)?;
        loaded
            .book
            .get(id)
            .cloned()
            .ok_or(RouteError::UnknownRoute(id))
    }

    pub async fn create_route(&self, name: &str) -> Result<u32, RouteError> {
        self.edit(|book| Ok(book.create(name))).await
    }

    pub async fn delete_route(&self, id: u32) -> Result<Route, RouteError> {
        self.edit(|book| book.delete(id)).await
    }

    pub async fn add_command(&self, id: u32, position: Option<i64>, command: &str) -> Result<usize, RouteError> {
        self.edit(|book| book.add_command(id, position, command))
            .await
    }

    pub async fn remove_command(&self, id: u32, position: i64) -> Result<RouteCommand, RouteError> {
        self.edit(|book| book.remove_command(id, position)).await
    }

    /// Put the ship named by `ship_key` (local id or name) on a route
    pub async fn assign(&self, id: u32, ship_key: &str) -> Result<(Assignment, ShipData), RouteError> {
        let mut guard = self.routes.lock().await;
        let loaded = guard.as_mut().ok_or(RouteError::NotLoaded)?;
        if loaded.book.get(id).is_none() {
            return Err(RouteError::UnknownRoute(id));
        }
        let ship = self.find_ship(ship_key).await?;

        let outcome = loaded.book.assign(id, &ship.server_id)?;
        if outcome == Assignment::Added {
            self.save(loaded);
            self.events.routes_updated(loaded.book.to_vec());
        }
        Ok((outcome, ship))
    }

    /// Take the ship named by `ship_key` off a route. The flag is false if
    /// it was not on the route.
    pub async fn unassign(&self, id: u32, ship_key: &str) -> Result<(bool, ShipData), RouteError> {
        let mut guard = self.routes.lock().await;
        let loaded = guard.as_mut().ok_or(RouteError::NotLoaded)?;
        if loaded.book.get(id).is_none() {
            return Err(RouteError::UnknownRoute(id));
        }
        let ship = self.find_ship(ship_key).await?;

        let removed = loaded.book.unassign(id, &ship.server_id)?;
        if removed {
            self.save(loaded);
            self.events.routes_updated(loaded.book.to_vec());
        }
        Ok((removed, ship))
    }

    /// Load the signed-in user's routes and drop assignments to ships the
    /// fleet no longer has. Signed out, routes are unloaded.
    pub async fn reload(&self) {
        let mut guard = self.routes.lock().await;

        *guard = match self.session.username() {
            Some(owner) => {
                let mut book = match load_json::<RouteBook>(self.store.as_ref(), &route_key(&owner)) {
                    Ok(book) => book.unwrap_or_default(),
                    Err(err) => {
                        tracing::warn!(%owner, error = %err, "discarding unreadable route data");
                        RouteBook::default()
                    }
                };

                // An empty fleet has not been fetched yet; keep assignments
                let ships = self.fleet.ships().await;
                if !ships.is_empty() {
                    let dropped = book.relink(|id| ships.iter().any(|s| s.server_id == id));
                    if dropped > 0 {
                        tracing::info!(dropped, "dropped route assignments for vanished ships");
                    }
                }

                let loaded = LoadedRoutes { owner, book };
                self.save(&loaded);
                Some(loaded)
            }
            None => None,
        };

        let routes = guard
            .as_ref()
            .map(|loaded| loaded.book.to_vec())
            .unwrap_or_default();
        self.events.routes_updated(routes);
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn edit<T>(&self, apply: impl FnOnce(&mut RouteBook) -> Result<T, RouteError>) -> Result<T, RouteError> {
        let mut guard = self.routes.lock().await;
        let loaded = guard.as_mut().ok_or(RouteError::NotLoaded)?;

        let value = apply(&mut loaded.book)?;
        self.save(loaded);
        self.events.routes_updated(loaded.book.to_vec());
        Ok(value)
    }

    async fn find_ship(&self, ship_key: &str) -> Result<ShipData, RouteError> {
        self.fleet
            .find(ship_key)
            .await
            .ok_or_else(|| RouteError::UnknownShip(ship_key.to_string()))
    }

    fn save(&self, loaded: &LoadedRoutes) {
        if let Err(err) = save_json(self.store.as_ref(), &route_key(&loaded.owner), &loaded.book) {
            tracing::warn!(error = %err, "failed to save route data");
        }
    }
}
