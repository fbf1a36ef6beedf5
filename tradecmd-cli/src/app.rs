//! Application wiring - build the client, engine and handlers, then run the
//! background tasks that keep them moving
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: App::build(), App::start_background(), App::restore_session()
//! - Level 2: open_store(), spawn_state_reactor(), react()
//! - Level 3: (delegated to tradecmd-core)
//! - Level 4: ClientConfig

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use tradecmd_api::{GameClient, RateLimitedTransport};
use tradecmd_core::storage::TOKEN_KEY;
use tradecmd_core::{
    CommandResult, Console, ConsoleOutput, Dispatcher, FileStore, FleetTracker, KeyValueStore,
    MemoryStore, RouteScheduler, Session, StateEvent, StateEvents,
};

use crate::config::ClientConfig;
use crate::handlers::{build_registry, Services};

/// A fully wired client
pub struct App {
    services: Services,
    dispatcher: Dispatcher,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    // ========================================================================
    // LEVEL 1 - ORCHESTRATION
    // ========================================================================

    /// Wire every component. Must run inside a tokio runtime.
    ///
    /// This function reads like a table of contents:
    /// 1. Open storage
    /// 2. Build the rate-limited API client
    /// 3. Build fleet tracker and route scheduler
    /// 4. Register handlers behind a dispatcher
    pub fn build(config: &ClientConfig) -> Result<(Self, ConsoleOutput)> {
        config.validate()?;

        let store = open_store(config)?;
        let transport = RateLimitedTransport::per_second(config.requests_per_second);
        let client = Arc::new(GameClient::new(config.base_url.clone(), transport));

        let session = Session::new();
        let events = StateEvents::new();
        let (console, output) = Console::channel();

        let fleet = Arc::new(FleetTracker::new(
            Arc::clone(&store),
            session.clone(),
            events.clone(),
        ));
        let scheduler = Arc::new(RouteScheduler::new(
            Arc::clone(&fleet),
            Arc::clone(&store),
            session.clone(),
            events.clone(),
            console.clone(),
        ));

        let services = Services {
            client,
            session: session.clone(),
            store,
            console: console.clone(),
            events,
            fleet,
            scheduler,
        };
        let dispatcher = Dispatcher::new(build_registry(&services), session, console);

        tracing::info!(base_url = %config.base_url, rate = config.requests_per_second, "client ready");
        Ok((
            Self {
                services,
                dispatcher,
                tasks: Vec::new(),
            },
            output,
        ))
    }

    /// Start the flight ticker, route runner and state reactor
    pub fn start_background(&mut self, config: &ClientConfig) {
        let fleet = Arc::clone(&self.services.fleet);
        let scheduler = Arc::clone(&self.services.scheduler);

        self.tasks.push(fleet.spawn_flight_ticker(config.flight_tick));
        self.tasks
            .push(scheduler.spawn_route_runner(self.dispatcher.clone(), config.route_tick));
        self.tasks
            .push(spawn_state_reactor(self.services.clone()));
    }

    /// Sign in with `token`, or with the saved token when `None`.
    /// Returns whether a session is now active.
    pub async fn restore_session(&self, token: Option<String>) -> bool {
        let saved = || match self.services.store.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read saved token");
                None
            }
        };
        let Some(token) = token.or_else(saved) else {
            return false;
        };

        match self.services.sign_in(&token).await {
            Ok(account) => {
                self.services
                    .console
                    .write_line(format!("Welcome back, {}.", account.username));
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not restore session");
                self.services
                    .console
                    .write_line("Saved login could not be used. Use LOGIN <Token> to sign in.");
                false
            }
        }
    }

    /// Refresh the fleet and reload routes without waiting for the reactor
    pub async fn sync(&self) {
        if !self.services.session.is_authenticated() {
            return;
        }
        self.services.resync_fleet().await;
        self.services.scheduler.reload().await;
    }

    /// Run one line typed by the user
    pub async fn execute(&self, line: &str) -> CommandResult {
        self.dispatcher.dispatch(line, false).await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Stop every background task
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn open_store(config: &ClientConfig) -> Result<Arc<dyn KeyValueStore>> {
    match &config.data_dir {
        Some(dir) => {
            let store = FileStore::new(dir)
                .with_context(|| format!("failed to open data directory {}", dir.display()))?;
            tracing::debug!(dir = %store.root().display(), "using file store");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

fn spawn_state_reactor(services: Services) -> JoinHandle<()> {
    let mut events = services.events.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => react(&services, event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "state reactor fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// React to one state change:
/// - sign-in → refresh the fleet from the server
/// - transit concluded → refresh unless one is already running (a running
///   refresh repeats itself for arrivals it overlapped)
/// - full fleet refresh → reload routes against the new fleet
///
/// Never awaits, so the reactor keeps draining the channel while a route
/// tick holds the route lock.
fn react(services: &Services, event: StateEvent) {
    match event {
        StateEvent::SessionChanged {
            username: Some(username),
        } => {
            tracing::debug!(%username, "session started, refreshing fleet");
            spawn_refresh(services);
        }
        StateEvent::TransitConcluded { ship } => {
            if !services.fleet.is_refreshing() {
                tracing::debug!(ship = %ship.display_name, "arrival, refreshing fleet");
                spawn_refresh(services);
            }
        }
        StateEvent::ShipsUpdated {
            full_refresh: true, ..
        } => spawn_reload(services),
        _ => {}
    }
}

fn spawn_refresh(services: &Services) {
    let services = services.clone();
    tokio::spawn(async move { services.resync_fleet().await });
}

fn spawn_reload(services: &Services) {
    let scheduler = Arc::clone(&services.scheduler);
    tokio::spawn(async move { scheduler.reload().await });
}
