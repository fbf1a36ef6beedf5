//! Leaf command handlers and their registration
//!
//! Every handler holds a clone of [`Services`], the shared handles it needs
//! to talk to the server and update local state. [`build_registry`] is the
//! one place handlers are constructed.

use std::sync::Arc;

use tradecmd_api::{Account, ApiError, GameClient};
use tradecmd_core::storage::TOKEN_KEY;
use tradecmd_core::{
    CommandRegistry, Console, FleetTracker, Handler, KeyValueStore, RouteScheduler, Session,
    ShipData, StateEvent, StateEvents,
};

mod account;
mod auto;
mod help;
mod market;
mod ship;
mod ships;

pub use account::{LoginHandler, LogoutHandler, TokenHandler};
pub use auto::AutoHandler;
pub use help::{HelpHandler, HelpTarget};
pub use market::{MarketHandler, Quantity};
pub use ship::ShipHandler;
pub use ships::ShipsHandler;

pub(crate) const UNKNOWN_SHIP: &str = "Invalid ship id. Please use number ids and not the full string id.";
pub(crate) const STATUS_UNAVAILABLE: &str = "Ship status unavailable. Use SHIPS refresh to fetch it.";

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct Services {
    pub client: Arc<GameClient>,
    pub session: Session,
    pub store: Arc<dyn KeyValueStore>,
    pub console: Console,
    pub events: StateEvents,
    pub fleet: Arc<FleetTracker>,
    pub scheduler: Arc<RouteScheduler>,
}

impl Services {
    /// Validate `token`, remember it and load the account's cached fleet
    /// and routes. Listeners refresh from the server on `SessionChanged`.
    pub async fn sign_in(&self, token: &str) -> Result<Account, ApiError> {
        let account = self.client.login(token).await?;
        self.session.sign_in(account.clone());

        if let Err(err) = self.store.set(TOKEN_KEY, token) {
            tracing::warn!(error = %err, "failed to save token");
        }

        let cached = self.fleet.load().await;
        self.scheduler.reload().await;
        tracing::debug!(username = %account.username, cached, "session started");

        self.events.publish(StateEvent::SessionChanged {
            username: Some(account.username.clone()),
        });
        Ok(account)
    }

    /// Forget the token and unload everything tied to the account
    pub async fn sign_out(&self) {
        self.client.logout();
        self.session.sign_out();

        if let Err(err) = self.store.remove(TOKEN_KEY) {
            tracing::warn!(error = %err, "failed to remove saved token");
        }

        self.fleet.clear().await;
        self.scheduler.reload().await;
        self.events
            .publish(StateEvent::SessionChanged { username: None });
    }

    /// Fetch ships from the server, logging instead of failing
    pub async fn resync_fleet(&self) {
        if let Err(err) = self.fleet.refresh(self.client.as_ref()).await {
            tracing::warn!(error = %err, "fleet refresh failed");
        }
    }

    /// Re-read the credit balance after the server refused a trade
    pub async fn resync_credits(&self) {
        match self.client.account().await {
            Ok(account) => self.session.set_credits(account.credits),
            Err(err) => tracing::warn!(error = %err, "could not refresh credits"),
        }
    }

    /// Look a ship up by local id or name, printing the standard message
    /// when there is none
    pub(crate) async fn find_ship(&self, key: &str) -> Option<ShipData> {
        let ship = self.fleet.find(key).await;
        if ship.is_none() {
            self.console.write_line(UNKNOWN_SHIP);
        }
        ship
    }
}

/// Construct every handler and register it. Duplicate names are logged
/// and skipped.
pub fn build_registry(services: &Services) -> Arc<CommandRegistry> {
    let help_target = HelpTarget::default();

    let handlers = vec![
        Handler::asynchronous(HelpHandler::new(services.console.clone(), help_target.clone())),
        Handler::asynchronous(LoginHandler::new(services.clone())),
        Handler::asynchronous(LogoutHandler::new(services.clone())),
        Handler::sync(TokenHandler::new(services.clone())),
        Handler::asynchronous(ShipsHandler::new(services.clone())),
        Handler::asynchronous(ShipHandler::new(services.clone())),
        Handler::asynchronous(MarketHandler::new(services.clone())),
        Handler::asynchronous(AutoHandler::new(services.clone())),
    ];

    let mut registry = CommandRegistry::new();
    for handler in handlers {
        let name = handler.name().to_string();
        if let Err(err) = registry.add(handler) {
            tracing::warn!(command = %name, error = %err, "skipping command");
        }
    }

    let registry = Arc::new(registry);
    help_target.bind(&registry);
    tracing::debug!(commands = ?registry.names(), "commands registered");
    registry
}

/// `help` or `?` as the only argument
pub(crate) fn wants_help(args: &[String]) -> bool {
    args.len() == 1 && (args[0] == "?" || args[0].eq_ignore_ascii_case("help"))
}

pub(crate) fn write_lines(console: &Console, lines: &[&str]) {
    for line in lines {
        console.write_line(*line);
    }
}
