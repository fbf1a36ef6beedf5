//! TradeCommander Core - Command dispatch, fleet tracking and route automation
//!
//! This crate provides the client's engine:
//! - A quoting-aware tokenizer and a registry of sync/async command handlers
//! - A dispatcher enforcing login and background-execution policy
//! - A fleet tracker reconciling ship transits against the clock
//! - Routes and the scheduler that drives ships through them
//! - Session, console output, state events and key/value persistence

pub mod command;
pub mod console;
pub mod dispatcher;
pub mod events;
pub mod fleet;
pub mod naming;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod tokenizer;

// Re-exports for convenient access
pub use command::{AsyncCommandHandler, CommandHandler, CommandRegistry, CommandResult, Handler, Invocation, RegisterError};
pub use console::{Console, ConsoleOutput};
pub use dispatcher::{Dispatcher, Rejection};
pub use events::{StateEvent, StateEvents};
pub use fleet::{FleetApi, FleetError, FleetRecord, FleetTracker, ShipData, Transit};
pub use routes::{Assignment, Route, RouteBook, RouteCommand, RouteError, RouteShip};
pub use scheduler::{RouteScheduler, TickOutcome, SHIP_PLACEHOLDER};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use tokenizer::{tokenize, CommandLine, TokenizeError};
