//! TradeCommander CLI - Wiring and command handlers for the `tradecmd` binary
//!
//! Modules:
//! - config: command-line arguments resolved into a validated ClientConfig
//! - app: component wiring and background tasks
//! - handlers: HELP, LOGIN, LOGOUT, SHIPS, SHIP, MARKET and AUTO
//! - shell: interactive read loop and one-shot execution

pub mod app;
pub mod config;
pub mod handlers;
pub mod shell;

pub use app::App;
pub use config::{configure, ClientConfig, ConnectionArgs};
