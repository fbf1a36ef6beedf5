//! TradeCommander API - Rate-limited access to the SpaceTraders game API
//!
//! This crate provides the remote side of the client:
//! - Wire models for accounts, ships, flight plans and markets
//! - A permit-pool rate limiter refilled at a steady rate
//! - A transport that throttles every request and retries on 429
//! - A typed client for the endpoints the command handlers use

mod client;
mod error;
pub mod models;
mod ratelimit;
mod transport;

// Re-exports for convenient access
pub use client::{GameClient, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use models::{Account, Cargo, FlightPlan, MarketGood, Order, Ship, TransactionResult};
pub use ratelimit::RateLimiter;
pub use transport::RateLimitedTransport;
