//! Client configuration - resolve command-line arguments into a ClientConfig
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: configure() - orchestration
//! - Level 2: resolve_data_dir(), ClientConfig::validate()
//! - Level 3: (field checks)
//! - Level 4: ConnectionArgs, ClientConfig defaults

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use tradecmd_api::DEFAULT_BASE_URL;

/// Requests per second the public server tolerates
pub const DEFAULT_RATE_LIMIT: u32 = 2;
pub const MAX_RATE_LIMIT: u32 = 50;

const DATA_DIR_NAME: &str = ".tradecmd";

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Game API base URL
    #[arg(long, env = "TRADECMD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum requests per second sent to the API
    #[arg(long, env = "TRADECMD_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: u32,

    /// Directory holding the saved token, fleet and routes
    #[arg(long, env = "TRADECMD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep all state in memory for this run
    #[arg(long, conflicts_with = "data_dir")]
    pub ephemeral: bool,

    /// Token to sign in with at startup instead of the saved one
    #[arg(long, env = "TRADECMD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Everything the client needs to start
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub requests_per_second: u32,
    /// Interval between route scheduler passes
    pub route_tick: Duration,
    /// Interval between transit clock updates
    pub flight_tick: Duration,
    /// Where state is persisted; `None` keeps it in memory
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: DEFAULT_RATE_LIMIT,
            route_tick: Duration::from_secs(1),
            flight_tick: Duration::from_secs(1),
            data_dir: default_data_dir(),
        }
    }
}

impl ClientConfig {
    /// Defaults with nothing persisted
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_route_tick(mut self, every: Duration) -> Self {
        self.route_tick = every;
        self
    }

    pub fn with_flight_tick(mut self, every: Duration) -> Self {
        self.flight_tick = every;
        self
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.base_url)?;

        if self.requests_per_second == 0 || self.requests_per_second > MAX_RATE_LIMIT {
            anyhow::bail!(
                "Rate limit must be between 1 and {} requests per second, got {}",
                MAX_RATE_LIMIT,
                self.requests_per_second
            );
        }
        if self.route_tick.is_zero() || self.flight_tick.is_zero() {
            anyhow::bail!("Tick intervals must be greater than zero");
        }
        if let Some(dir) = &self.data_dir {
            if dir.exists() && !dir.is_dir() {
                anyhow::bail!("Data path exists but is not a directory: {}", dir.display());
            }
        }

        Ok(())
    }
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Build a validated configuration from command arguments
pub fn configure(args: &ConnectionArgs) -> Result<ClientConfig> {
    let config = ClientConfig {
        base_url: args.base_url.trim().to_string(),
        requests_per_second: args.rate_limit,
        data_dir: resolve_data_dir(args),
        ..ClientConfig::default()
    };

    config.validate()?;
    Ok(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn resolve_data_dir(args: &ConnectionArgs) -> Option<PathBuf> {
    if args.ephemeral {
        return None;
    }

    let dir = args.data_dir.clone().or_else(default_data_dir);
    if dir.is_none() {
        tracing::warn!("No home directory found. State will not be saved between runs.");
    }
    dir
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// `~/.tradecmd`, if a home directory is known
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

fn validate_base_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => Ok(()),
        _ => anyhow::bail!("Base URL must be an http(s) URL with a host: {:?}", url),
    }
}

// ============================================================================
// TESTS
// ============================================================================
