//! MARKET - market listings and trading
//!
//! ## Architecture
//!
//! - Level 1: run() - subcommand selection
//! - Level 2: list(), buy(), sell()
//! - Level 3: plan_purchase(), plan_sale() - pure quantity arithmetic
//!
//! Route-driven trades (background) never evict a ship over market
//! conditions: out of stock, no space or no credits are reported and the
//! command still succeeds so the route keeps running.

use futures::future::{BoxFuture, FutureExt};
use tradecmd_api::{ApiError, MarketGood, Ship, TransactionResult};
use tradecmd_core::{AsyncCommandHandler, CommandResult, Invocation, ShipData};

use super::{wants_help, write_lines, Services, STATUS_UNAVAILABLE};

const NOT_LISTED: &str = "good is not listed in planet marketplace";

/// Buy or sell amount as typed by the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    /// `N`: exactly N units
    Flat(i64),
    /// `max`: as many as possible
    Max,
    /// `mN`: buy up to N held, or sell down to N held
    UpTo(i64),
    /// `N%`: a share of cargo capacity (buy) or of the held amount (sell)
    Percent(i64),
}

impl Quantity {
    /// `None` for malformed input or amounts below 1
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text == "max" {
            return Some(Quantity::Max);
        }

        let (number, wrap): (&str, fn(i64) -> Quantity) = if let Some(rest) = text.strip_prefix('m') {
            (rest, Quantity::UpTo)
        } else if let Some(rest) = text.strip_suffix('%') {
            (rest, Quantity::Percent)
        } else {
            (text.as_str(), Quantity::Flat)
        };

        number.parse::<i64>().ok().filter(|n| *n >= 1).map(wrap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Notice {
    Maximum,
    LimitedByStock,
    LimitedBySpace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Purchase {
    Buy { quantity: i64, notice: Option<Notice> },
    AlreadyStocked,
    OutOfStock,
    NoSpace,
    NoCredits,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sale {
    Sell { quantity: i64, notice: Option<Notice> },
    AlreadyBelow,
}

pub struct MarketHandler {
    services: Services,
}

impl MarketHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    // ========================================================================
    // LEVEL 1 - SUBCOMMANDS
    // ========================================================================

    async fn run(&self, args: &[String], invocation: Invocation) -> CommandResult {
        let background = invocation.background;

        if !background && wants_help(args) {
            write_lines(
                &self.services.console,
                &[
                    "MARKET: Provides functions for interacting with the marketplace.",
                    "Subcommands",
                    "list: Displays the market data for a given location - MARKET list <Location Symbol/Ship Id>",
                    "buy: Purchase cargo from a market for the given ship - MARKET <Ship Id> buy <Good> <Quantity>",
                    "sell: Sell cargo to a market from the given ship - MARKET <Ship Id> sell <Good> <Quantity>",
                    "  Buy and sell quantities support the following formats:",
                    "  [number]: A flat number amount to buy or sell.",
                    "  max: Purchase or sell the maximum quantity possible.",
                    "  m[number]: Buy up to an amount or sell down to an amount.",
                    "  [number]%: Buy a percent of the available ship space or sell a percent of the amount in cargo.",
                ],
            );
            return CommandResult::Success;
        }

        match args {
            [sub, target] if sub.eq_ignore_ascii_case("list") && !background => self.list(target).await,
            [ship, sub, good, quantity] if sub.eq_ignore_ascii_case("buy") => {
                self.buy(ship, good, quantity, background).await
            }
            [ship, sub, good, quantity] if sub.eq_ignore_ascii_case("sell") => {
                self.sell(ship, good, quantity, background).await
            }
            _ => CommandResult::Invalid,
        }
    }

    // ========================================================================
    // LEVEL 2 - ACTIONS
    // ========================================================================

    async fn list(&self, target: &str) -> CommandResult {
        let console = &self.services.console;

        let symbol = match self.services.fleet.find(target).await {
            Some(ship) => match ship.docked_at() {
                Some(location) => location.to_string(),
                None => {
                    console.write_line("Ship is not currently docked.");
                    return CommandResult::Failure;
                }
            },
            None => target.to_uppercase(),
        };

        match self.services.client.marketplace(&symbol).await {
            Ok(goods) => {
                console.write_line(format!("Displaying market data for {symbol}."));
                console.write_line(format!(
                    "{:<24} {:>8} {:>8} {:>10} {:>6}",
                    "Good", "Buy", "Sell", "Available", "Volume"
                ));
                for good in &goods {
                    console.write_line(format!(
                        "{:<24} {:>8} {:>8} {:>10} {:>6}",
                        good.symbol,
                        unit_price(good),
                        good.sell_price_per_unit,
                        good.quantity_available,
                        good.volume_per_unit
                    ));
                }
                CommandResult::Success
            }
            Err(err) => {
                tracing::debug!(%symbol, error = %err, "market lookup failed");
                console.write_line(format!("Market data unavailable for {symbol}."));
                CommandResult::Failure
            }
        }
    }

    async fn buy(&self, key: &str, good: &str, quantity: &str, background: bool) -> CommandResult {
        let console = &self.services.console;

        let Some((ship, status, location)) = self.docked_ship(key).await else {
            return CommandResult::Failure;
        };
        let Some(requested) = Quantity::parse(quantity) else {
            console.write_line("Invalid quantity provided. Must be at least 1.");
            return CommandResult::Failure;
        };

        let goods = match self.services.client.marketplace(&location).await {
            Ok(goods) => goods,
            Err(err) => {
                tracing::warn!(%location, error = %err, "market lookup failed");
                console.write_line("An unknown error occurred while fetching market data. Please try again.");
                return CommandResult::Failure;
            }
        };
        let symbol = good.to_uppercase();
        let Some(listing) = goods.iter().find(|g| g.symbol == symbol) else {
            console.write_line("The good specified could not be found at this ships market.");
            return CommandResult::Failure;
        };

        let credits = self
            .services
            .session
            .account()
            .map(|a| a.credits)
            .unwrap_or_default();

        let result = match plan_purchase(requested, listing, &status, credits) {
            Purchase::AlreadyStocked => {
                if !background {
                    console.write_line("Cargo already at or over given buy limit.");
                }
                return CommandResult::Success;
            }
            Purchase::OutOfStock => {
                console.write_line(if background {
                    "Market in route is out of stock. Attempting to continue."
                } else {
                    "The good specified is not in stock at this ships market."
                });
                CommandResult::Failure
            }
            Purchase::NoSpace => {
                console.write_line(if background {
                    "Route ship has insufficient cargo space. Attempting to continue."
                } else {
                    "Insufficient cargo space available for any purchase of this good."
                });
                CommandResult::Failure
            }
            Purchase::NoCredits => {
                console.write_line(if background {
                    "Insufficient credits available for route purchase. Attempting to continue."
                } else {
                    "Insufficient credits available for purchase."
                });
                CommandResult::Failure
            }
            Purchase::Buy { quantity, notice } => {
                if !background {
                    match notice {
                        Some(Notice::Maximum) => console
                            .write_line(format!("Purchasing maximum. Purchase quantity: {quantity}.")),
                        Some(Notice::LimitedByStock) => console.write_line(
                            "Insufficient quantity available for purchase. Purchasing maximum.",
                        ),
                        Some(Notice::LimitedBySpace) => console.write_line(
                            "Insufficient cargo space available for purchase. Purchasing maximum.",
                        ),
                        None => {}
                    }
                }

                match self
                    .services
                    .client
                    .purchase(&ship.server_id, &listing.symbol, quantity)
                    .await
                {
                    Ok(outcome) => {
                        let total = outcome.order.total;
                        self.settle(outcome).await;
                        if !background {
                            console.write_line(format!(
                                "{quantity} units of cargo purchased successfully. Total cost: {total} credits."
                            ));
                        }
                        return CommandResult::Success;
                    }
                    Err(err) => {
                        console.write_line(error_message(&err));
                        self.services.resync_credits().await;
                        if background {
                            console.write_line(
                                "Unhandled error occurred during route purchase. Attempting to continue.",
                            );
                        }
                        CommandResult::Failure
                    }
                }
            }
        };

        if background {
            CommandResult::Success
        } else {
            result
        }
    }

    async fn sell(&self, key: &str, good: &str, quantity: &str, background: bool) -> CommandResult {
        let console = &self.services.console;

        let Some((ship, status, _)) = self.docked_ship(key).await else {
            return CommandResult::Failure;
        };
        let Some(requested) = Quantity::parse(quantity) else {
            console.write_line("Invalid quantity provided. Must be at least 1.");
            return CommandResult::Failure;
        };

        let symbol = good.to_uppercase();
        let Some(held) = status.cargo.iter().find(|c| c.good == symbol) else {
            if background {
                console.write_line("Route ship did not have good to sell. Attempting to continue.");
                return CommandResult::Success;
            }
            console.write_line("The good specified could not be found in the ships cargo.");
            return CommandResult::Failure;
        };

        let (quantity, notice) = match plan_sale(requested, held.quantity) {
            Sale::AlreadyBelow => {
                if !background {
                    console.write_line("Cargo already at or over given sell limit.");
                }
                return CommandResult::Success;
            }
            Sale::Sell { quantity, notice } => (quantity, notice),
        };
        if !background {
            match notice {
                Some(Notice::Maximum) => {
                    console.write_line(format!("Selling maximum. Sell quantity: {quantity}."))
                }
                Some(_) => console.write_line("Insufficient quantity available for sale. Selling maximum."),
                None => {}
            }
        }

        match self
            .services
            .client
            .sell(&ship.server_id, &held.good, quantity)
            .await
        {
            Ok(outcome) => {
                let total = outcome.order.total;
                self.settle(outcome).await;
                if !background {
                    console.write_line(format!(
                        "{quantity} units of cargo sold successfully. Total made: {total} credits."
                    ));
                }
                CommandResult::Success
            }
            Err(err) => {
                self.services.resync_credits().await;
                let not_listed = err
                    .remote_message()
                    .is_some_and(|m| m.to_lowercase().contains(NOT_LISTED));
                if not_listed {
                    console.write_line("The good specified cannot be sold at this ships market.");
                } else {
                    console.write_line(error_message(&err));
                    if background {
                        console.write_line("Unhandled error occurred during route sale. Attempting to continue.");
                    }
                }

                if background {
                    CommandResult::Success
                } else {
                    CommandResult::Failure
                }
            }
        }
    }

    // ========================================================================
    // LEVEL 3 - HELPERS
    // ========================================================================

    /// The ship with its status and docked location
    async fn docked_ship(&self, key: &str) -> Option<(ShipData, Ship, String)> {
        let ship = self.services.find_ship(key).await?;

        let Some(status) = ship.status.clone() else {
            self.services.console.write_line(STATUS_UNAVAILABLE);
            return None;
        };
        let Some(location) = status.docked_at().map(str::to_string) else {
            self.services.console.write_line("Ship is not currently docked.");
            return None;
        };
        Some((ship, status, location))
    }

    /// Apply a completed trade to the session and fleet
    async fn settle(&self, outcome: TransactionResult) {
        self.services.session.set_credits(outcome.credits);
        let ship_id = outcome.ship.id.clone();
        if let Err(err) = self
            .services
            .fleet
            .update_cargo(&ship_id, outcome.ship.cargo)
            .await
        {
            tracing::warn!(ship = %ship_id, error = %err, "trade for untracked ship");
        }
    }
}

impl AsyncCommandHandler for MarketHandler {
    fn name(&self) -> &str {
        "MARKET"
    }

    fn requires_login(&self) -> bool {
        true
    }

    fn background_allowed(&self) -> bool {
        true
    }

    fn handle<'a>(&'a self, args: &'a [String], invocation: Invocation) -> BoxFuture<'a, CommandResult> {
        self.run(args, invocation).boxed()
    }
}

fn unit_price(good: &MarketGood) -> i64 {
    if good.purchase_price_per_unit > 0 {
        good.purchase_price_per_unit
    } else {
        good.price_per_unit
    }
}

fn error_message(err: &ApiError) -> String {
    err.remote_message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

/// Work out how many units to buy given stock, hold space and credits
fn plan_purchase(requested: Quantity, good: &MarketGood, ship: &Ship, credits: i64) -> Purchase {
    if good.quantity_available <= 0 {
        return Purchase::OutOfStock;
    }

    let volume = good.volume_per_unit;
    let used: i64 = ship.cargo.iter().map(|c| c.total_volume).sum();
    let space_left = (ship.max_cargo - used).max(0);

    let mut quantity = match requested {
        Quantity::Flat(n) => n,
        Quantity::Max => good.quantity_available,
        Quantity::UpTo(n) => {
            let held: i64 = ship
                .cargo
                .iter()
                .filter(|c| c.good == good.symbol)
                .map(|c| c.quantity)
                .sum();
            let wanted = n - held;
            if wanted < 1 {
                return Purchase::AlreadyStocked;
            }
            wanted
        }
        Quantity::Percent(p) => ship.max_cargo * p / 100 / volume.max(1),
    };

    let limited_by_space = volume > 0 && quantity * volume > space_left;
    if limited_by_space {
        quantity = space_left / volume;
    }
    let limited_by_stock = quantity > good.quantity_available;
    if limited_by_stock {
        quantity = good.quantity_available;
    }

    let price = unit_price(good);
    if requested == Quantity::Max && price > 0 && quantity * price > credits {
        quantity = credits / price;
    }

    if quantity <= 0 {
        return Purchase::NoSpace;
    }
    if quantity * price > credits {
        return Purchase::NoCredits;
    }

    let notice = if requested == Quantity::Max {
        Some(Notice::Maximum)
    } else if limited_by_stock {
        Some(Notice::LimitedByStock)
    } else if limited_by_space {
        Some(Notice::LimitedBySpace)
    } else {
        None
    };
    Purchase::Buy { quantity, notice }
}

/// Work out how many of the `held` units to sell
fn plan_sale(requested: Quantity, held: i64) -> Sale {
    let quantity = match requested {
        Quantity::Flat(n) => n,
        Quantity::Max => held,
        Quantity::UpTo(n) => held - n,
        Quantity::Percent(p) => held * p / 100,
    };
    if quantity < 1 {
        return Sale::AlreadyBelow;
    }

    if requested == Quantity::Max {
        return Sale::Sell {
            quantity,
            notice: Some(Notice::Maximum),
        };
    }
    if quantity > held {
        return Sale::Sell {
            quantity: held,
            notice: Some(Notice::LimitedByStock),
        };
    }
    Sale::Sell {
        quantity,
        notice: None,
    }
}
