//! SHIP - per-ship actions
//!
//! ## Architecture
//!
//! - Level 1: run() - subcommand selection
//! - Level 2: fly(), warp(), rename(), info()
//! - Level 3: docked_ship(), report_flight_error()

use futures::future::{BoxFuture, FutureExt};
use tradecmd_api::{ApiError, FlightPlan};
use tradecmd_core::{AsyncCommandHandler, CommandResult, Invocation, ShipData};

use super::{wants_help, write_lines, Services, STATUS_UNAVAILABLE};

const SAME_DESTINATION: &str = "ship destination is same as departure";
const MISSING_DESTINATION: &str = "Destination does not exist.";
const LOST_IN_WORMHOLE: &str = "ship was lost or destroyed upon entering the wormhole";

pub struct ShipHandler {
    services: Services,
}

impl ShipHandler {
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
                    "SHIP: Provides functions for managing ships.",
                    "Subcommands",
                    "fly: Enacts a flightplan for a ship - SHIP <Ship Id> fly <Location Symbol>",
                    "warp: Warps a ship through the docked wormhole - SHIP <Ship Id> warp",
                    "rename: Renames a ship - SHIP <Ship Id> rename <New Name>",
                    "info: Prints the specifications of ship - SHIP <Ship Id> info",
                ],
            );
            return CommandResult::Success;
        }

        match args {
            [ship, sub, destination] if sub.eq_ignore_ascii_case("fly") => {
                self.fly(ship, destination, background).await
            }
            [ship, sub] if sub.eq_ignore_ascii_case("warp") => self.warp(ship, background).await,
            [ship, sub, name] if sub.eq_ignore_ascii_case("rename") && !background => {
                self.rename(ship, name).await
            }
            [ship, sub] if sub.eq_ignore_ascii_case("info") => self.info(ship).await,
            _ => CommandResult::Invalid,
        }
    }

    // ========================================================================
    // LEVEL 2 - ACTIONS
    // ========================================================================

    async fn fly(&self, key: &str, destination: &str, background: bool) -> CommandResult {
        let Some(ship) = self.docked_ship(key).await else {
            return CommandResult::Failure;
        };
        let destination = destination.to_uppercase();

        match self
            .services
            .client
            .create_flight_plan(&ship.server_id, &destination)
            .await
        {
            Ok(plan) => {
                self.start_transit(&ship, &plan).await;
                if !background {
                    self.services.console.write_line(format!(
                        "Flight started successfully. Destination: {destination}."
                    ));
                }
                CommandResult::Success
            }
            Err(err) => {
                let same_place = err
                    .remote_message()
                    .is_some_and(|m| m.to_lowercase().contains(SAME_DESTINATION));
                if same_place {
                    if !background {
                        self.services
                            .console
                            .write_line("Ship is already docked in specified location.");
                    }
                    return CommandResult::Success;
                }

                self.report_flight_error(&err).await;
                CommandResult::Failure
            }
        }
    }

    async fn warp(&self, key: &str, background: bool) -> CommandResult {
        let Some(ship) = self.docked_ship(key).await else {
            return CommandResult::Failure;
        };

        match self.services.client.warp_jump(&ship.server_id).await {
            Ok(plan) => {
                self.start_transit(&ship, &plan).await;
                if !background {
                    self.services.console.write_line(format!(
                        "Warp started successfully. Destination: {}.",
                        plan.destination
                    ));
                }
                CommandResult::Success
            }
            Err(err) => {
                let lost = err
                    .remote_message()
                    .is_some_and(|m| m.to_lowercase().contains(LOST_IN_WORMHOLE));
                if lost {
                    write_lines(
                        &self.services.console,
                        &[
                            "Ship was lost while attempting to traverse the wormhole.",
                            "In an op shop somewhere, another teapot is sold.",
                        ],
                    );
                    self.services.resync_fleet().await;
                } else {
                    self.report_flight_error(&err).await;
                }
                CommandResult::Failure
            }
        }
    }

    async fn rename(&self, key: &str, name: &str) -> CommandResult {
        let Some(ship) = self.services.find_ship(key).await else {
            return CommandResult::Failure;
        };
        let name = name.trim();
        if name.is_empty() {
            self.services.console.write_line("Ship names cannot be empty.");
            return CommandResult::Failure;
        }

        match self.services.fleet.rename(&ship.server_id, name).await {
            Ok(renamed) => {
                self.services.console.write_line(format!(
                    "Ship {} renamed to {}.",
                    ship.display_name, renamed.display_name
                ));
                CommandResult::Success
            }
            Err(err) => {
                self.services.console.write_line(err.to_string());
                CommandResult::Failure
            }
        }
    }

    async fn info(&self, key: &str) -> CommandResult {
        let Some(ship) = self.services.find_ship(key).await else {
            return CommandResult::Failure;
        };
        let Some(status) = &ship.status else {
            self.services.console.write_line(STATUS_UNAVAILABLE);
            return CommandResult::Failure;
        };

        let console = &self.services.console;
        console.write_line(format!("Displaying info for {}.", ship.display_name));
        console.write_line(format!("Server Id: {}", ship.server_id));
        console.write_line(format!("Type: {}", status.ship_type));
        console.write_line(format!("Class: {}", status.class));
        console.write_line(format!("Manufacturer: {}", status.manufacturer));
        console.write_line(format!("Cargo Capacity: {}", status.max_cargo));
        console.write_line(format!("Speed: {}", status.speed));
        console.write_line(format!("Plating: {}", status.plating));
        console.write_line(format!("Weapons: {}", status.weapons));
        CommandResult::Success
    }

    // ========================================================================
    // LEVEL 3 - HELPERS
    // ========================================================================

    /// The ship named by `key`, provided it is docked somewhere
    async fn docked_ship(&self, key: &str) -> Option<ShipData> {
        let ship = self.services.find_ship(key).await?;

        if ship.status.is_none() {
            self.services.console.write_line(STATUS_UNAVAILABLE);
            return None;
        }
        if !ship.is_docked() {
            self.services
                .console
                .write_line("Ship is already in transit on an existing flight plan.");
            return None;
        }
        Some(ship)
    }

    async fn start_transit(&self, ship: &ShipData, plan: &FlightPlan) {
        if let Err(err) = self.services.fleet.record_flight(&ship.server_id, plan).await {
            tracing::warn!(ship = %ship.display_name, error = %err, "flight accepted for untracked ship");
        }
    }

    async fn report_flight_error(&self, err: &ApiError) {
        let console = &self.services.console;

        match err.remote_message() {
            Some(message) if message.starts_with(MISSING_DESTINATION) => {
                console.write_line("Destination does not exist. Please check destination and try again.");
            }
            Some(message) => {
                // The server disagrees with our view of the ship
                let message = message.to_string();
                self.services.resync_fleet().await;
                console.write_line(message);
            }
            None => console.write_line(err.to_string()),
        }
    }
}

impl AsyncCommandHandler for ShipHandler {
    fn name(&self) -> &str {
        "SHIP"
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
