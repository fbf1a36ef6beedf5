//! SHIPS - fleet overview

use futures::future::{BoxFuture, FutureExt};
use tradecmd_core::{AsyncCommandHandler, CommandResult, Invocation, ShipData};

use super::{wants_help, write_lines, Services};

pub struct ShipsHandler {
    services: Services,
}

impl ShipsHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn run(&self, args: &[String], invocation: Invocation) -> CommandResult {
        let console = &self.services.console;

        if !invocation.background && wants_help(args) {
            write_lines(
                console,
                &[
                    "SHIPS: Lists your ships with their current location or flight.",
                    "Usage: SHIPS [refresh]",
                    "refresh: Fetches the latest ship details from the server first.",
                ],
            );
            return CommandResult::Success;
        }

        match args {
            [] => {}
            [flag] if flag.eq_ignore_ascii_case("refresh") => {
                if let Err(err) = self.services.fleet.refresh(self.services.client.as_ref()).await {
                    console.write_line(format!("Unable to refresh ships: {err}"));
                    return CommandResult::Failure;
                }
                if !invocation.background {
                    console.write_line("Ship data refreshed.");
                }
            }
            _ => return CommandResult::Invalid,
        }

        if invocation.background {
            return CommandResult::Success;
        }

        let ships = self.services.fleet.ships().await;
        if ships.is_empty() {
            console.write_line("No ships found. Use SHIPS refresh to fetch them.");
            return CommandResult::Success;
        }

        console.write_line("Displaying ships.");
        for ship in &ships {
            console.write_line(describe(ship));
        }
        CommandResult::Success
    }
}

impl AsyncCommandHandler for ShipsHandler {
    fn name(&self) -> &str {
        "SHIPS"
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

/// One overview line for a ship
fn describe(ship: &ShipData) -> String {
    let prefix = format!("{}: {}", ship.local_id, ship.display_name);

    if let Some(location) = ship.docked_at() {
        return format!("{prefix} - docked at {location}");
    }
    match &ship.transit {
        Some(transit) if ship.transit_concluded => {
            format!("{prefix} - arrived at {}, awaiting update", transit.destination)
        }
        Some(transit) => format!(
            "{prefix} - flying {} to {}, {}s remaining",
            transit.departure, transit.destination, transit.remaining_seconds
        ),
        None => format!("{prefix} - status unknown"),
    }
}
