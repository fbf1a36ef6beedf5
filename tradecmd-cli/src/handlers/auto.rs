//! AUTO - route management
//!
//! Routes are edited through the scheduler so edits wait for any running
//! tick to finish.

use futures::future::{BoxFuture, FutureExt};
use tradecmd_core::{Assignment, AsyncCommandHandler, CommandResult, Invocation, Route, RouteError};

use super::{wants_help, write_lines, Services};

pub struct AutoHandler {
    services: Services,
}

impl AutoHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn run(&self, args: &[String]) -> CommandResult {
        if wants_help(args) {
            write_lines(
                &self.services.console,
                &[
                    "AUTO: Provides functions for automatic routes.",
                    "Subcommands",
                    "list: Lists all routes created - AUTO list",
                    "    - Lists the commands on the route - AUTO list commands <Route Id>",
                    "    - Lists the ships assigned to the route - AUTO list ships <Route Id>",
                    "new: Creates a new auto route - AUTO new <Route Name>",
                    "delete: Deletes an existing auto route - AUTO delete <Route Id>",
                    "add: Adds a command to the end of the route. Adds at the position indicated if supplied. - AUTO add <Route Id> [Index] <Command>",
                    "     Use $s to provide a ship id for a command.",
                    "remove: Removes a command from the route - AUTO remove <Route Id> <Command Index>",
                    "start: Start a ship running on the route - AUTO start <Route Id> <Ship Id/Name>",
                    "stop: Stop a ship running the route - AUTO stop <Route Id> <Ship Id/Name>",
                ],
            );
            return CommandResult::Success;
        }

        let Some((sub, rest)) = args.split_first() else {
            return CommandResult::Invalid;
        };

        let outcome = match (sub.to_lowercase().as_str(), rest) {
            ("list", []) => self.list().await,
            ("list", [kind, id]) if kind.eq_ignore_ascii_case("commands") => {
                self.list_commands(id).await
            }
            ("list", [kind, id]) if kind.eq_ignore_ascii_case("ships") => self.list_ships(id).await,
            ("new", [name]) => self.create(name).await,
            ("delete", [id]) => self.delete(id).await,
            ("add", [id, command @ ..]) if !command.is_empty() => self.add(id, command).await,
            ("remove", [id, index]) => self.remove(id, index).await,
            ("start", [id, ship]) => self.start(id, ship).await,
            ("stop", [id, ship]) => self.stop(id, ship).await,
            _ => return CommandResult::Invalid,
        };

        match outcome {
            Ok(message) => {
                if let Some(message) = message {
                    self.services.console.write_line(message);
                }
                CommandResult::Success
            }
            Err(err) => {
                self.services.console.write_line(err.to_string());
                CommandResult::Failure
            }
        }
    }

    // ------------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------------

    async fn list(&self) -> Result<Option<String>, RouteError> {
        let routes = self
            .services
            .scheduler
            .routes()
            .await
            .ok_or(RouteError::NotLoaded)?;

        if routes.is_empty() {
            return Ok(Some("No routes created. Use AUTO new <Route Name> to create one.".to_string()));
        }

        let console = &self.services.console;
        console.write_line("Displaying auto route list.");
        for route in &routes {
            console.write_line(format!(
                "{}: {} - {} commands, {} ships",
                route.id,
                route.display_name,
                route.commands.len(),
                route.ships.len()
            ));
        }
        Ok(None)
    }

    async fn list_commands(&self, id: &str) -> Result<Option<String>, RouteError> {
        let route = self.route(id).await?;
        let console = &self.services.console;

        console.write_line(format!("Displaying auto route commands for {}.", route.display_name));
        if route.commands.is_empty() {
            console.write_line("Route has no commands.");
        }
        for command in &route.commands {
            console.write_line(format!("{}: {}", command.index + 1, command.command));
        }
        Ok(None)
    }

    async fn list_ships(&self, id: &str) -> Result<Option<String>, RouteError> {
        let route = self.route(id).await?;
        let console = &self.services.console;

        console.write_line(format!("Displaying auto route ships for {}.", route.display_name));
        if route.ships.is_empty() {
            console.write_line("No ships are running this route.");
        }
        for assigned in &route.ships {
            let line = match self.services.fleet.ship(&assigned.ship_id).await {
                Some(ship) => format!("{}: {}", ship.local_id, ship.display_name),
                None => format!("?: {}", assigned.ship_id),
            };
            console.write_line(line);
        }
        Ok(None)
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    async fn create(&self, name: &str) -> Result<Option<String>, RouteError> {
        let id = self.services.scheduler.create_route(name).await?;
        Ok(Some(format!("New route created. Id: {id}.")))
    }

    async fn delete(&self, id: &str) -> Result<Option<String>, RouteError> {
        self.services.scheduler.delete_route(parse_route_id(id)?).await?;
        Ok(Some("Auto route deleted.".to_string()))
    }

    /// A leading number after the route id is a 1-based insert position
    async fn add(&self, id: &str, words: &[String]) -> Result<Option<String>, RouteError> {
        let id = parse_route_id(id)?;

        let (position, words) = match words.split_first() {
            Some((first, rest)) if !rest.is_empty() => match first.parse::<i64>() {
                Ok(position) => (Some(position), rest),
                Err(_) => (None, words),
            },
            _ => (None, words),
        };

        self.services
            .scheduler
            .add_command(id, position, &words.join(" "))
            .await?;
        Ok(Some("Command added successfully.".to_string()))
    }

    async fn remove(&self, id: &str, index: &str) -> Result<Option<String>, RouteError> {
        let id = parse_route_id(id)?;
        let Ok(index) = index.parse::<i64>() else {
            // An unknown route takes precedence over a malformed index
            self.services.scheduler.route(id).await?;
            return Err(RouteError::InvalidCommandIndex(0));
        };

        self.services.scheduler.remove_command(id, index).await?;
        Ok(Some("Command deleted successfully.".to_string()))
    }

    async fn start(&self, id: &str, ship: &str) -> Result<Option<String>, RouteError> {
        let (assignment, _) = self
            .services
            .scheduler
            .assign(parse_route_id(id)?, ship)
            .await?;

        Ok(Some(
            match assignment {
                Assignment::Added => "Ship added to route.",
                Assignment::AlreadyOnRoute => "Ship provided is already on route.",
            }
            .to_string(),
        ))
    }

    async fn stop(&self, id: &str, ship: &str) -> Result<Option<String>, RouteError> {
        let (removed, _) = self
            .services
            .scheduler
            .unassign(parse_route_id(id)?, ship)
            .await?;

        Ok(Some(
            if removed {
                "Ship removed from route."
            } else {
                "Ship provided is not currently on this route."
            }
            .to_string(),
        ))
    }

    async fn route(&self, id: &str) -> Result<Route, RouteError> {
        self.services.scheduler.route(parse_route_id(id)?).await
    }
}

impl AsyncCommandHandler for AutoHandler {
    fn name(&self) -> &str {
        "AUTO"
    }

    fn requires_login(&self) -> bool {
        true
    }

    fn background_allowed(&self) -> bool {
        false
    }

    fn handle<'a>(&'a self, args: &'a [String], _invocation: Invocation) -> BoxFuture<'a, CommandResult> {
        self.run(args).boxed()
    }
}

fn parse_route_id(text: &str) -> Result<u32, RouteError> {
    text.parse().map_err(|_| RouteError::UnknownRoute(0))
}
