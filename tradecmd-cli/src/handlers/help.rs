//! HELP - command overview and per-command help

use std::sync::{Arc, OnceLock, Weak};

use futures::future::{BoxFuture, FutureExt};
use tradecmd_core::{AsyncCommandHandler, CommandRegistry, CommandResult, Console, Invocation, Rejection};

use super::{wants_help, write_lines};

/// Late-bound view of the registry HELP lives in
#[derive(Clone, Default)]
pub struct HelpTarget(Arc<OnceLock<Weak<CommandRegistry>>>);

impl HelpTarget {
    pub fn bind(&self, registry: &Arc<CommandRegistry>) {
        if self.0.set(Arc::downgrade(registry)).is_err() {
            tracing::warn!("help target already bound");
        }
    }

    fn registry(&self) -> Option<Arc<CommandRegistry>> {
        self.0.get().and_then(Weak::upgrade)
    }
}

pub struct HelpHandler {
    console: Console,
    target: HelpTarget,
}

impl HelpHandler {
    pub fn new(console: Console, target: HelpTarget) -> Self {
        Self { console, target }
    }

    async fn run(&self, args: &[String], invocation: Invocation) -> CommandResult {
        match args {
            [] if invocation.signed_in => {
                write_lines(
                    &self.console,
                    &[
                        "Commands available",
                        "SHIPS: Lists your ships and refreshes them from the server.",
                        "SHIP: Provides functions for managing ships.",
                        "MARKET: Provides functions for interacting with the marketplace.",
                        "AUTO: Provides functions for creating automatic routes for ships.",
                        "TOKEN: Displays the token for the current user.",
                        "LOGOUT: Logs out of the current user.",
                        "EXIT: Closes the client.",
                    ],
                );
                CommandResult::Success
            }
            [] => {
                write_lines(
                    &self.console,
                    &[
                        "Commands available",
                        "LOGIN: Logs an existing user into the SpaceTraders API.",
                        "EXIT: Closes the client.",
                    ],
                );
                CommandResult::Success
            }
            _ if wants_help(args) => {
                write_lines(
                    &self.console,
                    &[
                        "HELP: Provides a list of commands.",
                        "HELP <Command Name>: Provides help for a specific command.",
                    ],
                );
                CommandResult::Success
            }
            [name] => self.command_help(name, invocation).await,
            _ => CommandResult::Invalid,
        }
    }

    /// Ask the named command for its own help text
    async fn command_help(&self, name: &str, invocation: Invocation) -> CommandResult {
        let Some(registry) = self.target.registry() else {
            tracing::warn!("help invoked before the registry was bound");
            return CommandResult::Failure;
        };

        let Some(handler) = registry.get(name).cloned() else {
            self.console
                .write_line(Rejection::UnknownCommand(name.to_uppercase()).to_string());
            return CommandResult::Failure;
        };
        if handler.requires_login() && !invocation.signed_in {
            self.console
                .write_line(Rejection::AuthenticationRequired.to_string());
            return CommandResult::Failure;
        }

        match handler.invoke(&["help".to_string()], invocation).await {
            CommandResult::Invalid => CommandResult::Failure,
            result => result,
        }
    }
}

impl AsyncCommandHandler for HelpHandler {
    fn name(&self) -> &str {
        "HELP"
    }

    fn requires_login(&self) -> bool {
        false
    }

    fn background_allowed(&self) -> bool {
        false
    }

    fn handle<'a>(&'a self, args: &'a [String], invocation: Invocation) -> BoxFuture<'a, CommandResult> {
        self.run(args, invocation).boxed()
    }
}
