//! LOGIN, LOGOUT and TOKEN

use futures::future::{BoxFuture, FutureExt};
use tradecmd_core::{AsyncCommandHandler, CommandHandler, CommandResult, Invocation};

use super::{wants_help, write_lines, Services};

pub struct LoginHandler {
    services: Services,
}

impl LoginHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn run(&self, args: &[String], invocation: Invocation) -> CommandResult {
        let console = &self.services.console;

        if wants_help(args) {
            write_lines(
                console,
                &[
                    "LOGIN: Logs an existing user into the SpaceTraders API.",
                    "Usage: LOGIN <Token>",
                ],
            );
            return CommandResult::Success;
        }
        if invocation.signed_in {
            console.write_line("You must be signed out to use this command.");
            return CommandResult::Failure;
        }
        let [token] = args else {
            return CommandResult::Invalid;
        };

        match self.services.sign_in(token).await {
            Ok(account) => {
                console.write_line(format!("Welcome back, {}.", account.username));
                console.write_line("For command list see HELP.");
                CommandResult::Success
            }
            Err(err) if err.status().is_some() => {
                tracing::debug!(error = %err, "login rejected");
                console.write_line("Incorrect login details. Please try again.");
                CommandResult::Failure
            }
            Err(err) => {
                console.write_line(format!("Unable to reach the game server: {err}"));
                CommandResult::Failure
            }
        }
    }
}

impl AsyncCommandHandler for LoginHandler {
    fn name(&self) -> &str {
        "LOGIN"
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

pub struct LogoutHandler {
    services: Services,
}

impl LogoutHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn run(&self, args: &[String]) -> CommandResult {
        if wants_help(args) {
            write_lines(
                &self.services.console,
                &[
                    "LOGOUT: Logs current user out of the SpaceTraders API.",
                    "Usage: LOGOUT",
                ],
            );
            return CommandResult::Success;
        }
        if !args.is_empty() {
            return CommandResult::Invalid;
        }

        self.services.sign_out().await;
        self.services.console.write_line("Goodbye.");
        CommandResult::Success
    }
}

impl AsyncCommandHandler for LogoutHandler {
    fn name(&self) -> &str {
        "LOGOUT"
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

/// Prints the signed-in user's token. Reads only local state.
pub struct TokenHandler {
    services: Services,
}

impl TokenHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl CommandHandler for TokenHandler {
    fn name(&self) -> &str {
        "TOKEN"
    }

    fn requires_login(&self) -> bool {
        true
    }

    fn background_allowed(&self) -> bool {
        false
    }

    fn handle(&self, args: &[String], _invocation: Invocation) -> CommandResult {
        let console = &self.services.console;

        if wants_help(args) {
            write_lines(
                console,
                &["TOKEN: Displays the token for the current user.", "Usage: TOKEN"],
            );
            return CommandResult::Success;
        }
        if !args.is_empty() {
            return CommandResult::Invalid;
        }

        let (Some(username), Some(token)) = (self.services.session.username(), self.services.client.token()) else {
            tracing::warn!("token requested without credentials");
            console.write_line("No token is held for the current user.");
            return CommandResult::Failure;
        };
        console.write_line(format!("Token for {username}: {token}"));
        CommandResult::Success
    }
}
