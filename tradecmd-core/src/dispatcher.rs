//! Command dispatcher
//!
//! Turns a raw line into a [`CommandResult`]:
//! 1. Tokenize (malformed quoting → `Invalid`)
//! 2. Look up the handler (unknown → `Invalid`)
//! 3. Gate on login and background eligibility (→ `Failure`, handler not run)
//! 4. Invoke, awaiting async handlers
//! 5. Hint at the command's help on `Invalid`
//!
//! Rejections never escape as errors; each one leaves a line on the console.

use std::sync::Arc;

use thiserror::Error;

use crate::command::{CommandRegistry, CommandResult, Handler, Invocation};
use crate::console::Console;
use crate::session::Session;
use crate::tokenizer::{CommandLine, TokenizeError};

/// Reasons the dispatcher refuses a line before any handler runs
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Command contains unterminated quoted string.")]
    MalformedQuoting,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("You must be signed in to use this command.")]
    AuthenticationRequired,
    #[error("This command cannot be run automatically.")]
    BackgroundNotAllowed,
}

impl Rejection {
    /// Result reported for this rejection
    pub fn result(&self) -> CommandResult {
        match self {
            Rejection::MalformedQuoting | Rejection::UnknownCommand(_) => CommandResult::Invalid,
            Rejection::AuthenticationRequired | Rejection::BackgroundNotAllowed => {
                CommandResult::Failure
            }
        }
    }
}

impl From<TokenizeError> for Rejection {
    fn from(err: TokenizeError) -> Self {
        match err {
            TokenizeError::MalformedQuoting => Rejection::MalformedQuoting,
        }
    }
}

/// Routes command lines to registered handlers
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    session: Session,
    console: Console,
}

impl Dispatcher {
    /// Accepts an owned registry or one already shared elsewhere
    pub fn new(registry: impl Into<Arc<CommandRegistry>>, session: Session, console: Console) -> Self {
        Self {
            registry: registry.into(),
            session,
            console,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one command line. `background` marks scheduler-originated lines.
    pub async fn dispatch(&self, line: &str, background: bool) -> CommandResult {
        let (handler, command) = match self.resolve(line, background) {
            Ok(Some(found)) => found,
            Ok(None) => return CommandResult::Success,
            Err(rejection) => {
                tracing::debug!(line, background, %rejection, "command rejected");
                self.console.write_line(rejection.to_string());
                return rejection.result();
            }
        };

        let invocation = Invocation {
            background,
            signed_in: self.session.is_authenticated(),
        };
        let result = handler.invoke(&command.args, invocation).await;

        if result == CommandResult::Invalid {
            self.console
                .write_line(format!("Invalid arguments. (See {} help)", command.name));
        }

        tracing::debug!(command = %command.name, background, ?result, "command finished");
        result
    }

    /// Tokenize and apply the policy checks. `Ok(None)` for blank lines.
    fn resolve(
        &self,
        line: &str,
        background: bool,
    ) -> Result<Option<(Handler, CommandLine)>, Rejection> {
        let Some(command) = CommandLine::parse(line)? else {
            return Ok(None);
        };

        let handler = self
            .registry
            .get(&command.name)
            .cloned()
            .ok_or_else(|| Rejection::UnknownCommand(command.name.clone()))?;

        if handler.requires_login() && !self.session.is_authenticated() {
            return Err(Rejection::AuthenticationRequired);
        }
        if background && !handler.background_allowed() {
            return Err(Rejection::BackgroundNotAllowed);
        }

        Ok(Some((handler, command)))
    }
}
