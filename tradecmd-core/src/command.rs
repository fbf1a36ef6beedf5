//! Command handlers and the registry holding them
//!
//! Handlers come in two flavours, synchronous and asynchronous, sharing one
//! flat, case-insensitive name space. Registration is explicit: the binary
//! builds its handlers once at startup and registers each one here.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::tokenizer::fold_name;

/// Outcome of running a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// The command did everything it was asked to
    Success,
    /// The command was understood but could not be carried out
    Failure,
    /// The arguments did not match the command's grammar
    Invalid,
}

impl CommandResult {
    pub fn is_success(self) -> bool {
        self == CommandResult::Success
    }
}

/// Context a handler is invoked with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Dispatched by the route scheduler rather than typed by the user
    pub background: bool,
    /// A session was active at dispatch time
    pub signed_in: bool,
}

/// A command that completes without suspending
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;
    fn requires_login(&self) -> bool;
    fn background_allowed(&self) -> bool;
    fn handle(&self, args: &[String], invocation: Invocation) -> CommandResult;
}

/// A command that awaits remote calls or other async work
pub trait AsyncCommandHandler: Send + Sync {
    fn name(&self) -> &str;
    fn requires_login(&self) -> bool;
    fn background_allowed(&self) -> bool;
    fn handle<'a>(&'a self, args: &'a [String], invocation: Invocation) -> BoxFuture<'a, CommandResult>;
}

/// A registered handler of either flavour
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<dyn CommandHandler>),
    Async(Arc<dyn AsyncCommandHandler>),
}

impl Handler {
    pub fn sync(handler: impl CommandHandler + 'static) -> Self {
        Handler::Sync(Arc::new(handler))
    }

    pub fn asynchronous(handler: impl AsyncCommandHandler + 'static) -> Self {
        Handler::Async(Arc::new(handler))
    }

    pub fn name(&self) -> &str {
        match self {
            Handler::Sync(h) => h.name(),
            Handler::Async(h) => h.name(),
        }
    }

    pub fn requires_login(&self) -> bool {
        match self {
            Handler::Sync(h) => h.requires_login(),
            Handler::Async(h) => h.requires_login(),
        }
    }

    pub fn background_allowed(&self) -> bool {
        match self {
            Handler::Sync(h) => h.background_allowed(),
            Handler::Async(h) => h.background_allowed(),
        }
    }

    /// Run the handler, awaiting it if asynchronous
    pub async fn invoke(&self, args: &[String], invocation: Invocation) -> CommandResult {
        match self {
            Handler::Sync(h) => h.handle(args, invocation),
            Handler::Async(h) => h.handle(args, invocation).await,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Handler::Sync(_) => "sync",
            Handler::Async(_) => "async",
        };
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}

/// Why a registration was refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("command was already registered: {0}")]
    Duplicate(String),
    #[error("command names cannot be empty or contain whitespace: {0:?}")]
    InvalidName(String),
}

/// Name-keyed handler table
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. Returns false if the name is taken
    /// (ignoring case) or malformed.
    pub fn register(&mut self, name: &str, handler: Handler) -> bool {
        self.try_register(name, handler).is_ok()
    }

    /// Register `handler` under its own name
    pub fn add(&mut self, handler: Handler) -> Result<(), RegisterError> {
        let name = handler.name().to_string();
        self.try_register(&name, handler)
    }

    /// Like [`register`](Self::register), reporting why it failed
    pub fn try_register(&mut self, name: &str, handler: Handler) -> Result<(), RegisterError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(RegisterError::InvalidName(name.to_string()));
        }

        let key = fold_name(trimmed);
        if self.handlers.contains_key(&key) {
            return Err(RegisterError::Duplicate(key));
        }

        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Look up a handler by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(&fold_name(name))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
