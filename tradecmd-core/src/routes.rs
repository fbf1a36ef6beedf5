//! Route definitions
//!
//! A route is a numbered, ordered list of command lines plus the ships
//! currently running it. [`RouteBook`] owns every route of one user and keeps
//! the invariants:
//! - route ids are dense from 1 and renumbered on deletion
//! - command indexes are contiguous from 0
//! - a ship is assigned to at most one route

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cursor value of a ship that has not run any command yet
pub const NOT_STARTED: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid route id provided.")]
    UnknownRoute(u32),
    #[error("Invalid command index provided.")]
    InvalidCommandIndex(i64),
    #[error("Invalid ship id. Please use number ids and not the full string id.")]
    UnknownShip(String),
    #[error("Ship is already on another route. Please remove ship from current route before adding it to a new one.")]
    ShipOnAnotherRoute { ship_id: String, route_id: u32 },
    #[error("Routes are not loaded. Sign in first.")]
    NotLoaded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCommand {
    pub index: usize,
    pub command: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteShip {
    pub ship_id: String,
    /// Index of the last command run, [`NOT_STARTED`] before the first
    pub last_command: i64,
}

impl RouteShip {
    pub fn new(ship_id: impl Into<String>) -> Self {
        Self {
            ship_id: ship_id.into(),
            last_command: NOT_STARTED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: u32,
    pub display_name: String,
    #[serde(default)]
    pub commands: Vec<RouteCommand>,
    #[serde(default)]
    pub ships: Vec<RouteShip>,
}

impl Route {
    /// Index that follows `last`, wrapping after the final command
    pub fn next_index(&self, last: i64) -> Option<usize> {
        if self.commands.is_empty() {
            return None;
        }
        let next = last + 1;
        if next < 0 || next >= self.commands.len() as i64 {
            Some(0)
        } else {
            Some(next as usize)
        }
    }

    fn reindex(&mut self) {
        for (index, command) in self.commands.iter_mut().enumerate() {
            command.index = index;
        }
    }
}

/// Outcome of assigning a ship to a route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    Added,
    AlreadyOnRoute,
}

/// All routes of one user, keyed by id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteBook {
    routes: BTreeMap<u32, Route>,
}

impl RouteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in id order
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn to_vec(&self) -> Vec<Route> {
        self.routes.values().cloned().collect()
    }

    pub fn get(&self, id: u32) -> Option<&Route> {
        self.routes.get(&id)
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Route, RouteError> {
        self.routes.get_mut(&id).ok_or(RouteError::UnknownRoute(id))
    }

    /// Route a ship is assigned to
    pub fn route_of(&self, ship_id: &str) -> Option<u32> {
        self.routes
            .values()
            .find(|r| r.ships.iter().any(|s| s.ship_id == ship_id))
            .map(|r| r.id)
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Create an empty route, returning its id
    pub fn create(&mut self, display_name: impl Into<String>) -> u32 {
        let id = self.routes.len() as u32 + 1;
        self.routes.insert(
            id,
            Route {
                id,
                display_name: display_name.into(),
                commands: Vec::new(),
                ships: Vec::new(),
            },
        );
        id
    }

    /// Delete a route; later routes move down one id
    pub fn delete(&mut self, id: u32) -> Result<Route, RouteError> {
        let removed = self.routes.remove(&id).ok_or(RouteError::UnknownRoute(id))?;

        let rest = std::mem::take(&mut self.routes);
        self.routes = rest
            .into_values()
            .map(|mut route| {
                if route.id > id {
                    route.id -= 1;
                }
                (route.id, route)
            })
            .collect();

        Ok(removed)
    }

    /// Insert a command at a 1-based `position` (clamped to the list), or
    /// append when `None`. Returns the 0-based index it landed at.
    pub fn add_command(
        &mut self,
        id: u32,
        position: Option<i64>,
        command: impl Into<String>,
    ) -> Result<usize, RouteError> {
        let route = self.get_mut(id)?;
        let len = route.commands.len();
        let index = match position {
            Some(position) => position.saturating_sub(1).clamp(0, len as i64) as usize,
            None => len,
        };

        route.commands.insert(
            index,
            RouteCommand {
                index,
                command: command.into(),
            },
        );
        route.reindex();
        Ok(index)
    }

    /// Remove the command at a 1-based `position`
    pub fn remove_command(&mut self, id: u32, position: i64) -> Result<RouteCommand, RouteError> {
        let route = self.get_mut(id)?;
        if position < 1 || position > route.commands.len() as i64 {
            return Err(RouteError::InvalidCommandIndex(position));
        }

        let removed = route.commands.remove(position as usize - 1);
        route.reindex();
        Ok(removed)
    }

    /// Put a ship on a route. Fails if it already runs a different one.
    pub fn assign(&mut self, id: u32, ship_id: &str) -> Result<Assignment, RouteError> {
        if !self.routes.contains_key(&id) {
            return Err(RouteError::UnknownRoute(id));
        }
        match self.route_of(ship_id) {
            Some(current) if current == id => return Ok(Assignment::AlreadyOnRoute),
            Some(current) => {
                return Err(RouteError::ShipOnAnotherRoute {
                    ship_id: ship_id.to_string(),
                    route_id: current,
                })
            }
            None => {}
        }

        self.get_mut(id)?.ships.push(RouteShip::new(ship_id));
        Ok(Assignment::Added)
    }

    /// Take a ship off a route. `Ok(false)` if it was not on it.
    pub fn unassign(&mut self, id: u32, ship_id: &str) -> Result<bool, RouteError> {
        let route = self.get_mut(id)?;
        let before = route.ships.len();
        route.ships.retain(|s| s.ship_id != ship_id);
        Ok(route.ships.len() != before)
    }

    /// Drop assignments whose ship `exists` no longer recognises.
    /// Returns how many were dropped.
    pub fn relink(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let mut dropped = 0;
        for route in self.routes.values_mut() {
            let before = route.ships.len();
            route.ships.retain(|s| exists(&s.ship_id));
            dropped += before - route.ships.len();
        }
        dropped
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Every (route id, ship id) pair, in route order then assignment order
    pub fn assignments(&self) -> Vec<(u32, String)> {
        self.routes
            .values()
            .flat_map(|r| r.ships.iter().map(move |s| (r.id, s.ship_id.clone())))
            .collect()
    }

    /// Move a ship's cursor to its next command and return that command.
    /// `None` if the route, the assignment or any command is missing.
    pub fn advance(&mut self, id: u32, ship_id: &str) -> Option<RouteCommand> {
        let route = self.routes.get_mut(&id)?;
        let position = route.ships.iter().position(|s| s.ship_id == ship_id)?;
        let next = route.next_index(route.ships[position].last_command)?;

        route.ships[position].last_command = next as i64;
        route.commands.get(next).cloned()
    }
}
