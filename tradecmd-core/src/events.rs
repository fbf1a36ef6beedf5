//! State change notifications
//!
//! Components publish a [`StateEvent`] carrying the latest snapshot after
//! every change. Delivery is fire-and-forget: with no subscriber the event is
//! dropped, and a subscriber that falls behind sees `Lagged` and skips ahead.

use tokio::sync::broadcast;

use crate::fleet::ShipData;
use crate::routes::Route;

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub enum StateEvent {
    /// Signed in (`Some`) or signed out (`None`)
    SessionChanged { username: Option<String> },
    /// The tracked ship set or a ship's details changed
    ShipsUpdated {
        ships: Vec<ShipData>,
        full_refresh: bool,
    },
    /// Transit clocks advanced
    FlightsUpdated { ships: Vec<ShipData> },
    /// A ship's transit ran out; published once per transit
    TransitConcluded { ship: ShipData },
    /// Route definitions or assignments changed
    RoutesUpdated { routes: Vec<Route> },
}

/// Broadcast hub for [`StateEvent`]s
#[derive(Clone, Debug)]
pub struct StateEvents {
    tx: broadcast::Sender<StateEvent>,
}

impl Default for StateEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl StateEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: StateEvent) {
        // No receivers is not an error
        let _ = self.tx.send(event);
    }

    pub(crate) fn routes_updated(&self, routes: Vec<Route>) {
        self.publish(StateEvent::RoutesUpdated { routes });
    }
}
