//! Ship naming - Human-readable names for newly discovered ships
//!
//! The server identifies ships by long opaque ids. Each new ship gets a name
//! from a fixed list, chosen by hashing its server id so the same ship always
//! prefers the same name. Collisions probe forward through the list.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub(crate) const SHIP_NAMES: [&str; 48] = [
    "Aurora", "Beacon", "Cinder", "Drifter", "Ember", "Falcon", "Gallant", "Harbinger",
    "Icarus", "Javelin", "Kestrel", "Lodestar", "Meridian", "Nomad", "Odyssey", "Pioneer",
    "Quasar", "Rover", "Sojourner", "Tempest", "Umbra", "Vagrant", "Wayfarer", "Xebec",
    "Yonder", "Zephyr", "Albatross", "Bounty", "Corsair", "Dauntless", "Endeavour", "Fortuna",
    "Gossamer", "Halcyon", "Intrepid", "Jubilee", "Kingfisher", "Lantern", "Mistral", "Nebula",
    "Osprey", "Peregrine", "Resolute", "Serenity", "Trident", "Valiant", "Whisper", "Zenith",
];

/// Index of the name a ship prefers, stable across runs
fn preferred_index(server_id: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    server_id.hash(&mut hasher);
    (hasher.finish() % SHIP_NAMES.len() as u64) as usize
}

/// Pick a name for `server_id` that `in_use` does not already contain.
///
/// Returns `None` when every name on the list is taken.
pub fn pick_name(server_id: &str, in_use: &[&str]) -> Option<&'static str> {
    let start = preferred_index(server_id);

    (0..SHIP_NAMES.len())
        .map(|offset| SHIP_NAMES[(start + offset) % SHIP_NAMES.len()])
        .find(|name| !in_use.contains(name))
}
