//! Authoritative world model: players, placed objects, and the rules for
//! mutating them.
//!
//! The [`WorldState`] is the single source of truth that every connected
//! client converges to. It is owned exclusively by the engine task; all
//! mutation goes through the atomic operations defined in [`store`].

pub mod counters;
pub mod grid;
pub mod store;
pub mod types;

pub use counters::WorldCounters;
pub use grid::{GridKey, OBJECT_GRID, PLAYER_GRID, snap};
pub use store::{WorldSnapshot, WorldState};
pub use types::{
    DEFAULT_OBJECT_COLOR, DEFAULT_PLAYER_NAME, GROUND_CLEARANCE, ObjectId, ObjectSpec, Player,
    PlayerId, Shape, WorldObject, color_from_id,
};
