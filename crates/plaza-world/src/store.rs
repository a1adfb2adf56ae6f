//! The World State Store: atomic operations over the canonical world.
//!
//! Every operation here appears complete-before-or-after every other one
//! because the store is owned by a single task (see the engine in
//! `plaza-net`). Nothing in this module locks or blocks.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::grid::{GridKey, OBJECT_GRID, snap};
use crate::types::{
    DEFAULT_OBJECT_COLOR, DEFAULT_PLAYER_NAME, GROUND_CLEARANCE, ObjectId, ObjectSpec, Player,
    PlayerId, Shape, WorldObject, color_from_id,
};

/// Point-in-time read-only copy of the full world, delivered to newly
/// registered connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// All registered players, ordered by id.
    pub players: Vec<Player>,
    /// All placed objects, in placement order.
    pub objects: Vec<WorldObject>,
}

/// The aggregate of all players and placed objects. Exactly one exists per
/// process.
#[derive(Debug, Default)]
pub struct WorldState {
    players: HashMap<PlayerId, Player>,
    objects: Vec<WorldObject>,
    next_object_id: u64,
}

/// Replace non-finite components (NaN, ±inf) with zero, mirroring how the
/// protocol treats non-numeric input.
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

impl WorldState {
    /// Create an empty world. Object ids start at 1.
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            objects: Vec::new(),
            next_object_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Register a player for a connection.
    ///
    /// Duplicate registration is an idempotent no-op that returns the
    /// existing record, so a client re-sending `register` is tolerated.
    /// A missing or blank name falls back to [`DEFAULT_PLAYER_NAME`].
    pub fn register_player(&mut self, id: PlayerId, name: Option<&str>) -> Player {
        if let Some(existing) = self.players.get(&id) {
            return existing.clone();
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_PLAYER_NAME)
            .to_string();

        let player = Player {
            id,
            name,
            color: color_from_id(id),
            position: Vec3::new(0.0, GROUND_CLEARANCE, 0.0),
            yaw: 0.0,
        };
        self.players.insert(id, player.clone());
        player
    }

    /// Update a player's position and/or yaw. Only supplied fields change.
    ///
    /// `position.y` is clamped to the ground-clearance floor; non-finite
    /// components become `0`. Returns `None` if the connection never
    /// registered — callers must drop the intent silently, not error.
    pub fn move_player(
        &mut self,
        id: PlayerId,
        position: Option<Vec3>,
        yaw: Option<f32>,
    ) -> Option<Player> {
        let player = self.players.get_mut(&id)?;

        if let Some(p) = position {
            let mut p = Vec3::new(
                finite_or_zero(p.x),
                finite_or_zero(p.y),
                finite_or_zero(p.z),
            );
            p.y = p.y.max(GROUND_CLEARANCE);
            player.position = p;
        }
        if let Some(yaw) = yaw {
            player.yaw = finite_or_zero(yaw);
        }

        Some(player.clone())
    }

    /// Remove and return the player for a connection, or `None` if already
    /// absent (double-disconnect is tolerated).
    pub fn unregister_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Place one object. Always succeeds.
    ///
    /// The position is snapped to [`OBJECT_GRID`] and floored at
    /// `y >= 0.5`; missing fields take their documented defaults. Manual
    /// placement performs **no** occupancy check: objects may stack at the
    /// same discretized coordinate.
    pub fn place_object(&mut self, spec: ObjectSpec) -> WorldObject {
        let position = Self::normalized_position(spec.position);
        self.commit(spec, position)
    }

    /// Remove the object with the given id. Returns whether a removal
    /// occurred; removing an unknown id is a silent no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        self.objects.len() != before
    }

    /// Merge a generated candidate batch into the world.
    ///
    /// Candidates whose discretized position collides with an existing
    /// object, or with an earlier candidate in the same batch, are
    /// discarded. Fresh ids are assigned only to survivors, which are
    /// appended and returned in generation order. This path is strictly
    /// additive: nothing pre-existing is removed or moved.
    pub fn merge_generated(&mut self, specs: Vec<ObjectSpec>) -> Vec<WorldObject> {
        let mut occupied: HashSet<GridKey> = self
            .objects
            .iter()
            .map(|o| GridKey::at(o.position, OBJECT_GRID))
            .collect();

        let mut added = Vec::new();
        for spec in specs {
            let position = Self::normalized_position(spec.position);
            let key = GridKey::at(position, OBJECT_GRID);
            if !occupied.insert(key) {
                continue;
            }
            added.push(self.commit(spec, position));
        }
        added
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Look up a registered player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Point-in-time consistent copy of the full world.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by_key(|p| p.id.0);
        WorldSnapshot {
            players,
            objects: self.objects.clone(),
        }
    }

    /// Number of registered players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of placed objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Sanitize, snap to the fine grid, and apply the ground floor.
    fn normalized_position(p: Vec3) -> Vec3 {
        let p = Vec3::new(
            finite_or_zero(p.x),
            finite_or_zero(p.y),
            finite_or_zero(p.z),
        );
        let mut p = snap(p, OBJECT_GRID);
        p.y = p.y.max(GROUND_CLEARANCE);
        p
    }

    /// Assign the next id, materialize defaults, and append. Id assignment
    /// and append are a single step so no two intents can observe the same
    /// "next id".
    fn commit(&mut self, spec: ObjectSpec, position: Vec3) -> WorldObject {
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;

        let size = spec
            .size
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(1.0);
        let alpha = spec
            .alpha
            .filter(|a| a.is_finite())
            .map(|a| a.clamp(0.0, 1.0))
            .unwrap_or(1.0);

        let object = WorldObject {
            id,
            shape: spec.shape.unwrap_or_default(),
            size,
            color: spec
                .color
                .unwrap_or_else(|| DEFAULT_OBJECT_COLOR.to_string()),
            alpha,
            position,
            rotation: spec.rotation.unwrap_or(Vec3::ZERO),
        };
        self.objects.push(object.clone());
        object
    }
}
