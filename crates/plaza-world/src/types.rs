//! Core data model: players and placed world objects.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Placeholder display name used when a client registers without one.
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

/// Default object color when a placement intent omits it.
pub const DEFAULT_OBJECT_COLOR: &str = "#cccccc";

/// Minimum stored `y` for players and objects (ground-clearance floor).
pub const GROUND_CLEARANCE: f32 = 0.5;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque player identifier. Equal to the connection identifier that
/// registered it; never reused while that connection lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

/// Server-assigned object identifier. Strictly increasing for the process
/// lifetime; never reused, even after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Shape of a placed object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned cube (the default).
    #[default]
    Cube,
    /// Sphere.
    Sphere,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One connected participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Identifier, equal to the connection id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color, derived from `id` (stable per connection).
    pub color: String,
    /// Position; `position.y >= 0.5` always holds.
    pub position: Vec3,
    /// Yaw-only orientation in radians. Other axes are unused for players.
    pub yaw: f32,
}

/// Derive a stable display color from a player id.
///
/// Hashes the id bytes with the classic 31-multiplier string hash and maps
/// the result onto the HSL hue circle. The same id always yields the same
/// color, and nearby ids scatter widely.
pub fn color_from_id(id: PlayerId) -> String {
    let mut hash: u32 = 0;
    for byte in id.0.to_le_bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
    }
    let hue = hash % 360;
    format!("hsl({hue}, 70%, 55%)")
}

// ---------------------------------------------------------------------------
// WorldObject
// ---------------------------------------------------------------------------

/// One placed or procedurally generated shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Server-assigned identifier.
    pub id: ObjectId,
    /// Shape variant.
    pub shape: Shape,
    /// Edge length / diameter. Always positive.
    pub size: f32,
    /// Display color string.
    pub color: String,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    /// Position, snapped to the fine grid; `position.y >= 0.5`.
    pub position: Vec3,
    /// Full 3-axis orientation in radians.
    pub rotation: Vec3,
}

/// Candidate object without an id, as submitted by a placement intent or
/// produced by the city generator. Missing fields take documented defaults
/// when the store materializes the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Shape; defaults to [`Shape::Cube`].
    pub shape: Option<Shape>,
    /// Size; defaults to `1.0`. Non-positive values also fall back to `1.0`.
    pub size: Option<f32>,
    /// Color; defaults to [`DEFAULT_OBJECT_COLOR`].
    pub color: Option<String>,
    /// Opacity; clamped into `[0, 1]`, defaults to `1.0`.
    pub alpha: Option<f32>,
    /// Requested position (snapped by the store).
    pub position: Vec3,
    /// Orientation; defaults to zero.
    pub rotation: Option<Vec3>,
}

impl ObjectSpec {
    /// A bare spec at `position` with every other field defaulted.
    pub fn at(position: Vec3) -> Self {
        Self {
            shape: None,
            size: None,
            color: None,
            alpha: None,
            position,
            rotation: None,
        }
    }
}
