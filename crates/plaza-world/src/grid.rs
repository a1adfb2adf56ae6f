//! Grid snapping and discretized coordinate keys.
//!
//! Positions are stored as continuous `f32` vectors but collision/occupancy
//! decisions are made on discretized coordinates: each axis rounded to the
//! nearest multiple of a grid resolution. [`GridKey`] converts a snapped
//! position into an integer triple so that float equality never decides
//! whether two objects overlap.

use glam::Vec3;

/// Coarse unit grid used for player positions. Advisory only; movement is
/// never snapped server-side.
pub const PLAYER_GRID: f32 = 1.0;

/// Fine half-unit grid enforced on every object placement.
pub const OBJECT_GRID: f32 = 0.5;

/// Round each axis of `p` to the nearest multiple of `resolution`.
///
/// Pure and idempotent: `snap(snap(p, r), r) == snap(p, r)` for any `r > 0`.
pub fn snap(p: Vec3, resolution: f32) -> Vec3 {
    Vec3::new(
        (p.x / resolution).round() * resolution,
        (p.y / resolution).round() * resolution,
        (p.z / resolution).round() * resolution,
    )
}

/// Integer discretized coordinate, used as the occupancy key for objects.
///
/// Two positions collide exactly when they produce the same `GridKey` at the
/// active resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    /// X cell index.
    pub x: i32,
    /// Y cell index.
    pub y: i32,
    /// Z cell index.
    pub z: i32,
}

impl GridKey {
    /// Discretize `p` at the given resolution.
    pub fn at(p: Vec3, resolution: f32) -> Self {
        Self {
            x: (p.x / resolution).round() as i32,
            y: (p.y / resolution).round() as i32,
            z: (p.z / resolution).round() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_to_nearest_multiple() {
        let p = Vec3::new(1.3, 0.2, -0.8);
        let snapped = snap(p, OBJECT_GRID);
        assert_eq!(snapped, Vec3::new(1.5, 0.0, -1.0));
    }

    #[test]
    fn test_snap_unit_grid() {
        let p = Vec3::new(1.3, 0.2, -0.8);
        let snapped = snap(p, PLAYER_GRID);
        assert_eq!(snapped, Vec3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn test_snap_is_idempotent() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.3, 0.2, -0.8),
            Vec3::new(-17.77, 3.24, 99.99),
            Vec3::new(0.25, 0.75, -0.25),
        ];
        for resolution in [0.5, 1.0, 2.0] {
            for p in positions {
                let once = snap(p, resolution);
                let twice = snap(once, resolution);
                assert_eq!(once, twice, "snap must be idempotent for {p:?} at {resolution}");
            }
        }
    }

    #[test]
    fn test_snap_preserves_points_already_on_grid() {
        let p = Vec3::new(2.5, 0.5, -3.0);
        assert_eq!(snap(p, OBJECT_GRID), p);
    }

    #[test]
    fn test_grid_key_equal_for_same_cell() {
        let a = GridKey::at(Vec3::new(1.5, 0.5, -1.0), OBJECT_GRID);
        let b = GridKey::at(snap(Vec3::new(1.6, 0.4, -1.1), OBJECT_GRID), OBJECT_GRID);
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_key_differs_across_cells() {
        let a = GridKey::at(Vec3::new(1.5, 0.5, 0.0), OBJECT_GRID);
        let b = GridKey::at(Vec3::new(2.0, 0.5, 0.0), OBJECT_GRID);
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_coordinates_snap_symmetrically() {
        let snapped = snap(Vec3::new(-1.3, 0.0, -1.3), PLAYER_GRID);
        assert_eq!(snapped, Vec3::new(-1.0, 0.0, -1.0));
    }
}
