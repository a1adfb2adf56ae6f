//! Procedural city generator: roads plus randomized building volumes.
//!
//! [`generate`] produces a batch of candidate [`ObjectSpec`]s from a seeded
//! RNG and never touches the world store; the store's batch-merge path
//! filters the candidates against current occupancy and assigns ids. The
//! same `(params, seed)` pair always yields the same batch.

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use plaza_world::{GROUND_CLEARANCE, ObjectSpec, Shape};

/// Road tile color.
pub const ROAD_COLOR: &str = "#2b2f38";

/// Building wall voxel color.
pub const WALL_COLOR: &str = "#8d939e";

/// Window voxel color (lighter, semi-transparent).
pub const WINDOW_COLOR: &str = "#bcd9ff";

/// Window voxel opacity.
pub const WINDOW_ALPHA: f32 = 0.55;

/// Layout parameters for one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CityParams {
    /// Half-extent of the square footprint on both horizontal axes.
    pub half_extent: i32,
    /// Cells whose `x` or `z` is a multiple of this become road tiles.
    pub road_spacing: i32,
    /// Probability that a building lot takes a 2×2 footprint.
    pub two_by_two_chance: f64,
    /// Minimum building height in voxels (inclusive).
    pub min_height: i32,
    /// Maximum building height in voxels (inclusive).
    pub max_height: i32,
    /// Independent probability that a qualifying voxel becomes a window.
    pub window_chance: f64,
}

impl Default for CityParams {
    fn default() -> Self {
        Self {
            half_extent: 12,
            road_spacing: 4,
            two_by_two_chance: 0.6,
            min_height: 3,
            max_height: 8,
            window_chance: 0.5,
        }
    }
}

/// Derive the generator RNG from a seed.
pub fn city_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generate one candidate city batch.
///
/// Walks the square footprint at unit step. Road cells emit a single dark
/// tile; every other cell becomes a building lot with a randomized footprint
/// (1×1 or 2×2) and height. A voxel qualifies as a window only above the
/// ground floor, on an odd level, and on the footprint's outer shell.
///
/// When a 2×2 lot is placed, the inner loop skips one extra `z` step. The
/// `x+1` column is still revisited, so batches overlap themselves there;
/// the store's batch merge discards those duplicates. The resulting
/// irregular coverage is part of the layout's look and is kept as is.
pub fn generate(params: &CityParams, rng: &mut ChaCha8Rng) -> Vec<ObjectSpec> {
    let e = params.half_extent;
    let mut specs = Vec::new();

    let mut x = -e;
    while x <= e {
        let mut z = -e;
        while z <= e {
            if is_road(x, z, params.road_spacing) {
                specs.push(road_tile(x, z));
                z += 1;
                continue;
            }

            let two_by_two = rng.random_bool(params.two_by_two_chance);
            let footprint = if two_by_two { 2 } else { 1 };
            let height = rng.random_range(params.min_height..=params.max_height);

            for dx in 0..footprint {
                for dz in 0..footprint {
                    let on_shell =
                        dx == 0 || dx == footprint - 1 || dz == 0 || dz == footprint - 1;
                    for level in 0..height {
                        let qualifies = level >= 1 && level % 2 == 1 && on_shell;
                        let window = qualifies && rng.random_bool(params.window_chance);
                        specs.push(building_voxel(x + dx, level, z + dz, window));
                    }
                }
            }

            if two_by_two {
                // Skip the second row of the lot; the x+1 column is
                // revisited on the next outer pass and deduped at merge.
                z += 1;
            }
            z += 1;
        }
        x += 1;
    }

    specs
}

/// `true` when the cell lies on the road lattice.
fn is_road(x: i32, z: i32, spacing: i32) -> bool {
    x.rem_euclid(spacing) == 0 || z.rem_euclid(spacing) == 0
}

fn road_tile(x: i32, z: i32) -> ObjectSpec {
    ObjectSpec {
        shape: Some(Shape::Cube),
        size: Some(1.0),
        color: Some(ROAD_COLOR.to_string()),
        alpha: Some(1.0),
        position: Vec3::new(x as f32, GROUND_CLEARANCE, z as f32),
        rotation: None,
    }
}

fn building_voxel(x: i32, level: i32, z: i32, window: bool) -> ObjectSpec {
    let (color, alpha) = if window {
        (WINDOW_COLOR, WINDOW_ALPHA)
    } else {
        (WALL_COLOR, 1.0)
    };
    ObjectSpec {
        shape: Some(Shape::Cube),
        size: Some(1.0),
        color: Some(color.to_string()),
        alpha: Some(alpha),
        position: Vec3::new(x as f32, GROUND_CLEARANCE + level as f32, z as f32),
        rotation: None,
    }
}
