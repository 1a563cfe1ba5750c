//! Terrain generation - fills a voxel grid with solid ground and walls

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use ventwork_logic::voxel::{VoxelData, VoxelGrid, VoxelPos};

/// Height range of rough terrain above the first layer, in voxels.
const ROUGH_HEIGHT_RANGE: f64 = 3.0;

/// Shapes `generate_terrain` can build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Solid ground of `height` layers over the whole grid.
    FlatFloor { height: i32 },
    /// Flat floor plus walls around the x/z border up to `wall_height`.
    /// The top stays open.
    Room { floor_height: i32, wall_height: i32 },
    /// Hollow solid shell spanning `min..=max`. The interior is enclosed.
    Box { min: VoxelPos, max: VoxelPos },
    /// Random ground between 1 and 3 voxels high, smoothed over neighbours.
    Rough { seed: u64 },
}

impl Default for TerrainKind {
    fn default() -> Self {
        TerrainKind::FlatFloor { height: 1 }
    }
}

/// Clear the grid and build `kind` in it. Returns the number of solid voxels.
pub fn generate_terrain(grid: &mut VoxelGrid, kind: TerrainKind) -> usize {
    grid.clear();
    match kind {
        TerrainKind::FlatFloor { height } => fill_floor(grid, height),
        TerrainKind::Room {
            floor_height,
            wall_height,
        } => {
            fill_floor(grid, floor_height);
            fill_border_walls(grid, floor_height, wall_height);
        }
        TerrainKind::Box { min, max } => fill_shell(grid, min, max),
        TerrainKind::Rough { seed } => fill_rough(grid, seed),
    }
    let solid = grid.stored_count();
    log::debug!("generated {:?}: {} solid voxels", kind, solid);
    solid
}

fn fill_floor(grid: &mut VoxelGrid, height: i32) {
    let size = grid.size();
    for x in 0..size.x {
        for z in 0..size.z {
            for y in 0..height.min(size.y) {
                grid.set(VoxelPos::new(x, y, z), VoxelData::solid());
            }
        }
    }
}

fn fill_border_walls(grid: &mut VoxelGrid, floor_height: i32, wall_height: i32) {
    let size = grid.size();
    for x in 0..size.x {
        for z in 0..size.z {
            let edge = x == 0 || x == size.x - 1 || z == 0 || z == size.z - 1;
            if !edge {
                continue;
            }
            for y in floor_height.max(0)..wall_height.min(size.y) {
                grid.set(VoxelPos::new(x, y, z), VoxelData::solid());
            }
        }
    }
}

fn fill_shell(grid: &mut VoxelGrid, min: VoxelPos, max: VoxelPos) {
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let on_face = x == min.x
                    || x == max.x
                    || y == min.y
                    || y == max.y
                    || z == min.z
                    || z == max.z;
                if on_face {
                    grid.set(VoxelPos::new(x, y, z), VoxelData::solid());
                }
            }
        }
    }
}

fn fill_rough(grid: &mut VoxelGrid, seed: u64) {
    let size = grid.size();
    let (w, d) = (size.x.max(0) as usize, size.z.max(0) as usize);
    if w == 0 || d == 0 {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Vec<f64> = (0..w * d).map(|_| rng.gen::<f64>()).collect();

    for x in 0..w {
        for z in 0..d {
            let mut sum = noise[x * d + z];
            let mut count = 1.0;
            for (dx, dz) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                let (nx, nz) = (x as i64 + dx, z as i64 + dz);
                if nx >= 0 && nz >= 0 && (nx as usize) < w && (nz as usize) < d {
                    sum += noise[nx as usize * d + nz as usize];
                    count += 1.0;
                }
            }
            let smoothed = sum / count;
            let height = ((smoothed * ROUGH_HEIGHT_RANGE).floor() as i32 + 1).min(size.y);
            for y in 0..height {
                grid.set(VoxelPos::new(x as i32, y, z as i32), VoxelData::solid());
            }
        }
    }
}
