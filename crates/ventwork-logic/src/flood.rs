//! Flood fill over a voxel grid: connected components of passable voxels
//! and boundary reachability.
//!
//! Everything here reads the grid and never mutates it, so a detection pass
//! is a pure function of the grid snapshot it is given. Every traversal is
//! bounded by `max_depth` dequeued voxels; hitting the bound yields a
//! best-effort result flagged as `truncated`.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::voxel::{VoxelGrid, VoxelPos};

/// Traversal limits and boundary policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodSettings {
    /// Maximum voxels a single traversal may dequeue.
    pub max_depth: usize,
    /// When true, the grid boundary does not count as an opening.
    pub edges_sealed: bool,
}

impl Default for FloodSettings {
    fn default() -> Self {
        Self {
            max_depth: 10_000,
            edges_sealed: false,
        }
    }
}

/// One connected component of passable voxels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub voxels: BTreeSet<VoxelPos>,
    /// Some member sits on the grid boundary (and edges are not sealed).
    pub touches_boundary: bool,
    /// The traversal stopped at `max_depth` before exhausting the component.
    pub truncated: bool,
}

impl Region {
    pub fn is_enclosed(&self) -> bool {
        !self.touches_boundary
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

/// Result of partitioning a whole grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    pub regions: Vec<Region>,
    /// At least one region was cut short.
    pub truncated: bool,
}

/// Outcome of a bounded search for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reach {
    pub found: bool,
    /// The search hit `max_depth` before finding what it was looking for.
    pub truncated: bool,
}

/// Whether a voxel at `pos` opens onto the outside: it lies on the grid edge
/// or has a face neighbour outside the grid.
pub fn opens_to_boundary(grid: &VoxelGrid, pos: VoxelPos, settings: &FloodSettings) -> bool {
    if settings.edges_sealed {
        return false;
    }
    grid.is_edge(pos) || pos.neighbors().iter().any(|n| !grid.in_bounds(*n))
}

/// Breadth-first walk from `start` over passable voxels accepted by `admit`.
///
/// `visit` is called for every dequeued voxel; returning `true` stops the
/// walk early. Returns whether the walk was cut short by `max_depth`.
fn walk(
    grid: &VoxelGrid,
    start: VoxelPos,
    settings: &FloodSettings,
    admit: impl Fn(VoxelPos) -> bool,
    mut visit: impl FnMut(VoxelPos) -> bool,
) -> bool {
    if !grid.is_passable(start) || !admit(start) {
        return false;
    }

    let mut queue = VecDeque::from([start]);
    let mut seen = HashSet::from([start]);
    let mut iterations = 0;

    while let Some(current) = queue.pop_front() {
        if iterations >= settings.max_depth {
            return true;
        }
        iterations += 1;

        if visit(current) {
            return false;
        }

        for neighbor in current.neighbors() {
            if seen.contains(&neighbor) || !grid.is_passable(neighbor) || !admit(neighbor) {
                continue;
            }
            seen.insert(neighbor);
            queue.push_back(neighbor);
        }
    }
    false
}

/// Collect the connected component containing `start`.
pub fn flood_fill(grid: &VoxelGrid, start: VoxelPos, settings: &FloodSettings) -> Region {
    flood_fill_excluding(grid, start, settings, &HashSet::new())
}

/// Like [`flood_fill`], but never enters voxels already in `claimed`.
pub fn flood_fill_excluding(
    grid: &VoxelGrid,
    start: VoxelPos,
    settings: &FloodSettings,
    claimed: &HashSet<VoxelPos>,
) -> Region {
    let mut region = Region::default();
    let truncated = walk(
        grid,
        start,
        settings,
        |p| !claimed.contains(&p),
        |p| {
            region.voxels.insert(p);
            if opens_to_boundary(grid, p, settings) {
                region.touches_boundary = true;
            }
            false
        },
    );
    region.truncated = truncated;
    region
}

/// Split every passable voxel of the grid into connected regions.
///
/// Positions are scanned in [`VoxelGrid::positions`] order, so the result is
/// deterministic for a given grid.
pub fn partition(grid: &VoxelGrid, settings: &FloodSettings) -> Partition {
    let mut claimed: HashSet<VoxelPos> = HashSet::new();
    let mut out = Partition::default();

    for pos in grid.positions() {
        if claimed.contains(&pos) || !grid.is_passable(pos) {
            continue;
        }
        let region = flood_fill_excluding(grid, pos, settings, &claimed);
        if region.is_empty() {
            continue;
        }
        if region.truncated {
            log::warn!(
                "flood fill from {} stopped at {} voxels (max depth {})",
                pos,
                region.len(),
                settings.max_depth
            );
        }
        claimed.extend(region.voxels.iter().copied());
        out.truncated |= region.truncated;
        out.regions.push(region);
    }
    out
}

/// Whether the boundary can be reached from `start` moving only through
/// passable voxels in `allowed`.
///
/// A walk cut short by `max_depth` without finding the boundary reports
/// `found: false, truncated: true`.
pub fn reaches_boundary(
    grid: &VoxelGrid,
    start: VoxelPos,
    allowed: &BTreeSet<VoxelPos>,
    settings: &FloodSettings,
) -> Reach {
    if settings.edges_sealed {
        return Reach::default();
    }
    let mut found = false;
    let truncated = walk(
        grid,
        start,
        settings,
        |p| allowed.contains(&p),
        |p| {
            found = opens_to_boundary(grid, p, settings);
            found
        },
    );
    Reach { found, truncated }
}

/// Whether every voxel in `targets` is reachable from `start` through
/// passable voxels in `allowed`.
pub fn are_connected_within(
    grid: &VoxelGrid,
    start: VoxelPos,
    targets: &[VoxelPos],
    allowed: &BTreeSet<VoxelPos>,
    settings: &FloodSettings,
) -> Reach {
    let wanted: HashSet<VoxelPos> = targets.iter().copied().collect();
    if wanted.is_empty() {
        return Reach {
            found: true,
            truncated: false,
        };
    }
    let mut found: HashSet<VoxelPos> = HashSet::new();
    let truncated = walk(
        grid,
        start,
        settings,
        |p| allowed.contains(&p),
        |p| {
            if wanted.contains(&p) {
                found.insert(p);
            }
            found.len() == wanted.len()
        },
    );
    Reach {
        found: found.len() == wanted.len(),
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{GridSize, VoxelData};

    /// Solid grid with a hollow box interior of `inner` voxels per side, starting at (1,1,1).
    fn sealed_room(inner: i32) -> VoxelGrid {
        let n = inner + 2;
        let mut grid = VoxelGrid::new(GridSize::new(n, n, n), 1.0);
        for pos in grid.positions().collect::<Vec<_>>() {
            let interior = (1..=inner).contains(&pos.x)
                && (1..=inner).contains(&pos.y)
                && (1..=inner).contains(&pos.z);
            if !interior {
                grid.set(pos, VoxelData::solid());
            }
        }
        grid
    }

    #[test]
    fn test_sealed_room_is_one_enclosed_region() {
        let grid = sealed_room(3);
        let p = partition(&grid, &FloodSettings::default());
        assert_eq!(p.regions.len(), 1);
        assert_eq!(p.regions[0].len(), 27);
        assert!(p.regions[0].is_enclosed());
        assert!(!p.truncated);
    }

    #[test]
    fn test_open_grid_is_exposed() {
        let grid = VoxelGrid::new(GridSize::new(4, 4, 4), 1.0);
        let p = partition(&grid, &FloodSettings::default());
        assert_eq!(p.regions.len(), 1);
        assert_eq!(p.regions[0].len(), 64);
        assert!(!p.regions[0].is_enclosed());
    }

    #[test]
    fn test_sealed_edges_enclose_open_grid() {
        let grid = VoxelGrid::new(GridSize::new(4, 4, 4), 1.0);
        let settings = FloodSettings {
            edges_sealed: true,
            ..Default::default()
        };
        assert!(partition(&grid, &settings).regions[0].is_enclosed());
    }

    #[test]
    fn test_hole_in_wall_exposes_room() {
        let mut grid = sealed_room(3);
        grid.clear_voxel(VoxelPos::new(0, 2, 2));
        let p = partition(&grid, &FloodSettings::default());
        assert_eq!(p.regions.len(), 1);
        assert_eq!(p.regions[0].len(), 28);
        assert!(!p.regions[0].is_enclosed());
    }

    #[test]
    fn test_depth_bound_truncates() {
        let grid = VoxelGrid::new(GridSize::new(10, 10, 10), 1.0);
        let settings = FloodSettings {
            max_depth: 100,
            ..Default::default()
        };
        let region = flood_fill(&grid, VoxelPos::new(0, 0, 0), &settings);
        assert!(region.truncated);
        assert_eq!(region.len(), 100);
    }

    #[test]
    fn test_reaches_boundary_respects_allowed_set() {
        let mut grid = sealed_room(3);
        let interior = flood_fill(&grid, VoxelPos::new(2, 2, 2), &FloodSettings::default()).voxels;
        assert!(!reaches_boundary(&grid, VoxelPos::new(2, 2, 2), &interior, &FloodSettings::default()).found);

        let hole = VoxelPos::new(0, 2, 2);
        grid.clear_voxel(hole);
        // The hole is not part of the allowed set yet
        assert!(!reaches_boundary(&grid, VoxelPos::new(2, 2, 2), &interior, &FloodSettings::default()).found);

        let mut widened = interior.clone();
        widened.insert(hole);
        assert!(reaches_boundary(&grid, VoxelPos::new(2, 2, 2), &widened, &FloodSettings::default()).found);
    }

    #[test]
    fn test_connectivity_within_region() {
        // Two cells joined by a one-voxel bridge along x
        let mut grid = VoxelGrid::new(GridSize::new(5, 3, 3), 1.0);
        for pos in grid.positions().collect::<Vec<_>>() {
            if pos.y != 1 || pos.z != 1 {
                grid.set(pos, VoxelData::solid());
            }
        }
        let settings = FloodSettings::default();
        let line = flood_fill(&grid, VoxelPos::new(0, 1, 1), &settings).voxels;
        assert_eq!(line.len(), 5);

        let a = VoxelPos::new(1, 1, 1);
        let b = VoxelPos::new(3, 1, 1);
        assert!(are_connected_within(&grid, a, &[a, b], &line, &settings).found);

        grid.set(VoxelPos::new(2, 1, 1), VoxelData::solid());
        assert!(!are_connected_within(&grid, a, &[a, b], &line, &settings).found);
    }

    #[test]
    fn test_depth_bound_flags_reachability() {
        // A long enclosed corridor: the walk gives up before seeing every member
        let mut grid = VoxelGrid::new(GridSize::new(30, 3, 3), 1.0);
        for pos in grid.positions().collect::<Vec<_>>() {
            if pos.y != 1 || pos.z != 1 || pos.x == 0 || pos.x == 29 {
                grid.set(pos, VoxelData::solid());
            }
        }
        let corridor = flood_fill(&grid, VoxelPos::new(1, 1, 1), &FloodSettings::default()).voxels;
        assert_eq!(corridor.len(), 28);

        let shallow = FloodSettings {
            max_depth: 10,
            ..Default::default()
        };
        let reach = reaches_boundary(&grid, VoxelPos::new(1, 1, 1), &corridor, &shallow);
        assert_eq!(reach, Reach { found: false, truncated: true });

        let far = VoxelPos::new(28, 1, 1);
        let reach = are_connected_within(&grid, VoxelPos::new(1, 1, 1), &[far], &corridor, &shallow);
        assert!(!reach.found);
        assert!(reach.truncated);

        let deep = reaches_boundary(&grid, VoxelPos::new(1, 1, 1), &corridor, &FloodSettings::default());
        assert_eq!(deep, Reach::default());
    }
}
