//! Sparse 3D voxel occupancy grid.
//!
//! The grid has a fixed extent; only non-empty voxels are stored. A position
//! inside the extent that has no entry is implicitly [`VoxelType::Empty`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Partial voxels below this density let gas through.
pub const PASSABLE_DENSITY: f64 = 0.5;

/// Integer voxel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    /// ±x, ±y, ±z.
    pub const FACE_OFFSETS: [(i32, i32, i32); 6] = [
        (1, 0, 0),
        (-1, 0, 0),
        (0, 1, 0),
        (0, -1, 0),
        (0, 0, 1),
        (0, 0, -1),
    ];

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The six face-adjacent positions, in a fixed order.
    pub fn neighbors(self) -> [VoxelPos; 6] {
        Self::FACE_OFFSETS.map(|(dx, dy, dz)| self.offset(dx, dy, dz))
    }
}

impl std::fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Grid extent in voxels along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridSize {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn cells(&self) -> usize {
        (self.x.max(0) as usize) * (self.y.max(0) as usize) * (self.z.max(0) as usize)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(32, 32, 32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoxelType {
    Empty,
    Solid,
    Partial,
}

/// State of one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelData {
    pub kind: VoxelType,
    /// 0.0 (nothing) to 1.0 (fully dense).
    pub density: f64,
    pub sealed: bool,
}

impl Default for VoxelData {
    fn default() -> Self {
        Self::empty()
    }
}

impl VoxelData {
    pub fn new(kind: VoxelType, density: f64, sealed: bool) -> Self {
        let density = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        Self {
            kind,
            density,
            sealed,
        }
    }

    pub fn empty() -> Self {
        Self::new(VoxelType::Empty, 0.0, false)
    }

    pub fn solid() -> Self {
        Self::new(VoxelType::Solid, 1.0, true)
    }

    pub fn partial(density: f64) -> Self {
        Self::new(VoxelType::Partial, density, false)
    }

    /// Whether gas can move through this voxel.
    pub fn is_passable(&self) -> bool {
        match self.kind {
            VoxelType::Empty => true,
            VoxelType::Partial => self.density < PASSABLE_DENSITY,
            VoxelType::Solid => false,
        }
    }
}

/// Bounded, sparsely stored voxel grid with a world-space placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelGrid {
    size: GridSize,
    voxel_size: f64,
    origin: [f64; 3],
    voxels: HashMap<VoxelPos, VoxelData>,
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new(GridSize::default(), 1.0)
    }
}

impl VoxelGrid {
    pub fn new(size: GridSize, voxel_size: f64) -> Self {
        Self {
            size,
            voxel_size: if voxel_size > 0.0 { voxel_size } else { 1.0 },
            origin: [0.0; 3],
            voxels: HashMap::new(),
        }
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Edge length of one voxel, m.
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// Volume of one voxel, m³.
    pub fn voxel_volume(&self) -> f64 {
        self.voxel_size.powi(3)
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn in_bounds(&self, pos: VoxelPos) -> bool {
        (0..self.size.x).contains(&pos.x)
            && (0..self.size.y).contains(&pos.y)
            && (0..self.size.z).contains(&pos.z)
    }

    /// Whether `pos` lies on the outermost layer of the grid.
    pub fn is_edge(&self, pos: VoxelPos) -> bool {
        pos.x == 0
            || pos.x == self.size.x - 1
            || pos.y == 0
            || pos.y == self.size.y - 1
            || pos.z == 0
            || pos.z == self.size.z - 1
    }

    /// Voxel at `pos`; Empty when nothing is stored there.
    pub fn get(&self, pos: VoxelPos) -> VoxelData {
        self.voxels.get(&pos).copied().unwrap_or_default()
    }

    /// In bounds and passable.
    pub fn is_passable(&self, pos: VoxelPos) -> bool {
        self.in_bounds(pos) && self.get(pos).is_passable()
    }

    /// Store a voxel. Returns false (and stores nothing) when `pos` is out of bounds.
    pub fn set(&mut self, pos: VoxelPos, data: VoxelData) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        if data.kind == VoxelType::Empty {
            self.voxels.remove(&pos);
        } else {
            self.voxels.insert(pos, data);
        }
        true
    }

    pub fn set_voxel(&mut self, pos: VoxelPos, kind: VoxelType, density: f64, sealed: bool) -> bool {
        self.set(pos, VoxelData::new(kind, density, sealed))
    }

    /// Reset a voxel to Empty.
    pub fn clear_voxel(&mut self, pos: VoxelPos) -> bool {
        self.set(pos, VoxelData::empty())
    }

    /// Drop every stored voxel.
    pub fn clear(&mut self) {
        self.voxels.clear();
    }

    /// Stored (non-empty) voxels, in no particular order.
    pub fn stored(&self) -> impl Iterator<Item = (VoxelPos, VoxelData)> + '_ {
        self.voxels.iter().map(|(p, d)| (*p, *d))
    }

    pub fn stored_count(&self) -> usize {
        self.voxels.len()
    }

    /// Every in-bounds position, z-major then y then x.
    pub fn positions(&self) -> impl Iterator<Item = VoxelPos> {
        let size = self.size;
        (0..size.z).flat_map(move |z| {
            (0..size.y).flat_map(move |y| (0..size.x).map(move |x| VoxelPos::new(x, y, z)))
        })
    }

    /// Voxel containing a world-space point.
    pub fn world_to_voxel(&self, world: [f64; 3]) -> VoxelPos {
        let axis = |i: usize| ((world[i] - self.origin[i]) / self.voxel_size).floor() as i32;
        VoxelPos::new(axis(0), axis(1), axis(2))
    }

    /// World-space centre of a voxel.
    pub fn voxel_to_world(&self, pos: VoxelPos) -> [f64; 3] {
        let half = self.voxel_size * 0.5;
        [
            self.origin[0] + pos.x as f64 * self.voxel_size + half,
            self.origin[1] + pos.y as f64 * self.voxel_size + half,
            self.origin[2] + pos.z as f64 * self.voxel_size + half,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_voxel_is_empty() {
        let grid = VoxelGrid::new(GridSize::new(4, 4, 4), 1.0);
        let v = grid.get(VoxelPos::new(1, 2, 3));
        assert_eq!(v.kind, VoxelType::Empty);
        assert!(v.is_passable());
    }

    #[test]
    fn test_passability() {
        assert!(VoxelData::empty().is_passable());
        assert!(!VoxelData::solid().is_passable());
        assert!(VoxelData::partial(0.3).is_passable());
        assert!(!VoxelData::partial(0.5).is_passable());
    }

    #[test]
    fn test_out_of_bounds_set_is_rejected() {
        let mut grid = VoxelGrid::new(GridSize::new(2, 2, 2), 1.0);
        assert!(!grid.set(VoxelPos::new(2, 0, 0), VoxelData::solid()));
        assert!(!grid.set(VoxelPos::new(-1, 0, 0), VoxelData::solid()));
        assert_eq!(grid.stored_count(), 0);
        assert!(!grid.is_passable(VoxelPos::new(-1, 0, 0)));
    }

    #[test]
    fn test_setting_empty_keeps_storage_sparse() {
        let mut grid = VoxelGrid::new(GridSize::new(3, 3, 3), 1.0);
        let p = VoxelPos::new(1, 1, 1);
        grid.set(p, VoxelData::solid());
        assert_eq!(grid.stored_count(), 1);
        grid.clear_voxel(p);
        assert_eq!(grid.stored_count(), 0);
    }

    #[test]
    fn test_edges() {
        let grid = VoxelGrid::new(GridSize::new(3, 3, 3), 1.0);
        assert!(grid.is_edge(VoxelPos::new(0, 1, 1)));
        assert!(grid.is_edge(VoxelPos::new(1, 1, 2)));
        assert!(!grid.is_edge(VoxelPos::new(1, 1, 1)));
    }

    #[test]
    fn test_positions_cover_grid() {
        let grid = VoxelGrid::new(GridSize::new(2, 3, 4), 1.0);
        assert_eq!(grid.positions().count(), 24);
        assert_eq!(grid.positions().next(), Some(VoxelPos::new(0, 0, 0)));
    }

    #[test]
    fn test_world_voxel_conversion() {
        let grid = VoxelGrid::new(GridSize::new(10, 10, 10), 0.5).with_origin([-2.0, 0.0, 1.0]);
        let p = VoxelPos::new(3, 4, 5);
        let centre = grid.voxel_to_world(p);
        assert_eq!(centre, [-0.25, 2.25, 3.75]);
        assert_eq!(grid.world_to_voxel(centre), p);
        assert_eq!(grid.voxel_volume(), 0.125);
    }

    #[test]
    fn test_neighbors_are_face_adjacent() {
        let n = VoxelPos::new(0, 0, 0).neighbors();
        assert_eq!(n.len(), 6);
        for p in n {
            assert_eq!(p.x.abs() + p.y.abs() + p.z.abs(), 1);
        }
    }
}
