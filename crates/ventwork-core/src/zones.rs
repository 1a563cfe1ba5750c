//! Zone detection: binds connected regions of passable voxels to node entities.
//!
//! A full rebuild partitions the grid and spawns one node plus one leak group
//! per zone. Single-voxel edits are handled incrementally where possible:
//! a zone grows or shrinks by one voxel and is re-checked for a path to the
//! grid boundary. Edits that merge or split zones fall back to a rebuild.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use hecs::{Entity, World};
use ventwork_logic::ambient::AmbientAtmosphere;
use ventwork_logic::constants::enclosed_seed;
use ventwork_logic::flood::{
    are_connected_within, flood_fill, partition, reaches_boundary, FloodSettings, Reach,
};
use ventwork_logic::gas::{Gas, GasMixture};
use ventwork_logic::node::Node;
use ventwork_logic::thermal::ThermalState;
use ventwork_logic::voxel::{VoxelData, VoxelGrid, VoxelPos, VoxelType};

use crate::components::{LeakGroup, NodeLabel, Vec3};
use crate::config::ZoneConfig;

/// Density lost per unit of damage.
const DAMAGE_DENSITY_FACTOR: f64 = 0.1;

/// A connected region of passable voxels and the entities simulating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: u32,
    pub voxels: BTreeSet<VoxelPos>,
    /// No member can reach the grid boundary.
    pub enclosed: bool,
    pub node: Entity,
    pub leak_group: Entity,
    /// Mean world position of the member voxels.
    pub centre: Vec3,
}

impl Zone {
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn volume(&self, voxel_volume: f64) -> f64 {
        self.voxels.len() as f64 * voxel_volume
    }
}

/// Zone counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneSummary {
    pub zones: usize,
    pub enclosed: usize,
    pub exposed: usize,
    pub voxels: usize,
    /// Searches in the last detection or edit that stopped at the flood-fill
    /// depth bound. Non-zero means the zones may be incomplete.
    pub truncated: usize,
}

impl std::fmt::Display for ZoneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} zones ({} enclosed, {} exposed), {} voxels",
            self.zones, self.enclosed, self.exposed, self.voxels
        )?;
        if self.truncated > 0 {
            write!(f, ", {} truncated", self.truncated)?;
        }
        Ok(())
    }
}

/// What a single voxel edit did to the zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneUpdate {
    /// Connectivity did not change.
    Unchanged,
    /// The voxel joined a zone, which kept its classification.
    Extended(u32),
    /// The voxel left a zone, which kept its classification.
    Shrunk(u32),
    /// An enclosed zone now reaches the boundary.
    Breached(u32),
    /// An exposed zone no longer reaches the boundary.
    Sealed(u32),
    /// A new zone was created around the voxel.
    Created(u32),
    /// A zone fell below the minimum size and was removed.
    Dissolved(u32),
    /// Zones merged or split; everything was rebuilt.
    Rebuilt(ZoneSummary),
}

/// Tracks zones over a voxel grid and keeps their nodes in a world.
#[derive(Debug, Clone)]
pub struct ZoneDetector {
    settings: FloodSettings,
    min_zone_size: usize,
    ambient: AmbientAtmosphere,
    exterior_volume: f64,
    thermal: ThermalState,
    zones: BTreeMap<u32, Zone>,
    voxel_zone: HashMap<VoxelPos, u32>,
    next_id: u32,
    exterior: Option<Entity>,
    truncated: usize,
}

impl ZoneDetector {
    pub fn new(config: &ZoneConfig, thermal: ThermalState) -> Self {
        Self {
            settings: config.flood_settings(),
            min_zone_size: config.min_zone_size.max(1),
            ambient: config.ambient_atmosphere(),
            exterior_volume: config.exterior_volume,
            thermal,
            zones: BTreeMap::new(),
            voxel_zone: HashMap::new(),
            next_id: 0,
            exterior: None,
            truncated: 0,
        }
    }

    pub fn settings(&self) -> &FloodSettings {
        &self.settings
    }

    pub fn ambient(&self) -> &AmbientAtmosphere {
        &self.ambient
    }

    /// Change the outside atmosphere. Takes effect on the next conversion or rebuild;
    /// the reservoir node is refilled now.
    pub fn set_ambient(&mut self, world: &mut World, ambient: AmbientAtmosphere) {
        self.ambient = ambient;
        if let Some(exterior) = self.exterior {
            if let Ok(mut node) = world.get::<&mut Node>(exterior) {
                ambient.apply_to(&mut node, self.exterior_volume);
            }
        }
    }

    /// The reservoir node exposed zones leak into, once created.
    pub fn exterior(&self) -> Option<Entity> {
        self.exterior
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn zone(&self, id: u32) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn zone_at(&self, pos: VoxelPos) -> Option<&Zone> {
        self.voxel_zone.get(&pos).and_then(|id| self.zones.get(id))
    }

    /// Node simulating the voxel at `pos`.
    pub fn node_at(&self, pos: VoxelPos) -> Option<Entity> {
        self.zone_at(pos).map(|z| z.node)
    }

    pub fn summary(&self) -> ZoneSummary {
        let enclosed = self.zones.values().filter(|z| z.enclosed).count();
        ZoneSummary {
            zones: self.zones.len(),
            enclosed,
            exposed: self.zones.len() - enclosed,
            voxels: self.voxel_zone.len(),
            truncated: self.truncated,
        }
    }

    // ── Full rebuild ────────────────────────────────────────────────────

    /// Throw away every zone and partition the grid from scratch.
    pub fn detect_and_create_zones(&mut self, world: &mut World, grid: &VoxelGrid) -> ZoneSummary {
        self.clear_zones(world);
        self.next_id = 0;

        let partition = partition(grid, &self.settings);
        self.truncated = partition.regions.iter().filter(|r| r.truncated).count();
        let mut skipped = 0;
        for region in partition.regions {
            if region.len() < self.min_zone_size {
                skipped += 1;
                continue;
            }
            let enclosed = region.is_enclosed();
            self.spawn_zone(world, grid, region.voxels, enclosed);
        }

        let summary = self.summary();
        log::info!("zone detection: {}", summary);
        if skipped > 0 {
            log::debug!(
                "zone detection: {} regions below minimum size {}",
                skipped,
                self.min_zone_size
            );
        }
        summary
    }

    /// Despawn every zone's node and leak group. The reservoir survives.
    pub fn clear_zones(&mut self, world: &mut World) {
        for zone in std::mem::take(&mut self.zones).into_values() {
            let _ = world.despawn(zone.node);
            let _ = world.despawn(zone.leak_group);
        }
        self.voxel_zone.clear();
    }

    // ── Voxel edits ─────────────────────────────────────────────────────

    /// Clear a voxel and update the zones around it.
    pub fn on_voxel_destroyed(
        &mut self,
        world: &mut World,
        grid: &mut VoxelGrid,
        pos: VoxelPos,
    ) -> ZoneUpdate {
        self.apply_voxel(world, grid, pos, VoxelData::empty())
    }

    /// Place a voxel and update the zones around it.
    pub fn on_voxel_created(
        &mut self,
        world: &mut World,
        grid: &mut VoxelGrid,
        pos: VoxelPos,
        kind: VoxelType,
        density: f64,
    ) -> ZoneUpdate {
        let data = VoxelData::new(kind, density, true);
        let data = VoxelData {
            sealed: !data.is_passable(),
            ..data
        };
        self.apply_voxel(world, grid, pos, data)
    }

    /// Wear down a solid voxel. It turns partial once its density drops below
    /// the passable threshold and is destroyed at zero.
    pub fn on_voxel_damaged(
        &mut self,
        world: &mut World,
        grid: &mut VoxelGrid,
        pos: VoxelPos,
        amount: f64,
    ) -> ZoneUpdate {
        let current = grid.get(pos);
        if current.kind != VoxelType::Solid || !(amount > 0.0) {
            return ZoneUpdate::Unchanged;
        }
        let density = current.density - amount * DAMAGE_DENSITY_FACTOR;
        let data = if density <= 0.0 {
            VoxelData::empty()
        } else if density < ventwork_logic::voxel::PASSABLE_DENSITY {
            VoxelData::new(VoxelType::Partial, density, false)
        } else {
            VoxelData::new(VoxelType::Solid, density, true)
        };
        self.apply_voxel(world, grid, pos, data)
    }

    /// Store `data` at `pos` and react to any change in passability.
    pub fn apply_voxel(
        &mut self,
        world: &mut World,
        grid: &mut VoxelGrid,
        pos: VoxelPos,
        data: VoxelData,
    ) -> ZoneUpdate {
        let was_passable = grid.is_passable(pos);
        if !grid.set(pos, data) {
            return ZoneUpdate::Unchanged;
        }
        let now_passable = grid.is_passable(pos);
        if was_passable != now_passable {
            self.truncated = 0;
        }
        match (was_passable, now_passable) {
            (false, true) => self.opened(world, grid, pos),
            (true, false) => self.closed(world, grid, pos),
            _ => ZoneUpdate::Unchanged,
        }
    }

    /// `pos` just became passable.
    fn opened(&mut self, world: &mut World, grid: &VoxelGrid, pos: VoxelPos) -> ZoneUpdate {
        let mut adjacent = BTreeSet::new();
        let mut loose_neighbour = false;
        for n in pos.neighbors() {
            if !grid.is_passable(n) {
                continue;
            }
            match self.voxel_zone.get(&n) {
                Some(id) => {
                    adjacent.insert(*id);
                }
                None => loose_neighbour = true,
            }
        }

        if adjacent.len() >= 2 || (loose_neighbour && !adjacent.is_empty()) {
            log::debug!(
                "voxel {} joins {} zones: rebuilding",
                pos,
                adjacent.len().max(2)
            );
            return ZoneUpdate::Rebuilt(self.detect_and_create_zones(world, grid));
        }

        let Some(id) = adjacent.into_iter().next() else {
            let region = flood_fill(grid, pos, &self.settings);
            self.truncated += usize::from(region.truncated);
            if region.len() < self.min_zone_size {
                log::debug!("voxel {} opened a region too small for a zone", pos);
                return ZoneUpdate::Unchanged;
            }
            let enclosed = region.is_enclosed();
            let id = self.spawn_zone(world, grid, region.voxels, enclosed);
            log::debug!("voxel {} opened new zone {}", pos, id);
            return ZoneUpdate::Created(id);
        };

        self.voxel_zone.insert(pos, id);
        let Some(zone) = self.zones.get_mut(&id) else {
            return ZoneUpdate::Unchanged;
        };
        zone.voxels.insert(pos);
        let breached = if zone.enclosed {
            let reach = reaches_boundary(grid, pos, &zone.voxels, &self.settings);
            self.truncated += usize::from(reach.truncated);
            reach.found
        } else {
            false
        };
        self.refresh_geometry(world, grid, id);

        if breached {
            log::debug!("voxel {} breached zone {}", pos, id);
            self.convert_zone_to_exposed(world, id);
            ZoneUpdate::Breached(id)
        } else {
            log::debug!("voxel {} extended zone {}", pos, id);
            ZoneUpdate::Extended(id)
        }
    }

    /// `pos` just stopped being passable.
    fn closed(&mut self, world: &mut World, grid: &VoxelGrid, pos: VoxelPos) -> ZoneUpdate {
        let Some(id) = self.voxel_zone.remove(&pos) else {
            return ZoneUpdate::Unchanged;
        };
        let Some(zone) = self.zones.get_mut(&id) else {
            return ZoneUpdate::Unchanged;
        };
        zone.voxels.remove(&pos);

        if zone.voxels.len() < self.min_zone_size {
            log::debug!("voxel {} shrank zone {} below minimum size", pos, id);
            self.dissolve_zone(world, id);
            return ZoneUpdate::Dissolved(id);
        }

        let members: Vec<VoxelPos> = pos
            .neighbors()
            .into_iter()
            .filter(|n| zone.voxels.contains(n))
            .collect();
        if members.len() >= 2 {
            let reach =
                are_connected_within(grid, members[0], &members[1..], &zone.voxels, &self.settings);
            if !reach.found {
                log::debug!("voxel {} split zone {}: rebuilding", pos, id);
                return ZoneUpdate::Rebuilt(self.detect_and_create_zones(world, grid));
            }
        }

        let sealed = if zone.enclosed {
            false
        } else {
            let reach = boundary_reachable(grid, zone, &self.settings);
            self.truncated += usize::from(reach.truncated);
            !reach.found
        };
        self.refresh_geometry(world, grid, id);

        if sealed {
            log::debug!("voxel {} sealed zone {}", pos, id);
            self.convert_zone_to_enclosed(world, id);
            ZoneUpdate::Sealed(id)
        } else {
            log::debug!("voxel {} shrank zone {}", pos, id);
            ZoneUpdate::Shrunk(id)
        }
    }

    // ── Conversions ─────────────────────────────────────────────────────

    /// Open a zone to the ambient atmosphere. Returns false if it was already
    /// exposed or does not exist.
    pub fn convert_zone_to_exposed(&mut self, world: &mut World, id: u32) -> bool {
        if !self.zones.get(&id).is_some_and(|z| z.enclosed) {
            return false;
        }
        let exterior = self.ensure_exterior(world);
        let ambient = self.ambient;
        let Some(zone) = self.zones.get_mut(&id) else {
            return false;
        };
        zone.enclosed = false;

        if let Ok(mut group) = world.get::<&mut LeakGroup>(zone.leak_group) {
            group.exterior = Some(exterior);
            group.set_sealed(false);
            group.set_leak_rate(1.0);
        }
        if let Ok(mut node) = world.get::<&mut Node>(zone.node) {
            let volume = node.volume();
            ambient.apply_to(&mut node, volume);
        }
        if let Ok(mut label) = world.get::<&mut NodeLabel>(zone.node) {
            label.name = format!("Exposed Zone {} (BREACHED)", id);
        }
        log::debug!("zone {} converted to exposed", id);
        true
    }

    /// Close a zone off and refill it with the breathable seed. Returns false
    /// if it was already enclosed or does not exist.
    pub fn convert_zone_to_enclosed(&mut self, world: &mut World, id: u32) -> bool {
        let Some(zone) = self.zones.get_mut(&id) else {
            return false;
        };
        if zone.enclosed {
            return false;
        }
        zone.enclosed = true;

        if let Ok(mut group) = world.get::<&mut LeakGroup>(zone.leak_group) {
            group.set_sealed(true);
            group.set_leak_rate(0.0);
        }
        if let Ok(mut node) = world.get::<&mut Node>(zone.node) {
            seed_enclosed(&mut node);
        }
        if let Ok(mut label) = world.get::<&mut NodeLabel>(zone.node) {
            label.name = format!("Enclosed Zone {} (RESEALED)", id);
        }
        log::debug!("zone {} converted to enclosed", id);
        true
    }

    // ── Bookkeeping ─────────────────────────────────────────────────────

    fn spawn_zone(
        &mut self,
        world: &mut World,
        grid: &VoxelGrid,
        voxels: BTreeSet<VoxelPos>,
        enclosed: bool,
    ) -> u32 {
        let exterior = self.ensure_exterior(world);
        let id = self.next_id;
        self.next_id += 1;

        let volume = voxels.len() as f64 * grid.voxel_volume();
        let centre = centre_of(grid, &voxels);
        let mut node = Node::from_mixture(GasMixture::empty(enclosed_seed::TEMPERATURE, volume))
            .with_thermal(self.thermal);
        let name = if enclosed {
            seed_enclosed(&mut node);
            format!("Enclosed Zone {}", id)
        } else {
            self.ambient.apply_to(&mut node, volume);
            format!("Exposed Zone {}", id)
        };

        let node_entity = world.spawn((node, NodeLabel::new(name).with_position(centre)));
        let group = if enclosed {
            LeakGroup {
                exterior: Some(exterior),
                ..LeakGroup::sealed(vec![node_entity])
            }
        } else {
            LeakGroup::new(vec![node_entity], Some(exterior), 1.0)
        };
        let leak_group = world.spawn((group,));

        for v in &voxels {
            self.voxel_zone.insert(*v, id);
        }
        log::debug!(
            "created {} zone {}: {} voxels, {:.1} m³",
            if enclosed { "enclosed" } else { "exposed" },
            id,
            voxels.len(),
            volume
        );
        self.zones.insert(
            id,
            Zone {
                id,
                voxels,
                enclosed,
                node: node_entity,
                leak_group,
                centre,
            },
        );
        id
    }

    fn dissolve_zone(&mut self, world: &mut World, id: u32) {
        if let Some(zone) = self.zones.remove(&id) {
            for v in &zone.voxels {
                self.voxel_zone.remove(v);
            }
            let _ = world.despawn(zone.node);
            let _ = world.despawn(zone.leak_group);
        }
    }

    /// Resize the node and move its label after a zone gained or lost a voxel.
    /// Moles are kept, so pressure follows the volume.
    fn refresh_geometry(&mut self, world: &mut World, grid: &VoxelGrid, id: u32) {
        let Some(zone) = self.zones.get_mut(&id) else {
            return;
        };
        zone.centre = centre_of(grid, &zone.voxels);
        let volume = zone.volume(grid.voxel_volume());
        if let Ok(mut node) = world.get::<&mut Node>(zone.node) {
            node.set_volume(volume);
        }
        if let Ok(mut label) = world.get::<&mut NodeLabel>(zone.node) {
            label.position = zone.centre;
        }
    }

    /// The reservoir node, spawning it from the ambient preset if needed.
    fn ensure_exterior(&mut self, world: &mut World) -> Entity {
        if let Some(e) = self.exterior {
            if world.get::<&Node>(e).is_ok() {
                return e;
            }
        }
        let mut node = Node::from_mixture(GasMixture::empty(self.ambient.temperature, self.exterior_volume))
            .with_heat_loss(0.0, self.ambient.temperature);
        self.ambient.apply_to(&mut node, self.exterior_volume);
        let e = world.spawn((node, NodeLabel::new("Ambient Reservoir")));
        self.exterior = Some(e);
        e
    }

    /// Reinstate zones from a save. Entities must already exist in the world.
    pub fn restore(&mut self, zones: Vec<Zone>, next_id: u32, exterior: Option<Entity>) {
        self.zones.clear();
        self.voxel_zone.clear();
        for zone in zones {
            for v in &zone.voxels {
                self.voxel_zone.insert(*v, zone.id);
            }
            self.zones.insert(zone.id, zone);
        }
        self.next_id = next_id;
        self.exterior = exterior;
    }
}

/// Fill a node with the breathable seed at its current volume.
fn seed_enclosed(node: &mut Node) {
    node.mixture.clear();
    node.mixture.set_moles(Gas::Nitrogen, enclosed_seed::NITROGEN);
    node.mixture.set_moles(Gas::Oxygen, enclosed_seed::OXYGEN);
    node.mixture.set_temperature(enclosed_seed::TEMPERATURE);
    node.sync_energy_from_temperature();
}

/// Whether any member of `zone` can walk to the grid boundary inside the zone.
fn boundary_reachable(grid: &VoxelGrid, zone: &Zone, settings: &FloodSettings) -> Reach {
    match zone.voxels.first() {
        Some(start) => reaches_boundary(grid, *start, &zone.voxels, settings),
        None => Reach::default(),
    }
}

fn centre_of(grid: &VoxelGrid, voxels: &BTreeSet<VoxelPos>) -> Vec3 {
    if voxels.is_empty() {
        return Vec3::ZERO;
    }
    let sum = voxels
        .iter()
        .fold(Vec3::ZERO, |acc, v| acc + Vec3::from(grid.voxel_to_world(*v)));
    sum * (1.0 / voxels.len() as f64)
}
