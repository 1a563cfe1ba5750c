//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for efficient binary serialization of the entire simulation.
//! Components are serialized individually then reconstructed on load.
//! `Entity` handles are not stable across worlds, so every reference between
//! entities is written as an index into the saved entity list.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Write};

use ventwork_logic::hazards::{HazardReport, HazardThresholds};
use ventwork_logic::node::Node;
use ventwork_logic::transfer::FlowPolicy;
use ventwork_logic::voxel::{VoxelGrid, VoxelPos};

use crate::components::*;
use crate::config::SimConfig;
use crate::zones::{Zone, ZoneDetector};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Simulated seconds
    pub sim_time: f64,
    pub tick_count: u64,
    pub time_scale: f64,
    pub config: SimConfig,
    pub grid: VoxelGrid,
    pub zones: Vec<SavedZone>,
    pub next_zone_id: u32,
    /// Index of the ambient reservoir node
    pub exterior: Option<u32>,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    pub node: Option<Node>,
    pub label: Option<NodeLabel>,
    pub connection: Option<SavedConnection>,
    pub leak_group: Option<SavedLeakGroup>,
    pub scrubber: Option<SavedScrubber>,
    pub canister: Option<SavedCanister>,
    pub monitor: Option<SavedMonitor>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedConnection {
    pub a: Option<u32>,
    pub b: Option<u32>,
    pub policy: FlowPolicy,
    pub active: bool,
    pub thermal_conductance: f64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedLeakGroup {
    pub members: Vec<Option<u32>>,
    pub exterior: Option<u32>,
    pub sealed: bool,
    pub leak_rate: f64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedScrubber {
    pub node: Option<u32>,
    pub scrub_rate: f64,
    pub produces_oxygen: bool,
    pub oxygen_ratio: f64,
    pub requires_power: bool,
    pub powered: bool,
    pub active: bool,
    pub total_scrubbed: f64,
    pub total_produced: f64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedCanister {
    pub store: Node,
    pub node: Option<u32>,
    pub mode: CanisterMode,
    pub max_pressure: f64,
    pub transfer_rate: f64,
    pub total_filled: f64,
    pub total_emptied: f64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedMonitor {
    pub node: Option<u32>,
    pub thresholds: HazardThresholds,
    pub report: HazardReport,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedZone {
    pub id: u32,
    pub voxels: BTreeSet<VoxelPos>,
    pub enclosed: bool,
    pub node: Option<u32>,
    pub leak_group: Option<u32>,
    pub centre: Vec3,
}

/// Entity → save index, in entity index order.
struct EntityIndex(HashMap<Entity, u32>);

impl EntityIndex {
    fn of(world: &World) -> (Self, Vec<Entity>) {
        let mut entities: Vec<Entity> = world.iter().map(|e| e.entity()).collect();
        entities.sort_by_key(|e| e.id());
        let map = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (*e, i as u32))
            .collect();
        (Self(map), entities)
    }

    /// `None` for references to entities that no longer exist.
    fn get(&self, entity: Entity) -> Option<u32> {
        self.0.get(&entity).copied()
    }
}

/// Resolve a saved index; dangling references stay dangling.
fn resolve(spawned: &[Entity], index: Option<u32>) -> Entity {
    index
        .and_then(|i| spawned.get(i as usize).copied())
        .unwrap_or(Entity::DANGLING)
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World, index: &EntityIndex, order: &[Entity]) -> Vec<SerializableEntity> {
    let mut entities = Vec::with_capacity(order.len());

    for &entity in order {
        let mut se = SerializableEntity::default();
        let Ok(entity_ref) = world.entity(entity) else {
            entities.push(se);
            continue;
        };

        if let Some(c) = entity_ref.get::<&Node>() {
            se.node = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&NodeLabel>() {
            se.label = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Connection>() {
            se.connection = Some(SavedConnection {
                a: index.get(c.a),
                b: index.get(c.b),
                policy: c.policy,
                active: c.active,
                thermal_conductance: c.thermal_conductance,
            });
        }
        if let Some(c) = entity_ref.get::<&LeakGroup>() {
            se.leak_group = Some(SavedLeakGroup {
                members: c.members.iter().map(|m| index.get(*m)).collect(),
                exterior: c.exterior.and_then(|e| index.get(e)),
                sealed: c.sealed,
                leak_rate: c.leak_rate,
            });
        }
        if let Some(c) = entity_ref.get::<&Scrubber>() {
            se.scrubber = Some(SavedScrubber {
                node: index.get(c.node),
                scrub_rate: c.scrub_rate,
                produces_oxygen: c.produces_oxygen,
                oxygen_ratio: c.oxygen_ratio,
                requires_power: c.requires_power,
                powered: c.powered,
                active: c.active,
                total_scrubbed: c.total_scrubbed,
                total_produced: c.total_produced,
            });
        }
        if let Some(c) = entity_ref.get::<&Canister>() {
            se.canister = Some(SavedCanister {
                store: c.store,
                node: c.node.and_then(|e| index.get(e)),
                mode: c.mode,
                max_pressure: c.max_pressure,
                transfer_rate: c.transfer_rate,
                total_filled: c.total_filled,
                total_emptied: c.total_emptied,
            });
        }
        if let Some(c) = entity_ref.get::<&HazardMonitor>() {
            se.monitor = Some(SavedMonitor {
                node: index.get(c.node),
                thresholds: c.thresholds,
                report: c.report.clone(),
            });
        }

        entities.push(se);
    }

    entities
}

/// Rebuild a world from serialized entities
fn deserialize_entities(world: &mut World, entities: Vec<SerializableEntity>) -> Vec<Entity> {
    // Reserve every entity first so references can point forward.
    let spawned: Vec<Entity> = entities.iter().map(|_| world.spawn(())).collect();

    for (se, &entity) in entities.into_iter().zip(&spawned) {
        spawn_components(world, &spawned, entity, se);
    }
    spawned
}

/// Attach all saved components to an entity
fn spawn_components(world: &mut World, spawned: &[Entity], entity: Entity, se: SerializableEntity) {
    if let Some(c) = se.node {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.label {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.connection {
        let mut connection = Connection::new(resolve(spawned, c.a), resolve(spawned, c.b), c.policy)
            .with_thermal_conductance(c.thermal_conductance);
        connection.active = c.active;
        let _ = world.insert_one(entity, connection);
    }
    if let Some(c) = se.leak_group {
        let members = c.members.into_iter().map(|m| resolve(spawned, m)).collect();
        let exterior = c.exterior.map(|e| resolve(spawned, Some(e)));
        let mut group = LeakGroup::new(members, exterior, c.leak_rate);
        group.sealed = c.sealed;
        let _ = world.insert_one(entity, group);
    }
    if let Some(c) = se.scrubber {
        let scrubber = Scrubber {
            node: resolve(spawned, c.node),
            scrub_rate: c.scrub_rate,
            produces_oxygen: c.produces_oxygen,
            oxygen_ratio: c.oxygen_ratio,
            requires_power: c.requires_power,
            powered: c.powered,
            active: c.active,
            operational: true,
            total_scrubbed: c.total_scrubbed,
            total_produced: c.total_produced,
        };
        let _ = world.insert_one(entity, scrubber);
    }
    if let Some(c) = se.canister {
        let canister = Canister {
            store: c.store,
            node: c.node.map(|n| resolve(spawned, Some(n))),
            mode: c.mode,
            max_pressure: c.max_pressure,
            transfer_rate: c.transfer_rate,
            total_filled: c.total_filled,
            total_emptied: c.total_emptied,
        };
        let _ = world.insert_one(entity, canister);
    }
    if let Some(c) = se.monitor {
        let monitor = HazardMonitor {
            node: resolve(spawned, c.node),
            thresholds: c.thresholds,
            report: c.report,
        };
        let _ = world.insert_one(entity, monitor);
    }
}

/// Save the complete simulation to a writer
#[allow(clippy::too_many_arguments)]
pub fn save_simulation<W: Write>(
    writer: W,
    world: &World,
    grid: &VoxelGrid,
    zones: &ZoneDetector,
    config: &SimConfig,
    sim_time: f64,
    tick_count: u64,
    time_scale: f64,
) -> Result<(), SaveError> {
    let (index, order) = EntityIndex::of(world);
    let entities = serialize_entities(world, &index, &order);

    let saved_zones = zones
        .zones()
        .map(|z| SavedZone {
            id: z.id,
            voxels: z.voxels.clone(),
            enclosed: z.enclosed,
            node: index.get(z.node),
            leak_group: index.get(z.leak_group),
            centre: z.centre,
        })
        .collect();

    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time,
        tick_count,
        time_scale,
        config: config.clone(),
        grid: grid.clone(),
        zones: saved_zones,
        next_zone_id: zones.next_id(),
        exterior: zones.exterior().and_then(|e| index.get(e)),
        entities,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    let spawned = deserialize_entities(&mut world, save_data.entities);

    let zones = save_data
        .zones
        .into_iter()
        .map(|z| Zone {
            id: z.id,
            voxels: z.voxels,
            enclosed: z.enclosed,
            node: resolve(&spawned, z.node),
            leak_group: resolve(&spawned, z.leak_group),
            centre: z.centre,
        })
        .collect();

    Ok(LoadedSimulation {
        world,
        grid: save_data.grid,
        zones,
        next_zone_id: save_data.next_zone_id,
        exterior: save_data.exterior.map(|e| resolve(&spawned, Some(e))),
        config: save_data.config,
        sim_time: save_data.sim_time,
        tick_count: save_data.tick_count,
        time_scale: save_data.time_scale,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub world: World,
    pub grid: VoxelGrid,
    pub zones: Vec<Zone>,
    pub next_zone_id: u32,
    pub exterior: Option<Entity>,
    pub config: SimConfig,
    pub sim_time: f64,
    pub tick_count: u64,
    pub time_scale: f64,
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationEngine;
    use crate::generation::TerrainKind;
    use ventwork_logic::gas::Gas;
    use ventwork_logic::voxel::GridSize;

    #[test]
    fn test_save_load_roundtrip() {
        let mut engine = SimulationEngine::new();
        let a = engine.create_named_node("High", 200.0, 293.0, 1.0);
        let b = engine.create_named_node("Low", 50.0, 293.0, 1.0);
        engine.create_connection(a, b, ConnectionKind::Pipe, 0.5);
        engine.add_scrubber(b);
        engine.add_monitor(a);

        for _ in 0..10 {
            engine.advance(0.1);
        }

        let original_time = engine.sim_time();
        let original_moles = engine.total_moles_in_system();

        let mut save_buffer = Vec::new();
        engine.save(&mut save_buffer).expect("Save failed");

        let mut loaded = SimulationEngine::new();
        loaded.load(&save_buffer[..]).expect("Load failed");

        assert!((loaded.sim_time() - original_time).abs() < 1e-9);
        assert_eq!(loaded.tick_count(), engine.tick_count());
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.connection_count(), 1);
        assert!((loaded.total_moles_in_system() - original_moles).abs() < 1e-9);

        // References survived: the loaded pipe still moves gas.
        let report = loaded.step(0.1);
        assert_eq!(report.flow.flowing, 1);
    }

    #[test]
    fn test_zones_survive_roundtrip() {
        let mut config = SimConfig::default();
        config.zones.grid_size = GridSize::new(6, 6, 6);
        let mut engine = SimulationEngine::with_config(config);
        engine.generate_terrain(TerrainKind::Box {
            min: VoxelPos::new(0, 0, 0),
            max: VoxelPos::new(4, 4, 4),
        });
        let inside = VoxelPos::new(2, 2, 2);
        let node = engine.zones.node_at(inside).unwrap();
        engine.add_gas(node, Gas::CarbonDioxide, 3.0);

        let mut buf = Vec::new();
        engine.save(&mut buf).unwrap();
        let mut loaded = SimulationEngine::new();
        loaded.load(&buf[..]).unwrap();

        assert_eq!(loaded.zone_count(), engine.zone_count());
        let restored = loaded.zones.node_at(inside).unwrap();
        let n = loaded.node(restored).unwrap();
        assert!((n.mixture.moles(Gas::CarbonDioxide) - 3.0).abs() < 1e-12);
        assert!(loaded.zones.zone_at(inside).unwrap().enclosed);
        assert!(loaded.zones.exterior().is_some());
    }

    #[test]
    fn test_version_mismatch() {
        let engine = SimulationEngine::new();
        let mut buf = Vec::new();
        engine.save(&mut buf).unwrap();
        // The version is the first field: a little-endian u32.
        buf[0] = 99;
        let mut loaded = SimulationEngine::new();
        match loaded.load(&buf[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.err()),
        }
    }
}
