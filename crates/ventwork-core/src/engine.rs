//! Simulation engine - main entry point for running the atmosphere simulation

use hecs::{Entity, World};
use ventwork_logic::ambient::{AmbientAtmosphere, AmbientPreset};
use ventwork_logic::gas::Gas;
use ventwork_logic::node::Node;
use ventwork_logic::voxel::{VoxelData, VoxelGrid, VoxelPos, VoxelType};

use crate::components::*;
use crate::config::{ConfigError, SimConfig};
use crate::generation::{generate_terrain, TerrainKind};
use crate::systems::*;
use crate::zones::{ZoneDetector, ZoneSummary, ZoneUpdate};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Net heat exchanged with the environment, J.
    pub environment_heat: f64,
    /// Heat conducted along connections, J.
    pub conducted_heat: f64,
    pub flow: FlowSummary,
    pub leaking_groups: usize,
    /// CO2 removed by scrubbers, mol.
    pub scrubbed: f64,
    /// Gas moved in or out of canisters, mol.
    pub canister_moles: f64,
    pub clamped_nodes: usize,
    pub hazard_transitions: usize,
}

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing nodes, connections, leak groups, devices and monitors
    pub world: World,
    /// Voxel occupancy the zone detector works from
    pub grid: VoxelGrid,
    pub zones: ZoneDetector,
    config: SimConfig,
    validator: SystemValidator,

    /// Simulated seconds since start
    sim_time: f64,
    tick_count: u64,
    /// Scaled time not yet consumed by a tick
    accumulator: f64,
    time_scale: f64,
    paused: bool,

    last_tick: TickReport,
    last_validation: Option<ValidationReport>,
    clamp_log: ClampLog,
}

impl SimulationEngine {
    /// Create an empty simulation with default settings
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a simulation, rejecting a config that fails [`SimConfig::validate`].
    pub fn try_with_config(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Create a simulation. An invalid config is logged and used as given.
    pub fn with_config(config: SimConfig) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("running with an invalid config: {}", err);
        }
        let grid = VoxelGrid::new(config.zones.grid_size, config.zones.voxel_size);
        let zones = ZoneDetector::new(&config.zones, config.thermal_template());
        let validator = SystemValidator::new(config.validation_interval);
        Self {
            world: World::new(),
            grid,
            zones,
            time_scale: config.time_scale,
            validator,
            config,
            sim_time: 0.0,
            tick_count: 0,
            accumulator: 0.0,
            paused: false,
            last_tick: TickReport::default(),
            last_validation: None,
            clamp_log: ClampLog::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    // ── Construction surface ────────────────────────────────────────────

    /// Create a node of the default composition.
    pub fn create_node(&mut self, pressure: f64, temperature: f64, volume: f64) -> Entity {
        let name = format!("Node {}", self.node_count());
        self.create_named_node(name, pressure, temperature, volume)
    }

    pub fn create_named_node(
        &mut self,
        name: impl Into<String>,
        pressure: f64,
        temperature: f64,
        volume: f64,
    ) -> Entity {
        let node = Node::new(pressure, temperature, volume).with_thermal(self.config.thermal_template());
        self.spawn_node(node, NodeLabel::new(name))
    }

    /// Add a prepared node as-is.
    pub fn spawn_node(&mut self, node: Node, label: NodeLabel) -> Entity {
        self.world.spawn((node, label))
    }

    /// Connect two nodes. `parameter` is the conductance of a pipe or the
    /// flow rate (mol/s) of a pump running from `a` to `b`. Either kind
    /// conducts heat at the configured `pipe_thermal_conductance`.
    pub fn create_connection(
        &mut self,
        a: Entity,
        b: Entity,
        kind: ConnectionKind,
        parameter: f64,
    ) -> Entity {
        let connection = Connection::new(a, b, kind.policy(parameter))
            .with_thermal_conductance(self.config.pipe_thermal_conductance);
        self.world.spawn((connection,))
    }

    pub fn spawn_connection(&mut self, connection: Connection) -> Entity {
        self.world.spawn((connection,))
    }

    pub fn create_leak_group(
        &mut self,
        members: Vec<Entity>,
        exterior: Option<Entity>,
        leak_rate: f64,
    ) -> Entity {
        self.world.spawn((LeakGroup::new(members, exterior, leak_rate),))
    }

    pub fn add_scrubber(&mut self, node: Entity) -> Entity {
        self.world.spawn((Scrubber::new(node),))
    }

    pub fn add_canister(&mut self, canister: Canister) -> Entity {
        self.world.spawn((canister,))
    }

    pub fn add_monitor(&mut self, node: Entity) -> Entity {
        self.world.spawn((HazardMonitor::new(node),))
    }

    /// Remove any entity. Anything still referring to it becomes inert.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    // ── Read surface ────────────────────────────────────────────────────

    pub fn node(&self, entity: Entity) -> Option<Node> {
        read_node(&self.world, entity)
    }

    pub fn pressure(&self, entity: Entity) -> Option<f64> {
        self.node(entity).map(|n| n.pressure())
    }

    pub fn temperature(&self, entity: Entity) -> Option<f64> {
        self.node(entity).map(|n| n.temperature())
    }

    pub fn total_moles(&self, entity: Entity) -> Option<f64> {
        self.node(entity).map(|n| n.total_moles())
    }

    pub fn hazard(&self, monitor: Entity) -> Option<ventwork_logic::hazards::HazardLevel> {
        self.world.get::<&HazardMonitor>(monitor).ok().map(|m| m.level())
    }

    // ── Write surface ───────────────────────────────────────────────────

    /// Add gas to a node. Returns false if the node is gone.
    pub fn add_gas(&mut self, node: Entity, gas: Gas, moles: f64) -> bool {
        match self.world.get::<&mut Node>(node) {
            Ok(mut n) => {
                n.add_gas(gas, moles);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove up to `moles` of a gas. Returns what was removed.
    pub fn remove_gas(&mut self, node: Entity, gas: Gas, moles: f64) -> f64 {
        self.world
            .get::<&mut Node>(node)
            .map(|mut n| n.remove_gas(gas, moles))
            .unwrap_or(0.0)
    }

    pub fn set_connection_active(&mut self, connection: Entity, active: bool) -> bool {
        match self.world.get::<&mut Connection>(connection) {
            Ok(mut c) => {
                c.set_active(active);
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_leak_group_sealed(&mut self, group: Entity, sealed: bool) -> bool {
        match self.world.get::<&mut LeakGroup>(group) {
            Ok(mut g) => {
                g.set_sealed(sealed);
                true
            }
            Err(_) => false,
        }
    }

    // ── Voxels and zones ────────────────────────────────────────────────

    /// Write one voxel and let the zone detector react to it.
    pub fn set_voxel(
        &mut self,
        pos: VoxelPos,
        kind: VoxelType,
        density: f64,
        sealed: bool,
    ) -> ZoneUpdate {
        self.zones.apply_voxel(
            &mut self.world,
            &mut self.grid,
            pos,
            VoxelData::new(kind, density, sealed),
        )
    }

    pub fn destroy_voxel(&mut self, pos: VoxelPos) -> ZoneUpdate {
        self.zones.on_voxel_destroyed(&mut self.world, &mut self.grid, pos)
    }

    pub fn create_voxel(&mut self, pos: VoxelPos, kind: VoxelType, density: f64) -> ZoneUpdate {
        self.zones
            .on_voxel_created(&mut self.world, &mut self.grid, pos, kind, density)
    }

    pub fn damage_voxel(&mut self, pos: VoxelPos, amount: f64) -> ZoneUpdate {
        self.zones
            .on_voxel_damaged(&mut self.world, &mut self.grid, pos, amount)
    }

    /// Partition the whole grid again.
    pub fn detect_and_create_zones(&mut self) -> ZoneSummary {
        self.zones.detect_and_create_zones(&mut self.world, &self.grid)
    }

    /// Replace the grid contents with generated terrain and rebuild zones.
    pub fn generate_terrain(&mut self, kind: TerrainKind) -> ZoneSummary {
        generate_terrain(&mut self.grid, kind);
        self.detect_and_create_zones()
    }

    /// Switch the outside atmosphere. The reservoir is refilled now; zones
    /// pick it up the next time they open or rebuild.
    pub fn set_ambient(&mut self, preset: AmbientPreset) {
        self.config.zones.ambient = preset;
        self.zones
            .set_ambient(&mut self.world, AmbientAtmosphere::from_preset(preset));
    }

    // ── Clock ───────────────────────────────────────────────────────────

    /// Feed real time to the clock and run as many fixed ticks as fit.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, delta_seconds: f64) -> u32 {
        let tick = self.config.tick_length;
        if self.paused || !(delta_seconds > 0.0) || !(tick > 0.0) {
            return 0;
        }
        self.accumulator += delta_seconds * self.time_scale;

        let mut ticks = 0;
        while self.accumulator + 1e-9 >= tick {
            if ticks >= self.config.max_ticks_per_frame {
                log::debug!(
                    "dropping {:.3}s of backlog after {} ticks",
                    self.accumulator,
                    ticks
                );
                self.accumulator = 0.0;
                break;
            }
            self.step(tick);
            self.accumulator = (self.accumulator - tick).max(0.0);
            ticks += 1;
        }
        ticks
    }

    /// Run exactly one tick of `dt` seconds.
    pub fn step(&mut self, dt: f64) -> TickReport {
        let world = &mut self.world;

        settle_energy_system(world);
        let environment_heat = environment_heat_system(world, dt);
        let conducted_heat = conduction_system(world, dt);
        sync_temperature_system(world);

        let flow = connection_system(world, dt);
        let leaking_groups = leak_system(world, dt);
        let scrubbed = scrubber_system(world, dt);
        let canister_moles = canister_system(world, dt);
        let floors = self.config.safety_floors();
        let clamped_nodes = clamp_system(world, &floors, &mut self.clamp_log);

        let hazard_transitions = hazard_system(world);

        self.sim_time += dt;
        self.tick_count += 1;

        if self.config.validation_interval > 0.0 {
            if let Some(report) = self.validator.tick(&self.world, dt) {
                self.last_validation = Some(report);
            }
        }

        self.last_tick = TickReport {
            environment_heat,
            conducted_heat,
            flow,
            leaking_groups,
            scrubbed,
            canister_moles,
            clamped_nodes,
            hazard_transitions,
        };
        self.last_tick
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Simulated seconds since start
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn last_tick(&self) -> &TickReport {
        &self.last_tick
    }

    pub fn last_validation(&self) -> Option<&ValidationReport> {
        self.last_validation.as_ref()
    }

    /// Validate now, outside the interval schedule.
    pub fn validate(&mut self) -> ValidationReport {
        self.validator.validate(&self.world)
    }

    /// Drop the drift baseline, e.g. after gas was added by hand.
    pub fn reset_validation(&mut self) {
        self.validator.reset();
        self.last_validation = None;
    }

    // ── Counters ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.world.query::<&Node>().iter().count()
    }

    pub fn connection_count(&self) -> usize {
        self.world.query::<&Connection>().iter().count()
    }

    pub fn active_connection_count(&self) -> usize {
        self.world
            .query::<&Connection>()
            .iter()
            .filter(|(_, c)| c.active)
            .count()
    }

    pub fn leak_group_count(&self) -> usize {
        self.world.query::<&LeakGroup>().iter().count()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.zone_count()
    }

    /// Moles in every node and canister.
    pub fn total_moles_in_system(&self) -> f64 {
        inspect(&self.world).total_moles
    }

    /// Internal energy of every node and canister, J.
    pub fn total_energy(&self) -> f64 {
        inspect(&self.world).total_energy
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_simulation(
            writer,
            &self.world,
            &self.grid,
            &self.zones,
            &self.config,
            self.sim_time,
            self.tick_count,
            self.time_scale,
        )
    }

    /// Load simulation state from a reader
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), crate::persistence::SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        let mut zones = ZoneDetector::new(&loaded.config.zones, loaded.config.thermal_template());
        zones.restore(loaded.zones, loaded.next_zone_id, loaded.exterior);

        self.validator = SystemValidator::new(loaded.config.validation_interval);
        self.world = loaded.world;
        self.grid = loaded.grid;
        self.zones = zones;
        self.config = loaded.config;
        self.sim_time = loaded.sim_time;
        self.tick_count = loaded.tick_count;
        self.time_scale = loaded.time_scale;
        self.accumulator = 0.0;
        self.last_tick = TickReport::default();
        self.last_validation = None;
        self.clamp_log.clear();

        Ok(())
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::new();
        assert_eq!(engine.node_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.tick_count(), 0);
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut engine = SimulationEngine::new();
        engine.create_node(101.3, 293.0, 1.0);

        assert_eq!(engine.advance(0.25), 2);
        assert_eq!(engine.advance(0.05), 1);
        assert_eq!(engine.tick_count(), 3);
        assert!((engine.sim_time() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_time_scale() {
        let mut engine = SimulationEngine::new();
        engine.set_time_scale(2.0);
        engine.advance(0.5); // 1 simulated second
        assert_eq!(engine.tick_count(), 10);
        assert!((engine.sim_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_skips_frames() {
        let mut engine = SimulationEngine::new();
        engine.pause();
        assert_eq!(engine.advance(1.0), 0);
        engine.resume();
        assert_eq!(engine.advance(0.1), 1);
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut engine = SimulationEngine::new();
        assert_eq!(engine.advance(60.0), 10);
        assert_eq!(engine.advance(0.1), 1);
    }

    #[test]
    fn test_counters() {
        let mut engine = SimulationEngine::new();
        let a = engine.create_node(200.0, 293.0, 1.0);
        let b = engine.create_node(50.0, 293.0, 1.0);
        let pipe = engine.create_connection(a, b, ConnectionKind::Pipe, 0.5);
        engine.create_connection(a, b, ConnectionKind::Pump, 1.0);
        engine.create_leak_group(vec![a], Some(b), 0.5);

        assert_eq!(engine.node_count(), 2);
        assert_eq!(engine.active_connection_count(), 2);
        assert!(engine.set_connection_active(pipe, false));
        assert_eq!(engine.active_connection_count(), 1);
        assert_eq!(engine.connection_count(), 2);
        assert_eq!(engine.leak_group_count(), 1);
    }

    #[test]
    fn test_write_surface_on_missing_node() {
        let mut engine = SimulationEngine::new();
        let a = engine.create_node(101.3, 293.0, 1.0);
        engine.remove_entity(a);
        assert!(!engine.add_gas(a, Gas::Oxygen, 1.0));
        assert_eq!(engine.remove_gas(a, Gas::Oxygen, 1.0), 0.0);
        assert!(engine.pressure(a).is_none());
    }

    #[test]
    fn test_step_reports_flow() {
        let mut engine = SimulationEngine::new();
        let a = engine.create_node(200.0, 293.0, 1.0);
        let b = engine.create_node(50.0, 293.0, 1.0);
        engine.create_connection(a, b, ConnectionKind::Pipe, 0.5);

        let report = engine.step(0.1);
        assert_eq!(report.flow.flowing, 1);
        assert!(report.flow.moles_moved > 0.0);
        assert!(engine.pressure(a).unwrap() < 200.0);
    }

    #[test]
    fn test_canister_drains_into_node() {
        let mut engine = SimulationEngine::new();
        let room = engine.create_node(50.0, 293.0, 10.0);
        let mut canister = Canister::with_contents(ventwork_logic::gas::GasMixture::from_moles(
            [(Gas::Oxygen, 20.0)],
            293.0,
            Canister::VOLUME,
        ));
        canister.mode = CanisterMode::Empty;
        let entity = engine.add_canister(canister);
        let before = engine.total_moles_in_system();

        // Nothing moves until the canister is attached
        engine.step(0.1);
        assert_eq!(engine.last_tick().canister_moles, 0.0);

        engine.world.get::<&mut Canister>(entity).unwrap().connect(room);
        engine.step(0.1);
        assert!(engine.last_tick().canister_moles > 0.0);
        assert!((engine.total_moles_in_system() - before).abs() < 1e-9);

        engine.world.get::<&mut Canister>(entity).unwrap().disconnect();
        engine.step(0.1);
        assert_eq!(engine.last_tick().canister_moles, 0.0);
    }

    #[test]
    fn test_set_ambient_refills_reservoir() {
        let mut config = SimConfig::default();
        config.zones.grid_size = ventwork_logic::voxel::GridSize::new(5, 5, 5);
        let mut engine = SimulationEngine::with_config(config);
        engine.generate_terrain(TerrainKind::Box {
            min: VoxelPos::new(1, 1, 1),
            max: VoxelPos::new(3, 3, 3),
        });
        let reservoir = engine.zones.exterior().unwrap();
        assert!(engine.total_moles(reservoir).unwrap() < 1e-9);

        engine.set_ambient(AmbientPreset::Earth);
        assert_eq!(engine.config().zones.ambient, AmbientPreset::Earth);
        assert!((engine.pressure(reservoir).unwrap() - 101.325).abs() < 1.0);
    }

    #[test]
    fn test_reset_validation_clears_baseline() {
        let mut engine = SimulationEngine::new();
        let a = engine.create_node(101.3, 293.0, 1.0);
        engine.validate();
        engine.add_gas(a, Gas::Oxygen, 50.0);
        assert!(engine.validate().energy_delta.unwrap() > 0.0);

        engine.reset_validation();
        assert!(engine.validate().energy_delta.is_none());
        assert!(engine.last_validation().is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimConfig {
            tick_length: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            SimulationEngine::try_with_config(config.clone()),
            Err(ConfigError::Invalid(_))
        ));
        assert!(SimulationEngine::try_with_config(SimConfig::default()).is_ok());

        // The infallible constructor still builds, but the clock will not run
        let mut engine = SimulationEngine::with_config(config);
        assert_eq!(engine.config().tick_length, 0.0);
        assert_eq!(engine.advance(0.1), 0);
        assert_eq!(engine.tick_count(), 0);
    }
}
