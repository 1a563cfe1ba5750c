//! Integration tests for the transport math on plain nodes.
//!
//! Exercises: Node → transfer engine → leak equalization, looping ticks by
//! hand in the same order the engine scheduler uses.
//!
//! All tests are pure logic — no ECS, no scheduler.

use ventwork_logic::flood::{partition, FloodSettings};
use ventwork_logic::gas::{Gas, GasMixture};
use ventwork_logic::leak::{equalize, leak_fraction};
use ventwork_logic::node::Node;
use ventwork_logic::transfer::{heat_exchange, FlowPolicy};
use ventwork_logic::voxel::{GridSize, VoxelData, VoxelGrid, VoxelPos};

// ── Helpers ────────────────────────────────────────────────────────────

const DT: f64 = 0.1;

fn insulated(pressure: f64, temperature: f64) -> Node {
    Node::new(pressure, temperature, 1.0).with_heat_loss(0.0, temperature)
}

/// One hand-rolled tick of the scheduler for a single connection.
fn tick(a: &mut Node, b: &mut Node, policy: &FlowPolicy, thermal_conductance: f64) {
    a.sync_energy_from_temperature();
    b.sync_energy_from_temperature();
    a.apply_environment_heat(DT);
    b.apply_environment_heat(DT);
    heat_exchange(a, b, thermal_conductance, DT);
    a.sync_temperature_from_energy();
    b.sync_temperature_from_energy();
    policy.apply(a, b, DT);
}

// ── Conservation ───────────────────────────────────────────────────────

#[test]
fn pipe_pair_conserves_moles() {
    let mut a = insulated(200.0, 293.0);
    let mut b = insulated(50.0, 293.0);
    let pipe = FlowPolicy::Pipe { conductance: 0.5 };
    let total = a.total_moles() + b.total_moles();

    for _ in 0..500 {
        tick(&mut a, &mut b, &pipe, 10.0);
        assert!((a.total_moles() + b.total_moles() - total).abs() < 1e-9);
    }
}

#[test]
fn isolated_pair_conserves_energy() {
    let mut a = insulated(180.0, 350.0);
    let mut b = insulated(60.0, 250.0);
    let pipe = FlowPolicy::Pipe { conductance: 0.5 };
    let initial = a.internal_energy() + b.internal_energy();

    for _ in 0..1000 {
        tick(&mut a, &mut b, &pipe, 10.0);
    }
    let drift = (a.internal_energy() + b.internal_energy() - initial).abs() / initial;
    assert!(drift < 0.005, "energy drift {drift}");
}

// ── Equalization ───────────────────────────────────────────────────────

#[test]
fn pipe_equalizes_pressure() {
    let mut a = insulated(200.0, 293.0);
    let mut b = insulated(50.0, 293.0);
    let pipe = FlowPolicy::Pipe { conductance: 0.5 };

    let mut ticks = 0;
    while (a.pressure() - b.pressure()).abs() >= 1.0 {
        tick(&mut a, &mut b, &pipe, 10.0);
        ticks += 1;
        assert!(ticks < 1000, "pressures never converged");
    }
}

#[test]
fn conduction_equalizes_temperature() {
    let mut a = insulated(101.3, 400.0);
    let mut b = insulated(101.3, 200.0);

    // ~300 simulated seconds
    for _ in 0..3000 {
        a.sync_energy_from_temperature();
        b.sync_energy_from_temperature();
        heat_exchange(&mut a, &mut b, 10.0, DT);
        a.sync_temperature_from_energy();
        b.sync_temperature_from_energy();
    }
    assert!((a.temperature() - b.temperature()).abs() < 10.0);
}

#[test]
fn pump_drains_source_against_gradient() {
    let mut a = insulated(60.0, 293.0);
    let mut b = insulated(150.0, 293.0);
    let pump = FlowPolicy::Pump { flow_rate: 2.0 };
    for _ in 0..50 {
        tick(&mut a, &mut b, &pump, 0.0);
    }
    assert!(a.pressure() < 60.0);
    assert!(b.pressure() > 150.0);
}

#[test]
fn leak_to_vacuum_exterior_mixes_composition() {
    let mut nodes = [
        Node::from_mixture(GasMixture::from_moles([(Gas::Oxygen, 20.0)], 293.0, 1.0)),
        Node::from_mixture(GasMixture::from_moles([(Gas::CarbonDioxide, 20.0)], 210.0, 1.0)),
    ];
    let f = leak_fraction(1.0, DT);
    for _ in 0..200 {
        equalize(&mut nodes, f);
    }
    assert!((nodes[0].fraction(Gas::Oxygen) - 0.5).abs() < 1e-3);
    assert!((nodes[0].temperature() - nodes[1].temperature()).abs() < 1e-3);
}

// ── Connectivity ───────────────────────────────────────────────────────

#[test]
fn two_rooms_joined_by_doorway() {
    // Two 3x3x3 rooms separated by a wall at x = 4, all inside a solid shell
    let mut grid = VoxelGrid::new(GridSize::new(9, 5, 5), 1.0);
    for pos in grid.positions().collect::<Vec<_>>() {
        let shell = pos.x == 0 || pos.x == 8 || pos.y == 0 || pos.y == 4 || pos.z == 0 || pos.z == 4;
        if shell || pos.x == 4 {
            grid.set(pos, VoxelData::solid());
        }
    }
    let settings = FloodSettings::default();
    let split = partition(&grid, &settings);
    assert_eq!(split.regions.len(), 2);
    assert!(split.regions.iter().all(|r| r.is_enclosed() && r.len() == 27));

    grid.clear_voxel(VoxelPos::new(4, 2, 2));
    let merged = partition(&grid, &settings);
    assert_eq!(merged.regions.len(), 1);
    assert_eq!(merged.regions[0].len(), 55);
}
