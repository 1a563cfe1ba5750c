//! Heat passes: the settle / environment / conduction / resync bracket that
//! opens every tick.
//!
//! Temperature is authoritative entering the bracket; energy is
//! authoritative inside it; temperature is re-derived on the way out.

use hecs::World;
use ventwork_logic::node::Node;
use ventwork_logic::transfer::heat_exchange;

use super::access::{sorted_entities, with_node_pair};
use crate::components::Connection;

/// Step 1: E = n·Cp·T for every node.
pub fn settle_energy_system(world: &mut World) {
    for (_, node) in world.query_mut::<&mut Node>() {
        node.sync_energy_from_temperature();
    }
}

/// Step 2: exchange heat with each node's environment. Returns the net heat gained, J.
pub fn environment_heat_system(world: &mut World, dt: f64) -> f64 {
    let mut net = 0.0;
    for (_, node) in world.query_mut::<&mut Node>() {
        net += node.apply_environment_heat(dt);
    }
    net
}

/// Step 3: conduct heat along every connection between two live nodes.
///
/// Conduction ignores `active` and the flow policy: a closed pipe or a
/// stopped pump still couples its endpoints thermally.
/// Returns the total heat moved (absolute), J.
pub fn conduction_system(world: &mut World, dt: f64) -> f64 {
    let mut moved = 0.0;
    for entity in sorted_entities::<Connection>(world) {
        let Ok(conn) = world.get::<&Connection>(entity).map(|c| *c) else {
            continue;
        };
        if conn.thermal_conductance <= 0.0 {
            continue;
        }
        if let Some(dq) = with_node_pair(world, conn.a, conn.b, |a, b| {
            heat_exchange(a, b, conn.thermal_conductance, dt)
        }) {
            moved += dq.abs();
        }
    }
    moved
}

/// Step 4: T = E / (n·Cp) for every node.
pub fn sync_temperature_system(world: &mut World) {
    for (_, node) in world.query_mut::<&mut Node>() {
        node.sync_temperature_from_energy();
    }
}
