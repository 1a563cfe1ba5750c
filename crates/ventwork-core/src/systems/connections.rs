//! Connection system: pipe and pump mass transfer (step 5).

use hecs::World;

use super::access::{sorted_entities, with_node_pair};
use crate::components::{Connection, ConnectionState};

/// What the connection pass did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowSummary {
    /// Connections that moved gas.
    pub flowing: usize,
    /// Total moles moved, summed without sign.
    pub moles_moved: f64,
}

/// Run every connection once, in entity index order.
///
/// Inactive connections and connections with a missing endpoint move nothing
/// and end the tick `Inactive`.
pub fn connection_system(world: &mut World, dt: f64) -> FlowSummary {
    let mut summary = FlowSummary::default();

    for entity in sorted_entities::<Connection>(world) {
        let Ok(conn) = world.get::<&Connection>(entity).map(|c| *c) else {
            continue;
        };

        let flow = if conn.active {
            with_node_pair(world, conn.a, conn.b, |a, b| conn.policy.apply(a, b, dt))
        } else {
            None
        };

        let (state, moved) = match flow {
            Some(moved) if moved != 0.0 => (ConnectionState::Flowing, moved),
            _ => (ConnectionState::Inactive, 0.0),
        };
        if moved != 0.0 {
            summary.flowing += 1;
            summary.moles_moved += moved.abs();
        }

        if let Ok(mut c) = world.get::<&mut Connection>(entity) {
            c.state = state;
            c.last_flow = moved;
        }
    }

    summary
}
