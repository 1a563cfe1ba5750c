//! Scenario builders - small node networks used by tests, benches and the harness

use hecs::Entity;
use serde::{Deserialize, Serialize};
use ventwork_logic::gas::{Gas, GasMixture};
use ventwork_logic::node::Node;

use crate::components::{Connection, ConnectionKind, NodeLabel};
use crate::engine::SimulationEngine;

/// Two nodes joined by one connection.
#[derive(Debug, Clone, Copy)]
pub struct NodePair {
    pub a: Entity,
    pub b: Entity,
    pub connection: Entity,
}

/// A ring of nodes driven by pumps.
#[derive(Debug, Clone)]
pub struct PumpLoop {
    pub nodes: Vec<Entity>,
    pub pumps: Vec<Entity>,
}

/// A room leaking into an outside node.
#[derive(Debug, Clone, Copy)]
pub struct LeakingRoom {
    pub room: Entity,
    pub outside: Entity,
    pub group: Entity,
}

/// Scenario description as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioSpec {
    PressureEqualization {
        high: f64,
        low: f64,
        conductance: f64,
    },
    TemperatureGradient {
        hot: f64,
        cold: f64,
        conductance: f64,
    },
    PumpLoop {
        nodes: usize,
        flow_rate: f64,
    },
    LeakingRoom {
        leak_rate: f64,
    },
}

/// A node with no heat exchange with its environment.
fn isolated_node(pressure: f64, temperature: f64, volume: f64) -> Node {
    Node::new(pressure, temperature, volume).with_heat_loss(0.0, temperature)
}

/// Two equal isolated volumes at different pressures joined by a pipe.
pub fn pressure_equalization(
    engine: &mut SimulationEngine,
    high: f64,
    low: f64,
    conductance: f64,
) -> NodePair {
    let a = engine.spawn_node(isolated_node(high, 293.0, 1.0), NodeLabel::new("High"));
    let b = engine.spawn_node(isolated_node(low, 293.0, 1.0), NodeLabel::new("Low"));
    let connection = engine.spawn_connection(Connection::pipe(a, b, conductance));
    NodePair { a, b, connection }
}

/// Two isolated volumes at the same pressure and different temperatures,
/// coupled only thermally.
pub fn temperature_gradient(
    engine: &mut SimulationEngine,
    hot: f64,
    cold: f64,
    conductance: f64,
) -> NodePair {
    let a = engine.spawn_node(isolated_node(101.3, hot, 1.0), NodeLabel::new("Hot"));
    let b = engine.spawn_node(isolated_node(101.3, cold, 1.0), NodeLabel::new("Cold"));
    let connection = engine
        .spawn_connection(Connection::pipe(a, b, 0.0).with_thermal_conductance(conductance));
    NodePair { a, b, connection }
}

/// `count` isolated nodes in a ring, each pumping into the next.
pub fn pump_loop(engine: &mut SimulationEngine, count: usize, flow_rate: f64) -> PumpLoop {
    let nodes: Vec<Entity> = (0..count)
        .map(|i| {
            engine.spawn_node(
                isolated_node(101.3, 293.0, 1.0),
                NodeLabel::new(format!("Loop {}", i)),
            )
        })
        .collect();
    let pumps = if count < 2 {
        Vec::new()
    } else {
        (0..count)
            .map(|i| {
                engine.create_connection(
                    nodes[i],
                    nodes[(i + 1) % count],
                    ConnectionKind::Pump,
                    flow_rate,
                )
            })
            .collect()
    };
    PumpLoop { nodes, pumps }
}

/// A warm breathable room in an unsealed leak group with a cold, CO2-heavy outside.
pub fn leaking_room(engine: &mut SimulationEngine, leak_rate: f64) -> LeakingRoom {
    let room = engine.spawn_node(isolated_node(101.3, 293.0, 10.0), NodeLabel::new("Room"));
    let outside_mix = GasMixture::from_moles(
        [(Gas::CarbonDioxide, 200.0), (Gas::Nitrogen, 10.0)],
        210.0,
        50.0,
    );
    let outside = engine.spawn_node(
        Node::from_mixture(outside_mix).with_heat_loss(0.0, 210.0),
        NodeLabel::new("Outside"),
    );
    let group = engine.create_leak_group(vec![room], Some(outside), leak_rate);
    LeakingRoom {
        room,
        outside,
        group,
    }
}

/// What `build_scenario` created, for the caller to inspect.
#[derive(Debug, Clone)]
pub enum BuiltScenario {
    Pair(NodePair),
    Loop(PumpLoop),
    Leak(LeakingRoom),
}

impl BuiltScenario {
    /// Every node the scenario created.
    pub fn nodes(&self) -> Vec<Entity> {
        match self {
            BuiltScenario::Pair(p) => vec![p.a, p.b],
            BuiltScenario::Loop(l) => l.nodes.clone(),
            BuiltScenario::Leak(r) => vec![r.room, r.outside],
        }
    }
}

pub fn build_scenario(engine: &mut SimulationEngine, spec: &ScenarioSpec) -> BuiltScenario {
    match *spec {
        ScenarioSpec::PressureEqualization {
            high,
            low,
            conductance,
        } => BuiltScenario::Pair(pressure_equalization(engine, high, low, conductance)),
        ScenarioSpec::TemperatureGradient {
            hot,
            cold,
            conductance,
        } => BuiltScenario::Pair(temperature_gradient(engine, hot, cold, conductance)),
        ScenarioSpec::PumpLoop { nodes, flow_rate } => {
            BuiltScenario::Loop(pump_loop(engine, nodes, flow_rate))
        }
        ScenarioSpec::LeakingRoom { leak_rate } => {
            BuiltScenario::Leak(leaking_room(engine, leak_rate))
        }
    }
}
