//! Network components: the edges and groupings between node entities.
//!
//! These hold `Entity` references, which are not directly serializable;
//! persistence maps them through stable indices.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use ventwork_logic::transfer::FlowPolicy;

/// Connection kind, for construction calls that take a kind plus one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    Pipe,
    Pump,
}

impl ConnectionKind {
    /// Policy for this kind: `parameter` is conductance for a pipe, moles/s for a pump.
    pub fn policy(self, parameter: f64) -> FlowPolicy {
        match self {
            ConnectionKind::Pipe => FlowPolicy::Pipe {
                conductance: parameter,
            },
            ConnectionKind::Pump => FlowPolicy::Pump {
                flow_rate: parameter,
            },
        }
    }
}

/// Per-tick state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Inactive,
    Flowing,
}

/// Edge between two node entities.
///
/// For a pump, `a` is the source and `b` the target. A connection whose
/// endpoints are missing (or identical) moves nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: Entity,
    pub b: Entity,
    pub policy: FlowPolicy,
    pub active: bool,
    /// Conductive coupling between the endpoints, W/K.
    pub thermal_conductance: f64,
    pub state: ConnectionState,
    /// Signed moles moved last tick, positive from `a` to `b`.
    pub last_flow: f64,
}

impl Connection {
    pub fn new(a: Entity, b: Entity, policy: FlowPolicy) -> Self {
        Self {
            a,
            b,
            policy,
            active: true,
            thermal_conductance: 0.0,
            state: ConnectionState::Inactive,
            last_flow: 0.0,
        }
    }

    pub fn pipe(a: Entity, b: Entity, conductance: f64) -> Self {
        Self::new(a, b, FlowPolicy::Pipe { conductance })
    }

    pub fn pump(source: Entity, target: Entity, flow_rate: f64) -> Self {
        Self::new(source, target, FlowPolicy::Pump { flow_rate })
    }

    pub fn with_thermal_conductance(mut self, conductance: f64) -> Self {
        self.thermal_conductance = conductance.max(0.0);
        self
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.state = ConnectionState::Inactive;
            self.last_flow = 0.0;
        }
    }

    pub fn connects(&self, node: Entity) -> bool {
        self.a == node || self.b == node
    }
}

/// Nodes sharing one undivided volume, optionally bleeding to an exterior node.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakGroup {
    pub members: Vec<Entity>,
    pub exterior: Option<Entity>,
    pub sealed: bool,
    /// Fraction of the way to equilibrium per second, 0..=1.
    pub leak_rate: f64,
}

impl LeakGroup {
    pub fn new(members: Vec<Entity>, exterior: Option<Entity>, leak_rate: f64) -> Self {
        Self {
            members,
            exterior,
            sealed: false,
            leak_rate: leak_rate.clamp(0.0, 1.0),
        }
    }

    /// A closed group: no exchange, rate 0.
    pub fn sealed(members: Vec<Entity>) -> Self {
        Self {
            members,
            exterior: None,
            sealed: true,
            leak_rate: 0.0,
        }
    }

    pub fn set_sealed(&mut self, sealed: bool) {
        self.sealed = sealed;
    }

    pub fn set_leak_rate(&mut self, rate: f64) {
        self.leak_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    }

    pub fn add_member(&mut self, node: Entity) {
        if !self.members.contains(&node) {
            self.members.push(node);
        }
    }

    pub fn remove_member(&mut self, node: Entity) {
        self.members.retain(|m| *m != node);
    }

    /// Whether the group exchanges anything this tick.
    pub fn is_leaking(&self) -> bool {
        !self.sealed && !self.members.is_empty() && self.exterior.is_some() && self.leak_rate > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn test_kind_policy() {
        assert_eq!(
            ConnectionKind::Pump.policy(2.0),
            FlowPolicy::Pump { flow_rate: 2.0 }
        );
    }

    #[test]
    fn test_deactivate_resets_state() {
        let mut world = World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut c = Connection::pipe(a, b, 0.5);
        c.state = ConnectionState::Flowing;
        c.last_flow = 1.0;
        c.set_active(false);
        assert_eq!(c.state, ConnectionState::Inactive);
        assert_eq!(c.last_flow, 0.0);
        assert!(c.connects(a));
    }

    #[test]
    fn test_leak_group_activity() {
        let mut world = World::new();
        let a = world.spawn(());
        let ext = world.spawn(());
        let mut group = LeakGroup::new(vec![a], Some(ext), 1.0);
        assert!(group.is_leaking());
        group.set_sealed(true);
        assert!(!group.is_leaking());
        assert!(!LeakGroup::sealed(vec![a]).is_leaking());
        group.add_member(a);
        assert_eq!(group.members.len(), 1);
        group.set_sealed(false);
        group.remove_member(a);
        assert!(!group.is_leaking());
    }
}
