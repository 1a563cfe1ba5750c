//! Transfer engine: advective mole/enthalpy transport and conductive heat exchange.
//!
//! Every function here conserves the sum of moles and the sum of internal
//! energy across the two nodes it touches, up to floating-point rounding.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TRANSFER_FRACTION, MIN_PRESSURE_DELTA, MIN_TRANSFER, SPECIFIC_HEAT_CP};
use crate::gas::Gas;
use crate::node::Node;

/// What a single transfer actually moved.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferOutcome {
    /// Moles moved from source to destination.
    pub moles: f64,
    /// Enthalpy carried with them, J.
    pub enthalpy: f64,
}

impl TransferOutcome {
    pub const NONE: Self = Self {
        moles: 0.0,
        enthalpy: 0.0,
    };
}

/// Move up to `requested` moles from `source` to `destination`.
///
/// The request is clamped to half the source's moles. Each species moves in
/// proportion to its fraction in the source, and the moved gas carries
/// `moles · Cp · T_source` of enthalpy. Both sides re-derive temperature from
/// their updated energy; a side left with no gas keeps its last temperature.
pub fn transfer_moles(source: &mut Node, destination: &mut Node, requested: f64) -> TransferOutcome {
    if !(requested > MIN_TRANSFER) || source.mixture.is_empty() {
        return TransferOutcome::NONE;
    }

    let total_src = source.total_moles();
    let actual = requested.min(total_src * MAX_TRANSFER_FRACTION);
    let source_temperature = source.temperature();

    let mut moved_total = 0.0;
    for gas in Gas::ALL {
        let src_moles = source.mixture.moles(gas);
        let moved = src_moles / total_src * actual;
        if moved < MIN_TRANSFER {
            continue;
        }
        source.mixture.set_moles(gas, src_moles - moved);
        destination.mixture.add(gas, moved);
        moved_total += moved;
    }

    if moved_total <= 0.0 {
        return TransferOutcome::NONE;
    }

    let enthalpy = moved_total * SPECIFIC_HEAT_CP * source_temperature;
    source.thermal.internal_energy -= enthalpy;
    destination.thermal.internal_energy += enthalpy;

    source.sync_temperature_from_energy();
    destination.sync_temperature_from_energy();

    TransferOutcome {
        moles: moved_total,
        enthalpy,
    }
}

/// Candidate moles for a pressure-driven flow: `|pA − pB| · conductance · dt`.
///
/// Direction is the caller's business (always high to low pressure).
pub fn pressure_driven_flow(pressure_a: f64, pressure_b: f64, conductance: f64, dt: f64) -> f64 {
    let dp = (pressure_a - pressure_b).abs();
    if !(dp >= MIN_PRESSURE_DELTA) {
        return 0.0;
    }
    dp * conductance.max(0.0) * dt.max(0.0)
}

/// Conductive heat exchange: `dQ = conductance · (T_A − T_B) · dt`, taken from
/// A's energy and given to B's.
///
/// Temperatures are read from internal energy (`E / n·Cp`), so several
/// exchanges on one node within a pass see each other's effect. `dQ` is
/// capped at the amount that would bring both sides to a common
/// temperature, so a large `conductance · dt` cannot invert the gradient.
/// Only energies change; temperatures are re-derived by the caller.
/// Returns the heat moved from A to B (negative when B was hotter).
pub fn heat_exchange(a: &mut Node, b: &mut Node, conductance: f64, dt: f64) -> f64 {
    let ca = a.total_moles() * SPECIFIC_HEAT_CP;
    let cb = b.total_moles() * SPECIFIC_HEAT_CP;
    if ca <= 0.0 || cb <= 0.0 {
        return 0.0;
    }

    let delta_t = a.internal_energy() / ca - b.internal_energy() / cb;
    let mut dq = conductance.max(0.0) * delta_t * dt.max(0.0);
    if dq == 0.0 || !dq.is_finite() {
        return 0.0;
    }

    let equilibrium = delta_t * ca * cb / (ca + cb);
    if dq.abs() > equilibrium.abs() {
        dq = equilibrium;
    }

    a.thermal.internal_energy -= dq;
    b.thermal.internal_energy += dq;
    dq
}

/// How a connection decides how much gas to move each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FlowPolicy {
    /// Pressure-difference flow, either direction.
    Pipe { conductance: f64 },
    /// Fixed moles per second from endpoint A to endpoint B, regardless of pressure.
    Pump { flow_rate: f64 },
}

impl FlowPolicy {
    /// Run one tick of this policy between `a` and `b`.
    ///
    /// Returns the signed moles moved, positive when gas went from `a` to `b`.
    pub fn apply(&self, a: &mut Node, b: &mut Node, dt: f64) -> f64 {
        match *self {
            FlowPolicy::Pipe { conductance } => pipe_flow(a, b, conductance, dt),
            FlowPolicy::Pump { flow_rate } => pump_flow(a, b, flow_rate, dt),
        }
    }

    /// The policy's tunable: conductance for a pipe, flow rate for a pump.
    pub fn parameter(&self) -> f64 {
        match *self {
            FlowPolicy::Pipe { conductance } => conductance,
            FlowPolicy::Pump { flow_rate } => flow_rate,
        }
    }

    pub fn is_pump(&self) -> bool {
        matches!(self, FlowPolicy::Pump { .. })
    }
}

/// Pressure-driven flow from the higher-pressure node to the lower one.
pub fn pipe_flow(a: &mut Node, b: &mut Node, conductance: f64, dt: f64) -> f64 {
    let pa = a.pressure();
    let pb = b.pressure();
    let candidate = pressure_driven_flow(pa, pb, conductance, dt);
    if candidate <= 0.0 {
        return 0.0;
    }
    if pa > pb {
        transfer_moles(a, b, candidate).moles
    } else {
        -transfer_moles(b, a, candidate).moles
    }
}

/// Fixed-rate flow from `source` to `target`, at most half the source per tick.
pub fn pump_flow(source: &mut Node, target: &mut Node, flow_rate: f64, dt: f64) -> f64 {
    if source.mixture.is_empty() {
        return 0.0;
    }
    let requested = (flow_rate * dt).max(0.0);
    transfer_moles(source, target, requested).moles
}
