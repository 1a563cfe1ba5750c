//! A node is one well-mixed control volume: a gas mixture plus its thermal state.
//!
//! `Node` is the read/write surface external collaborators use. Mutations
//! that change the mole count keep internal energy consistent with the
//! current temperature, so a node is always at a settled point between ticks.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_TEMPERATURE, MIN_VOLUME, VACUUM_PRESSURE_FLOOR};
use crate::gas::{Gas, GasMixture};
use crate::thermal::ThermalState;

/// Gas mixture and thermal state of one simulated volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub mixture: GasMixture,
    pub thermal: ThermalState,
}

impl Default for Node {
    fn default() -> Self {
        Self::from_mixture(GasMixture::default())
    }
}

impl Node {
    /// Create a node of the default composition at the given pressure (kPa),
    /// temperature (K) and volume (m³), with energy derived from the mixture.
    pub fn new(pressure: f64, temperature: f64, volume: f64) -> Self {
        Self::from_mixture(GasMixture::new(pressure, temperature, volume))
    }

    /// Wrap an existing mixture with default thermal properties.
    pub fn from_mixture(mixture: GasMixture) -> Self {
        let mut node = Self {
            mixture,
            thermal: ThermalState::default(),
        };
        node.sync_energy_from_temperature();
        node
    }

    /// Use specific thermal coefficients (energy is re-derived).
    pub fn with_thermal(mut self, thermal: ThermalState) -> Self {
        self.thermal = thermal;
        self.sync_energy_from_temperature();
        self
    }

    pub fn with_heat_loss(mut self, coefficient: f64, external_temperature: f64) -> Self {
        self.thermal.heat_loss_coefficient = coefficient;
        self.thermal.external_temperature = external_temperature;
        self
    }

    // ── Read surface ────────────────────────────────────────────────────

    pub fn pressure(&self) -> f64 {
        self.mixture.pressure()
    }

    pub fn temperature(&self) -> f64 {
        self.mixture.temperature()
    }

    pub fn volume(&self) -> f64 {
        self.mixture.volume()
    }

    pub fn total_moles(&self) -> f64 {
        self.mixture.total_moles()
    }

    pub fn fractions(&self) -> [(Gas, f64); Gas::COUNT] {
        self.mixture.fractions()
    }

    pub fn fraction(&self, gas: Gas) -> f64 {
        self.mixture.fraction(gas)
    }

    /// Mole fraction as a percentage.
    pub fn percent(&self, gas: Gas) -> f64 {
        self.fraction(gas) * 100.0
    }

    pub fn internal_energy(&self) -> f64 {
        self.thermal.internal_energy
    }

    /// |E − n·Cp·T|: how far energy and temperature have drifted apart.
    pub fn energy_mismatch(&self) -> f64 {
        let expected = ThermalState::energy_of(self.total_moles(), self.temperature());
        (expected - self.thermal.internal_energy).abs()
    }

    // ── Write surface ───────────────────────────────────────────────────

    /// Add gas at the node's current temperature.
    pub fn add_gas(&mut self, gas: Gas, moles: f64) {
        self.mixture.add(gas, moles);
        self.sync_energy_from_temperature();
    }

    /// Remove up to `moles` of a species; returns the amount removed.
    pub fn remove_gas(&mut self, gas: Gas, moles: f64) -> f64 {
        let removed = self.mixture.remove(gas, moles);
        self.sync_energy_from_temperature();
        removed
    }

    /// Set temperature and re-derive energy from it.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.mixture.set_temperature(temperature);
        self.sync_energy_from_temperature();
    }

    /// Rescale contents to reach `pressure` kPa, keeping composition and temperature.
    pub fn set_pressure(&mut self, pressure: f64) {
        self.mixture.set_pressure(pressure);
        self.sync_energy_from_temperature();
    }

    /// Change the geometric volume. Moles and temperature are kept, so pressure changes.
    pub fn set_volume(&mut self, volume: f64) {
        self.mixture.set_volume(volume);
    }

    // ── Sync points ─────────────────────────────────────────────────────

    /// Temperature is authoritative: E = n·Cp·T.
    pub fn sync_energy_from_temperature(&mut self) {
        self.thermal
            .recalculate_energy(self.mixture.total_moles(), self.mixture.temperature());
    }

    /// Energy is authoritative: T = E / (n·Cp).
    ///
    /// An empty mixture keeps its last temperature.
    pub fn sync_temperature_from_energy(&mut self) {
        if self.mixture.is_empty() {
            return;
        }
        let t = self.thermal.temperature_for(self.mixture.total_moles());
        self.mixture.set_temperature(t);
    }

    /// Apply heat exchange with the environment over `dt`. Energy only.
    pub fn apply_environment_heat(&mut self, dt: f64) -> f64 {
        let q = self.thermal.environment_heat(self.temperature(), dt);
        self.thermal.internal_energy += q;
        q
    }

    /// Force the node back inside safe numeric bounds.
    ///
    /// Returns what was clamped; an untouched node yields an empty report.
    pub fn clamp_to_safe_values(&mut self, floors: &SafetyFloors) -> ClampReport {
        let mut report = ClampReport::default();

        if self.mixture.scrub_non_finite() {
            report.moles = true;
        }
        let t = self.mixture.temperature();
        if !t.is_finite() || t < floors.temperature {
            let clamped = if t.is_finite() {
                t.max(floors.temperature)
            } else {
                floors.temperature
            };
            self.mixture.set_temperature(clamped);
            report.temperature = true;
        }
        if self.mixture.volume() < floors.volume {
            self.mixture.set_volume(floors.volume);
            report.volume = true;
        }

        let p = self.mixture.pressure();
        if !p.is_finite() || p < floors.pressure {
            self.mixture.set_pressure(floors.pressure);
            report.pressure = true;
        }

        if !self.thermal.is_valid() || report.any() {
            report.energy = !self.thermal.is_valid();
            self.sync_energy_from_temperature();
        }

        report
    }
}

/// Lower bounds the clamp pass enforces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyFloors {
    /// kPa
    pub pressure: f64,
    /// K
    pub temperature: f64,
    /// m³
    pub volume: f64,
}

impl Default for SafetyFloors {
    fn default() -> Self {
        Self {
            pressure: VACUUM_PRESSURE_FLOOR,
            temperature: MIN_TEMPERATURE,
            volume: MIN_VOLUME,
        }
    }
}

/// Which quantities a clamp touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClampReport {
    pub moles: bool,
    pub temperature: bool,
    pub volume: bool,
    pub pressure: bool,
    pub energy: bool,
}

impl ClampReport {
    pub fn any(&self) -> bool {
        self.moles || self.temperature || self.volume || self.pressure || self.energy
    }

    /// Short description for log lines, e.g. `"pressure, energy"`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.moles {
            parts.push("moles");
        }
        if self.temperature {
            parts.push("temperature");
        }
        if self.volume {
            parts.push("volume");
        }
        if self.pressure {
            parts.push("pressure");
        }
        if self.energy {
            parts.push("energy");
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_settled() {
        let node = Node::new(101.3, 293.0, 1.0);
        assert!(node.energy_mismatch() < 1e-6);
        assert!((node.internal_energy() - node.total_moles() * 29.0 * 293.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_gas_keeps_energy_consistent() {
        let mut node = Node::new(101.3, 293.0, 1.0);
        node.add_gas(Gas::Oxygen, 5.0);
        assert!(node.energy_mismatch() < 1e-6);
        assert!((node.temperature() - 293.0).abs() < 1e-9);
    }

    #[test]
    fn test_sync_temperature_from_energy() {
        let mut node = Node::new(101.3, 293.0, 1.0);
        node.thermal.internal_energy *= 2.0;
        node.sync_temperature_from_energy();
        assert!((node.temperature() - 586.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_node_keeps_temperature() {
        let mut node = Node::from_mixture(GasMixture::empty(250.0, 1.0));
        node.thermal.internal_energy = 1.0e6;
        node.sync_temperature_from_energy();
        assert_eq!(node.temperature(), 250.0);
    }

    #[test]
    fn test_clamp_untouched_node() {
        let mut node = Node::new(101.3, 293.0, 1.0);
        let before = node;
        let report = node.clamp_to_safe_values(&SafetyFloors::default());
        assert!(!report.any());
        assert_eq!(node, before);
    }

    #[test]
    fn test_clamp_recovers_nan_energy() {
        let mut node = Node::new(101.3, 293.0, 1.0);
        node.thermal.internal_energy = f64::NAN;
        let report = node.clamp_to_safe_values(&SafetyFloors::default());
        assert!(report.energy);
        assert!(node.internal_energy().is_finite());
        assert!(node.energy_mismatch() < 1e-6);
    }

    #[test]
    fn test_clamp_raises_vacuum_to_floor() {
        let mut node = Node::from_mixture(GasMixture::empty(293.0, 1.0));
        let report = node.clamp_to_safe_values(&SafetyFloors::default());
        assert!(report.pressure);
        assert!((node.pressure() - VACUUM_PRESSURE_FLOOR).abs() < 1e-9);
        assert_eq!(report.describe(), "pressure");
    }
}
