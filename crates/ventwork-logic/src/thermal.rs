//! Internal energy bookkeeping for a gas volume.
//!
//! Energy and temperature are two views of the same quantity, related by
//! `E = n · Cp · T`. Which one is authoritative depends on the phase of the
//! tick; crossing between them goes through [`crate::node::Node`]'s
//! `sync_energy_from_temperature` / `sync_temperature_from_energy`.

use serde::{Deserialize, Serialize};

use crate::constants::{thermal_defaults, MIN_TEMPERATURE, SPECIFIC_HEAT_CP};

/// Thermal state coupled 1:1 with a gas mixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalState {
    /// Internal energy, J.
    pub internal_energy: f64,
    /// Environment reference temperature, K.
    pub external_temperature: f64,
    /// Heat loss to the environment, W/K.
    pub heat_loss_coefficient: f64,
    /// Advisory thermal capacity, J/K. Not used by the energy law.
    pub thermal_capacity: f64,
}

impl Default for ThermalState {
    fn default() -> Self {
        Self {
            internal_energy: 0.0,
            external_temperature: thermal_defaults::EXTERNAL_TEMPERATURE,
            heat_loss_coefficient: thermal_defaults::HEAT_LOSS_COEFFICIENT,
            thermal_capacity: thermal_defaults::THERMAL_CAPACITY,
        }
    }
}

impl ThermalState {
    /// Energy held by `total_moles` at `temperature`.
    pub fn energy_of(total_moles: f64, temperature: f64) -> f64 {
        total_moles * SPECIFIC_HEAT_CP * temperature
    }

    /// Overwrite internal energy from a mole count and temperature.
    pub fn recalculate_energy(&mut self, total_moles: f64, temperature: f64) {
        self.internal_energy = Self::energy_of(total_moles, temperature);
    }

    /// Temperature implied by the current energy for `total_moles`.
    ///
    /// Never returns less than the temperature floor.
    pub fn temperature_for(&self, total_moles: f64) -> f64 {
        if !(total_moles > 0.0) {
            return MIN_TEMPERATURE;
        }
        let t = self.internal_energy / (total_moles * SPECIFIC_HEAT_CP);
        if t.is_nan() {
            MIN_TEMPERATURE
        } else {
            t.max(MIN_TEMPERATURE)
        }
    }

    /// Heat gained from the environment over `dt` (negative when losing heat).
    pub fn environment_heat(&self, temperature: f64, dt: f64) -> f64 {
        -self.heat_loss_coefficient * (temperature - self.external_temperature) * dt
    }

    /// Whether the energy is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.internal_energy.is_finite() && self.internal_energy >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_temperature_roundtrip() {
        let mut thermal = ThermalState::default();
        thermal.recalculate_energy(10.0, 300.0);
        assert_eq!(thermal.internal_energy, 10.0 * 29.0 * 300.0);
        assert!((thermal.temperature_for(10.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_for_zero_moles_is_floor() {
        let thermal = ThermalState {
            internal_energy: 1000.0,
            ..Default::default()
        };
        assert_eq!(thermal.temperature_for(0.0), MIN_TEMPERATURE);
    }

    #[test]
    fn test_negative_energy_floors_temperature() {
        let thermal = ThermalState {
            internal_energy: -50.0,
            ..Default::default()
        };
        assert_eq!(thermal.temperature_for(1.0), MIN_TEMPERATURE);
        assert!(!thermal.is_valid());
    }

    #[test]
    fn test_environment_heat_sign() {
        let thermal = ThermalState::default();
        // Warmer than the 220 K environment: loses heat
        assert!(thermal.environment_heat(293.0, 1.0) < 0.0);
        assert!(thermal.environment_heat(100.0, 1.0) > 0.0);
    }
}
