//! Planetary atmosphere that exposed zones open onto.

use serde::{Deserialize, Serialize};

use crate::constants::{PA_PER_KPA, R, VACUUM_PRESSURE_FLOOR};
use crate::gas::Gas;
use crate::node::Node;

/// Named ambient presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbientPreset {
    Vacuum,
    Mars,
    Earth,
    Venus,
    Custom,
}

/// Pressure, temperature and composition of the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientAtmosphere {
    pub preset: AmbientPreset,
    /// kPa
    pub pressure: f64,
    /// K
    pub temperature: f64,
    /// Mole fractions, indexed by [`Gas::index`].
    pub composition: [f64; Gas::COUNT],
}

impl Default for AmbientAtmosphere {
    fn default() -> Self {
        Self::vacuum()
    }
}

impl AmbientAtmosphere {
    pub fn from_preset(preset: AmbientPreset) -> Self {
        match preset {
            AmbientPreset::Vacuum => Self::vacuum(),
            AmbientPreset::Mars => Self::mars(),
            AmbientPreset::Earth => Self::earth(),
            AmbientPreset::Venus => Self::venus(),
            AmbientPreset::Custom => Self::custom(0.0, 273.15, [0.0; Gas::COUNT]),
        }
    }

    pub fn vacuum() -> Self {
        Self {
            preset: AmbientPreset::Vacuum,
            pressure: 0.0,
            temperature: 2.7,
            composition: [0.0; Gas::COUNT],
        }
    }

    pub fn mars() -> Self {
        Self {
            preset: AmbientPreset::Mars,
            pressure: 0.6,
            temperature: 210.0,
            composition: [0.027, 0.0013, 0.95],
        }
    }

    pub fn earth() -> Self {
        Self {
            preset: AmbientPreset::Earth,
            pressure: 101.325,
            temperature: 288.15,
            composition: [0.78, 0.21, 0.0004],
        }
    }

    pub fn venus() -> Self {
        Self {
            preset: AmbientPreset::Venus,
            pressure: 9200.0,
            temperature: 735.0,
            composition: [0.035, 0.0, 0.965],
        }
    }

    pub fn custom(pressure: f64, temperature: f64, composition: [f64; Gas::COUNT]) -> Self {
        Self {
            preset: AmbientPreset::Custom,
            pressure,
            temperature,
            composition,
        }
    }

    pub fn fraction(&self, gas: Gas) -> f64 {
        self.composition[gas.index()]
    }

    /// Moles of ambient gas that fill `volume` m³.
    pub fn total_moles_for(&self, volume: f64) -> f64 {
        if !(self.pressure > 0.0) || !(self.temperature > 0.0) {
            return 0.0;
        }
        self.pressure * volume * PA_PER_KPA / (R * self.temperature)
    }

    /// Replace the node's contents with ambient gas filling `volume`.
    ///
    /// Composition is renormalized so the node lands exactly on the ambient
    /// pressure even when the preset fractions do not sum to one.
    pub fn apply_to(&self, node: &mut Node, volume: f64) {
        let total = self.total_moles_for(volume);
        node.mixture.clear();
        node.mixture.set_volume(volume);
        node.mixture.set_temperature(self.temperature);
        for gas in Gas::ALL {
            let fraction = self.fraction(gas);
            if fraction > 0.0 {
                node.mixture.set_moles(gas, total * fraction);
            }
        }
        if !node.mixture.is_empty() {
            node.mixture.set_pressure(self.pressure);
        }
        node.sync_energy_from_temperature();
    }

    pub fn is_vacuum(&self) -> bool {
        self.pressure <= VACUUM_PRESSURE_FLOOR
    }

    /// Whether a person could breathe outside unaided.
    pub fn is_breathable(&self) -> bool {
        let o2 = self.fraction(Gas::Oxygen);
        (0.18..=0.25).contains(&o2)
            && (50.0..=120.0).contains(&self.pressure)
            && (260.0..=310.0).contains(&self.temperature)
    }
}
