//! Gas species and per-volume gas mixtures.
//!
//! A [`GasMixture`] is a well-mixed zero-dimensional volume: moles of each
//! species plus a temperature and a geometric volume. Pressure is derived from
//! the ideal gas law and reported in kPa.

use serde::{Deserialize, Serialize};

use crate::constants::{default_mix, MIN_MOLES, MIN_TEMPERATURE, MIN_VOLUME, PA_PER_KPA, R};

/// A gas species tracked by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gas {
    Nitrogen,
    Oxygen,
    CarbonDioxide,
}

impl Gas {
    /// Number of tracked species.
    pub const COUNT: usize = 3;

    /// Every species, in storage order.
    pub const ALL: [Gas; Gas::COUNT] = [Gas::Nitrogen, Gas::Oxygen, Gas::CarbonDioxide];

    /// Storage slot for this species.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Chemical formula, as shown on readouts.
    pub fn symbol(self) -> &'static str {
        match self {
            Gas::Nitrogen => "N2",
            Gas::Oxygen => "O2",
            Gas::CarbonDioxide => "CO2",
        }
    }

    /// Parse a chemical formula.
    pub fn from_symbol(symbol: &str) -> Option<Gas> {
        Gas::ALL.into_iter().find(|g| g.symbol() == symbol)
    }
}

impl std::fmt::Display for Gas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Moles of each species, temperature and volume of one control volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    moles: [f64; Gas::COUNT],
    temperature: f64,
    volume: f64,
}

impl Default for GasMixture {
    fn default() -> Self {
        use crate::constants::standard;
        Self::new(standard::PRESSURE, standard::TEMPERATURE, standard::VOLUME)
    }
}

impl GasMixture {
    /// Create a mixture of the default composition at the given pressure (kPa),
    /// temperature (K) and volume (m³).
    pub fn new(pressure: f64, temperature: f64, volume: f64) -> Self {
        let mut mix = Self::empty(temperature, volume);
        mix.fill_default_composition(1.0);
        let target = mix.moles_for_pressure(pressure);
        mix.normalize_to_total_moles(target);
        mix
    }

    /// A mixture with no gas at all.
    pub fn empty(temperature: f64, volume: f64) -> Self {
        Self {
            moles: [0.0; Gas::COUNT],
            temperature: sanitize_floor(temperature, MIN_TEMPERATURE),
            volume: sanitize_floor(volume, MIN_VOLUME),
        }
    }

    /// Build a mixture from explicit per-species amounts.
    pub fn from_moles(
        amounts: impl IntoIterator<Item = (Gas, f64)>,
        temperature: f64,
        volume: f64,
    ) -> Self {
        let mut mix = Self::empty(temperature, volume);
        for (gas, moles) in amounts {
            mix.set_moles(gas, moles);
        }
        mix
    }

    /// Sum of all species, never below [`MIN_MOLES`].
    pub fn total_moles(&self) -> f64 {
        self.raw_total().max(MIN_MOLES)
    }

    /// Whether the mixture holds effectively no gas.
    pub fn is_empty(&self) -> bool {
        self.raw_total() <= MIN_MOLES
    }

    fn raw_total(&self) -> f64 {
        self.moles.iter().map(|m| m.max(0.0)).sum()
    }

    /// Ideal gas pressure in kPa.
    pub fn pressure(&self) -> f64 {
        self.total_moles() * R * self.temperature / (self.volume * PA_PER_KPA)
    }

    /// Moles needed to reach `pressure` at the current temperature and volume.
    pub fn moles_for_pressure(&self, pressure: f64) -> f64 {
        (pressure * self.volume * PA_PER_KPA) / (R * self.temperature)
    }

    /// Rescale every species proportionally so the mixture reaches `target` kPa.
    ///
    /// An empty mixture is seeded with the default composition first, so a
    /// positive floor pressure is always reachable.
    pub fn set_pressure(&mut self, target: f64) {
        if !target.is_finite() {
            return;
        }
        if self.is_empty() && target > 0.0 {
            self.fill_default_composition(1.0);
        }
        let n = self.moles_for_pressure(target.max(0.0));
        self.normalize_to_total_moles(n);
    }

    /// Scale every species so the total equals `target` moles.
    pub fn normalize_to_total_moles(&mut self, target: f64) {
        let factor = target.max(0.0) / self.total_moles();
        for m in self.moles.iter_mut() {
            *m = (*m * factor).max(0.0);
        }
    }

    /// Mole fraction of each species. All zero when the mixture is empty.
    pub fn fractions(&self) -> [(Gas, f64); Gas::COUNT] {
        let total = self.raw_total();
        Gas::ALL.map(|gas| {
            let fraction = if total > MIN_MOLES {
                self.moles[gas.index()].max(0.0) / total
            } else {
                0.0
            };
            (gas, fraction)
        })
    }

    /// Mole fraction of one species (0.0 when empty).
    pub fn fraction(&self, gas: Gas) -> f64 {
        self.fractions()[gas.index()].1
    }

    /// Moles of one species.
    pub fn moles(&self, gas: Gas) -> f64 {
        self.moles[gas.index()]
    }

    /// Overwrite the amount of one species. Negative and non-finite values become 0.
    pub fn set_moles(&mut self, gas: Gas, moles: f64) {
        self.moles[gas.index()] = if moles.is_finite() { moles.max(0.0) } else { 0.0 };
    }

    /// Iterate `(species, moles)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Gas, f64)> + '_ {
        Gas::ALL.into_iter().map(move |g| (g, self.moles[g.index()]))
    }

    /// Add gas. Non-positive amounts are ignored.
    pub fn add(&mut self, gas: Gas, moles: f64) {
        if !(moles > 0.0) || !moles.is_finite() {
            return;
        }
        self.moles[gas.index()] += moles;
    }

    /// Remove up to `moles` of a species and return how much was actually removed.
    pub fn remove(&mut self, gas: Gas, moles: f64) -> f64 {
        if !(moles > 0.0) {
            return 0.0;
        }
        let slot = &mut self.moles[gas.index()];
        let removed = moles.min(slot.max(0.0));
        *slot = (*slot - removed).max(0.0);
        removed
    }

    /// Remove every species.
    pub fn clear(&mut self) {
        self.moles = [0.0; Gas::COUNT];
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Set the temperature, clamped to the positive floor.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = sanitize_floor(temperature, MIN_TEMPERATURE);
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the volume, clamped to the positive floor.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = sanitize_floor(volume, MIN_VOLUME);
    }

    /// Whether every stored quantity is a finite number.
    pub fn is_finite(&self) -> bool {
        self.temperature.is_finite()
            && self.volume.is_finite()
            && self.moles.iter().all(|m| m.is_finite())
    }

    /// Replace NaN/∞ and negative amounts with zero. Returns true if anything changed.
    pub fn scrub_non_finite(&mut self) -> bool {
        let mut changed = false;
        for m in self.moles.iter_mut() {
            if !m.is_finite() || *m < 0.0 {
                *m = 0.0;
                changed = true;
            }
        }
        changed
    }

    /// Overwrite the contents with `total` moles of the default composition.
    pub fn fill_default_composition(&mut self, total: f64) {
        self.moles[Gas::Nitrogen.index()] = default_mix::NITROGEN * total;
        self.moles[Gas::Oxygen.index()] = default_mix::OXYGEN * total;
        self.moles[Gas::CarbonDioxide.index()] = default_mix::CARBON_DIOXIDE * total;
    }
}

/// Clamp to `floor`, mapping NaN to the floor as well.
fn sanitize_floor(value: f64, floor: f64) -> f64 {
    if value.is_nan() {
        floor
    } else {
        value.max(floor)
    }
}
