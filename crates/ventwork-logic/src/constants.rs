//! Physical constants and numeric floors shared by every atmosphere module.
//!
//! Pressures are in kPa, temperatures in K, volumes in m³, energies in J.

/// Universal gas constant, J/(mol·K).
pub const R: f64 = 8.314;

/// Molar specific heat used for every species, J/(mol·K).
pub const SPECIFIC_HEAT_CP: f64 = 29.0;

/// Pressure is reported in kPa, the ideal gas law works in Pa.
pub const PA_PER_KPA: f64 = 1000.0;

/// Smallest total mole count a mixture reports. Keeps pressure defined.
pub const MIN_MOLES: f64 = 1e-12;

/// Transfers below this many moles are skipped.
pub const MIN_TRANSFER: f64 = 1e-12;

/// Below this, a pressure difference produces no flow.
pub const MIN_PRESSURE_DELTA: f64 = 1e-4;

/// Temperature floor, K.
pub const MIN_TEMPERATURE: f64 = 0.1;

/// Volume floor, m³.
pub const MIN_VOLUME: f64 = 1e-4;

/// Pressure floor applied by the clamp pass, kPa.
pub const VACUUM_PRESSURE_FLOOR: f64 = 0.01;

/// Fraction of a source's moles a single transfer may move.
pub const MAX_TRANSFER_FRACTION: f64 = 0.5;

/// Standard conditions used when a node is created without arguments.
pub mod standard {
    /// Sea-level pressure, kPa.
    pub const PRESSURE: f64 = 101.3;
    /// Room temperature, K.
    pub const TEMPERATURE: f64 = 293.0;
    /// One cubic metre.
    pub const VOLUME: f64 = 1.0;
}

/// Default composition of a freshly created mixture (mole fractions).
pub mod default_mix {
    pub const NITROGEN: f64 = 0.78;
    pub const OXYGEN: f64 = 0.21;
    pub const CARBON_DIOXIDE: f64 = 0.01;
}

/// Breathable seed used when a zone becomes enclosed.
pub mod enclosed_seed {
    /// Nitrogen, mol.
    pub const NITROGEN: f64 = 40.0;
    /// Oxygen, mol.
    pub const OXYGEN: f64 = 10.0;
    /// Temperature, K.
    pub const TEMPERATURE: f64 = 293.15;
}

/// Thermal defaults for new nodes.
pub mod thermal_defaults {
    /// Environment reference temperature, K.
    pub const EXTERNAL_TEMPERATURE: f64 = 220.0;
    /// Heat loss to the environment, W/K.
    pub const HEAT_LOSS_COEFFICIENT: f64 = 1.0;
    /// Advisory only.
    pub const THERMAL_CAPACITY: f64 = 1000.0;
}
