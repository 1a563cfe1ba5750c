//! Breathability classification of a node's atmosphere.
//!
//! Read-only: nothing here mutates a node. Each parameter (pressure,
//! temperature, O2, CO2) is checked against its thresholds and the worst
//! level wins.

use serde::{Deserialize, Serialize};

use crate::gas::Gas;
use crate::node::Node;

/// Severity of an atmosphere, ordered from harmless to lethal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardLevel {
    Safe,
    Caution,
    Warning,
    Danger,
    Critical,
}

impl HazardLevel {
    pub fn label(self) -> &'static str {
        match self {
            HazardLevel::Safe => "safe",
            HazardLevel::Caution => "caution",
            HazardLevel::Warning => "warning",
            HazardLevel::Danger => "danger",
            HazardLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for HazardLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification bounds. Pressures in kPa, temperatures in K, gases in mole percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardThresholds {
    pub critical_low_pressure: f64,
    pub min_safe_pressure: f64,
    pub max_safe_pressure: f64,
    pub critical_high_pressure: f64,

    pub critical_low_temperature: f64,
    pub min_safe_temperature: f64,
    pub max_safe_temperature: f64,
    pub critical_high_temperature: f64,

    pub critical_low_oxygen: f64,
    pub min_safe_oxygen: f64,
    pub max_safe_oxygen: f64,

    pub max_safe_co2: f64,
    pub dangerous_co2: f64,
    pub critical_co2: f64,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            critical_low_pressure: 20.0,
            min_safe_pressure: 50.0,
            max_safe_pressure: 150.0,
            critical_high_pressure: 200.0,

            critical_low_temperature: 250.0,
            min_safe_temperature: 273.0,
            max_safe_temperature: 310.0,
            critical_high_temperature: 340.0,

            critical_low_oxygen: 10.0,
            min_safe_oxygen: 18.0,
            max_safe_oxygen: 25.0,

            max_safe_co2: 1.0,
            dangerous_co2: 3.0,
            critical_co2: 5.0,
        }
    }
}

/// Outcome of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    pub level: HazardLevel,
    /// One line per tripped threshold, most severe checks first within each parameter.
    pub warnings: Vec<String>,
}

impl HazardReport {
    /// Report for a monitor with nothing to read.
    pub fn no_atmosphere() -> Self {
        Self {
            level: HazardLevel::Critical,
            warnings: vec!["No atmosphere detected".to_string()],
        }
    }

    /// Whether an unprotected person can stay here.
    pub fn is_safe_for_humans(&self) -> bool {
        self.level <= HazardLevel::Warning
    }
}

/// Point-in-time readout of a node, as shown on displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// kPa
    pub pressure: f64,
    /// K
    pub temperature: f64,
    pub oxygen_percent: f64,
    pub co2_percent: f64,
    pub nitrogen_percent: f64,
    pub total_moles: f64,
    pub level: HazardLevel,
}

impl Readings {
    pub fn of(node: &Node, level: HazardLevel) -> Self {
        Self {
            pressure: node.pressure(),
            temperature: node.temperature(),
            oxygen_percent: node.percent(Gas::Oxygen),
            co2_percent: node.percent(Gas::CarbonDioxide),
            nitrogen_percent: node.percent(Gas::Nitrogen),
            total_moles: node.total_moles(),
            level,
        }
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature - 273.15
    }
}

/// Classify a node's atmosphere.
pub fn assess_hazard(node: &Node, thresholds: &HazardThresholds) -> HazardReport {
    let mut warnings = Vec::new();
    let mut level = HazardLevel::Safe;

    level = level.max(check_pressure(node.pressure(), thresholds, &mut warnings));
    level = level.max(check_temperature(node.temperature(), thresholds, &mut warnings));
    level = level.max(check_oxygen(node.percent(Gas::Oxygen), thresholds, &mut warnings));
    level = level.max(check_co2(node.percent(Gas::CarbonDioxide), thresholds, &mut warnings));

    HazardReport { level, warnings }
}

fn check_pressure(p: f64, t: &HazardThresholds, warnings: &mut Vec<String>) -> HazardLevel {
    if p < t.critical_low_pressure {
        warnings.push(format!("CRITICAL: Vacuum conditions ({p:.1} kPa)"));
        HazardLevel::Critical
    } else if p > t.critical_high_pressure {
        warnings.push(format!("CRITICAL: Extreme pressure ({p:.1} kPa)"));
        HazardLevel::Critical
    } else if p < t.min_safe_pressure {
        warnings.push(format!("WARNING: Low pressure ({p:.1} kPa)"));
        HazardLevel::Warning
    } else if p > t.max_safe_pressure {
        warnings.push(format!("WARNING: High pressure ({p:.1} kPa)"));
        HazardLevel::Warning
    } else {
        HazardLevel::Safe
    }
}

fn check_temperature(k: f64, t: &HazardThresholds, warnings: &mut Vec<String>) -> HazardLevel {
    let c = k - 273.15;
    if k < t.critical_low_temperature {
        warnings.push(format!("CRITICAL: Extreme cold ({c:.1} °C)"));
        HazardLevel::Critical
    } else if k > t.critical_high_temperature {
        warnings.push(format!("CRITICAL: Extreme heat ({c:.1} °C)"));
        HazardLevel::Critical
    } else if k < t.min_safe_temperature {
        warnings.push(format!("WARNING: Cold environment ({c:.1} °C)"));
        HazardLevel::Warning
    } else if k > t.max_safe_temperature {
        warnings.push(format!("WARNING: Hot environment ({c:.1} °C)"));
        HazardLevel::Warning
    } else {
        HazardLevel::Safe
    }
}

fn check_oxygen(pct: f64, t: &HazardThresholds, warnings: &mut Vec<String>) -> HazardLevel {
    if pct < t.critical_low_oxygen {
        warnings.push(format!("CRITICAL: Hypoxia, O2 at {pct:.1}%"));
        HazardLevel::Critical
    } else if pct < t.min_safe_oxygen {
        warnings.push(format!("DANGER: Low oxygen, {pct:.1}%"));
        HazardLevel::Danger
    } else if pct > t.max_safe_oxygen {
        warnings.push(format!("WARNING: High oxygen, {pct:.1}%"));
        HazardLevel::Warning
    } else {
        HazardLevel::Safe
    }
}

fn check_co2(pct: f64, t: &HazardThresholds, warnings: &mut Vec<String>) -> HazardLevel {
    if pct > t.critical_co2 {
        warnings.push(format!("CRITICAL: CO2 toxicity, {pct:.1}%"));
        HazardLevel::Critical
    } else if pct > t.dangerous_co2 {
        warnings.push(format!("DANGER: High CO2, {pct:.1}%"));
        HazardLevel::Danger
    } else if pct > t.max_safe_co2 {
        warnings.push(format!("WARNING: Elevated CO2, {pct:.1}%"));
        HazardLevel::Warning
    } else {
        HazardLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::GasMixture;

    fn node_with(o2: f64, co2: f64, n2: f64, temperature: f64) -> Node {
        Node::from_mixture(GasMixture::from_moles(
            [(Gas::Oxygen, o2), (Gas::CarbonDioxide, co2), (Gas::Nitrogen, n2)],
            temperature,
            1.0,
        ))
    }

    /// ~101 kPa of air at 293 K with the given O2/CO2 percentages.
    fn air(o2_pct: f64, co2_pct: f64) -> Node {
        let mut node = node_with(o2_pct, co2_pct, 100.0 - o2_pct - co2_pct, 293.0);
        node.set_pressure(101.3);
        node
    }

    #[test]
    fn test_earth_air_is_safe() {
        let report = assess_hazard(&air(21.0, 0.04), &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Safe);
        assert!(report.warnings.is_empty());
        assert!(report.is_safe_for_humans());
    }

    #[test]
    fn test_low_oxygen_is_danger() {
        let report = assess_hazard(&air(15.0, 0.04), &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Danger);
        assert!(!report.is_safe_for_humans());
    }

    #[test]
    fn test_hypoxia_is_critical() {
        let report = assess_hazard(&air(5.0, 0.04), &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Critical);
    }

    #[test]
    fn test_elevated_co2_is_warning() {
        let report = assess_hazard(&air(21.0, 2.0), &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Warning);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.is_safe_for_humans());
    }

    #[test]
    fn test_vacuum_is_critical() {
        let mut node = air(21.0, 0.04);
        node.set_pressure(1.0);
        let report = assess_hazard(&node, &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Critical);
        assert!(report.warnings[0].contains("Vacuum"));
    }

    #[test]
    fn test_worst_parameter_wins() {
        let mut node = air(15.0, 2.0);
        node.set_temperature(260.0);
        let report = assess_hazard(&node, &HazardThresholds::default());
        assert_eq!(report.level, HazardLevel::Danger);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn test_level_ordering() {
        assert!(HazardLevel::Safe < HazardLevel::Caution);
        assert!(HazardLevel::Danger < HazardLevel::Critical);
        assert_eq!(HazardLevel::Warning.max(HazardLevel::Caution), HazardLevel::Warning);
    }

    #[test]
    fn test_readings_snapshot() {
        let node = air(21.0, 0.04);
        let r = Readings::of(&node, HazardLevel::Safe);
        assert!((r.pressure - 101.3).abs() < 1e-9);
        assert!((r.oxygen_percent - 21.0).abs() < 1e-9);
        assert!((r.temperature_celsius() - 19.85).abs() < 1e-9);
    }
}
