//! Diagnostic validation: conservation drift and per-node sanity checks.
//!
//! Runs after a tick and never mutates simulation state.

use std::fmt;

use hecs::World;
use ventwork_logic::node::Node;

use crate::components::{Canister, NodeLabel};

/// Per-interval energy change above this is reported as drift, J.
pub const ENERGY_DRIFT_THRESHOLD: f64 = 1000.0;
/// Energy/temperature disagreement above this is reported, J.
pub const ENERGY_MISMATCH_THRESHOLD: f64 = 100.0;
/// Nodes lighter than this are not checked for mismatch, mol.
const MISMATCH_MIN_MOLES: f64 = 0.1;

/// System-wide totals and any problems found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub node_count: usize,
    /// Internal energy of every node and canister, J.
    pub total_energy: f64,
    /// Moles in every node and canister.
    pub total_moles: f64,
    /// Mean node temperature, K.
    pub average_temperature: f64,
    /// Energy change since the previous validation, J. `None` on the first pass.
    pub energy_delta: Option<f64>,
    pub moles_delta: Option<f64>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Atmosphere validation ===")?;
        writeln!(f, "Nodes:               {}", self.node_count)?;
        writeln!(f, "Total energy:        {:.2} J", self.total_energy)?;
        writeln!(f, "Total moles:         {:.4} mol", self.total_moles)?;
        writeln!(
            f,
            "Average temperature: {:.2} K ({:.2} C)",
            self.average_temperature,
            self.average_temperature - 273.15
        )?;
        if let Some(delta) = self.energy_delta {
            writeln!(f, "Energy change:       {:+.2} J", delta)?;
        }
        if let Some(delta) = self.moles_delta {
            writeln!(f, "Moles change:        {:+.6} mol", delta)?;
        }
        if self.warnings.is_empty() {
            write!(f, "No problems found")
        } else {
            writeln!(f, "Warnings ({}):", self.warnings.len())?;
            for (i, w) in self.warnings.iter().enumerate() {
                if i + 1 == self.warnings.len() {
                    write!(f, "  - {}", w)?;
                } else {
                    writeln!(f, "  - {}", w)?;
                }
            }
            Ok(())
        }
    }
}

/// Tracks totals between validation passes.
#[derive(Debug, Clone)]
pub struct SystemValidator {
    pub energy_drift_threshold: f64,
    /// Seconds between comparisons.
    pub interval: f64,
    elapsed: f64,
    last_energy: Option<f64>,
    last_moles: Option<f64>,
}

impl Default for SystemValidator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SystemValidator {
    pub fn new(interval: f64) -> Self {
        Self {
            energy_drift_threshold: ENERGY_DRIFT_THRESHOLD,
            interval,
            elapsed: 0.0,
            last_energy: None,
            last_moles: None,
        }
    }

    /// Accumulate `dt`; validate once a full interval has passed.
    pub fn tick(&mut self, world: &World, dt: f64) -> Option<ValidationReport> {
        self.elapsed += dt;
        if self.elapsed + 1e-9 < self.interval {
            return None;
        }
        self.elapsed = 0.0;
        Some(self.validate(world))
    }

    /// Validate now and remember the totals for the next comparison.
    pub fn validate(&mut self, world: &World) -> ValidationReport {
        let mut report = inspect(world);

        if let Some(last) = self.last_energy {
            let delta = report.total_energy - last;
            report.energy_delta = Some(delta);
            if delta.abs() > self.energy_drift_threshold {
                let msg = format!("Energy drift of {:.2} J since last check", delta);
                log::warn!("{}", msg);
                report.warnings.push(msg);
            }
        }
        if let Some(last) = self.last_moles {
            report.moles_delta = Some(report.total_moles - last);
        }

        self.last_energy = Some(report.total_energy);
        self.last_moles = Some(report.total_moles);
        report
    }

    /// Forget the previous totals.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.last_energy = None;
        self.last_moles = None;
    }
}

/// One-off snapshot: totals plus per-node checks, with no drift comparison.
pub fn inspect(world: &World) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut temperature_sum = 0.0;

    for (_, (node, label)) in world.query::<(&Node, Option<&NodeLabel>)>().iter() {
        let name = label.map(|l| l.name.as_str()).unwrap_or("unnamed node");
        check_node(node, name, &mut report.warnings);
        report.node_count += 1;
        report.total_energy += node.internal_energy();
        report.total_moles += node.total_moles();
        temperature_sum += node.temperature();
    }
    for (_, canister) in world.query::<&Canister>().iter() {
        report.total_energy += canister.store.internal_energy();
        report.total_moles += canister.store.total_moles();
    }

    if report.node_count > 0 {
        report.average_temperature = temperature_sum / report.node_count as f64;
    }
    report
}

fn check_node(node: &Node, name: &str, warnings: &mut Vec<String>) {
    let t = node.temperature();
    let e = node.internal_energy();
    if t.is_nan() {
        warnings.push(format!("{}: temperature is NaN", name));
    } else if t < 0.0 {
        warnings.push(format!("{}: negative temperature {:.2} K", name, t));
    }
    if e.is_nan() {
        warnings.push(format!("{}: internal energy is NaN", name));
    } else if e < 0.0 {
        warnings.push(format!("{}: negative internal energy {:.2} J", name, e));
    }
    if node.total_moles() > MISMATCH_MIN_MOLES {
        let mismatch = node.energy_mismatch();
        if mismatch > ENERGY_MISMATCH_THRESHOLD {
            warnings.push(format!(
                "{}: energy differs from temperature by {:.2} J",
                name, mismatch
            ));
        }
    }
}
