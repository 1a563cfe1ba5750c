//! Hazard monitor component: a read-only observer of one node.

use hecs::Entity;
use ventwork_logic::hazards::{HazardLevel, HazardReport, HazardThresholds};

#[derive(Debug, Clone, PartialEq)]
pub struct HazardMonitor {
    pub node: Entity,
    pub thresholds: HazardThresholds,
    /// Result of the most recent hazard pass.
    pub report: HazardReport,
}

impl HazardMonitor {
    pub fn new(node: Entity) -> Self {
        Self {
            node,
            thresholds: HazardThresholds::default(),
            report: HazardReport {
                level: HazardLevel::Safe,
                warnings: Vec::new(),
            },
        }
    }

    pub fn with_thresholds(mut self, thresholds: HazardThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn level(&self) -> HazardLevel {
        self.report.level
    }
}
