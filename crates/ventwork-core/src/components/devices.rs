//! Device components: equipment that transforms the gas in a node.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use ventwork_logic::gas::GasMixture;
use ventwork_logic::node::Node;

/// Removes CO2 from a node, optionally returning part of it as O2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scrubber {
    pub node: Entity,
    /// CO2 removed per second when running, mol/s.
    pub scrub_rate: f64,
    pub produces_oxygen: bool,
    /// O2 produced per mole of CO2 removed.
    pub oxygen_ratio: f64,
    pub requires_power: bool,
    pub powered: bool,
    pub active: bool,
    /// Cleared when the last tick found nothing to do.
    pub operational: bool,
    pub total_scrubbed: f64,
    pub total_produced: f64,
}

impl Scrubber {
    pub fn new(node: Entity) -> Self {
        Self {
            node,
            scrub_rate: 0.1,
            produces_oxygen: true,
            oxygen_ratio: 0.5,
            requires_power: true,
            powered: true,
            active: true,
            operational: true,
            total_scrubbed: 0.0,
            total_produced: 0.0,
        }
    }

    pub fn with_rate(mut self, scrub_rate: f64) -> Self {
        self.scrub_rate = scrub_rate.max(0.0);
        self
    }

    pub fn is_running(&self) -> bool {
        self.active && (!self.requires_power || self.powered)
    }

    pub fn status_text(&self) -> &'static str {
        if !self.active {
            "Inactive"
        } else if self.requires_power && !self.powered {
            "No Power"
        } else if !self.operational {
            "Idle"
        } else {
            "Active"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanisterMode {
    /// Holds its contents.
    Manual,
    /// Draws gas from the node while the node is at higher pressure.
    Fill,
    /// Releases gas into the node.
    Empty,
    /// Moves gas toward the lower-pressure side.
    Equalize,
}

/// Portable pressurized gas store attached to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canister {
    /// Stored gas and its thermal state.
    pub store: Node,
    pub node: Option<Entity>,
    pub mode: CanisterMode,
    /// kPa
    pub max_pressure: f64,
    /// mol/s
    pub transfer_rate: f64,
    pub total_filled: f64,
    pub total_emptied: f64,
}

impl Canister {
    /// Default canister volume, m³.
    pub const VOLUME: f64 = 0.1;

    /// An empty canister at `temperature`.
    pub fn empty(temperature: f64) -> Self {
        Self::with_contents(GasMixture::empty(temperature, Self::VOLUME))
    }

    pub fn with_contents(mixture: GasMixture) -> Self {
        Self {
            store: Node::from_mixture(mixture).with_heat_loss(0.0, mixture.temperature()),
            node: None,
            mode: CanisterMode::Manual,
            max_pressure: 5000.0,
            transfer_rate: 1.0,
            total_filled: 0.0,
            total_emptied: 0.0,
        }
    }

    pub fn connect(&mut self, node: Entity) {
        self.node = Some(node);
    }

    pub fn disconnect(&mut self) {
        self.node = None;
    }

    pub fn pressure(&self) -> f64 {
        self.store.pressure()
    }

    /// Fill level relative to the rated pressure, percent.
    pub fn fill_percent(&self) -> f64 {
        self.pressure() / self.max_pressure * 100.0
    }

    pub fn status_text(&self) -> String {
        if self.node.is_none() {
            return "Disconnected".to_string();
        }
        format!(
            "{:?} | {:.1} kPa ({:.0}%)",
            self.mode,
            self.pressure(),
            self.fill_percent()
        )
    }
}
