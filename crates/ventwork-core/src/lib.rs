//! Ventwork Core - Atmosphere Simulation Engine
//!
//! An ECS-based simulation of gas networks: well-mixed volumes joined by
//! pipes and pumps, leaking to the outside, and carved out of a voxel world
//! by the zone detector.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Nodes, connections, leak groups, scrubbers, canisters, monitors
//! - **Components**: Pure data attached to entities (Node, Connection, LeakGroup, etc.)
//! - **Systems**: Logic that queries and updates components once per fixed tick
//!
//! The physics itself lives in `ventwork-logic`; this crate schedules it,
//! owns the voxel grid, and keeps zones and their nodes in step with edits.
//!
//! # Example
//!
//! ```rust,no_run
//! use ventwork_core::prelude::*;
//!
//! let mut engine = SimulationEngine::new();
//!
//! let cabin = engine.create_named_node("Cabin", 101.3, 293.0, 30.0);
//! let lock = engine.create_named_node("Airlock", 0.0, 293.0, 4.0);
//! engine.create_connection(cabin, lock, ConnectionKind::Pipe, 0.5);
//!
//! // Run simulation
//! loop {
//!     engine.advance(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod generation;
pub mod persistence;
pub mod systems;
pub mod zones;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{SimConfig, ZoneConfig};
    pub use crate::engine::{SimulationEngine, TickReport};
    pub use crate::generation::TerrainKind;
    pub use crate::zones::{ZoneDetector, ZoneUpdate};
    pub use ventwork_logic::gas::{Gas, GasMixture};
    pub use ventwork_logic::voxel::{VoxelPos, VoxelType};
}
