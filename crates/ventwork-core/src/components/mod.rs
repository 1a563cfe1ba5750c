//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.
//!
//! A node entity carries `(Node, NodeLabel)`; connections, leak groups,
//! devices and monitors are entities of their own that reference nodes.

mod common;
mod devices;
mod monitor;
mod network;

pub use common::*;
pub use devices::*;
pub use monitor::*;
pub use network::*;

pub use ventwork_logic::node::Node;
