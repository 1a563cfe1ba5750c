//! Pure atmosphere logic for Ventwork.
//!
//! This crate contains the physics and connectivity rules that are independent
//! of any ECS, scheduler, or runtime. Functions take plain data and return
//! results, making them unit-testable and reusable from the engine crate, the
//! headless harness, and any external consumer that only needs the math.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ambient`] | Planetary ambient presets (vacuum, Mars, Earth, Venus) |
//! | [`constants`] | Gas constant, specific heat, floors and default mixtures |
//! | [`flood`] | Flood-fill zone partitioning, boundary reachability, split tests |
//! | [`gas`] | Gas species and per-volume mixtures (ideal gas law) |
//! | [`hazards`] | Hazard classification of a node's atmosphere |
//! | [`leak`] | Leak-group composition and temperature relaxation |
//! | [`node`] | Well-mixed control volume: mixture + thermal state |
//! | [`thermal`] | Internal energy bookkeeping and energy/temperature sync |
//! | [`transfer`] | Advective mole/enthalpy transfer and conductive heat exchange |
//! | [`voxel`] | Sparse 3D voxel occupancy grid |

pub mod ambient;
pub mod constants;
pub mod flood;
pub mod gas;
pub mod hazards;
pub mod leak;
pub mod node;
pub mod thermal;
pub mod transfer;
pub mod voxel;
