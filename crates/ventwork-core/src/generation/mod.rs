//! Generation - procedural voxel terrain and ready-made node scenarios.

mod scenarios;
mod terrain;

pub use scenarios::*;
pub use terrain::*;
