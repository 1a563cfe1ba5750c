//! Systems run by the simulation engine, in tick order.

mod access;
mod clamp;
mod connections;
mod devices;
mod hazards;
mod heat;
mod leaks;
mod validation;

pub use access::*;
pub use clamp::*;
pub use connections::*;
pub use devices::*;
pub use hazards::*;
pub use heat::*;
pub use leaks::*;
pub use validation::*;
