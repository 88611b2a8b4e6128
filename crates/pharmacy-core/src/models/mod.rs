//! Domain models for the pharmacy inventory.

mod allocation;
mod drug;

pub use allocation::*;
pub use drug::*;
