//! Perturbed truncated and shifted (PeTS) equation of state
//! for the Lennard-Jones fluid truncated and shifted at $2.5\sigma$.
//!
//! [Heier et al. (2018)](https://doi.org/10.1080/00268976.2018.1447153)
mod eos;
mod parameters;

pub use eos::{Pets, PetsOptions};
pub use parameters::{PetsBinaryRecord, PetsParameters, PetsRecord};
