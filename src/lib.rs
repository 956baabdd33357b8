#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]
//! Helmholtz energy models built on top of `helmos-core`.
//!
//! The core crate is re-exported as [core] so that applications only
//! need a single dependency.
pub use helmos_core as core;

pub mod hard_sphere;

// models
#[cfg(feature = "pets")]
pub mod pets;
