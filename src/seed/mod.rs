//! Seeding and reset for grcstore
//!
//! A fresh dataset is loaded with a baseline exactly once. Completion is
//! recorded by the seed marker in `_meta`; reset wipes managed collections
//! and the marker, then seeds again.
//!
//! # Invariants
//!
//! - The baseline and the marker commit in one batch
//! - A marked dataset is never reseeded except by reset
//! - A baseline naming an unknown collection writes nothing

mod baseline;
mod controller;
mod marker;

pub use baseline::{Baseline, BaselineCollection};
pub use controller::{SeedOutcome, SeedState};
pub use marker::{SeedMarker, SEED_MARKER_KEY};
