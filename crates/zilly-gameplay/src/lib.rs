//! # Zilly Gameplay
//!
//! Deterministic character physics on top of the collision grid.
//!
//! This crate provides:
//! - Tuning parameters stored as exact hundredths
//! - Player input and the hook state machine
//! - The character core (tick, drag, move, quantization)
//! - The world core holding every character slot
//! - Client-side prediction from confirmed snapshots

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod character;
pub mod config;
pub mod hook;
pub mod input;
pub mod prediction;
pub mod tuning;
pub mod world;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::character::*;
    pub use crate::config::*;
    pub use crate::hook::*;
    pub use crate::input::*;
    pub use crate::prediction::*;
    pub use crate::tuning::*;
    pub use crate::world::*;
}

pub use prelude::*;
