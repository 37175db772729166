//! # Zilly Common
//!
//! Common types, utilities, and shared abstractions for the Zilly physics core.
//!
//! This crate provides foundational types used by the collision grid and the
//! character simulation:
//! - Deterministic scalar and vector math (rounding, saturated add, ramps)
//! - Tile-space coordinate types
//! - Player slot ids (weak indices into the world's character array)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
    pub use glam::Vec2;
}

pub use prelude::*;
