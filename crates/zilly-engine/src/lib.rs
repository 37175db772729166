//! Zilly Engine - headless simulation runner for the Zilly physics core.
//!
//! This crate loads scenario configs, runs them through the world core and
//! records per-tick traces for determinism checks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod scenario;
