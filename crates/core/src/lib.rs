//! GameTracker core - daily playtime snapshot engine.
//!
//! Samples cumulative per-game playtime from the Steam Web API, persists
//! immutable daily snapshots, and derives day-over-day "hours played"
//! series by diffing consecutive snapshots.

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod source;
pub mod utils;

pub use config::TrackerConfig;
pub use error::{Error, Result};
