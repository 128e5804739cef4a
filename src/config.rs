//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive the game
//! and helpers to locate and load configuration from disk.

mod load;
mod schema;

pub use schema::*;
