//! Kinetic: a headless animation and gesture engine.
//!
//! Re-exports the engine and its configuration crate under one name.

pub use kinetic_config as config;
pub use kinetic_engine::*;

pub use kinetic_config::KineticConfig;
