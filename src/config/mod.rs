//! Configuration module for tunelayer
//!
//! Provides CLI argument definitions and the backing-store path layout
//! shared by every layer.

mod paths;
mod settings;

pub use paths::*;
pub use settings::*;
