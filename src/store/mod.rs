//! Definition stores and layered resolution
//!
//! Provides the sectioned key/value parser shared by every backing store,
//! the Note/Solution definition model, and the resolver that merges the
//! Package, Override, Extra/Custom and Deprecated layers into one
//! authoritative per-architecture table.

mod definition;
mod resolver;
pub mod text;

pub use definition::*;
pub use resolver::*;
pub use text::{Document, Entry};
