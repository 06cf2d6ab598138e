//! Staging lifecycle: classification, diff, impact analysis, release
//!
//! Vendor updates land in the staging area and are promoted into the
//! working area in four steps:
//! - classification of every staged object (new/updated/deleted)
//! - field-level diff against the working content
//! - pre-release impact analysis against the enabled/applied state
//! - release, the only mutating step

mod classifier;
mod diff;
mod impact;
mod release;

pub use classifier::*;
pub use diff::*;
pub use impact::*;
pub use release::*;
