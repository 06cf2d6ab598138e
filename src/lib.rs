//! # tunelayer - Layered Host-Tuning Definition Manager
//!
//! tunelayer keeps a catalogue of named tuning definitions - Notes
//! (atomic parameter bundles) and Solutions (named ordered bundles of
//! Notes) - and decides, across several overlapping storage layers and
//! architecture variants, which definition content is authoritative. It
//! promotes vendor updates from the staging area into the working area
//! without silently breaking an already-tuned system.
//!
//! ## Layers
//!
//! - **Package**: vendor-shipped, read-only ground truth
//! - **Working**: engine-owned, currently effective content
//! - **Override**: customer overlay superseding specific package values
//! - **Extra/Custom**: customer-authored definitions
//! - **Deprecated**: read-only advisory list of retired Solutions
//! - **Staging**: vendor holding area for unreleased updates
//!
//! Precedence per ID and architecture:
//! Custom(Extra) > Override-modified-Package > Package.
//!
//! ## Staging lifecycle
//!
//! ```no_run
//! use tunelayer::config::StorePaths;
//! use tunelayer::confirm::FixedConfirmer;
//! use tunelayer::staging::{ImpactAnalyzer, ReleaseExecutor, ReleaseOptions, StagingContext};
//!
//! # fn main() -> tunelayer::error::Result<()> {
//! let mut ctx = StagingContext::build(StorePaths::default(), "ArchX86")?;
//!
//! for analysis in ImpactAnalyzer::new(&ctx).analyze_all() {
//!     println!("{}: severity {}", analysis.name, analysis.severity());
//! }
//!
//! let confirmer = FixedConfirmer(true);
//! let result = ReleaseExecutor::new(&mut ctx, &confirmer)
//!     .release(&["all".to_string()], ReleaseOptions { force: true, dry_run: false })?;
//! result.into_result()?;
//! # Ok(())
//! # }
//! ```

pub mod arch;
pub mod config;
pub mod confirm;
pub mod error;
pub mod lock;
pub mod staging;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use arch::ArchSelector;
pub use error::{Result, TuneError};
pub use staging::{Classification, StagingContext};
pub use store::{Definition, Kind, Layer, LayerResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use tunelayer::prelude::*;
    //! ```

    pub use crate::arch::ArchSelector;
    pub use crate::config::{CliArgs, Commands, StorePaths};
    pub use crate::confirm::{Confirmer, FixedConfirmer, StdinConfirmer};
    pub use crate::error::{Result, TuneError};
    pub use crate::lock::{FileLock, LockService};
    pub use crate::staging::{
        Classification, DiffEngine, ImpactAnalyzer, ReleaseExecutor, ReleaseOptions, StageRecord,
        StagingContext,
    };
    pub use crate::state::ApplicationState;
    pub use crate::store::{Definition, Kind, Layer, LayerResolver};
}
