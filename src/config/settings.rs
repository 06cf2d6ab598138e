//! CLI argument definitions for tunelayer
//!
//! Defines the command surface and flags. Command handling lives in the
//! binary; the engine only sees the narrow option structs.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// tunelayer - layered host-tuning definition manager
#[derive(Parser, Debug, Clone)]
#[command(name = "tunelayer")]
#[command(author = "Tunelayer Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage layered tuning definitions and staged vendor updates")]
#[command(long_about = r#"
tunelayer keeps a catalogue of named tuning definitions - Notes (atomic
parameter bundles) and Solutions (named bundles of Notes) - resolved across
the package, override and custom layers, and promotes staged vendor updates
into the working area without breaking an already-tuned system.

Examples:
  tunelayer list solutions               # Resolved solution catalogue
  tunelayer staging list                 # Pending vendor updates
  tunelayer staging diff 1410736         # Field-level differences
  tunelayer staging analysis all         # Pre-release impact report
  tunelayer staging release --dry-run all
  tunelayer staging release HANA.sol     # Promote one object
"#)]
pub struct CliArgs {
    /// Root directory holding all backing stores (for tests and chroots)
    #[arg(long, global = true, default_value = "/", value_name = "DIR")]
    pub root: PathBuf,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the resolved definition catalogue
    #[command(name = "list")]
    List {
        /// Which catalogue to list
        #[arg(value_enum)]
        kind: ListKind,
    },

    /// Show enabled/applied state and pending staging work
    #[command(name = "status")]
    Status,

    /// Inspect and promote staged vendor updates
    #[command(name = "staging")]
    Staging {
        #[command(subcommand)]
        action: StagingAction,
    },
}

/// Catalogue selector for `list`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Notes,
    Solutions,
}

/// Staging subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StagingAction {
    /// List every staged object with its classification
    #[command(name = "list")]
    List,

    /// Show field-level differences between staged and working content
    #[command(name = "diff")]
    Diff {
        /// Object IDs, or 'all' (default: all)
        ids: Vec<String>,
    },

    /// Report whether releasing the objects would break current tuning
    #[command(name = "analysis")]
    Analysis {
        /// Object IDs, or 'all' (default: all)
        ids: Vec<String>,
    },

    /// Promote staged objects into the working area
    #[command(name = "release")]
    Release {
        /// Skip the confirmation prompt
        #[arg(short = 'f', long)]
        force: bool,

        /// Analyze and report only, mutate nothing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Object IDs, or the literal token 'all'
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Commands {
    /// Whether this command mutates state and must hold the run lock.
    ///
    /// A static allowlist: read-only commands skip the lock entirely.
    pub fn needs_lock(&self) -> bool {
        match self {
            Commands::List { .. } | Commands::Status => false,
            Commands::Staging { action } => matches!(
                action,
                StagingAction::Release { dry_run: false, .. }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_allowlist() {
        assert!(!Commands::Status.needs_lock());
        assert!(!Commands::List {
            kind: ListKind::Notes
        }
        .needs_lock());
        assert!(!Commands::Staging {
            action: StagingAction::Analysis { ids: vec![] }
        }
        .needs_lock());
        assert!(Commands::Staging {
            action: StagingAction::Release {
                force: false,
                dry_run: false,
                ids: vec!["all".to_string()]
            }
        }
        .needs_lock());
        // Dry runs mutate nothing and stay lock-free
        assert!(!Commands::Staging {
            action: StagingAction::Release {
                force: false,
                dry_run: true,
                ids: vec!["all".to_string()]
            }
        }
        .needs_lock());
    }
}
