//! Backing-store path layout
//!
//! Every layer lives at a fixed location under one root. The root is
//! overridable (`--root`, tests), which keeps the engine free of
//! hard-coded absolute paths.

use crate::store::Kind;
use std::path::{Path, PathBuf};

/// Locations of all layer backing stores
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    /// Layout rooted at an arbitrary directory
    pub fn under_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vendor-shipped Note files, one per ID (read-only)
    pub fn package_notes_dir(&self) -> PathBuf {
        self.root.join("usr/share/tunelayer/notes")
    }

    /// Vendor-shipped Solution catalogue (aggregate, architecture-sectioned)
    pub fn package_solutions_file(&self) -> PathBuf {
        self.root.join("usr/share/tunelayer/solutions")
    }

    /// Advisory list of deprecated Solution IDs (read-only)
    pub fn deprecated_solutions_file(&self) -> PathBuf {
        self.root.join("usr/share/tunelayer/sols/deprecated")
    }

    /// Vendor holding area for unreleased updates, working-shaped
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("usr/share/tunelayer/staging/latest")
    }

    /// Currently effective Note files
    pub fn working_notes_dir(&self) -> PathBuf {
        self.root.join("var/lib/tunelayer/working/notes")
    }

    /// Currently effective single-solution files
    pub fn working_sols_dir(&self) -> PathBuf {
        self.root.join("var/lib/tunelayer/working/sols")
    }

    /// Customer overlay files, one per ID
    pub fn override_dir(&self) -> PathBuf {
        self.root.join("etc/tunelayer/override")
    }

    /// Customer-authored Note files plus the custom Solution catalogue
    pub fn extra_dir(&self) -> PathBuf {
        self.root.join("etc/tunelayer/extra")
    }

    /// Aggregate file holding customer-authored Solutions
    pub fn extra_solutions_file(&self) -> PathBuf {
        self.extra_dir().join("solutions.sol")
    }

    /// Persisted application state (enabled/apply-order bookkeeping)
    pub fn state_file(&self) -> PathBuf {
        self.root.join("var/lib/tunelayer/config")
    }

    /// Advisory run lock holding the owning PID
    pub fn lock_file(&self) -> PathBuf {
        self.root.join("run/tunelayer.lock")
    }

    /// Working-area path for an ID of the given kind
    pub fn working_path(&self, kind: Kind, id: &str) -> PathBuf {
        match kind {
            Kind::Note => self.working_notes_dir().join(kind.file_name(id)),
            Kind::Solution => self.working_sols_dir().join(kind.file_name(id)),
        }
    }

    /// Staging-area path for an ID of the given kind
    pub fn staging_path(&self, kind: Kind, id: &str) -> PathBuf {
        self.staging_dir().join(kind.file_name(id))
    }

    /// Override-layer path for an ID of the given kind
    pub fn override_path(&self, kind: Kind, id: &str) -> PathBuf {
        self.override_dir().join(kind.file_name(id))
    }

    /// Extra-layer path for a customer Note
    pub fn extra_note_path(&self, id: &str) -> PathBuf {
        self.extra_dir().join(id)
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::under_root("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_paths_split_by_kind() {
        let paths = StorePaths::under_root("/tmp/x");
        assert!(paths
            .working_path(Kind::Note, "100")
            .ends_with("working/notes/100"));
        assert!(paths
            .working_path(Kind::Solution, "HANA")
            .ends_with("working/sols/HANA.sol"));
    }

    #[test]
    fn test_staging_mirrors_working_shape() {
        let paths = StorePaths::under_root("/");
        assert!(paths
            .staging_path(Kind::Solution, "HANA")
            .ends_with("staging/latest/HANA.sol"));
        assert!(paths.staging_path(Kind::Note, "100").ends_with("staging/latest/100"));
    }
}
