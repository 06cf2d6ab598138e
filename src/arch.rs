//! Architecture variant selection
//!
//! Definition stores scope their entries per architecture. The key is
//! resolved once per run and stays stable for the process lifetime: the
//! native architecture name, suffixed with `_PC` when the kernel exposes
//! the page-cache limit tunable.

use std::path::PathBuf;

/// Kernel tunable whose presence indicates page-cache limit support
const PAGECACHE_PROBE: &str = "/proc/sys/vm/pagecache_limit_mb";

/// Resolves the architecture key used to select definition store sections
#[derive(Debug, Clone)]
pub struct ArchSelector {
    native: String,
    probe_path: PathBuf,
}

impl ArchSelector {
    /// Selector for the machine we are running on
    pub fn native() -> Self {
        Self {
            native: std::env::consts::ARCH.to_string(),
            probe_path: PathBuf::from(PAGECACHE_PROBE),
        }
    }

    /// Selector with an explicit architecture name and probe path (tests)
    pub fn with_parts(native: impl Into<String>, probe_path: impl Into<PathBuf>) -> Self {
        Self {
            native: native.into(),
            probe_path: probe_path.into(),
        }
    }

    /// Resolve the architecture key for this run.
    ///
    /// There is no error path: an unavailable probe simply yields the
    /// unsuffixed native key.
    pub fn resolve(&self) -> String {
        let base = arch_key(&self.native);
        if self.supports_pagecache_limit() {
            format!("{base}_PC")
        } else {
            base
        }
    }

    fn supports_pagecache_limit(&self) -> bool {
        self.probe_path.exists()
    }
}

impl Default for ArchSelector {
    fn default() -> Self {
        Self::native()
    }
}

/// Map a native architecture name to its definition store section name
fn arch_key(native: &str) -> String {
    match native {
        "x86_64" => "ArchX86".to_string(),
        "powerpc64" | "powerpc64le" => "ArchPPC64LE".to_string(),
        "aarch64" => "ArchARM64".to_string(),
        "s390x" => "ArchS390X".to_string(),
        other => format!("Arch{}", other.to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_arch_mapping() {
        assert_eq!(arch_key("x86_64"), "ArchX86");
        assert_eq!(arch_key("powerpc64le"), "ArchPPC64LE");
        assert_eq!(arch_key("s390x"), "ArchS390X");
    }

    #[test]
    fn test_unknown_arch_falls_back_to_uppercase() {
        assert_eq!(arch_key("riscv64"), "ArchRISCV64");
    }

    #[test]
    fn test_pagecache_suffix() {
        let dir = TempDir::new().unwrap();
        let probe = dir.path().join("pagecache_limit_mb");

        let selector = ArchSelector::with_parts("x86_64", &probe);
        assert_eq!(selector.resolve(), "ArchX86");

        std::fs::write(&probe, "0\n").unwrap();
        assert_eq!(selector.resolve(), "ArchX86_PC");
    }
}
